//! The host environment that imported property sources are appended to.

use crate::core::ActiveProfiles;
use crate::error::{ImportError, Result};
use config::{Map, Value, ValueKind};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Property read when no profiles have been set explicitly.
pub const ACTIVE_PROFILES_PROPERTY: &str = "profiles.active";

/// An ordered group of string properties decoded from one document.
///
/// Keys are flattened paths such as `server.port` or `hosts[0]`. If a key
/// occurs more than once, lookups see the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySource {
    name: String,
    entries: Vec<(String, String)>,
}

impl PropertySource {
    /// Create an empty property source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append a property, returning the source for chaining.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use config_importer::core::PropertySource;
    ///
    /// let source = PropertySource::new("inline").with_property("server.port", "8080");
    /// assert_eq!(source.get("server.port"), Some("8080"));
    /// ```
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Append a property at the end of this source.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Logical name of this source, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this source holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The profile this source is restricted to, read from `activation_key`.
    ///
    /// A missing, blank, or non-scalar marker (a sequence or mapping flattens
    /// to other keys) yields `None`, which means "always include".
    pub fn activation_profile(&self, activation_key: &str) -> Option<&str> {
        self.get(activation_key)
            .map(str::trim)
            .filter(|profile| !profile.is_empty())
    }
}

/// The host's mutable, ordered property chain.
///
/// Lookups are first-match-wins across sources, and the importer only ever
/// appends at the tail. A key that is already visible can never be changed by
/// an imported fragment.
pub trait ConfigurableEnvironment {
    /// Profiles active for this process.
    fn active_profiles(&self) -> ActiveProfiles;

    /// Effective value of `key`, if any source defines it.
    fn property(&self, key: &str) -> Option<&str>;

    /// Effective value of `key`, or `default` when no source defines it.
    fn property_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.property(key).unwrap_or(default)
    }

    /// Append a property source at the lowest precedence.
    fn append_property_source(&mut self, source: PropertySource);
}

/// A callback the host's bootstrap sequence fires once, before the
/// application reads its own settings.
pub trait EnvironmentPostProcessor {
    /// Mutate `environment`. `application` is an opaque host handle.
    fn post_process_environment<A: ?Sized>(
        &self,
        environment: &mut dyn ConfigurableEnvironment,
        application: &A,
    );
}

/// A plain in-process [`ConfigurableEnvironment`].
///
/// # Examples
///
/// ```rust
/// use config_importer::core::{ConfigurableEnvironment, PropertySource, StandardEnvironment};
///
/// let mut env = StandardEnvironment::new().with_active_profiles(["local"]);
/// env.append_property_source(PropertySource::new("a").with_property("k", "first"));
/// env.append_property_source(PropertySource::new("b").with_property("k", "second"));
/// assert_eq!(env.property("k"), Some("first"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StandardEnvironment {
    profiles: Option<ActiveProfiles>,
    sources: Vec<PropertySource>,
}

impl StandardEnvironment {
    /// Create an environment with no sources and no explicit profiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active profiles explicitly.
    pub fn with_active_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_active_profiles(profiles);
        self
    }

    /// Replace the active profiles.
    pub fn set_active_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.profiles = Some(profiles.into_iter().collect());
    }

    /// Insert a source at the highest precedence.
    pub fn add_first(&mut self, source: PropertySource) {
        self.sources.insert(0, source);
    }

    /// Insert a source at the lowest precedence.
    pub fn add_last(&mut self, source: PropertySource) {
        self.sources.push(source);
    }

    /// Property sources in precedence order.
    pub fn property_sources(&self) -> &[PropertySource] {
        &self.sources
    }

    /// Whether a source with this name has been added.
    pub fn contains_source(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name() == name)
    }

    /// Every visible key with its effective value, in precedence order.
    pub fn effective_properties(&self) -> Vec<(&str, &str)> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .flat_map(PropertySource::iter)
            .filter(|(key, _)| seen.insert(*key))
            .collect()
    }

    /// Deserialize the effective properties under `prefix` into `T`.
    ///
    /// An empty prefix binds the whole environment. Keys keep their case, so
    /// `aws.accessKey` binds to a field renamed `accessKey`. Values are
    /// strings, and numbers and booleans are converted by the `config` crate on
    /// the way in. A key shadowed by a higher-precedence key of another shape
    /// (`a` as a scalar and `a.b`) is left out.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use config_importer::core::{PropertySource, StandardEnvironment};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// #[serde(rename_all = "camelCase")]
    /// struct Aws {
    ///     access_key: String,
    /// }
    ///
    /// let mut env = StandardEnvironment::new();
    /// env.add_last(PropertySource::new("aws").with_property("aws.accessKey", "my-access"));
    /// let aws: Aws = env.bind("aws")?;
    /// assert_eq!(aws.access_key, "my-access");
    /// # Ok::<(), config_importer::error::ImportError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Binding`] if a key cannot be expressed as a
    /// property path or the values do not fit `T`.
    pub fn bind<T: DeserializeOwned>(&self, prefix: &str) -> Result<T> {
        let scope = format!("{}.", prefix);
        let mut root = PropertyNode::Table(BTreeMap::new());

        for (key, value) in self.effective_properties() {
            let relative = if prefix.is_empty() {
                key
            } else {
                match key.strip_prefix(&scope) {
                    Some(relative) => relative,
                    None => continue,
                }
            };

            let path = parse_path(relative)
                .ok_or_else(|| ImportError::Binding(format!("'{}' is not a property path", key)))?;
            if !root.insert(&path, value) {
                debug!(key, "Property shadowed by a key of another shape, not bound");
            }
        }

        root.into_value()
            .try_deserialize::<T>()
            .map_err(|e| ImportError::Binding(format!("'{}': {}", prefix, e)))
    }
}

/// One step of a flattened key: `server.hosts[0]` is `server`, `hosts`, `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathSegment<'k> {
    Key(&'k str),
    Index(usize),
}

fn parse_path(key: &str) -> Option<Vec<PathSegment<'_>>> {
    let mut path = Vec::new();

    for part in key.split('.') {
        let (name, mut indices) = match part.find('[') {
            Some(open) => part.split_at(open),
            None => (part, ""),
        };
        if name.is_empty() && (indices.is_empty() || path.is_empty()) {
            return None;
        }
        if !name.is_empty() {
            path.push(PathSegment::Key(name));
        }

        while !indices.is_empty() {
            let close = indices.find(']')?;
            let index = indices.get(1..close)?.parse().ok()?;
            path.push(PathSegment::Index(index));
            indices = &indices[close + 1..];
            if !indices.is_empty() && !indices.starts_with('[') {
                return None;
            }
        }
    }

    Some(path)
}

/// Nested form of the flattened properties, with key case intact.
#[derive(Debug, Default)]
enum PropertyNode {
    #[default]
    Empty,
    Leaf(String),
    Table(BTreeMap<String, PropertyNode>),
    List(BTreeMap<usize, PropertyNode>),
}

impl PropertyNode {
    /// Place `value` at `path`. Returns false if the slot is already taken
    /// by a value of another shape.
    fn insert(&mut self, path: &[PathSegment<'_>], value: &str) -> bool {
        let Some((head, rest)) = path.split_first() else {
            return match self {
                Self::Empty => {
                    *self = Self::Leaf(value.to_string());
                    true
                }
                _ => false,
            };
        };

        match head {
            PathSegment::Key(key) => {
                if matches!(self, Self::Empty) {
                    *self = Self::Table(BTreeMap::new());
                }
                match self {
                    Self::Table(children) => children
                        .entry((*key).to_string())
                        .or_default()
                        .insert(rest, value),
                    _ => false,
                }
            }
            PathSegment::Index(index) => {
                if matches!(self, Self::Empty) {
                    *self = Self::List(BTreeMap::new());
                }
                match self {
                    Self::List(items) => items.entry(*index).or_default().insert(rest, value),
                    _ => false,
                }
            }
        }
    }

    fn into_value(self) -> Value {
        let kind = match self {
            Self::Empty => ValueKind::Nil,
            Self::Leaf(text) => ValueKind::String(text),
            Self::Table(children) => ValueKind::Table(
                children
                    .into_iter()
                    .map(|(key, child)| (key, child.into_value()))
                    .collect::<Map<String, Value>>(),
            ),
            Self::List(mut items) => {
                let len = items.keys().next_back().map_or(0, |last| last + 1);
                ValueKind::Array(
                    (0..len)
                        .map(|index| items.remove(&index).unwrap_or_default().into_value())
                        .collect(),
                )
            }
        };
        Value::new(None, kind)
    }
}

impl ConfigurableEnvironment for StandardEnvironment {
    fn active_profiles(&self) -> ActiveProfiles {
        match &self.profiles {
            Some(profiles) => profiles.clone(),
            None => self
                .property(ACTIVE_PROFILES_PROPERTY)
                .map(ActiveProfiles::parse)
                .unwrap_or_default(),
        }
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.sources.iter().find_map(|source| source.get(key))
    }

    fn append_property_source(&mut self, source: PropertySource) {
        self.add_last(source);
    }
}
