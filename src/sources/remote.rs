//! Remote object-storage fragment source.

use super::{FragmentSource, Fragments, NamedFragment};
use crate::core::ConfigurableEnvironment;
use crate::error::{ImportError, Result};
use std::io::Read;
use tracing::{info, warn};

/// Default bucket when the environment does not name one.
pub const DEFAULT_BUCKET: &str = "my-secure-bucket";

/// Default key prefix when the environment does not name one.
pub const DEFAULT_PREFIX: &str = "config/";

/// Default region when the environment does not name one.
pub const DEFAULT_REGION: &str = "ap-northeast-2";

/// Prefix added to object keys to form fragment names.
pub const REMOTE_NAME_PREFIX: &str = "remote-";

/// Minimal object-storage client.
///
/// Implement this trait to back [`RemoteSource`] with a store other than S3, or
/// with an in-memory double in tests.
pub trait ObjectStore {
    /// List every key under `prefix`.
    ///
    /// # Errors
    ///
    /// Should return [`ImportError::SourceUnavailable`] if the listing fails.
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Open the body of one object.
    ///
    /// # Errors
    ///
    /// Should return [`ImportError::FragmentFetch`] if the object cannot be read.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + '_>>;
}

/// Creates an [`ObjectStore`] for a region.
///
/// Credentials are the provider's business. Any closure of the right shape is
/// a provider:
///
/// ```rust
/// use config_importer::error::ImportError;
/// use config_importer::sources::{ObjectStore, ObjectStoreProvider};
///
/// let provider = |region: &str| -> config_importer::error::Result<Box<dyn ObjectStore>> {
///     Err(ImportError::SourceUnavailable(format!("no store for {region}")))
/// };
/// assert!(provider.connect("ap-northeast-2").is_err());
/// ```
pub trait ObjectStoreProvider: Send + Sync {
    /// Connect to the store serving `region`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::SourceUnavailable`] if no client can be built.
    fn connect(&self, region: &str) -> Result<Box<dyn ObjectStore>>;
}

impl<F> ObjectStoreProvider for F
where
    F: Fn(&str) -> Result<Box<dyn ObjectStore>> + Send + Sync,
{
    fn connect(&self, region: &str) -> Result<Box<dyn ObjectStore>> {
        self(region)
    }
}

/// Environment keys that locate the remote fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKeys {
    /// Key holding the bucket name
    pub bucket: String,
    /// Key holding the object key prefix
    pub prefix: String,
    /// Key holding the region
    pub region: String,
}

impl Default for RemoteKeys {
    fn default() -> Self {
        Self {
            bucket: "s3.bucket".to_string(),
            prefix: "s3.prefix".to_string(),
            region: "s3.region".to_string(),
        }
    }
}

/// Where to find remote fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Bucket to list
    pub bucket: String,
    /// Key prefix to list under
    pub prefix: String,
    /// Region of the bucket
    pub region: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl RemoteSettings {
    /// Read the settings from `environment`, falling back to `defaults` per key.
    pub fn resolve(
        environment: &dyn ConfigurableEnvironment,
        keys: &RemoteKeys,
        defaults: &RemoteSettings,
    ) -> Self {
        let lookup = |key: &str, default: &str| environment.property_or(key, default).to_string();

        Self {
            bucket: lookup(&keys.bucket, &defaults.bucket),
            prefix: lookup(&keys.prefix, &defaults.prefix),
            region: lookup(&keys.region, &defaults.region),
        }
    }

    /// `s3://bucket/prefix`, for log messages.
    pub fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }
}

/// Fetches configuration fragments from an object store.
///
/// Lists every key under the configured prefix, keeps those ending with the
/// suffix, and fetches each one as it is pulled. Fragment names are
/// `remote-<key>`. Finding nothing is not an error: the source yields no
/// fragments and logs a warning so operators notice.
pub struct RemoteSource<'s> {
    store: &'s dyn ObjectStore,
    settings: RemoteSettings,
    suffix: String,
    sort_keys: bool,
}

impl<'s> RemoteSource<'s> {
    /// Create a source over `store` with the default `.yml` suffix.
    pub fn new(store: &'s dyn ObjectStore, settings: RemoteSettings) -> Self {
        Self {
            store,
            settings,
            suffix: super::local::DEFAULT_SUFFIX.to_string(),
            sort_keys: false,
        }
    }

    /// Set the key suffix that marks a fragment.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Sort matching keys lexicographically instead of keeping backend order.
    pub fn with_sorted_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    fn fetch(&self, key: &str) -> Result<NamedFragment> {
        let name = format!("{}{}", REMOTE_NAME_PREFIX, key);
        info!(location = %format!("s3://{}/{}", self.settings.bucket, key), "Loading remote config fragment");

        let mut body = self
            .store
            .get_object(&self.settings.bucket, key)
            .map_err(|e| match e {
                ImportError::FragmentFetch { reason, .. } => ImportError::fetch(&name, reason),
                other => ImportError::fetch(&name, other),
            })?;
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)
            .map_err(|e| ImportError::fetch(&name, e))?;

        Ok(NamedFragment::new(name, bytes))
    }
}

impl FragmentSource for RemoteSource<'_> {
    fn fragments(&self) -> Result<Fragments<'_>> {
        let mut keys: Vec<String> = self
            .store
            .list_objects(&self.settings.bucket, &self.settings.prefix)?
            .into_iter()
            .filter(|key| key.ends_with(&self.suffix))
            .collect();

        if keys.is_empty() {
            warn!(location = %self.settings.location(), suffix = %self.suffix, "No config files found");
            return Ok(Box::new(std::iter::empty::<Result<NamedFragment>>()));
        }

        if self.sort_keys {
            keys.sort();
        }

        Ok(Box::new(keys.into_iter().map(move |key| self.fetch(&key))))
    }

    fn name(&self) -> String {
        format!("remote:{}", self.settings.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PropertySource, StandardEnvironment};
    use std::collections::BTreeMap;
    use std::io::Cursor;

    struct MockStore {
        objects: Vec<(String, Option<String>)>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                objects: Vec::new(),
            }
        }

        fn with_object(mut self, key: &str, body: &str) -> Self {
            self.objects.push((key.to_string(), Some(body.to_string())));
            self
        }

        fn with_broken_object(mut self, key: &str) -> Self {
            self.objects.push((key.to_string(), None));
            self
        }
    }

    impl ObjectStore for MockStore {
        fn list_objects(&self, _bucket: &str, prefix: &str) -> Result<Vec<String>> {
            Ok(self
                .objects
                .iter()
                .map(|(k, _)| k.clone())
                .filter(|k| k.starts_with(prefix))
                .collect())
        }

        fn get_object(&self, _bucket: &str, key: &str) -> Result<Box<dyn Read + '_>> {
            match self.objects.iter().find(|(k, _)| k == key) {
                Some((_, Some(body))) => Ok(Box::new(Cursor::new(body.as_bytes()))),
                _ => Err(ImportError::fetch(key, "NoSuchKey")),
            }
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let env = StandardEnvironment::new();
        let settings = RemoteSettings::resolve(&env, &RemoteKeys::default(), &RemoteSettings::default());
        assert_eq!(settings, RemoteSettings::default());
        assert_eq!(settings.location(), "s3://my-secure-bucket/config/");
    }

    #[test]
    fn test_resolve_from_environment() {
        let mut env = StandardEnvironment::new();
        env.add_last(
            PropertySource::new("system")
                .with_property("s3.bucket", "mock-bucket")
                .with_property("s3.prefix", "mock-prefix/"),
        );

        let settings = RemoteSettings::resolve(&env, &RemoteKeys::default(), &RemoteSettings::default());
        assert_eq!(settings.bucket, "mock-bucket");
        assert_eq!(settings.prefix, "mock-prefix/");
        assert_eq!(settings.region, DEFAULT_REGION);
    }

    #[test]
    fn test_filters_suffix_and_names_fragments() {
        let store = MockStore::new()
            .with_object("config/aws.yml", "aws: 1")
            .with_object("config/readme.txt", "nope")
            .with_object("other/slack.yml", "slack: 1");

        let source = RemoteSource::new(&store, RemoteSettings::default());
        let fragments: BTreeMap<_, _> = source
            .fragments()
            .unwrap()
            .map(|f| {
                let f = f.unwrap();
                (f.name().to_string(), f.bytes().to_vec())
            })
            .collect();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments["remote-config/aws.yml"], b"aws: 1");
    }

    #[test]
    fn test_empty_listing_is_not_an_error() {
        let store = MockStore::new().with_object("config/readme.txt", "nope");
        let source = RemoteSource::new(&store, RemoteSettings::default());
        assert_eq!(source.fragments().unwrap().count(), 0);
    }

    #[test]
    fn test_fetch_failure_is_per_fragment() {
        let store = MockStore::new()
            .with_broken_object("config/a.yml")
            .with_object("config/b.yml", "b: 1");

        let source = RemoteSource::new(&store, RemoteSettings::default());
        let results: Vec<_> = source.fragments().unwrap().collect();
        assert_eq!(results.len(), 2);
        let err = results[0].as_ref().err().unwrap();
        assert_eq!(err.fragment_name(), Some("remote-config/a.yml"));
        assert!(err.to_string().contains("NoSuchKey"));
        assert_eq!(results[1].as_ref().unwrap().name(), "remote-config/b.yml");
    }

    #[test]
    fn test_sorted_keys() {
        let store = MockStore::new()
            .with_object("config/z.yml", "z: 1")
            .with_object("config/a.yml", "a: 1");

        let backend_order: Vec<_> = RemoteSource::new(&store, RemoteSettings::default())
            .fragments()
            .unwrap()
            .map(|f| f.unwrap().name().to_string())
            .collect();
        assert_eq!(backend_order, vec!["remote-config/z.yml", "remote-config/a.yml"]);

        let sorted: Vec<_> = RemoteSource::new(&store, RemoteSettings::default())
            .with_sorted_keys(true)
            .fragments()
            .unwrap()
            .map(|f| f.unwrap().name().to_string())
            .collect();
        assert_eq!(sorted, vec!["remote-config/a.yml", "remote-config/z.yml"]);
    }

    #[test]
    fn test_closure_provider() {
        let provider = |region: &str| -> Result<Box<dyn ObjectStore>> {
            assert_eq!(region, "us-east-1");
            Ok(Box::new(MockStore::new()))
        };
        let store = provider.connect("us-east-1").unwrap();
        assert!(store.list_objects("b", "p").unwrap().is_empty());
    }
}
