//! Active profiles and production classification.

use std::fmt;

/// Substring that marks a profile as production-like.
const PRODUCTION_MARKER: &str = "prod";

/// The set of active deployment profiles supplied by the host.
///
/// Names compare case-insensitively. Adding a name that differs from an
/// existing one only by case is a no-op, and the first spelling is kept.
///
/// # Examples
///
/// ```rust
/// use config_importer::core::ActiveProfiles;
///
/// let profiles = ActiveProfiles::parse("local, Dev");
/// assert!(profiles.contains("dev"));
/// assert_eq!(profiles.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveProfiles {
    names: Vec<String>,
}

impl ActiveProfiles {
    /// Create an empty profile set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"local, dev"`.
    ///
    /// Blank entries are ignored.
    pub fn parse(list: &str) -> Self {
        list.split(',').collect()
    }

    /// Add a profile name, ignoring blanks and case-insensitive duplicates.
    pub fn insert(&mut self, name: impl AsRef<str>) {
        let name = name.as_ref().trim();
        if name.is_empty() || self.contains(name) {
            return;
        }
        self.names.push(name.to_string());
    }

    /// Whether `name` case-insensitively equals one of the active profiles.
    pub fn contains(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.names.iter().any(|p| p.to_lowercase() == wanted)
    }

    /// Iterate over the profile names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of active profiles.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no profile is active.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ActiveProfiles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut profiles = Self::new();
        for name in iter {
            profiles.insert(name);
        }
        profiles
    }
}

impl fmt::Display for ActiveProfiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            return write!(f, "(none)");
        }
        write!(f, "{}", self.names.join(","))
    }
}

/// Returns true iff any profile name contains `prod`, ignoring case.
///
/// An empty set is never production-like.
pub fn is_production_like(profiles: &ActiveProfiles) -> bool {
    profiles
        .iter()
        .any(|p| p.to_lowercase().contains(PRODUCTION_MARKER))
}

/// Which fragment source a run reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    /// Scan bundled files on the local search path.
    Local,
    /// Fetch fragments from object storage.
    Remote,
}

impl SourceSelection {
    /// Classify the profile set: production-like selects [`SourceSelection::Remote`].
    pub fn for_profiles(profiles: &ActiveProfiles) -> Self {
        if is_production_like(profiles) {
            Self::Remote
        } else {
            Self::Local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_not_production() {
        assert!(!is_production_like(&ActiveProfiles::new()));
        assert_eq!(
            SourceSelection::for_profiles(&ActiveProfiles::new()),
            SourceSelection::Local
        );
    }

    #[test]
    fn test_substring_match_ignores_case() {
        for name in ["prod", "PROD", "preprod", "Production", "eu-prod-2"] {
            let profiles = ActiveProfiles::from_iter([name]);
            assert!(is_production_like(&profiles), "{name} should be production-like");
        }
    }

    #[test]
    fn test_non_production_profiles() {
        let profiles = ActiveProfiles::from_iter(["local", "dev", "staging", "pro"]);
        assert!(!is_production_like(&profiles));
    }

    #[test]
    fn test_any_profile_is_enough() {
        let profiles = ActiveProfiles::from_iter(["local", "prod"]);
        assert_eq!(SourceSelection::for_profiles(&profiles), SourceSelection::Remote);
    }

    #[test]
    fn test_parse_and_dedup() {
        let profiles = ActiveProfiles::parse(" local ,, LOCAL,dev ");
        assert_eq!(profiles.iter().collect::<Vec<_>>(), vec!["local", "dev"]);
        assert!(profiles.contains("Local"));
        assert!(!profiles.contains("loc"));
    }

    #[test]
    fn test_display() {
        assert_eq!(ActiveProfiles::new().to_string(), "(none)");
        assert_eq!(ActiveProfiles::parse("a,b").to_string(), "a,b");
    }
}
