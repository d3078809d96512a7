//! Local filesystem fragment source.

use super::{FragmentSource, Fragments, NamedFragment};
use crate::error::{ImportError, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default search root, relative to the working directory.
pub const DEFAULT_SEARCH_ROOT: &str = "config";

/// Default suffix of configuration fragments.
pub const DEFAULT_SUFFIX: &str = ".yml";

/// Name prefix reserved for the host's primary configuration file.
pub const DEFAULT_PRIMARY_PREFIX: &str = "application";

/// File name reserved for the bootstrap configuration.
pub const DEFAULT_BOOTSTRAP_NAME: &str = "bootstrap.yml";

/// Scans local search roots for bundled configuration fragments.
///
/// Every file under a root whose name ends with the suffix is a fragment,
/// except the host's own primary configuration (any name starting with the
/// primary prefix) and the bootstrap file. Roots are scanned in the order they
/// were added; entries within a root are visited sorted by file name.
///
/// # Examples
///
/// ```rust,no_run
/// use config_importer::sources::{FragmentSource, LocalSource};
///
/// let source = LocalSource::new("config").with_root("/etc/myapp/config.d");
/// for fragment in source.fragments()? {
///     println!("{}", fragment?.name());
/// }
/// # Ok::<(), config_importer::error::ImportError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalSource {
    roots: Vec<PathBuf>,
    suffix: String,
    primary_prefix: String,
    bootstrap_name: String,
}

impl LocalSource {
    /// Create a source scanning a single root with default naming rules.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_roots([root.into()])
    }

    /// Create a source scanning several roots in order.
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            suffix: DEFAULT_SUFFIX.to_string(),
            primary_prefix: DEFAULT_PRIMARY_PREFIX.to_string(),
            bootstrap_name: DEFAULT_BOOTSTRAP_NAME.to_string(),
        }
    }

    /// Add another search root, scanned after the existing ones.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Set the file suffix that marks a fragment.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the name prefix reserved for the host's primary configuration.
    pub fn with_primary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.primary_prefix = prefix.into();
        self
    }

    /// Set the exact file name reserved for bootstrap configuration.
    pub fn with_bootstrap_name(mut self, name: impl Into<String>) -> Self {
        self.bootstrap_name = name.into();
        self
    }

    /// Whether a file with this name should be imported.
    pub fn is_candidate(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.suffix)
            && !file_name.starts_with(&self.primary_prefix)
            && file_name != self.bootstrap_name
    }

    fn candidates(&self) -> Vec<(String, PathBuf)> {
        let mut found = Vec::new();

        for root in &self.roots {
            if !root.exists() {
                debug!(root = %root.display(), "Search root does not exist, skipping");
                continue;
            }

            // Linked files are resolved to their targets; loops surface as entry errors
            for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(root = %root.display(), error = %e, "Failed to read directory entry");
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                let Some(name) = entry.file_name().to_str() else {
                    warn!(path = ?entry.path(), "Skipping file with non-UTF-8 name");
                    continue;
                };

                if self.is_candidate(name) {
                    found.push((name.to_string(), entry.into_path()));
                } else {
                    debug!(file = name, "Ignoring file");
                }
            }
        }

        found
    }
}

impl FragmentSource for LocalSource {
    fn fragments(&self) -> Result<Fragments<'_>> {
        let candidates = self.candidates();
        debug!(count = candidates.len(), source = %self.name(), "Found local fragments");

        Ok(Box::new(candidates.into_iter().map(|(name, path)| -> Result<NamedFragment> {
            let bytes = fs::read(&path).map_err(|e| ImportError::fetch(&name, e))?;
            Ok(NamedFragment::new(name, bytes))
        })))
    }

    fn name(&self) -> String {
        let roots: Vec<_> = self
            .roots
            .iter()
            .map(|r| r.display().to_string())
            .collect();
        format!("local:{}", roots.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(source: &LocalSource) -> Vec<String> {
        source
            .fragments()
            .unwrap()
            .map(|f| f.unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_is_candidate() {
        let source = LocalSource::new("config");
        assert!(source.is_candidate("test.yml"));
        assert!(source.is_candidate("bootstrap-extra.yml"));
        assert!(!source.is_candidate("application.yml"));
        assert!(!source.is_candidate("application-local.yml"));
        assert!(!source.is_candidate("bootstrap.yml"));
        assert!(!source.is_candidate("test.yaml"));
        assert!(!source.is_candidate("notes.txt"));
    }

    #[test]
    fn test_custom_naming_rules() {
        let source = LocalSource::new("config")
            .with_suffix(".yaml")
            .with_primary_prefix("main")
            .with_bootstrap_name("boot.yaml");
        assert!(source.is_candidate("application.yaml"));
        assert!(!source.is_candidate("main.yaml"));
        assert!(!source.is_candidate("boot.yaml"));
    }

    #[test]
    fn test_scan_excludes_reserved_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("application.yml"), "a: 1").unwrap();
        fs::write(root.join("bootstrap.yml"), "b: 1").unwrap();
        fs::write(root.join("zeta.yml"), "z: 1").unwrap();
        fs::write(root.join("alpha.yml"), "x: 1").unwrap();
        fs::write(root.join("nested/inner.yml"), "i: 1").unwrap();
        fs::write(root.join("readme.md"), "# hi").unwrap();

        let source = LocalSource::new(root);
        assert_eq!(names(&source), vec!["alpha.yml", "inner.yml", "zeta.yml"]);
    }

    #[test]
    fn test_fragment_payload() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("test.yml"), "test:\n  key: v\n").unwrap();

        let source = LocalSource::new(temp_dir.path());
        let fragment = source.fragments().unwrap().next().unwrap().unwrap();
        assert_eq!(fragment.name(), "test.yml");
        assert_eq!(fragment.bytes(), b"test:\n  key: v\n");
    }

    #[test]
    fn test_roots_scanned_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("z.yml"), "k: 1").unwrap();
        fs::write(second.path().join("a.yml"), "k: 2").unwrap();

        let source = LocalSource::new(first.path()).with_root(second.path());
        assert_eq!(names(&source), vec!["z.yml", "a.yml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(target.path().join("real.yml"), "k: 1").unwrap();
        fs::create_dir(target.path().join("shared")).unwrap();
        fs::write(target.path().join("shared/inner.yml"), "i: 1").unwrap();
        std::os::unix::fs::symlink(target.path().join("real.yml"), temp_dir.path().join("linked.yml")).unwrap();
        std::os::unix::fs::symlink(target.path().join("shared"), temp_dir.path().join("shared")).unwrap();

        let source = LocalSource::new(temp_dir.path());
        assert_eq!(names(&source), vec!["linked.yml", "inner.yml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.yml"), "k: 1").unwrap();
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("loop")).unwrap();

        let source = LocalSource::new(temp_dir.path());
        assert_eq!(names(&source), vec!["a.yml"]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let source = LocalSource::new("/nonexistent/config-importer/root");
        assert!(names(&source).is_empty());
    }

    #[test]
    fn test_name() {
        let source = LocalSource::new("config").with_root("extra");
        assert_eq!(source.name(), "local:config,extra");
    }
}
