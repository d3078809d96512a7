//! Profile-aware import of configuration fragments into the environment.

use crate::core::{
    ActiveProfiles, ConfigurableEnvironment, EnvironmentPostProcessor, FragmentDecoder,
    SourceSelection, should_include,
};
use crate::error::Result;
use crate::sources::{
    FragmentSource, LocalSource, ObjectStoreProvider, RemoteKeys, RemoteSettings, RemoteSource,
};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// What one import run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Which source the active profiles selected
    pub selection: SourceSelection,
    /// Names of property sources appended to the environment, in order
    pub loaded: Vec<String>,
    /// Names of property sources dropped for a profile mismatch
    pub skipped: Vec<String>,
    /// Fragments that could not be fetched or decoded
    pub failed: Vec<String>,
    /// Message of the error that aborted a phase, if any
    pub phase_error: Option<String>,
}

impl ImportReport {
    fn new(selection: SourceSelection) -> Self {
        Self {
            selection,
            loaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            phase_error: None,
        }
    }

    /// Whether nothing failed, at fragment or phase level.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.phase_error.is_none()
    }
}

/// Merges configuration fragments into the host environment at startup.
///
/// A run has two phases that always execute in order:
///
/// 1. **Local**: when no active profile is production-like, bundled files
///    under the search roots are imported.
/// 2. **Remote**: when a profile is production-like, fragments are fetched
///    from object storage. Bucket, prefix, and region are read from the
///    environment, with defaults.
///
/// Each fragment is decoded, each decoded property source is checked against
/// its activation marker, and accepted sources are appended to the tail of the
/// environment. Existing keys therefore keep their values.
///
/// Nothing is ever propagated to the caller. A broken fragment is skipped and a
/// failing phase contributes nothing, so startup always completes with
/// whatever could be loaded.
///
/// # Examples
///
/// ```rust,no_run
/// use config_importer::prelude::*;
///
/// let mut env = StandardEnvironment::new().with_active_profiles(["local"]);
/// let importer = ConfigImporter::builder()
///     .with_search_root("resources")
///     .build();
///
/// importer.post_process_environment(&mut env, &());
/// println!("{:?}", env.property("test.key"));
/// ```
pub struct ConfigImporter {
    pub(crate) search_roots: Vec<PathBuf>,
    pub(crate) suffix: String,
    pub(crate) primary_prefix: String,
    pub(crate) bootstrap_name: String,
    pub(crate) activation_key: String,
    pub(crate) remote_keys: RemoteKeys,
    pub(crate) remote_defaults: RemoteSettings,
    pub(crate) sort_remote_keys: bool,
    pub(crate) provider: Box<dyn ObjectStoreProvider>,
    pub(crate) decoder: Box<dyn FragmentDecoder>,
}

impl ConfigImporter {
    /// Create an importer with default settings.
    ///
    /// Scans `config/` locally and uses S3 remotely when the `s3` feature is
    /// enabled.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Run both phases against `environment` and report what happened.
    pub fn import(&self, environment: &mut dyn ConfigurableEnvironment) -> ImportReport {
        let profiles = environment.active_profiles();
        let selection = SourceSelection::for_profiles(&profiles);
        info!(profiles = %profiles, ?selection, "Importing configuration fragments");

        let mut report = ImportReport::new(selection);
        self.import_local(environment, &profiles, &mut report);
        self.import_remote(environment, &profiles, &mut report);

        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Configuration import finished"
        );
        report
    }

    /// The local source this importer scans.
    pub fn local_source(&self) -> LocalSource {
        LocalSource::with_roots(self.search_roots.iter().cloned())
            .with_suffix(self.suffix.as_str())
            .with_primary_prefix(self.primary_prefix.as_str())
            .with_bootstrap_name(self.bootstrap_name.as_str())
    }

    fn import_local(
        &self,
        environment: &mut dyn ConfigurableEnvironment,
        profiles: &ActiveProfiles,
        report: &mut ImportReport,
    ) {
        if SourceSelection::for_profiles(profiles) != SourceSelection::Local {
            debug!("Skipping local config (production profile)");
            return;
        }

        let source = self.local_source();
        if let Err(e) = self.load(&source, environment, profiles, report) {
            warn!(source = %source.name(), error = %e, "Failed to load local config");
            report.phase_error = Some(e.to_string());
        }
    }

    fn import_remote(
        &self,
        environment: &mut dyn ConfigurableEnvironment,
        profiles: &ActiveProfiles,
        report: &mut ImportReport,
    ) {
        if SourceSelection::for_profiles(profiles) != SourceSelection::Remote {
            info!("Skipping remote config (not a production profile)");
            return;
        }

        let settings = RemoteSettings::resolve(&*environment, &self.remote_keys, &self.remote_defaults);
        if let Err(e) = self.load_remote(&settings, environment, profiles, report) {
            error!(location = %settings.location(), error = %e, "Remote config load failed");
            report.phase_error = Some(e.to_string());
        }
    }

    fn load_remote(
        &self,
        settings: &RemoteSettings,
        environment: &mut dyn ConfigurableEnvironment,
        profiles: &ActiveProfiles,
        report: &mut ImportReport,
    ) -> Result<()> {
        // The store lives for this phase only
        let store = self.provider.connect(&settings.region)?;
        let source = RemoteSource::new(store.as_ref(), settings.clone())
            .with_suffix(self.suffix.as_str())
            .with_sorted_keys(self.sort_remote_keys);

        self.load(&source, environment, profiles, report)
    }

    /// Drive one source through decode, filter, and append.
    fn load(
        &self,
        source: &dyn FragmentSource,
        environment: &mut dyn ConfigurableEnvironment,
        profiles: &ActiveProfiles,
        report: &mut ImportReport,
    ) -> Result<()> {
        for fragment in source.fragments()? {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    warn!(source = %source.name(), error = %e, "Failed to fetch config fragment, skipping");
                    report
                        .failed
                        .push(e.fragment_name().map_or_else(|| e.to_string(), str::to_string));
                    continue;
                }
            };

            let property_sources = match self.decoder.decode(&fragment) {
                Ok(property_sources) => property_sources,
                Err(e) => {
                    warn!(fragment = fragment.name(), error = %e, "Failed to decode config fragment, skipping");
                    report.failed.push(fragment.name().to_string());
                    continue;
                }
            };

            for property_source in property_sources {
                let name = property_source.name().to_string();
                if should_include(&property_source, profiles, &self.activation_key) {
                    environment.append_property_source(property_source);
                    info!(source = %name, "Loaded config");
                    report.loaded.push(name);
                } else {
                    info!(
                        source = %name,
                        profile = property_source.activation_profile(&self.activation_key).unwrap_or_default(),
                        "Skipped config (profile mismatch)"
                    );
                    report.skipped.push(name);
                }
            }
        }

        Ok(())
    }
}

impl Default for ConfigImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentPostProcessor for ConfigImporter {
    fn post_process_environment<A: ?Sized>(
        &self,
        environment: &mut dyn ConfigurableEnvironment,
        _application: &A,
    ) {
        self.import(environment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PropertySource, StandardEnvironment, YamlDecoder};
    use crate::error::ImportError;
    use crate::sources::{NamedFragment, ObjectStore};
    use std::fs;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    struct StaticStore {
        objects: Vec<(&'static str, &'static str)>,
    }

    impl ObjectStore for StaticStore {
        fn list_objects(&self, _bucket: &str, _prefix: &str) -> Result<Vec<String>> {
            Ok(self.objects.iter().map(|(k, _)| k.to_string()).collect())
        }

        fn get_object(&self, _bucket: &str, key: &str) -> Result<Box<dyn Read + '_>> {
            let (_, body) = self
                .objects
                .iter()
                .find(|(k, _)| *k == key)
                .ok_or_else(|| ImportError::fetch(key, "NoSuchKey"))?;
            Ok(Box::new(Cursor::new(body.as_bytes())))
        }
    }

    /// Fails on any fragment whose name contains "poison".
    struct PickyDecoder;

    impl FragmentDecoder for PickyDecoder {
        fn decode(&self, fragment: &NamedFragment) -> Result<Vec<PropertySource>> {
            if fragment.name().contains("poison") {
                return Err(ImportError::malformed(fragment.name(), "refused"));
            }
            YamlDecoder.decode(fragment)
        }
    }

    fn unreachable_provider(_region: &str) -> Result<Box<dyn ObjectStore>> {
        Err(ImportError::SourceUnavailable("connection refused".to_string()))
    }

    #[test]
    fn test_local_phase_skips_reserved_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("application.yml"), "test:\n  key: from-application\n").unwrap();
        fs::write(temp_dir.path().join("bootstrap.yml"), "test:\n  key: from-bootstrap\n").unwrap();
        fs::write(temp_dir.path().join("test.yml"), "test:\n  key: imported-from-yml\n").unwrap();

        let importer = ConfigImporter::builder()
            .with_search_root(temp_dir.path())
            .with_object_store_provider(unreachable_provider)
            .build();
        let mut env = StandardEnvironment::new().with_active_profiles(["local"]);

        let report = importer.import(&mut env);
        assert_eq!(report.selection, SourceSelection::Local);
        assert_eq!(report.loaded, vec!["test.yml"]);
        assert!(report.is_clean());
        assert_eq!(env.property("test.key"), Some("imported-from-yml"));
    }

    #[test]
    fn test_decode_failure_does_not_stop_later_fragments() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a-poison.yml"), "a: 1\n").unwrap();
        fs::write(temp_dir.path().join("b.yml"), "b: 2\n").unwrap();

        let importer = ConfigImporter::builder()
            .with_search_root(temp_dir.path())
            .with_decoder(PickyDecoder)
            .build();
        let mut env = StandardEnvironment::new();

        let report = importer.import(&mut env);
        assert_eq!(report.failed, vec!["a-poison.yml"]);
        assert_eq!(report.loaded, vec!["b.yml"]);
        assert_eq!(env.property("a"), None);
        assert_eq!(env.property("b"), Some("2"));
    }

    #[test]
    fn test_remote_connect_failure_is_contained() {
        let importer = ConfigImporter::builder()
            .with_object_store_provider(unreachable_provider)
            .build();
        let mut env = StandardEnvironment::new().with_active_profiles(["prod"]);

        let report = importer.import(&mut env);
        assert_eq!(report.selection, SourceSelection::Remote);
        assert!(report.loaded.is_empty());
        assert!(report.phase_error.unwrap().contains("connection refused"));
        assert!(env.property_sources().is_empty());
    }

    #[test]
    fn test_remote_profile_mismatch_skipped() {
        let importer = ConfigImporter::builder()
            .with_object_store_provider(|_region: &str| -> Result<Box<dyn ObjectStore>> {
                Ok(Box::new(StaticStore {
                    objects: vec![
                        ("config/prod.yml", "config:\n  activate:\n    on-profile: prod\nk: prod\n"),
                        ("config/staging.yml", "config:\n  activate:\n    on-profile: staging\nk: staging\n"),
                    ],
                }))
            })
            .build();
        let mut env = StandardEnvironment::new().with_active_profiles(["prod"]);

        let report = importer.import(&mut env);
        assert_eq!(report.loaded, vec!["remote-config/prod.yml"]);
        assert_eq!(report.skipped, vec!["remote-config/staging.yml"]);
        assert_eq!(env.property("k"), Some("prod"));
    }

    #[test]
    fn test_existing_keys_are_not_overridden() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("test.yml"), "test:\n  key: from-file\n").unwrap();

        let importer = ConfigImporter::builder().with_search_root(temp_dir.path()).build();
        let mut env = StandardEnvironment::new();
        env.add_last(PropertySource::new("system").with_property("test.key", "from-system"));

        importer.post_process_environment(&mut env, &());
        assert_eq!(env.property("test.key"), Some("from-system"));
        assert!(env.contains_source("test.yml"));
    }
}
