//! Builder for constructing ConfigImporter instances.

use crate::core::{ConfigImporter, DEFAULT_ACTIVATION_KEY, FragmentDecoder, YamlDecoder};
use crate::sources::{
    DEFAULT_BOOTSTRAP_NAME, DEFAULT_PRIMARY_PREFIX, DEFAULT_SEARCH_ROOT, DEFAULT_SUFFIX,
    ObjectStoreProvider, RemoteKeys, RemoteSettings,
};
use std::path::PathBuf;

#[cfg(not(feature = "s3"))]
use crate::error::{ImportError, Result};
#[cfg(not(feature = "s3"))]
use crate::sources::ObjectStore;

/// Builder for constructing a `ConfigImporter`.
///
/// Every setting has a default, so `ConfigImporter::builder().build()` is a
/// working importer.
///
/// # Examples
///
/// ```rust,no_run
/// use config_importer::prelude::*;
///
/// let importer = ConfigImporter::builder()
///     .with_search_root("resources")
///     .with_search_root("/etc/myapp")
///     .with_activation_key("spring.config.activate.on-profile")
///     .with_sorted_remote_keys(true)
///     .build();
/// ```
pub struct ConfigImporterBuilder {
    search_roots: Vec<PathBuf>,
    suffix: String,
    primary_prefix: String,
    bootstrap_name: String,
    activation_key: String,
    remote_keys: RemoteKeys,
    remote_defaults: RemoteSettings,
    sort_remote_keys: bool,
    provider: Option<Box<dyn ObjectStoreProvider>>,
    decoder: Option<Box<dyn FragmentDecoder>>,
}

impl ConfigImporterBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            search_roots: Vec::new(),
            suffix: DEFAULT_SUFFIX.to_string(),
            primary_prefix: DEFAULT_PRIMARY_PREFIX.to_string(),
            bootstrap_name: DEFAULT_BOOTSTRAP_NAME.to_string(),
            activation_key: DEFAULT_ACTIVATION_KEY.to_string(),
            remote_keys: RemoteKeys::default(),
            remote_defaults: RemoteSettings::default(),
            sort_remote_keys: false,
            provider: None,
            decoder: None,
        }
    }

    /// Add a local search root.
    ///
    /// Roots are scanned in the order they are added. Without any, `config/`
    /// is scanned.
    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_roots.push(root.into());
        self
    }

    /// Set the suffix that marks a fragment, locally and remotely.
    ///
    /// Default is `.yml`.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the file name prefix reserved for the host's primary configuration.
    ///
    /// Default is `application`.
    pub fn with_primary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.primary_prefix = prefix.into();
        self
    }

    /// Set the file name reserved for bootstrap configuration.
    ///
    /// Default is `bootstrap.yml`.
    pub fn with_bootstrap_name(mut self, name: impl Into<String>) -> Self {
        self.bootstrap_name = name.into();
        self
    }

    /// Set the key path of the activation marker.
    ///
    /// Default is `config.activate.on-profile`.
    pub fn with_activation_key(mut self, key: impl Into<String>) -> Self {
        self.activation_key = key.into();
        self
    }

    /// Set the environment keys the remote settings are read from.
    pub fn with_remote_keys(mut self, keys: RemoteKeys) -> Self {
        self.remote_keys = keys;
        self
    }

    /// Set the remote settings used when the environment has none.
    pub fn with_remote_defaults(mut self, defaults: RemoteSettings) -> Self {
        self.remote_defaults = defaults;
        self
    }

    /// Sort remote keys lexicographically instead of keeping backend order.
    pub fn with_sorted_remote_keys(mut self, sort: bool) -> Self {
        self.sort_remote_keys = sort;
        self
    }

    /// Use a custom object store provider for the remote phase.
    pub fn with_object_store_provider<P: ObjectStoreProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Use a custom fragment decoder.
    pub fn with_decoder<D: FragmentDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Build the importer.
    pub fn build(self) -> ConfigImporter {
        let search_roots = if self.search_roots.is_empty() {
            vec![PathBuf::from(DEFAULT_SEARCH_ROOT)]
        } else {
            self.search_roots
        };

        ConfigImporter {
            search_roots,
            suffix: self.suffix,
            primary_prefix: self.primary_prefix,
            bootstrap_name: self.bootstrap_name,
            activation_key: self.activation_key,
            remote_keys: self.remote_keys,
            remote_defaults: self.remote_defaults,
            sort_remote_keys: self.sort_remote_keys,
            provider: self.provider.unwrap_or_else(default_provider),
            decoder: self
                .decoder
                .unwrap_or_else(|| Box::new(YamlDecoder) as Box<dyn FragmentDecoder>),
        }
    }
}

impl Default for ConfigImporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigImporter {
    /// Create a new builder for constructing an importer.
    pub fn builder() -> ConfigImporterBuilder {
        ConfigImporterBuilder::new()
    }
}

#[cfg(feature = "s3")]
fn default_provider() -> Box<dyn ObjectStoreProvider> {
    Box::new(crate::sources::S3ObjectStoreProvider)
}

#[cfg(not(feature = "s3"))]
fn default_provider() -> Box<dyn ObjectStoreProvider> {
    Box::new(no_object_store)
}

#[cfg(not(feature = "s3"))]
fn no_object_store(_region: &str) -> Result<Box<dyn ObjectStore>> {
    Err(ImportError::FeatureNotEnabled("s3"))
}
