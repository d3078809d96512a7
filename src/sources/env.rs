//! Environment variable property source.

use crate::core::PropertySource;
use crate::error::{ImportError, Result};
use config::{Environment, Source};
use std::collections::HashMap;

/// Seeds a [`PropertySource`] from prefixed environment variables.
///
/// Hosts use this to supply the importer's own inputs (`s3.bucket`,
/// `profiles.active`, ...) without a config file. Keys are lowercased and the
/// separator becomes a dot.
///
/// # Examples
///
/// ```rust
/// use config_importer::sources::EnvSource;
///
/// // APP_S3__BUCKET=my-bucket -> s3.bucket = my-bucket
/// let source = EnvSource::new("APP", "__");
/// ```
pub struct EnvSource {
    prefix: String,
    separator: String,
    vars: Option<HashMap<String, String>>,
}

impl EnvSource {
    /// Create a new environment variable source.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Prefix for environment variables (e.g., "APP")
    /// * `separator` - Separator for nested keys (e.g., "__" for APP_S3__BUCKET)
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
            vars: None,
        }
    }

    /// Read from `vars` instead of the process environment.
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = Some(vars);
        self
    }

    /// Collect the matching variables into a property source, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::EnvironmentError`] if the variables cannot be read.
    pub fn load(&self) -> Result<PropertySource> {
        let environment = Environment::with_prefix(&self.prefix)
            .prefix_separator("_")
            .separator(&self.separator)
            .source(self.vars.clone());

        let collected = environment
            .collect()
            .map_err(|e| ImportError::EnvironmentError(e.to_string()))?;

        let mut entries: Vec<_> = collected.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut source = PropertySource::new(self.name());
        for (key, value) in entries {
            let value = value
                .into_string()
                .map_err(|e| ImportError::EnvironmentError(format!("'{}': {}", key, e)))?;
            source.push(key, value);
        }

        Ok(source)
    }

    /// Name of the produced property source.
    pub fn name(&self) -> String {
        format!("env:{}*", self.prefix)
    }
}
