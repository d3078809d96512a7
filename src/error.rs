//! Error types for config-importer.
//!
//! None of these ever escape [`ConfigImporter::import`](crate::core::ConfigImporter::import):
//! the importer catches each one at the narrowest scope, logs it, and carries on
//! with whatever is left.

/// Result type alias for config-importer operations.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors that can occur while importing configuration fragments.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A fragment source could not be listed or connected to.
    ///
    /// Aborts the phase that owns the source, never the whole run.
    #[error("Configuration source unavailable: {0}")]
    SourceUnavailable(String),

    /// A single fragment could not be fetched or read.
    #[error("Failed to fetch fragment '{name}': {reason}")]
    FragmentFetch {
        /// Logical name of the fragment
        name: String,
        /// Underlying cause
        reason: String,
    },

    /// A fragment could not be decoded into property sources.
    #[error("Malformed fragment '{name}': {reason}")]
    MalformedFragment {
        /// Logical name of the fragment
        name: String,
        /// Decoder message
        reason: String,
    },

    /// Attempted to use a backend that is not compiled in.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(&'static str),

    /// Effective properties could not be bound to the requested type.
    #[error("Failed to bind properties: {0}")]
    Binding(String),

    /// Process environment variables could not be collected.
    #[error("Failed to read environment variables: {0}")]
    EnvironmentError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ImportError {
    /// Create a fetch error for the named fragment.
    pub fn fetch(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::FragmentFetch {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a decode error for the named fragment.
    pub fn malformed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedFragment {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the fragment this error is about, if it is fragment-scoped.
    pub fn fragment_name(&self) -> Option<&str> {
        match self {
            Self::FragmentFetch { name, .. } | Self::MalformedFragment { name, .. } => {
                Some(name.as_str())
            }
            _ => None,
        }
    }
}
