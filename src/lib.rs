//! # config-importer
//!
//! Profile-aware startup import of YAML configuration fragments.
//!
//! ## Overview
//!
//! Before an application reads its own settings, `config-importer` merges extra
//! configuration fragments into its environment:
//! - Non-production profiles (`local`, `dev`, ...) import every bundled `.yml`
//!   file under the local search roots, except `application*` and
//!   `bootstrap.yml`
//! - Production-like profiles (any profile containing `prod`) import every
//!   `.yml` object under an S3 prefix instead
//! - A document carrying `config.activate.on-profile: <name>` is only imported
//!   when `<name>` is an active profile. Files that use
//!   `spring.config.activate.on-profile` can keep it through
//!   `ConfigImporter::builder().with_activation_key("spring.config.activate.on-profile")`
//! - Imported sources are appended after existing ones, so they never override
//!   a value that is already set
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use config_importer::prelude::*;
//! use config_importer::sources::EnvSource;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct SlackConfig {
//!     webhook: String,
//! }
//!
//! # fn example() -> config_importer::error::Result<()> {
//! let mut env = StandardEnvironment::new();
//! // APP_PROFILES__ACTIVE=prod, APP_S3__BUCKET=my-bucket, ...
//! env.add_first(EnvSource::new("APP", "__").load()?);
//!
//! ConfigImporter::new().post_process_environment(&mut env, &());
//!
//! let slack: SlackConfig = env.bind("slack")?;
//! println!("Webhook: {}", slack.webhook);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure Handling
//!
//! Startup always completes. A fragment that cannot be fetched or decoded is
//! skipped with a warning. A source that cannot be listed at all contributes
//! nothing and is logged as an error. Missing configuration shrinks the final
//! property set instead of aborting the host. Use [`core::ConfigImporter::import`]
//! to get an [`core::ImportReport`] of what happened.
//!
//! ## Feature Flags
//!
//! - `s3` (default): S3 object store via `aws-sdk-s3`, using the default AWS
//!   credential chain. Without it the remote phase logs an error and imports
//!   nothing unless a custom [`sources::ObjectStoreProvider`] is supplied.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ActiveProfiles, ConfigImporter, ConfigImporterBuilder, ConfigurableEnvironment,
        EnvironmentPostProcessor, ImportReport, PropertySource, StandardEnvironment,
    };
    pub use crate::error::{ImportError, Result};
}
