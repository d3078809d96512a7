//! Core import types: profiles, environment, decoding, filtering and the importer.

mod builder;
mod decoder;
mod environment;
mod filter;
mod importer;
mod profile;

pub use builder::ConfigImporterBuilder;
pub use decoder::{FragmentDecoder, YamlDecoder};
pub use environment::{
    ACTIVE_PROFILES_PROPERTY, ConfigurableEnvironment, EnvironmentPostProcessor, PropertySource,
    StandardEnvironment,
};
pub use filter::{DEFAULT_ACTIVATION_KEY, should_include};
pub use importer::{ConfigImporter, ImportReport};
pub use profile::{ActiveProfiles, SourceSelection, is_production_like};
