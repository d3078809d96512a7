//! Fragment source implementations.

mod env;
mod fragment_source;
mod local;
mod remote;

#[cfg(feature = "s3")]
mod s3;

pub use env::EnvSource;
pub use fragment_source::{FragmentSource, Fragments, NamedFragment};
pub use local::{
    DEFAULT_BOOTSTRAP_NAME, DEFAULT_PRIMARY_PREFIX, DEFAULT_SEARCH_ROOT, DEFAULT_SUFFIX,
    LocalSource,
};
pub use remote::{
    DEFAULT_BUCKET, DEFAULT_PREFIX, DEFAULT_REGION, ObjectStore, ObjectStoreProvider,
    REMOTE_NAME_PREFIX, RemoteKeys, RemoteSettings, RemoteSource,
};

#[cfg(feature = "s3")]
pub use s3::{S3ObjectStore, S3ObjectStoreProvider};
