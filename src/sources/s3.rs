//! AWS S3 object store.

use super::{ObjectStore, ObjectStoreProvider};
use crate::error::{ImportError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use std::io::{Cursor, Read};
use tokio::runtime::Runtime;
use tracing::debug;

/// [`ObjectStore`] backed by AWS S3.
///
/// The SDK is async, so the store owns a current-thread Tokio runtime and
/// blocks on each call. Dropping the store shuts the runtime down. It must not
/// be created or used from inside another async runtime.
pub struct S3ObjectStore {
    client: Client,
    runtime: Runtime,
}

impl S3ObjectStore {
    /// Build a client for `region` using the default credential chain.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::SourceUnavailable`] if the runtime cannot be created.
    pub fn connect(region: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ImportError::SourceUnavailable(format!("Failed to create runtime: {}", e)))?;

        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load(),
        );
        debug!(region, "Created S3 client");

        Ok(Self {
            client: Client::new(&sdk_config),
            runtime,
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take());

            let output = self.runtime.block_on(request.send()).map_err(|e| {
                ImportError::SourceUnavailable(format!(
                    "ListObjectsV2 s3://{}/{} failed: {}",
                    bucket,
                    prefix,
                    DisplayErrorContext(&e)
                ))
            })?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + '_>> {
        let output = self
            .runtime
            .block_on(self.client.get_object().bucket(bucket).key(key).send())
            .map_err(|e| ImportError::fetch(key, DisplayErrorContext(&e)))?;

        // Drain the body so the connection is released before the next object
        let bytes = self
            .runtime
            .block_on(output.body.collect())
            .map_err(|e| ImportError::fetch(key, e))?
            .into_bytes();

        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// Provider building an [`S3ObjectStore`] per region.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3ObjectStoreProvider;

impl ObjectStoreProvider for S3ObjectStoreProvider {
    fn connect(&self, region: &str) -> Result<Box<dyn ObjectStore>> {
        Ok(Box::new(S3ObjectStore::connect(region)?))
    }
}
