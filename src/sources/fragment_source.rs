//! Fragment source trait.

use crate::error::Result;

/// A boxed, lazily evaluated sequence of fragments.
///
/// Each item is fetched when it is pulled, so a failing fragment surfaces as a
/// single `Err` item and the remaining fragments are still yielded.
pub type Fragments<'a> = Box<dyn Iterator<Item = Result<NamedFragment>> + 'a>;

/// A configuration fragment: a logical name paired with its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFragment {
    name: String,
    bytes: Vec<u8>,
}

impl NamedFragment {
    /// Create a fragment from a logical name and payload.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Logical name, such as a file name or `remote-<key>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Trait for fragment sources.
///
/// The importer ships two: [`LocalSource`](super::LocalSource) for bundled files
/// and [`RemoteSource`](super::RemoteSource) for object storage. Exactly one of
/// them runs per import, depending on the active profiles.
pub trait FragmentSource {
    /// List the fragments this source provides.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::SourceUnavailable`](crate::error::ImportError::SourceUnavailable)
    /// if the source cannot be listed at all. Per-fragment failures are
    /// reported through the returned iterator instead.
    fn fragments(&self) -> Result<Fragments<'_>>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}
