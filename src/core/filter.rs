//! Profile-based inclusion of decoded property sources.

use crate::core::{ActiveProfiles, PropertySource};

/// Default key path of the embedded "activate only for profile X" marker.
pub const DEFAULT_ACTIVATION_KEY: &str = "config.activate.on-profile";

/// Decide whether `source` belongs in an environment running `profiles`.
///
/// A source without a marker is always included. A marked source is included
/// iff the marker equals one of the active profiles, ignoring case. This is an
/// exact match per profile, unlike the substring test used to classify
/// production environments.
///
/// A marker that is blank or not a scalar is treated as absent, so the source
/// is included. Someone who writes a list under the key gets the fragment
/// everywhere rather than nowhere.
pub fn should_include(
    source: &PropertySource,
    profiles: &ActiveProfiles,
    activation_key: &str,
) -> bool {
    match source.activation_profile(activation_key) {
        None => true,
        Some(profile) => profiles.contains(profile),
    }
}
