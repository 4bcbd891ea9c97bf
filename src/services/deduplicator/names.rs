//! Deduplicator names, versions and deprecated aliases.
//!
//! Data sets record the name of their owning deduplicator. Renamed policies
//! keep resolving data sets created under an old name through [`ALIASES`].

/// No-op policy.
pub const NONE_NAME: &str = "org.tidemark.deduplicator.none";
/// Version of [`NONE_NAME`].
pub const NONE_VERSION: &str = "1.0.0";

/// User-scoped hash drop policy.
pub const DROP_HASH_NAME: &str = "org.tidemark.deduplicator.dataset.drop.hash";
/// Version of [`DROP_HASH_NAME`].
pub const DROP_HASH_VERSION: &str = "1.0.0";

/// Origin replace policy.
pub const DELETE_ORIGIN_NAME: &str = "org.tidemark.deduplicator.dataset.delete.origin";
/// Version of [`DELETE_ORIGIN_NAME`].
pub const DELETE_ORIGIN_VERSION: &str = "1.0.0";

/// Origin replace-if-newer policy.
pub const DELETE_ORIGIN_OLDER_NAME: &str = "org.tidemark.deduplicator.dataset.delete.origin.older";
/// Version of [`DELETE_ORIGIN_OLDER_NAME`].
pub const DELETE_ORIGIN_OLDER_VERSION: &str = "1.0.0";

/// Device hash deactivation policy using platform identity fields.
pub const DEVICE_DEACTIVATE_HASH_NAME: &str = "org.tidemark.deduplicator.device.deactivate.hash";
/// Version of [`DEVICE_DEACTIVATE_HASH_NAME`].
pub const DEVICE_DEACTIVATE_HASH_VERSION: &str = "1.1.0";

/// Device hash deactivation policy using legacy identity fields.
pub const DEVICE_DEACTIVATE_LEGACY_HASH_NAME: &str =
    "org.tidemark.deduplicator.device.deactivate.legacy.hash";
/// Version of [`DEVICE_DEACTIVATE_LEGACY_HASH_NAME`].
pub const DEVICE_DEACTIVATE_LEGACY_HASH_VERSION: &str = "1.0.0";

/// Device history truncation policy.
pub const DEVICE_TRUNCATE_DATA_SET_NAME: &str = "org.tidemark.deduplicator.device.truncate.dataset";
/// Version of [`DEVICE_TRUNCATE_DATA_SET_NAME`].
pub const DEVICE_TRUNCATE_DATA_SET_VERSION: &str = "1.0.0";

/// Current name to deprecated names.
pub const ALIASES: &[(&str, &[&str])] = &[
    (NONE_NAME, &["org.tidemark.continuous"]),
    (DELETE_ORIGIN_NAME, &["org.tidemark.continuous.origin"]),
    (DEVICE_DEACTIVATE_HASH_NAME, &["org.tidemark.hash-deactivate-old"]),
    (DEVICE_TRUNCATE_DATA_SET_NAME, &["org.tidemark.truncate"]),
];

/// Returns the deprecated names of a deduplicator.
#[must_use]
pub fn aliases(name: &str) -> &'static [&'static str] {
    ALIASES
        .iter()
        .find(|(current, _)| *current == name)
        .map(|(_, aliases)| *aliases)
        .unwrap_or_default()
}

/// True if `candidate` is `name` or one of its deprecated aliases.
#[must_use]
pub fn is_name_or_alias(name: &str, candidate: &str) -> bool {
    candidate == name || aliases(name).contains(&candidate)
}
