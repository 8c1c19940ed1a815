//! Key-value index naming conventions.

use uuid::Uuid;

/// Prefix for canonical metadata records.
pub const METADATA_KEY_PREFIX: &str = "metadata:";

/// Prefix for the tag inverted index.
pub const TAG_KEY_PREFIX: &str = "tag:";

/// Prefix for the owner inverted index.
pub const OWNER_KEY_PREFIX: &str = "user:";

pub fn metadata_key(asset_id: Uuid) -> String {
    format!("{}{}", METADATA_KEY_PREFIX, asset_id)
}

pub fn tag_key(tag: &str) -> String {
    format!("{}{}", TAG_KEY_PREFIX, tag)
}

pub fn owner_key(owner_id: Uuid) -> String {
    format!("{}{}", OWNER_KEY_PREFIX, owner_id)
}
