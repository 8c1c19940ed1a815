//! Shared key generation for storage backends.
//!
//! Key format: originals at `images/{owner_id}_{file_name}`, derivatives at
//! `images/{asset_id}/variants/{width}w.{format}`. All backends and services
//! must use these helpers for consistency; the ownership policy condition
//! also relies on the original-key convention.

use uuid::Uuid;

pub const IMAGE_KEY_PREFIX: &str = "images/";

/// Storage key for an original upload: `images/{owner_id}_{file_name}`.
pub fn original_key(owner_id: Uuid, file_name: &str) -> String {
    format!("{}{}_{}", IMAGE_KEY_PREFIX, owner_id, file_name)
}

/// Storage key for a derived variant:
/// `images/{asset_id}/variants/{width}w.{format}`.
pub fn variant_key(asset_id: Uuid, width: u32, format: &str) -> String {
    format!("{}{}/variants/{}w.{}", IMAGE_KEY_PREFIX, asset_id, width, format)
}

/// Prefix under which all of an asset's variant objects live.
pub fn variant_prefix(asset_id: Uuid) -> String {
    format!("{}{}/variants/", IMAGE_KEY_PREFIX, asset_id)
}

/// Whether a storage key follows the ownership naming convention for the
/// given user (`images/{owner_id}_...`).
///
/// This is a convention check, not an authoritative lookup; callers that
/// have the metadata record at hand should prefer its `owner_id` field.
pub fn is_user_owned(key: &str, owner_id: Uuid) -> bool {
    key.strip_prefix(IMAGE_KEY_PREFIX)
        .map(|rest| rest.starts_with(&format!("{}_", owner_id)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_key_format() {
        let owner = Uuid::nil();
        assert_eq!(
            original_key(owner, "photo.jpg"),
            "images/00000000-0000-0000-0000-000000000000_photo.jpg"
        );
    }

    #[test]
    fn test_variant_key_format() {
        let asset = Uuid::nil();
        assert_eq!(
            variant_key(asset, 320, "webp"),
            "images/00000000-0000-0000-0000-000000000000/variants/320w.webp"
        );
        assert!(variant_key(asset, 320, "webp").starts_with(&variant_prefix(asset)));
    }

    #[test]
    fn test_is_user_owned() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let key = original_key(owner, "pic.png");
        assert!(is_user_owned(&key, owner));
        assert!(!is_user_owned(&key, other));
        assert!(!is_user_owned("avatars/abc.png", owner));
    }
}
