//! Shared key generation for storage backends.
//!
//! Key format: `user-images/{uid}/{uid}-{timestamp_ms}.{ext}`.

use crate::traits::{StorageError, StorageResult};
use snapshelf_core::constants::USER_IMAGES_PREFIX;

/// Generate the storage key for one uploaded image.
///
/// The object name embeds the owner and the upload timestamp so keys from
/// different users never collide. `extension` is used as given.
pub fn image_storage_key(user_id: &str, timestamp_ms: i64, extension: &str) -> String {
    format!(
        "{}/{}/{}-{}.{}",
        USER_IMAGES_PREFIX, user_id, user_id, timestamp_ms, extension
    )
}

/// Reject keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_embeds_user_and_timestamp() {
        assert_eq!(
            image_storage_key("uid42", 1_700_000_000_000, "jpg"),
            "user-images/uid42/uid42-1700000000000.jpg"
        );
    }

    #[test]
    fn rejects_traversal_and_absolute_keys() {
        assert!(validate_key("user-images/a/../../etc").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("user-images/a/a-1.png").is_ok());
    }
}
