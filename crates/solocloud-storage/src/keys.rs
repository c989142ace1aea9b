//! Shared key layout for storage backends.
//!
//! Key format: `{subfolder}/{unique_name}`, identical to the file's path under the
//! local upload root.

use crate::traits::{StorageError, StorageResult};

/// Build the storage key for a classified upload.
pub fn object_key(subfolder: &str, unique_name: &str) -> String {
    format!("{}/{}", subfolder.trim_matches('/'), unique_name)
}

/// Reject keys that could escape a backend's root.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_joins_subfolder_and_name() {
        assert_eq!(object_key("images", "ab12.png"), "images/ab12.png");
        assert_eq!(object_key("/files/", "readme"), "files/readme");
    }

    #[test]
    fn traversal_and_absolute_keys_are_rejected() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/images/a.png").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("images/a.png").is_ok());
    }
}
