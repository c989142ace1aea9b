//! Application-wide constants

use chrono::{DateTime, Utc};

/// 2099-12-31 23:59:59 UTC, the expiry stored for links issued without a TTL.
pub const PERMANENT_EXPIRY_TIMESTAMP: i64 = 4_102_444_799;

/// Seven days.
pub const DEFAULT_SHARE_TTL_HOURS: u32 = 168;

/// Raw bytes of entropy in a share token (256 bits).
pub const SHARE_TOKEN_BYTES: usize = 32;

pub const DEFAULT_THUMBNAIL_MAX_SIZE: u32 = 200;
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 85;

pub const THUMBNAIL_DIR: &str = "thumbnails";
pub const THUMBNAIL_PREFIX: &str = "thumb_";

pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECTION_TEST_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 1024;

/// Fixed far-future expiry used to encode "permanent".
pub fn permanent_expiry() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(PERMANENT_EXPIRY_TIMESTAMP, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
