//! API constants

/// API base path prefix
pub const API_BASE: &str = "/api";

/// Public share dereference prefix (no caller identity required)
pub const SHARED_BASE: &str = "/shared";

/// Header carrying the authenticated caller's id, set by the session layer in front of us.
pub const USER_ID_HEADER: &str = "x-user-id";
