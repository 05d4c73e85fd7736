/// Application name
pub const APP_NAME: &str = "Haven";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Minimum accepted password length at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Session lifetime in hours (30 days)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 720;

/// Email verification token lifetime in hours
pub const VERIFICATION_TTL_HOURS: i64 = 24;

/// Maximum profile photo size in bytes (5 MiB)
pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

/// Default number of check-ins returned by history queries
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Fallback names used when a user has not set a display name
pub const FALLBACK_DISPLAY_NAME: &str = "User";
pub const FALLBACK_ACTOR_NAME: &str = "Someone";

/// Location label used when a check-in carries none
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Maximum length of free-text fields (nickname, phone, location, address)
pub const MAX_FIELD_LEN: usize = 200;
