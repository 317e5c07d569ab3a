use std::time::Duration;

/// Default directory of a `LocalStore` opened through the builder
pub const DB_PATH: &str = "./tallykv";

/// Compare-and-swap attempts an increment makes before reporting contention
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Bound on a single store call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on the jittered pause between conflicting attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Longest accepted counter name in bytes
pub const MAX_NAME_LEN: usize = 1024;

/// Canonical decimal form a counter value is persisted as
#[inline]
pub fn encode_value(value: i64) -> String {
    value.to_string()
}

/// Parse stored bytes as a counter value.
///
/// Any UTF-8 decimal `i64` is accepted, canonical or not (`"007"`, `"+7"`).
#[inline]
pub fn decode_value(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}
