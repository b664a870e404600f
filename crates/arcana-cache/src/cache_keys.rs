//! Cache key generators for consistent key naming.

/// Prefix for lock keys.
pub const LOCK_PREFIX: &str = "lock:";

/// Generate the lock key guarding `resource`.
#[must_use]
pub fn lock_key(resource: &str) -> String {
    format!("{}{}", LOCK_PREFIX, resource)
}

/// Join a prefix and key parts with `:`.
#[must_use]
pub fn namespaced(prefix: &str, parts: &[&str]) -> String {
    let mut key = prefix.to_string();
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

/// Pattern matching every key under `prefix`.
#[must_use]
pub fn prefix_pattern(prefix: &str) -> String {
    format!("{}:*", prefix)
}
