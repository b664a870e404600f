//! In-process store with the same command semantics as Redis.
//!
//! Useful for tests and local development without a server. Several clients
//! can share one [`MemoryStore`] to exercise cross-client behavior such as
//! lock contention.

use super::{CacheTransport, ConnectionSettings, Connector};
use crate::connection::{ConnectionEvent, ConnectionLifecycle};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// TTL-aware in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    /// True when no live keys remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a value without expiration, like a plain `SET`.
    pub fn insert_persistent(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        Ok(())
    }

    /// Runs `f` over the map after purging expired entries.
    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>, Instant) -> T) -> CacheResult<T> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(f(&mut entries, now))
    }

    fn expiry(now: Instant, ttl_secs: u64) -> CacheResult<Instant> {
        if ttl_secs == 0 {
            return Err(CacheError::Backend("invalid expire time".to_string()));
        }
        Ok(now + Duration::from_secs(ttl_secs))
    }
}

#[async_trait]
impl CacheTransport for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.with_entries(|entries, _| entries.get(key).map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool> {
        self.with_entries(|entries, now| {
            let expires_at = Self::expiry(now, ttl_secs)?;
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Some(expires_at),
                },
            );
            Ok(true)
        })?
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool> {
        self.with_entries(|entries, now| {
            let expires_at = Self::expiry(now, ttl_secs)?;
            if entries.contains_key(key) {
                return Ok(false);
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Some(expires_at),
                },
            );
            Ok(true)
        })?
    }

    async fn del(&self, keys: &[String]) -> CacheResult<u64> {
        self.with_entries(|entries, _| keys.iter().filter(|key| entries.remove(key.as_str()).is_some()).count() as u64)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.with_entries(|entries, _| entries.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> CacheResult<bool> {
        self.with_entries(|entries, now| {
            if !entries.contains_key(key) {
                return false;
            }
            // A non-positive expiry deletes the key, as Redis does.
            if ttl_secs == 0 {
                entries.remove(key);
                return true;
            }
            if let Some(entry) = entries.get_mut(key) {
                entry.expires_at = Some(now + Duration::from_secs(ttl_secs));
            }
            true
        })
    }

    async fn ttl(&self, key: &str) -> CacheResult<i64> {
        self.with_entries(|entries, now| match entries.get(key) {
            None => -2,
            Some(Entry { expires_at: None, .. }) => -1,
            Some(Entry {
                expires_at: Some(at), ..
            }) => {
                let remaining = at.saturating_duration_since(now);
                // Round to the nearest second like the server does.
                ((remaining.as_millis() + 500) / 1000) as i64
            }
        })
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.with_entries(|entries, _| {
            let mut keys: Vec<String> = entries.keys().filter(|key| glob_match(pattern, key)).cloned().collect();
            keys.sort();
            keys
        })
    }

    async fn flush_all(&self) -> CacheResult<bool> {
        self.with_entries(|entries, _| {
            entries.clear();
            true
        })
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool> {
        self.with_entries(|entries, _| match entries.get(key) {
            Some(entry) if entry.value == expected => {
                entries.remove(key);
                true
            }
            _ => false,
        })
    }

    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Connector handing out clients of one shared [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    /// Creates a connector over a fresh store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector over an existing store.
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Returns the shared store.
    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }

    /// Makes every later command and connect attempt fail, simulating an
    /// unreachable server.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.store.closed.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        _settings: &ConnectionSettings,
        lifecycle: Arc<ConnectionLifecycle>,
    ) -> CacheResult<Arc<dyn CacheTransport>> {
        if self.store.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("memory store unavailable".to_string()));
        }
        lifecycle.record(ConnectionEvent::Connected);
        lifecycle.record(ConnectionEvent::Ready);
        Ok(self.store.clone())
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[^a]`, `[a-z]` and `\`
/// escapes.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_at(&pattern, &text)
}

fn glob_match_at(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Last `*` seen and the text position it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if let Some(next) = match_one(&pattern[p..], text[t]) {
            p = pattern.len() - next.len();
            t += 1;
            continue;
        }
        if pattern.get(p) == Some(&'*') {
            star = Some((p + 1, t));
            p += 1;
            continue;
        }
        match star {
            Some((after, absorbed)) => {
                p = after;
                t = absorbed + 1;
                star = Some((after, t));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches a single non-`*` pattern element against `c`, returning the
/// remaining pattern on success.
fn match_one(pattern: &[char], c: char) -> Option<&[char]> {
    let (&first, rest) = pattern.split_first()?;
    match first {
        '*' => None,
        '?' => Some(rest),
        '[' => match match_class(rest, c) {
            Some((true, after)) => Some(after),
            Some((false, _)) => None,
            // Unterminated class: treat `[` literally.
            None => (c == '[').then_some(rest),
        },
        '\\' if !rest.is_empty() => (rest[0] == c).then_some(&rest[1..]),
        literal => (literal == c).then_some(rest),
    }
}

/// Matches `c` against the class body starting after `[`. Returns whether it
/// matched and the pattern after the closing `]`.
fn match_class(class: &[char], c: char) -> Option<(bool, &[char])> {
    let (negated, mut i) = match class.first() {
        Some('^') => (true, 1),
        _ => (false, 0),
    };
    let mut matched = false;

    while i < class.len() {
        match class[i] {
            ']' => return Some((matched != negated, &class[i + 1..])),
            '\\' if i + 1 < class.len() => {
                matched |= class[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < class.len() && class[i + 1] == '-' && class[i + 2] != ']' => {
                let hi = class[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= (lo..=hi).contains(&c);
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }

    None
}
