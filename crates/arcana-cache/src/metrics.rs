//! Metrics for cache and lock monitoring.

use crate::connection::ConnectionState;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names for the cache client.
pub mod names {
    /// Cache reads that found a value.
    pub const CACHE_HITS_TOTAL: &str = "arcana_cache_hits_total";
    /// Cache reads that found nothing.
    pub const CACHE_MISSES_TOTAL: &str = "arcana_cache_misses_total";
    /// Backend failures absorbed into a fallback result.
    pub const CACHE_ERRORS_TOTAL: &str = "arcana_cache_errors_total";

    /// Connection state transitions.
    pub const CONNECTION_TRANSITIONS_TOTAL: &str = "arcana_cache_connection_transitions_total";
    /// Current connection state (0 uninitialized .. 4 closed).
    pub const CONNECTION_STATE: &str = "arcana_cache_connection_state";
    /// Reconnect attempts started.
    pub const RECONNECT_ATTEMPTS_TOTAL: &str = "arcana_cache_reconnect_attempts_total";

    /// Lock acquisitions that succeeded.
    pub const LOCKS_ACQUIRED_TOTAL: &str = "arcana_cache_locks_acquired_total";
    /// Lock acquisitions that ran out of retries.
    pub const LOCKS_CONTENDED_TOTAL: &str = "arcana_cache_locks_contended_total";
    /// Lock operations aborted by a backend error.
    pub const LOCKS_FAILED_TOTAL: &str = "arcana_cache_locks_failed_total";
    /// Lock releases, labelled by outcome.
    pub const LOCKS_RELEASED_TOTAL: &str = "arcana_cache_locks_released_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache reads that found a value");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache reads that found nothing");
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of backend failures absorbed into a fallback result"
    );

    describe_counter!(
        names::CONNECTION_TRANSITIONS_TOTAL,
        "Total number of connection state transitions"
    );
    describe_gauge!(names::CONNECTION_STATE, "Current connection state");
    describe_counter!(names::RECONNECT_ATTEMPTS_TOTAL, "Total number of reconnect attempts");

    describe_counter!(names::LOCKS_ACQUIRED_TOTAL, "Total number of locks acquired");
    describe_counter!(
        names::LOCKS_CONTENDED_TOTAL,
        "Total number of lock acquisitions that exhausted their retries"
    );
    describe_counter!(
        names::LOCKS_FAILED_TOTAL,
        "Total number of lock operations aborted by a backend error"
    );
    describe_counter!(names::LOCKS_RELEASED_TOTAL, "Total number of lock releases");
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a read that found a value.
    pub fn hit() {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    }

    /// Record a read that found nothing.
    pub fn miss() {
        counter!(names::CACHE_MISSES_TOTAL).increment(1);
    }

    /// Record an absorbed backend failure.
    pub fn error(op: &'static str) {
        counter!(names::CACHE_ERRORS_TOTAL, "op" => op).increment(1);
    }

    /// Record a connection state transition.
    pub fn transition(to: ConnectionState) {
        counter!(names::CONNECTION_TRANSITIONS_TOTAL, "to" => to.as_str()).increment(1);
        gauge!(names::CONNECTION_STATE).set(f64::from(to as u8));
    }

    /// Record a reconnect attempt.
    pub fn reconnect_attempt() {
        counter!(names::RECONNECT_ATTEMPTS_TOTAL).increment(1);
    }

    /// Record a successful lock acquisition.
    pub fn lock_acquired() {
        counter!(names::LOCKS_ACQUIRED_TOTAL).increment(1);
    }

    /// Record a lock acquisition that exhausted its retries.
    pub fn lock_contended() {
        counter!(names::LOCKS_CONTENDED_TOTAL).increment(1);
    }

    /// Record a lock operation aborted by a backend error.
    pub fn lock_failed(op: &'static str) {
        counter!(names::LOCKS_FAILED_TOTAL, "op" => op).increment(1);
    }

    /// Record a lock release.
    pub fn lock_released(outcome: &'static str) {
        counter!(names::LOCKS_RELEASED_TOTAL, "outcome" => outcome).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_namespaced() {
        for name in [
            names::CACHE_HITS_TOTAL,
            names::CACHE_ERRORS_TOTAL,
            names::CONNECTION_STATE,
            names::LOCKS_RELEASED_TOTAL,
        ] {
            assert!(name.starts_with("arcana_cache_"));
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        register_metrics();
        CacheMetrics::hit();
        CacheMetrics::error("set");
        CacheMetrics::transition(ConnectionState::Ready);
        CacheMetrics::lock_released("deleted");
    }
}
