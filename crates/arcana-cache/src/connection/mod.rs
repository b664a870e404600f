//! Connection lifecycle tracking.
//!
//! Transports report [`ConnectionEvent`]s to a shared [`ConnectionLifecycle`],
//! which applies them to the [`ConnectionState`] machine and notifies the
//! registered hooks. Hooks only observe; they never change control flow.

mod state;

pub use state::{ConnectionEvent, ConnectionState};

use crate::metrics::CacheMetrics;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Observer for connection transitions.
pub trait ConnectionHook: Send + Sync {
    /// Called after `event` moved the connection from `from` to `to`.
    /// `from` equals `to` when the event did not change the state.
    fn on_event(&self, from: ConnectionState, to: ConnectionState, event: &ConnectionEvent);
}

/// Shared connection state plus its observers.
pub struct ConnectionLifecycle {
    state: RwLock<ConnectionState>,
    hooks: RwLock<Vec<Arc<dyn ConnectionHook>>>,
}

impl ConnectionLifecycle {
    /// Creates a lifecycle with no hooks.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Uninitialized),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Creates a lifecycle that logs and records metrics for every event.
    pub fn with_default_hooks() -> Self {
        let lifecycle = Self::new();
        lifecycle.add_hook(Arc::new(TracingHook));
        lifecycle.add_hook(Arc::new(MetricsHook));
        lifecycle
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Registers a hook.
    pub fn add_hook(&self, hook: Arc<dyn ConnectionHook>) {
        self.hooks.write().push(hook);
    }

    /// Applies an event and notifies the hooks. Returns the new state.
    pub fn record(&self, event: ConnectionEvent) -> ConnectionState {
        let (from, to) = {
            let mut state = self.state.write();
            let from = *state;
            *state = from.next(&event);
            (from, *state)
        };

        let hooks = self.hooks.read().clone();
        for hook in &hooks {
            hook.on_event(from, to, &event);
        }

        to
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle")
            .field("state", &self.state())
            .field("hooks", &self.hooks.read().len())
            .finish()
    }
}

/// Logs every connection event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

impl ConnectionHook for TracingHook {
    fn on_event(&self, from: ConnectionState, to: ConnectionState, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Connecting => debug!("Connecting to Redis"),
            ConnectionEvent::Connected => info!("Redis connection established"),
            ConnectionEvent::Ready => info!("Redis client ready to receive commands"),
            ConnectionEvent::Error(cause) => error!(error = %cause, "Redis connection error"),
            ConnectionEvent::Disconnected => warn!("Redis connection closed"),
            ConnectionEvent::Reconnecting { attempt, delay } => {
                info!(attempt, delay_ms = delay.as_millis() as u64, "Redis reconnecting...")
            }
            ConnectionEvent::Ended => warn!("Redis connection ended"),
        }

        if from != to {
            debug!(from = %from, to = %to, event = event.name(), "Connection state changed");
        }
    }
}

/// Records transitions and reconnect attempts as metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsHook;

impl ConnectionHook for MetricsHook {
    fn on_event(&self, from: ConnectionState, to: ConnectionState, event: &ConnectionEvent) {
        if matches!(event, ConnectionEvent::Reconnecting { .. }) {
            CacheMetrics::reconnect_attempt();
        }
        if from != to {
            CacheMetrics::transition(to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingHook {
        seen: Mutex<Vec<(ConnectionState, ConnectionState, String)>>,
    }

    impl ConnectionHook for RecordingHook {
        fn on_event(&self, from: ConnectionState, to: ConnectionState, event: &ConnectionEvent) {
            self.seen.lock().push((from, to, event.name().to_string()));
        }
    }

    #[test]
    fn test_record_applies_transitions() {
        let lifecycle = ConnectionLifecycle::new();
        assert_eq!(lifecycle.state(), ConnectionState::Uninitialized);

        lifecycle.record(ConnectionEvent::Connecting);
        lifecycle.record(ConnectionEvent::Connected);
        assert_eq!(lifecycle.record(ConnectionEvent::Ready), ConnectionState::Ready);
        assert_eq!(lifecycle.state(), ConnectionState::Ready);
    }

    #[test]
    fn test_hooks_observe_every_event() {
        let lifecycle = ConnectionLifecycle::new();
        let hook = Arc::new(RecordingHook::default());
        lifecycle.add_hook(hook.clone());

        lifecycle.record(ConnectionEvent::Connecting);
        lifecycle.record(ConnectionEvent::Ready);
        lifecycle.record(ConnectionEvent::Disconnected);
        lifecycle.record(ConnectionEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(50),
        });
        lifecycle.record(ConnectionEvent::Ended);

        let seen = hook.seen.lock();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0], (ConnectionState::Uninitialized, ConnectionState::Connecting, "connecting".into()));
        assert_eq!(seen[2], (ConnectionState::Ready, ConnectionState::Degraded, "close".into()));
        assert_eq!(seen[3], (ConnectionState::Degraded, ConnectionState::Degraded, "reconnecting".into()));
        assert_eq!(seen[4], (ConnectionState::Degraded, ConnectionState::Closed, "end".into()));
    }

    #[test]
    fn test_hook_may_read_state() {
        struct StateReader(Arc<ConnectionLifecycle>, Mutex<Vec<ConnectionState>>);

        impl ConnectionHook for StateReader {
            fn on_event(&self, _: ConnectionState, _: ConnectionState, _: &ConnectionEvent) {
                self.1.lock().push(self.0.state());
            }
        }

        let lifecycle = Arc::new(ConnectionLifecycle::new());
        let reader = Arc::new(StateReader(lifecycle.clone(), Mutex::new(Vec::new())));
        lifecycle.add_hook(reader.clone());

        lifecycle.record(ConnectionEvent::Connecting);
        assert_eq!(*reader.1.lock(), vec![ConnectionState::Connecting]);
    }

    #[test]
    fn test_default_hooks_do_not_panic() {
        let lifecycle = ConnectionLifecycle::with_default_hooks();
        lifecycle.record(ConnectionEvent::Connecting);
        lifecycle.record(ConnectionEvent::Error("refused".into()));
        lifecycle.record(ConnectionEvent::Ended);
        assert_eq!(lifecycle.state(), ConnectionState::Closed);
    }
}
