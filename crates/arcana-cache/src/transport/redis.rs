//! Redis transport over a multiplexed async connection.

use super::{CacheTransport, ConnectionSettings, Connector, RELEASE_SCRIPT};
use crate::connection::{ConnectionEvent, ConnectionLifecycle};
use crate::error::{CacheError, CacheResult};
use arcana_resilience::with_timeout;
use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, FromRedisValue};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Opens [`RedisTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl Connector for RedisConnector {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
        lifecycle: Arc<ConnectionLifecycle>,
    ) -> CacheResult<Arc<dyn CacheTransport>> {
        let transport = RedisTransport::new(settings.clone(), lifecycle)?;
        let conn = transport.open().await?;
        *transport.connection.write() = Some(conn);

        info!(host = settings.url.host_str().unwrap_or_default(), "Connected to Redis");
        Ok(Arc::new(transport))
    }
}

/// Redis transport.
///
/// A dropped connection is re-established lazily by the next command,
/// waiting the backoff delay before each attempt. A command is retried on a
/// fresh connection at most `max_retries_per_request` times.
pub struct RedisTransport {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    reconnect_gate: tokio::sync::Mutex<()>,
    reconnect_attempts: AtomicU32,
    closed: AtomicBool,
    settings: ConnectionSettings,
    lifecycle: Arc<ConnectionLifecycle>,
}

impl RedisTransport {
    /// Creates a transport without connecting.
    pub fn new(settings: ConnectionSettings, lifecycle: Arc<ConnectionLifecycle>) -> CacheResult<Self> {
        let client = Client::open(settings.url.as_str())
            .map_err(|e| CacheError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            reconnect_gate: tokio::sync::Mutex::new(()),
            reconnect_attempts: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            settings,
            lifecycle,
        })
    }

    /// Connects and runs the readiness check.
    async fn open(&self) -> CacheResult<MultiplexedConnection> {
        let mut conn = with_timeout(self.settings.connect_timeout, async {
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(CacheError::from)
        })
        .await?;
        self.lifecycle.record(ConnectionEvent::Connected);

        with_timeout(self.settings.command_timeout, async {
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map_err(CacheError::from)
        })
        .await?;
        self.lifecycle.record(ConnectionEvent::Ready);

        Ok(conn)
    }

    /// Returns the live connection, reconnecting if it was dropped.
    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        if let Some(conn) = self.connection.read().clone() {
            return Ok(conn);
        }

        let _gate = self.reconnect_gate.lock().await;
        // Another caller may have reconnected while we waited.
        if let Some(conn) = self.connection.read().clone() {
            return Ok(conn);
        }

        let attempt = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let delay = self.settings.backoff.delay_for_attempt(attempt);
        self.lifecycle.record(ConnectionEvent::Reconnecting { attempt, delay });
        self.settings.backoff.wait(attempt).await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }

        match self.open().await {
            Ok(conn) => {
                self.reconnect_attempts.store(0, Ordering::SeqCst);
                *self.connection.write() = Some(conn.clone());
                Ok(conn)
            }
            Err(err) => {
                self.lifecycle.record(ConnectionEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Forgets the current connection after a connection-level failure.
    fn drop_connection(&self, err: &CacheError) {
        if self.connection.write().take().is_some() {
            self.lifecycle.record(ConnectionEvent::Error(err.to_string()));
            self.lifecycle.record(ConnectionEvent::Disconnected);
        }
    }

    /// Runs an idempotent command, retrying on connection-level failures.
    async fn query<T>(&self, cmd: &Cmd) -> CacheResult<T>
    where
        T: FromRedisValue + Send,
    {
        self.query_with(cmd, Replay::Safe).await
    }

    /// Runs a command under the command timeout, reconnecting and retrying
    /// on connection-level failures as `replay` allows.
    async fn query_with<T>(&self, cmd: &Cmd, replay: Replay) -> CacheResult<T>
    where
        T: FromRedisValue + Send,
    {
        let mut retries = 0;
        loop {
            let (result, sent) = match self.connection().await {
                Ok(mut conn) => {
                    let result = with_timeout(self.settings.command_timeout, async {
                        cmd.query_async::<T>(&mut conn).await.map_err(CacheError::from)
                    })
                    .await;
                    (result, true)
                }
                Err(err) => (Err(err), false),
            };

            match result {
                Err(err) if err.is_connection_error() => {
                    if sent {
                        self.drop_connection(&err);
                    }
                    if !replay.allows(sent) || retries >= self.settings.max_retries_per_request {
                        return Err(err);
                    }
                    retries += 1;
                    debug!(retries, error = %err, "Retrying Redis command");
                }
                other => return other,
            }
        }
    }
}

/// Whether a command may be sent again after a connection-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    /// Repeating the command has no further effect.
    Safe,
    /// The command may already have been applied once it reached the
    /// server, so it is only repeated when it never left the client.
    UnsentOnly,
}

impl Replay {
    fn allows(self, sent: bool) -> bool {
        match self {
            Self::Safe => true,
            Self::UnsentOnly => !sent,
        }
    }
}

#[async_trait]
impl CacheTransport for RedisTransport {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.query(redis::cmd("GET").arg(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool> {
        let reply: String = self.query(redis::cmd("SETEX").arg(key).arg(ttl_secs).arg(value)).await?;
        Ok(reply == "OK")
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool> {
        let reply: Option<String> = self
            .query_with(
                redis::cmd("SET").arg(key).arg(value).arg("EX").arg(ttl_secs).arg("NX"),
                Replay::UnsentOnly,
            )
            .await?;
        Ok(reply.as_deref() == Some("OK"))
    }

    async fn del(&self, keys: &[String]) -> CacheResult<u64> {
        self.query(redis::cmd("DEL").arg(keys)).await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let count: u64 = self.query(redis::cmd("EXISTS").arg(key)).await?;
        Ok(count == 1)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> CacheResult<bool> {
        let updated: u64 = self.query(redis::cmd("EXPIRE").arg(key).arg(ttl_secs)).await?;
        Ok(updated == 1)
    }

    async fn ttl(&self, key: &str) -> CacheResult<i64> {
        self.query(redis::cmd("TTL").arg(key)).await
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let keys: Option<Vec<String>> = self.query(redis::cmd("KEYS").arg(pattern)).await?;
        Ok(keys.unwrap_or_default())
    }

    async fn flush_all(&self) -> CacheResult<bool> {
        let reply: String = self.query(&redis::cmd("FLUSHALL")).await?;
        Ok(reply == "OK")
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let deleted: u64 = self
            .query_with(
                redis::cmd("EVAL").arg(RELEASE_SCRIPT).arg(1).arg(key).arg(expected),
                Replay::UnsentOnly,
            )
            .await?;
        Ok(deleted == 1)
    }

    async fn close(&self) -> CacheResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.connection.write().take();
        Ok(())
    }
}
