use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::Mutex;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect-and-verify contract of the backing store. The pooling mechanics
/// behind a healthy connection belong to the driver, not to us.
#[async_trait]
pub trait Connect: Send + Sync {
    type Conn: Clone + Send + Sync;

    async fn connect(&self) -> anyhow::Result<Self::Conn>;
    async fn ping(&self, conn: &Self::Conn) -> anyhow::Result<()>;
}

pub struct PgConnector {
    database_url: String,
}

impl PgConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl Connect for PgConnector {
    type Conn = PgPool;

    async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&self.database_url)
            .await
            .context("connect to database")?;
        Ok(pool)
    }

    async fn ping(&self, conn: &PgPool) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(conn)
            .await
            .context("ping database")?;
        Ok(())
    }
}

/// Process-wide connection handle, established lazily on first need and
/// reused across requests. Invoked at the start of every request, so a
/// cold-started process must be able to bring itself up from here alone.
///
/// The mutex serializes the "not yet connected" transition: any number of
/// concurrent `ensure_connected` calls produce at most one connect attempt,
/// and the rest observe its outcome. Once the handle exists the call is a
/// lock-and-clone, no I/O.
pub struct ConnectionGuard<C: Connect> {
    connector: C,
    slot: Mutex<Option<C::Conn>>,
}

impl<C: Connect> ConnectionGuard<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slot: Mutex::new(None),
        }
    }

    pub async fn ensure_connected(&self) -> anyhow::Result<C::Conn> {
        let mut slot = self.slot.lock().await;
        if let Some(conn) = slot.as_ref() {
            debug!("database connection already established");
            return Ok(conn.clone());
        }

        // The bound covers the whole connect-and-verify sequence; the mutex
        // is held throughout, so an unbounded ping would stall every request.
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let conn = self.connector.connect().await?;
            self.connector.ping(&conn).await?;
            anyhow::Ok(conn)
        })
        .await
        .context("database connect timed out")??;

        // A failed attempt leaves the slot empty; the next request retries.
        *slot = Some(conn.clone());
        info!("database connection established");
        Ok(conn)
    }
}

pub type Database = ConnectionGuard<PgConnector>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeConnector {
        connects: AtomicUsize,
        pings: AtomicUsize,
        fail_connects: AtomicUsize,
        hang_pings: bool,
    }

    impl FakeConnector {
        fn healthy() -> Self {
            Self {
                connects: AtomicUsize::new(0),
                pings: AtomicUsize::new(0),
                fail_connects: AtomicUsize::new(0),
                hang_pings: false,
            }
        }

        fn failing_first(n: usize) -> Self {
            Self {
                fail_connects: AtomicUsize::new(n),
                ..Self::healthy()
            }
        }

        fn hanging_ping() -> Self {
            Self {
                hang_pings: true,
                ..Self::healthy()
            }
        }
    }

    #[async_trait]
    impl Connect for FakeConnector {
        type Conn = ();

        async fn connect(&self) -> anyhow::Result<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail_connects.load(Ordering::SeqCst) > 0 {
                self.fail_connects.fetch_sub(1, Ordering::SeqCst);
                anyhow::bail!("connection refused");
            }
            Ok(())
        }

        async fn ping(&self, _conn: &()) -> anyhow::Result<()> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.hang_pings {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn connects_once_then_reuses() {
        let guard = ConnectionGuard::new(FakeConnector::healthy());
        guard.ensure_connected().await.expect("first call connects");
        guard.ensure_connected().await.expect("second call reuses");
        assert_eq!(guard.connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(guard.connector.pings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_attempt() {
        let guard = Arc::new(ConnectionGuard::new(FakeConnector::healthy()));
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let guard = guard.clone();
            tasks.push(tokio::spawn(
                async move { guard.ensure_connected().await },
            ));
        }
        for task in tasks {
            task.await.expect("task completes").expect("each call ok");
        }
        assert_eq!(guard.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_ping_fails_within_the_bound() {
        // The timeout covers connect AND ping; a ping that never resolves
        // must not hold the guard mutex forever.
        let guard = ConnectionGuard::new(FakeConnector::hanging_ping());
        let err = guard
            .ensure_connected()
            .await
            .expect_err("bounded by the connect timeout");
        assert!(err.to_string().contains("timed out"));
        assert_eq!(guard.connector.pings.load(Ordering::SeqCst), 1);

        // The slot stays empty, so the guard is usable again afterwards.
        let second = guard.ensure_connected().await;
        assert!(second.is_err());
        assert_eq!(guard.connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_attempt_is_retried_on_next_call() {
        let guard = ConnectionGuard::new(FakeConnector::failing_first(1));
        assert!(guard.ensure_connected().await.is_err());
        guard
            .ensure_connected()
            .await
            .expect("recovers once the store is reachable");
        assert_eq!(guard.connector.connects.load(Ordering::SeqCst), 2);
    }
}
