//! Pooled connection handle.
//!
//! A [`PooledConnection`] owns one driver connection while it is checked out.
//! Returning it (explicitly, through [`PooledConnection::exit`], or by
//! dropping it) moves the connection back to the pool; the handle is then
//! inert and every further call fails with [`PoolError::AlreadyReturned`].
//!
//! A handle created with [`PooledConnection::connect`] has no pool. Closing it
//! really closes the socket, and scope exit commits or rolls back like a plain
//! driver connection.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::driver::Driver;
use crate::error::{DriverError, PoolError, PoolResult};
use crate::pool::{Disposition, Pool};
use crate::value::{ExecResult, Row, RowShape, Value};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A driver connection plus the metadata the pool tracks for it.
pub(crate) struct Slot<C> {
    pub(crate) id: u64,
    /// `None` once the socket has been force closed.
    pub(crate) conn: Option<C>,
    pub(crate) created_at: Instant,
    /// Autocommit mode the session is currently in.
    pub(crate) autocommit: bool,
}

impl<C> Slot<C> {
    pub(crate) fn new(conn: C, autocommit: bool) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            conn: Some(conn),
            created_at: Instant::now(),
            autocommit,
        }
    }

    pub(crate) fn is_expired(&self, lifetime: Option<Duration>) -> bool {
        lifetime.is_some_and(|max| self.created_at.elapsed() >= max)
    }
}

/// Open a connection and put the session in the requested autocommit mode.
pub(crate) async fn open_connection<D: Driver>(
    driver: &D,
    autocommit: Option<bool>,
) -> Result<D::Connection, DriverError> {
    let mut conn = driver.connect().await?;
    if let Some(enabled) = autocommit {
        if let Err(e) = driver.set_autocommit(&mut conn, enabled).await {
            driver.force_close(conn);
            return Err(e);
        }
    }
    Ok(conn)
}

fn returned_error<D: Driver>(pool: &Option<Pool<D>>) -> PoolError {
    match pool {
        Some(pool) => PoolError::AlreadyReturned {
            pool: pool.name().to_string(),
        },
        None => PoolError::ConnectionClosed,
    }
}

/// A connection checked out of a [`Pool`], or a standalone connection.
pub struct PooledConnection<D: Driver> {
    slot: Option<Slot<D::Connection>>,
    pool: Option<Pool<D>>,
    driver: Arc<D>,
    id: u64,
    created_at: Instant,
    broken: bool,
}

impl<D: Driver> PooledConnection<D> {
    pub(crate) fn checked_out(pool: Pool<D>, slot: Slot<D::Connection>) -> Self {
        Self {
            id: slot.id,
            created_at: slot.created_at,
            driver: pool.driver_arc(),
            pool: Some(pool),
            slot: Some(slot),
            broken: false,
        }
    }

    /// Open a connection that is not managed by any pool.
    pub async fn connect(driver: Arc<D>) -> PoolResult<Self> {
        let conn = driver.connect().await?;
        let slot = Slot::new(conn, true);
        debug!(id = slot.id, "Opened standalone connection");
        Ok(Self {
            id: slot.id,
            created_at: slot.created_at,
            driver,
            pool: None,
            slot: Some(slot),
            broken: false,
        })
    }

    /// Process-unique connection id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// When the connection was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since the connection was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether this handle still owns its connection.
    pub fn is_checked_out(&self) -> bool {
        self.slot.is_some()
    }

    /// Whether the connection belongs to a pool.
    pub fn is_pool_managed(&self) -> bool {
        self.pool.is_some()
    }

    /// Name of the owning pool.
    pub fn pool_name(&self) -> Option<&str> {
        self.pool.as_ref().map(|p| p.name())
    }

    /// Whether a connection-level failure was observed on this handle.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Whether the underlying socket is open (not force closed).
    pub fn is_open(&self) -> bool {
        self.slot.as_ref().is_some_and(|s| s.conn.is_some())
    }

    /// The raw driver connection.
    pub fn inner_mut(&mut self) -> PoolResult<&mut D::Connection> {
        self.live().map(|(_, conn)| conn)
    }

    fn live(&mut self) -> PoolResult<(&D, &mut D::Connection)> {
        let driver = &*self.driver;
        match self.slot.as_mut() {
            Some(slot) => match slot.conn.as_mut() {
                Some(conn) => Ok((driver, conn)),
                None => Err(PoolError::ConnectionClosed),
            },
            None => Err(returned_error(&self.pool)),
        }
    }

    fn observe<T>(&mut self, result: Result<T, DriverError>) -> PoolResult<T> {
        result.map_err(|e| {
            if e.is_connection_broken() {
                debug!(id = self.id, error = %e, "Connection marked broken");
                self.broken = true;
            }
            PoolError::from_driver(e)
        })
    }

    /// Run a statement and report affected rows and the last insert id.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> PoolResult<ExecResult> {
        trace!(id = self.id, sql = %sql, "Executing statement");
        let (driver, conn) = self.live()?;
        let result = driver.execute(conn, sql, params).await;
        self.observe(result)
    }

    /// Run a statement once per parameter set; affected rows are summed.
    pub async fn execute_many(&mut self, sql: &str, batch: &[Vec<Value>]) -> PoolResult<ExecResult> {
        trace!(id = self.id, sql = %sql, batch = batch.len(), "Executing batch");
        let (driver, conn) = self.live()?;
        let result = driver.execute_many(conn, sql, batch).await;
        self.observe(result)
    }

    /// Run a query and return every row.
    pub async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> PoolResult<Vec<Row>> {
        trace!(id = self.id, sql = %sql, "Fetching rows");
        let (driver, conn) = self.live()?;
        let result = driver.fetch(conn, sql, params).await;
        self.observe(result)
    }

    /// Run a query and return the first row, if any.
    pub async fn fetch_one(&mut self, sql: &str, params: &[Value]) -> PoolResult<Option<Row>> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    /// Run a query and return the rows as JSON arrays or objects.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[Value],
        shape: RowShape,
    ) -> PoolResult<Vec<JsonValue>> {
        let rows = self.fetch_all(sql, params).await?;
        Ok(rows.iter().map(|r| r.to_json(shape)).collect())
    }

    /// Commit the current transaction.
    pub async fn commit(&mut self) -> PoolResult<()> {
        let (driver, conn) = self.live()?;
        let result = driver.commit(conn).await;
        self.observe(result)
    }

    /// Roll back the current transaction.
    pub async fn rollback(&mut self) -> PoolResult<()> {
        let (driver, conn) = self.live()?;
        let result = driver.rollback(conn).await;
        self.observe(result)
    }

    /// Switch the session's autocommit mode. A pooled connection gets the
    /// pool's mode back when it is returned.
    pub async fn set_autocommit(&mut self, enabled: bool) -> PoolResult<()> {
        let (driver, conn) = self.live()?;
        let result = driver.set_autocommit(conn, enabled).await;
        self.observe(result)?;
        if let Some(slot) = self.slot.as_mut() {
            slot.autocommit = enabled;
        }
        Ok(())
    }

    /// Check that the server is reachable.
    ///
    /// With `reconnect`, a closed or broken socket is replaced by a fresh one
    /// and probed once more; a second failure is returned. Without it, a
    /// closed socket fails with [`PoolError::ConnectionClosed`].
    pub async fn ping(&mut self, reconnect: bool) -> PoolResult<()> {
        let driver = &*self.driver;
        let autocommit = self.pool.as_ref().map(|p| p.config().autocommit);
        let slot = match self.slot.as_mut() {
            Some(slot) => slot,
            None => return Err(returned_error(&self.pool)),
        };

        let mut may_reconnect = reconnect;
        if slot.conn.is_none() {
            if !may_reconnect {
                return Err(PoolError::ConnectionClosed);
            }
            debug!(id = slot.id, "Reopening closed connection");
            let conn = open_connection(driver, autocommit).await?;
            slot.conn = Some(conn);
            may_reconnect = false;
        }

        let first = match slot.conn.as_mut() {
            Some(conn) => driver.ping(conn).await,
            None => return Err(PoolError::ConnectionClosed),
        };

        let result = match first {
            Ok(()) => Ok(()),
            Err(e) if may_reconnect => {
                debug!(id = slot.id, error = %e, "Connection broken, reconnecting");
                if let Some(old) = slot.conn.take() {
                    driver.force_close(old);
                }
                let mut conn = open_connection(driver, autocommit).await?;
                let second = driver.ping(&mut conn).await;
                slot.conn = Some(conn);
                if let Some(enabled) = autocommit {
                    slot.autocommit = enabled;
                }
                second
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.broken = false;
                Ok(())
            }
            Err(e) => self.observe(Err(e)),
        }
    }

    /// Give the connection back to its pool.
    ///
    /// A no-op for standalone connections. Fails with
    /// [`PoolError::AlreadyReturned`] if it was already given back.
    pub async fn release(&mut self) -> PoolResult<()> {
        let Some(pool) = self.pool.clone() else {
            return Ok(());
        };
        let slot = self.slot.take().ok_or_else(|| PoolError::AlreadyReturned {
            pool: pool.name().to_string(),
        })?;
        let disposition = if self.broken {
            Disposition::Discard
        } else {
            Disposition::Reset
        };
        pool.reclaim(slot, disposition).await;
        Ok(())
    }

    /// Close the connection.
    ///
    /// For a pooled connection this means returning it to the pool, exactly
    /// like [`release`](Self::release). Use [`force_close`](Self::force_close)
    /// to terminate the socket.
    pub async fn close(&mut self) -> PoolResult<()> {
        if self.pool.is_some() {
            return self.release().await;
        }
        let slot = self.slot.take().ok_or(PoolError::ConnectionClosed)?;
        if let Some(conn) = slot.conn {
            debug!(id = self.id, "Closing standalone connection");
            self.driver.close(conn).await?;
        }
        Ok(())
    }

    /// Terminate the socket without returning it.
    ///
    /// A pooled connection is removed from its pool, which opens a
    /// replacement if it drops below its normal size.
    pub async fn force_close(&mut self) -> PoolResult<()> {
        let slot = match self.slot.take() {
            Some(slot) => slot,
            None => return Err(returned_error(&self.pool)),
        };
        match self.pool.clone() {
            Some(pool) => pool.reclaim(slot, Disposition::Discard).await,
            None => {
                if let Some(conn) = slot.conn {
                    self.driver.force_close(conn);
                }
            }
        }
        Ok(())
    }

    /// Finish a scoped use of the connection.
    ///
    /// On `Ok` the transaction is committed. On an error the driver deems
    /// harmless to the connection (bad SQL, constraint violations, unsupported
    /// operations) it is rolled back. A pooled connection is then returned.
    /// Any other error closes the connection and the pool replaces it.
    ///
    /// A standalone connection commits or rolls back and is then closed.
    ///
    /// The outcome is handed back unchanged, unless the commit itself fails.
    pub async fn exit<T>(mut self, outcome: PoolResult<T>) -> PoolResult<T> {
        if self.slot.is_none() {
            return outcome;
        }

        let outcome = match outcome {
            Ok(value) => self.commit().await.map(|()| value),
            Err(e) => Err(e),
        };

        if self.pool.is_none() {
            if outcome.is_err() {
                let _ = self.rollback().await;
            }
            let closed = if self.broken {
                self.force_close().await
            } else {
                self.close().await
            };
            if let Err(e) = closed {
                debug!(id = self.id, error = %e, "Failed to close standalone connection");
            }
            return outcome;
        }

        let disposition = match &outcome {
            Ok(_) => Disposition::Keep,
            Err(e) if e.is_reusable() => match self.rollback().await {
                Ok(()) => Disposition::Keep,
                Err(_) => Disposition::Discard,
            },
            Err(e) => {
                debug!(id = self.id, error = %e, "Closing non-reusable connection");
                Disposition::Discard
            }
        };
        self.hand_back(disposition).await;
        outcome
    }

    async fn hand_back(&mut self, disposition: Disposition) {
        if let (Some(pool), Some(slot)) = (self.pool.clone(), self.slot.take()) {
            let disposition = if self.broken {
                Disposition::Discard
            } else {
                disposition
            };
            pool.reclaim(slot, disposition).await;
        }
    }
}

impl<D: Driver> Drop for PooledConnection<D> {
    fn drop(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        match self.pool.take() {
            Some(pool) => {
                let disposition = if self.broken {
                    Disposition::Discard
                } else {
                    Disposition::Rollback
                };
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        trace!(id = slot.id, "Returning dropped connection");
                        handle.spawn(async move { pool.reclaim(slot, disposition).await });
                    }
                    Err(_) => pool.discard_detached(slot),
                }
            }
            None => {
                if let Some(conn) = slot.conn {
                    self.driver.force_close(conn);
                }
            }
        }
    }
}

impl<D: Driver> fmt::Debug for PooledConnection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("pool", &self.pool_name())
            .field("checked_out", &self.is_checked_out())
            .field("broken", &self.broken)
            .finish()
    }
}
