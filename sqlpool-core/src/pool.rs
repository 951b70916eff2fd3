//! The connection pool.
//!
//! The pool keeps up to `max_size` connections alive. Idle connections sit in
//! a FIFO queue guarded by a short-lived lock; the number of live connections
//! is an atomic counter, so no lock is held while a connection is opened,
//! closed or used.
//!
//! Acquisition order:
//!
//! 1. take an idle connection if there is one;
//! 2. if the pool is below `normal_size`, open a new connection;
//! 3. otherwise wait at most `timeout` for a connection to come back, then
//!    sleep `retry_interval` and start over, up to `retry_count` times;
//! 4. then open an overflow connection if below `max_size`;
//! 5. otherwise fail with [`PoolError::Exhausted`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlpool_core::{AcquireOptions, Pool, PoolConfig};
//!
//! let pool = Pool::new(driver, PoolConfig::new().normal_size(5).max_size(20)).await?;
//! let mut conn = pool.acquire(AcquireOptions::new().pre_ping(true)).await?;
//! conn.execute("UPDATE t SET n = n + 1", &[]).await?;
//! conn.release().await?;
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::config::{AcquireOptions, PoolConfig};
use crate::connection::{PooledConnection, Slot, open_connection};
use crate::driver::Driver;
use crate::error::{PoolError, PoolResult};

/// What to do with a connection coming back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Commit or roll back according to the pool's autocommit mode.
    Reset,
    /// Roll back any open transaction.
    Rollback,
    /// The caller already settled the transaction.
    Keep,
    /// Close it; the pool replaces it if below its normal size.
    Discard,
}

/// Snapshot of the pool's occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Pool name.
    pub name: String,
    /// Configured normal size.
    pub normal_size: usize,
    /// Configured maximum size.
    pub max_size: usize,
    /// Live connections, idle or in use.
    pub outstanding: usize,
    /// Idle connections.
    pub idle: usize,
    /// Connections currently checked out.
    pub in_use: usize,
}

/// Cumulative pool counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections opened.
    pub created: u64,
    /// Idle connections handed out again.
    pub reused: u64,
    /// Connections closed for exceeding their lifetime.
    pub expired: u64,
    /// Connections closed because they were broken, overflow, or did not fit
    /// in the idle queue.
    pub discarded: u64,
    /// Acquisitions that failed with [`PoolError::Exhausted`].
    pub exhausted: u64,
}

#[derive(Default)]
struct Counters {
    created: AtomicU64,
    reused: AtomicU64,
    expired: AtomicU64,
    discarded: AtomicU64,
    exhausted: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

struct PoolInner<D: Driver> {
    name: String,
    driver: Arc<D>,
    config: PoolConfig,
    idle: Mutex<VecDeque<Slot<D::Connection>>>,
    idle_notify: Notify,
    outstanding: AtomicUsize,
    closed: AtomicBool,
    counters: Counters,
}

/// A slot in the outstanding count, given back unless a connection was
/// actually opened for it.
struct Reservation<'a> {
    outstanding: &'a AtomicUsize,
    armed: bool,
}

impl Reservation<'_> {
    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// A pool of connections opened by a [`Driver`].
pub struct Pool<D: Driver> {
    inner: Arc<PoolInner<D>>,
}

impl<D: Driver> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Driver> Pool<D> {
    /// Create a pool, opening `config.pre_create` connections up front.
    ///
    /// Sizes are normalized first (see [`PoolConfig::normalized`]). An error
    /// while pre-creating closes what was opened and is returned.
    pub async fn new(driver: D, config: PoolConfig) -> PoolResult<Self> {
        let config = config.normalized();
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| driver.target().pool_name());

        let pool = Self {
            inner: Arc::new(PoolInner {
                name,
                driver: Arc::new(driver),
                idle: Mutex::new(VecDeque::with_capacity(config.max_size)),
                idle_notify: Notify::new(),
                outstanding: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                counters: Counters::default(),
                config,
            }),
        };

        let config = &pool.inner.config;
        info!(
            pool = %pool.inner.name,
            normal_size = config.normal_size,
            max_size = config.max_size,
            lifetime = ?config.lifetime,
            pre_create = config.pre_create,
            "Connection pool created"
        );

        for _ in 0..config.pre_create {
            let Some(reservation) = pool.try_reserve(config.max_size) else {
                break;
            };
            match pool.create(reservation).await {
                Ok(slot) => {
                    if let Err(slot) = pool.push_idle(slot) {
                        pool.destroy(slot, true).await;
                    }
                }
                Err(e) => {
                    pool.close().await;
                    return Err(e);
                }
            }
        }

        Ok(pool)
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Pool configuration, after normalization.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// The driver connections are opened with.
    pub fn driver(&self) -> &D {
        &self.inner.driver
    }

    pub(crate) fn driver_arc(&self) -> Arc<D> {
        Arc::clone(&self.inner.driver)
    }

    /// Number of idle connections.
    pub fn available_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Number of live connections, idle or in use.
    pub fn total_outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Occupancy snapshot.
    pub fn status(&self) -> PoolStatus {
        let idle = self.available_count();
        let outstanding = self.total_outstanding();
        PoolStatus {
            name: self.inner.name.clone(),
            normal_size: self.inner.config.normal_size,
            max_size: self.inner.config.max_size,
            outstanding,
            idle,
            in_use: outstanding.saturating_sub(idle),
        }
    }

    /// Cumulative counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.counters.snapshot()
    }

    /// Acquire a connection with the pool's default options.
    pub async fn get(&self) -> PoolResult<PooledConnection<D>> {
        self.acquire(self.inner.config.acquire).await
    }

    /// Acquire a connection.
    ///
    /// Driver errors while opening a connection are returned as is; they are
    /// not retried.
    pub async fn acquire(&self, options: AcquireOptions) -> PoolResult<PooledConnection<D>> {
        let config = &self.inner.config;
        let retries = options.effective_retries();
        let mut attempt = 0;

        loop {
            self.ensure_open()?;

            if let Some(slot) = self.pop_idle() {
                match self.checkout_idle(slot, options.pre_ping).await? {
                    Some(conn) => return Ok(conn),
                    None => continue,
                }
            }

            if let Some(reservation) = self.try_reserve(config.normal_size) {
                let slot = self.create(reservation).await?;
                return Ok(self.hand_out(slot));
            }

            if let Some(slot) = self.wait_idle(options.timeout).await {
                match self.checkout_idle(slot, options.pre_ping).await? {
                    Some(conn) => return Ok(conn),
                    None => continue,
                }
            }
            self.ensure_open()?;

            if attempt < retries {
                attempt += 1;
                debug!(pool = %self.inner.name, attempt, "Retrying to get connection");
                tokio::time::sleep(options.retry_interval).await;
                continue;
            }

            if let Some(reservation) = self.try_reserve(config.max_size) {
                debug!(pool = %self.inner.name, "Opening overflow connection");
                let slot = self.create(reservation).await?;
                return Ok(self.hand_out(slot));
            }

            Counters::bump(&self.inner.counters.exhausted);
            let waited = options.wait_budget();
            warn!(
                pool = %self.inner.name,
                outstanding = self.total_outstanding(),
                waited = ?waited,
                "Connection pool exhausted"
            );
            return Err(PoolError::Exhausted {
                pool: self.inner.name.clone(),
                waited,
            });
        }
    }

    /// Acquire a connection, run `f` with it, and finish the scope with
    /// [`PooledConnection::exit`]: commit on success, roll back and return on
    /// reusable errors, close and replace on anything else.
    ///
    /// ```rust,ignore
    /// let rows = pool
    ///     .with_connection(AcquireOptions::default(), |conn| {
    ///         Box::pin(async move { conn.fetch_all("SELECT 1", &[]).await })
    ///     })
    ///     .await?;
    /// ```
    pub async fn with_connection<T, F>(&self, options: AcquireOptions, f: F) -> PoolResult<T>
    where
        F: for<'c> FnOnce(&'c mut PooledConnection<D>) -> BoxFuture<'c, PoolResult<T>>,
    {
        let mut conn = self.acquire(options).await?;
        let outcome = f(&mut conn).await;
        conn.exit(outcome).await
    }

    /// Shut the pool down.
    ///
    /// Idle connections are closed now; connections still checked out are
    /// closed when they come back. Later acquisitions fail with
    /// [`PoolError::Closed`].
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.idle_notify.notify_waiters();

        let drained: Vec<_> = self.inner.idle.lock().drain(..).collect();
        let count = drained.len();
        for slot in drained {
            self.destroy(slot, true).await;
        }
        info!(pool = %self.inner.name, closed = count, "Connection pool closed");
    }

    fn ensure_open(&self) -> PoolResult<()> {
        if self.is_closed() {
            Err(self.closed_error())
        } else {
            Ok(())
        }
    }

    fn closed_error(&self) -> PoolError {
        PoolError::Closed {
            pool: self.inner.name.clone(),
        }
    }

    fn try_reserve(&self, limit: usize) -> Option<Reservation<'_>> {
        let outstanding = &self.inner.outstanding;
        let mut current = outstanding.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return None;
            }
            match outstanding.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(Reservation {
                        outstanding,
                        armed: true,
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Open a connection for a reserved slot. Fails with
    /// [`PoolError::Closed`] if the pool is closed before or while connecting.
    async fn create(&self, reservation: Reservation<'_>) -> PoolResult<Slot<D::Connection>> {
        self.ensure_open()?;
        let autocommit = self.inner.config.autocommit;
        let conn = open_connection(&*self.inner.driver, Some(autocommit)).await?;
        if self.is_closed() {
            if let Err(e) = self.inner.driver.close(conn).await {
                debug!(pool = %self.inner.name, error = %e, "Error while closing connection");
            }
            return Err(self.closed_error());
        }
        reservation.commit();

        let slot = Slot::new(conn, autocommit);
        Counters::bump(&self.inner.counters.created);
        debug!(
            pool = %self.inner.name,
            id = slot.id,
            outstanding = self.total_outstanding(),
            "Created new connection"
        );
        Ok(slot)
    }

    /// Close a connection and drop it from the outstanding count.
    async fn destroy(&self, slot: Slot<D::Connection>, graceful: bool) {
        self.inner.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.close_slot(slot, graceful).await;
    }

    /// Take one connection off the outstanding count, but only while the pool
    /// is above its normal size.
    fn try_shrink(&self) -> bool {
        let normal = self.inner.config.normal_size;
        self.inner
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current > normal).then(|| current - 1)
            })
            .is_ok()
    }

    /// Close the socket; the caller has already adjusted the count.
    async fn close_slot(&self, mut slot: Slot<D::Connection>, graceful: bool) {
        let Some(conn) = slot.conn.take() else {
            return;
        };
        if graceful {
            if let Err(e) = self.inner.driver.close(conn).await {
                debug!(pool = %self.inner.name, id = slot.id, error = %e, "Error while closing connection");
            }
        } else {
            self.inner.driver.force_close(conn);
        }
        trace!(pool = %self.inner.name, id = slot.id, "Connection closed");
    }

    /// Synchronous fallback used when a handle is dropped outside a runtime.
    pub(crate) fn discard_detached(&self, mut slot: Slot<D::Connection>) {
        self.inner.outstanding.fetch_sub(1, Ordering::AcqRel);
        Counters::bump(&self.inner.counters.discarded);
        if let Some(conn) = slot.conn.take() {
            self.inner.driver.force_close(conn);
        }
    }

    fn push_idle(&self, slot: Slot<D::Connection>) -> Result<(), Slot<D::Connection>> {
        {
            let mut idle = self.inner.idle.lock();
            if idle.len() >= self.inner.config.max_size {
                return Err(slot);
            }
            idle.push_back(slot);
        }
        self.inner.idle_notify.notify_one();
        Ok(())
    }

    fn pop_idle(&self) -> Option<Slot<D::Connection>> {
        self.inner.idle.lock().pop_front()
    }

    /// Wait up to `timeout` for a connection to be returned. Gives up early
    /// when the pool is closed.
    async fn wait_idle(&self, timeout: Duration) -> Option<Slot<D::Connection>> {
        if timeout.is_zero() {
            return None;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.inner.idle_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_closed() {
                return None;
            }
            if let Some(slot) = self.pop_idle() {
                return Some(slot);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.pop_idle();
            }
        }
    }

    fn hand_out(&self, slot: Slot<D::Connection>) -> PooledConnection<D> {
        debug!(pool = %self.inner.name, id = slot.id, "Get connection from pool");
        PooledConnection::checked_out(self.clone(), slot)
    }

    /// Turn a dequeued idle connection into a handle.
    ///
    /// Returns `None` when the connection had expired and no replacement
    /// could be reserved, so the caller should try again.
    async fn checkout_idle(
        &self,
        slot: Slot<D::Connection>,
        pre_ping: bool,
    ) -> PoolResult<Option<PooledConnection<D>>> {
        let config = &self.inner.config;
        if slot.is_expired(config.lifetime) {
            debug!(pool = %self.inner.name, id = slot.id, "Close connection due to lifetime reached");
            Counters::bump(&self.inner.counters.expired);
            self.destroy(slot, true).await;
            return match self.try_reserve(config.max_size) {
                Some(reservation) => {
                    let slot = self.create(reservation).await?;
                    Ok(Some(self.hand_out(slot)))
                }
                None => Ok(None),
            };
        }

        Counters::bump(&self.inner.counters.reused);
        let mut conn = self.hand_out(slot);
        if pre_ping {
            if let Err(e) = conn.ping(true).await {
                debug!(pool = %self.inner.name, id = conn.id(), error = %e, "Pre-ping failed");
                if let Err(close_err) = conn.force_close().await {
                    debug!(pool = %self.inner.name, id = conn.id(), error = %close_err, "Error while closing connection");
                }
                return Err(e);
            }
        }
        Ok(Some(conn))
    }

    /// Open one connection into the idle queue if below the normal size.
    async fn replenish(&self) {
        let Some(reservation) = self.try_reserve(self.inner.config.normal_size) else {
            return;
        };
        match self.create(reservation).await {
            Ok(slot) => {
                if let Err(slot) = self.push_idle(slot) {
                    self.destroy(slot, true).await;
                }
            }
            Err(e) => {
                warn!(pool = %self.inner.name, error = %e, "Failed to create replacement connection");
            }
        }
    }

    async fn reset(&self, slot: &mut Slot<D::Connection>, disposition: Disposition) -> PoolResult<()> {
        let driver = &*self.inner.driver;
        let autocommit = self.inner.config.autocommit;
        let Some(conn) = slot.conn.as_mut() else {
            return Err(PoolError::ConnectionClosed);
        };

        match disposition {
            Disposition::Reset if slot.autocommit => driver.commit(conn).await?,
            Disposition::Reset | Disposition::Rollback => driver.rollback(conn).await?,
            Disposition::Keep | Disposition::Discard => {}
        }
        if slot.autocommit != autocommit {
            driver.set_autocommit(conn, autocommit).await?;
            slot.autocommit = autocommit;
        }
        Ok(())
    }

    /// Take back a connection from a handle.
    ///
    /// Never fails: anything that goes wrong ends with the connection closed
    /// and the outstanding count adjusted.
    pub(crate) async fn reclaim(&self, mut slot: Slot<D::Connection>, disposition: Disposition) {
        let inner = &self.inner;

        if self.is_closed() {
            self.destroy(slot, true).await;
            return;
        }

        if disposition == Disposition::Discard || slot.conn.is_none() {
            debug!(pool = %inner.name, id = slot.id, "Discarding non-reusable connection");
            Counters::bump(&inner.counters.discarded);
            self.destroy(slot, false).await;
            self.replenish().await;
            return;
        }

        if slot.is_expired(inner.config.lifetime) {
            debug!(pool = %inner.name, id = slot.id, "Close connection due to lifetime reached");
            Counters::bump(&inner.counters.expired);
            self.destroy(slot, true).await;
            self.replenish().await;
            return;
        }

        if inner.config.shrink_overflow && self.try_shrink() {
            debug!(pool = %inner.name, id = slot.id, "Closing overflow connection");
            Counters::bump(&inner.counters.discarded);
            self.close_slot(slot, true).await;
            return;
        }

        if let Err(e) = self.reset(&mut slot, disposition).await {
            warn!(pool = %inner.name, id = slot.id, error = %e, "Failed to reset returned connection");
            Counters::bump(&inner.counters.discarded);
            self.destroy(slot, false).await;
            self.replenish().await;
            return;
        }

        let id = slot.id;
        match self.push_idle(slot) {
            Ok(()) => debug!(pool = %inner.name, id, "Put connection back to pool"),
            Err(slot) => {
                warn!(
                    pool = %inner.name,
                    id,
                    max_size = inner.config.max_size,
                    "Idle queue full, closing returned connection"
                );
                Counters::bump(&inner.counters.discarded);
                self.destroy(slot, true).await;
            }
        }
    }
}

impl<D: Driver> std::fmt::Debug for Pool<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("status", &self.status()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    fn config(normal: usize, max: usize) -> PoolConfig {
        PoolConfig::new()
            .normal_size(normal)
            .max_size(max)
            .name("test")
            .no_lifetime()
    }

    #[tokio::test]
    async fn test_new_pool_is_lazy() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(2, 4)).await.unwrap();
        assert_eq!(pool.total_outstanding(), 0);
        assert_eq!(pool.available_count(), 0);
        assert_eq!(driver.connects(), 0);
    }

    #[tokio::test]
    async fn test_pre_create() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(2, 4).pre_create(3)).await.unwrap();
        assert_eq!(pool.total_outstanding(), 3);
        assert_eq!(pool.available_count(), 3);
    }

    #[tokio::test]
    async fn test_pre_create_failure_propagates() {
        let driver = MockDriver::new();
        driver.fail_connects(true);
        let result = Pool::new(driver.clone(), config(2, 4).pre_create(2)).await;
        assert!(matches!(result, Err(PoolError::Driver(_))));
    }

    #[tokio::test]
    async fn test_name_from_target() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver, PoolConfig::new()).await.unwrap();
        assert_eq!(pool.name(), "localhost-3306-mock-test");
    }

    #[tokio::test]
    async fn test_reservation_released_on_connect_failure() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(2, 2)).await.unwrap();
        driver.fail_connects(true);
        assert!(pool.acquire(AcquireOptions::immediate()).await.is_err());
        assert_eq!(pool.total_outstanding(), 0);
    }

    #[tokio::test]
    async fn test_release_requeues() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(2, 2)).await.unwrap();
        let mut conn = pool.acquire(AcquireOptions::immediate()).await.unwrap();
        conn.release().await.unwrap();
        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.total_outstanding(), 1);
        // autocommit on: returned connections are committed
        assert_eq!(driver.commits(), 1);
    }

    #[tokio::test]
    async fn test_autocommit_off_rolls_back_on_release() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(1, 1).autocommit(false))
            .await
            .unwrap();
        let mut conn = pool.acquire(AcquireOptions::immediate()).await.unwrap();
        conn.release().await.unwrap();
        assert_eq!(driver.rollbacks(), 1);
        assert_eq!(driver.commits(), 0);
    }

    #[tokio::test]
    async fn test_autocommit_restored_on_release() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(1, 1)).await.unwrap();
        let mut conn = pool.acquire(AcquireOptions::immediate()).await.unwrap();
        conn.set_autocommit(false).await.unwrap();
        conn.release().await.unwrap();

        let mut conn = pool.acquire(AcquireOptions::immediate()).await.unwrap();
        assert!(conn.inner_mut().unwrap().autocommit());
        conn.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_full_idle_queue_discards() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(1, 1).shrink_overflow(false))
            .await
            .unwrap();
        let mut conn = pool.acquire(AcquireOptions::immediate()).await.unwrap();
        let slot = Slot::new(driver.connect().await.unwrap(), true);
        pool.inner.outstanding.fetch_add(1, Ordering::AcqRel);

        // Fill the queue behind the pool's back, then return the handle.
        pool.push_idle(slot).ok().unwrap();
        conn.release().await.unwrap();

        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.total_outstanding(), 1);
        assert_eq!(pool.stats().discarded, 1);
    }

    #[tokio::test]
    async fn test_try_shrink_stops_at_normal_size() {
        let pool = Pool::new(MockDriver::new(), config(1, 3)).await.unwrap();
        pool.inner.outstanding.store(2, Ordering::Release);

        assert!(pool.try_shrink());
        assert_eq!(pool.total_outstanding(), 1);
        assert!(!pool.try_shrink());
        assert_eq!(pool.total_outstanding(), 1);
        pool.inner.outstanding.store(0, Ordering::Release);
    }

    #[tokio::test]
    async fn test_create_on_closed_pool_gives_slot_back() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(2, 2)).await.unwrap();
        pool.close().await;

        let reservation = pool.try_reserve(2).unwrap();
        assert!(matches!(pool.create(reservation).await, Err(PoolError::Closed { .. })));
        assert_eq!(pool.total_outstanding(), 0);
        assert_eq!(driver.connects(), 0);
    }

    #[tokio::test]
    async fn test_close_drains_idle() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), config(2, 2).pre_create(2)).await.unwrap();
        let mut conn = pool.acquire(AcquireOptions::immediate()).await.unwrap();

        pool.close().await;
        assert_eq!(pool.available_count(), 0);
        assert_eq!(pool.total_outstanding(), 1);
        assert!(matches!(
            pool.acquire(AcquireOptions::immediate()).await,
            Err(PoolError::Closed { .. })
        ));

        conn.release().await.unwrap();
        assert_eq!(pool.total_outstanding(), 0);
        assert_eq!(driver.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_status() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver, config(2, 3).pre_create(2)).await.unwrap();
        let conn = pool.acquire(AcquireOptions::immediate()).await.unwrap();
        let status = pool.status();
        assert_eq!(status.outstanding, 2);
        assert_eq!(status.idle, 1);
        assert_eq!(status.in_use, 1);
        assert_eq!(status.name, "test");
        drop(conn);
    }
}
