//! In-memory driver for tests.
//!
//! [`MockDriver`] hands out [`MockConnection`]s that answer every query
//! without a server. Tests can sever sockets, make connects fail, or queue
//! errors for the next statement, and read back counters of what the pool did.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::driver::Driver;
use crate::error::DriverError;
use crate::registry::ConnectTarget;
use crate::value::{ExecResult, Row, Value};

#[derive(Default)]
struct MockState {
    connects: AtomicUsize,
    closes: AtomicUsize,
    force_closes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    pings: AtomicUsize,
    open: AtomicUsize,
    next_serial: AtomicUsize,
    fail_connects: AtomicBool,
    sockets: Mutex<HashMap<usize, Arc<AtomicBool>>>,
    scripted: Mutex<VecDeque<DriverError>>,
}

/// A driver that never touches the network.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
    target: Option<ConnectTarget>,
}

/// A connection opened by [`MockDriver`].
pub struct MockConnection {
    serial: usize,
    severed: Arc<AtomicBool>,
    autocommit: bool,
    state: Arc<MockState>,
}

impl MockConnection {
    /// Driver-level serial number; a reconnect yields a new serial.
    pub fn serial(&self) -> usize {
        self.serial
    }

    /// Current autocommit mode of the session.
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn check_alive(&self) -> Result<(), DriverError> {
        if self.severed.load(Ordering::Acquire) {
            Err(DriverError::operational("Lost connection to MySQL server during query").with_code(2013))
        } else {
            Ok(())
        }
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.state.open.fetch_sub(1, Ordering::AcqRel);
        self.state.sockets.lock().remove(&self.serial);
    }
}

impl MockDriver {
    /// Create a driver targeting `localhost:3306` as user `mock`, database `test`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different connect target.
    pub fn with_target(mut self, target: ConnectTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Make every subsequent connect fail (or succeed again).
    pub fn fail_connects(&self, fail: bool) {
        self.state.fail_connects.store(fail, Ordering::Release);
    }

    /// Make the next statement or query fail with `err`.
    pub fn fail_next(&self, err: DriverError) {
        self.state.scripted.lock().push_back(err);
    }

    /// Cut the socket of one connection, by serial.
    pub fn sever(&self, serial: usize) {
        if let Some(flag) = self.state.sockets.lock().get(&serial) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Cut every open socket.
    pub fn sever_all(&self) {
        for flag in self.state.sockets.lock().values() {
            flag.store(true, Ordering::Release);
        }
    }

    /// Successful connects so far.
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::Acquire)
    }

    /// Graceful closes so far.
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::Acquire)
    }

    /// Forced closes so far.
    pub fn force_closes(&self) -> usize {
        self.state.force_closes.load(Ordering::Acquire)
    }

    /// Commits so far.
    pub fn commits(&self) -> usize {
        self.state.commits.load(Ordering::Acquire)
    }

    /// Rollbacks so far.
    pub fn rollbacks(&self) -> usize {
        self.state.rollbacks.load(Ordering::Acquire)
    }

    /// Pings so far, successful or not.
    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::Acquire)
    }

    /// Connections currently alive.
    pub fn open_connections(&self) -> usize {
        self.state.open.load(Ordering::Acquire)
    }

    fn scripted_error(&self) -> Result<(), DriverError> {
        match self.state.scripted.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Connection = MockConnection;

    fn target(&self) -> ConnectTarget {
        self.target.clone().unwrap_or_else(|| ConnectTarget {
            user: "mock".to_string(),
            database: "test".to_string(),
            ..ConnectTarget::default()
        })
    }

    async fn connect(&self) -> Result<MockConnection, DriverError> {
        if self.state.fail_connects.load(Ordering::Acquire) {
            return Err(DriverError::operational("Can't connect to MySQL server").with_code(2003));
        }
        let serial = self.state.next_serial.fetch_add(1, Ordering::AcqRel) + 1;
        let severed = Arc::new(AtomicBool::new(false));
        self.state.sockets.lock().insert(serial, Arc::clone(&severed));
        self.state.connects.fetch_add(1, Ordering::AcqRel);
        self.state.open.fetch_add(1, Ordering::AcqRel);
        Ok(MockConnection {
            serial,
            severed,
            autocommit: true,
            state: Arc::clone(&self.state),
        })
    }

    async fn ping(&self, conn: &mut MockConnection) -> Result<(), DriverError> {
        self.state.pings.fetch_add(1, Ordering::AcqRel);
        conn.check_alive()
    }

    async fn commit(&self, conn: &mut MockConnection) -> Result<(), DriverError> {
        conn.check_alive()?;
        self.state.commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn rollback(&self, conn: &mut MockConnection) -> Result<(), DriverError> {
        conn.check_alive()?;
        self.state.rollbacks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn set_autocommit(&self, conn: &mut MockConnection, enabled: bool) -> Result<(), DriverError> {
        conn.check_alive()?;
        conn.autocommit = enabled;
        Ok(())
    }

    async fn close(&self, conn: MockConnection) -> Result<(), DriverError> {
        self.state.closes.fetch_add(1, Ordering::AcqRel);
        conn.check_alive()
    }

    fn force_close(&self, conn: MockConnection) {
        self.state.force_closes.fetch_add(1, Ordering::AcqRel);
        drop(conn);
    }

    async fn execute(
        &self,
        conn: &mut MockConnection,
        _sql: &str,
        _params: &[Value],
    ) -> Result<ExecResult, DriverError> {
        conn.check_alive()?;
        self.scripted_error()?;
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: Some(conn.serial as u64),
        })
    }

    /// Answers with one row: the connection serial, the SQL text and the
    /// parameters as `p0`, `p1`, ...
    async fn fetch(
        &self,
        conn: &mut MockConnection,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, DriverError> {
        conn.check_alive()?;
        self.scripted_error()?;

        let mut columns = vec!["connection".to_string(), "sql".to_string()];
        columns.extend((0..params.len()).map(|i| format!("p{}", i)));
        let mut values = vec![Value::UInt(conn.serial as u64), Value::from(sql)];
        values.extend(params.iter().cloned());
        Ok(vec![Row::new(columns.into(), values)])
    }
}
