//! The database driver abstraction the pool is built on.
//!
//! A [`Driver`] knows how to open connections to one server with one set of
//! credentials, and how to run the primitive operations the pool and
//! [`PooledConnection`](crate::PooledConnection) need. Everything about the
//! wire protocol lives behind this trait.

use async_trait::async_trait;

use crate::error::DriverError;
use crate::registry::ConnectTarget;
use crate::value::{ExecResult, Row, Value};

/// A database driver.
///
/// Implementations must classify their errors through
/// [`DriverErrorKind`](crate::DriverErrorKind): the pool relies on
/// `Programming`, `Integrity` and `NotSupported` meaning "the connection is
/// still healthy", and on `Operational`/`Interface` meaning "the socket may be
/// gone".
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// The live connection type.
    type Connection: Send + 'static;

    /// Where this driver connects to; used to derive pool names.
    fn target(&self) -> ConnectTarget;

    /// Open a new connection.
    async fn connect(&self) -> Result<Self::Connection, DriverError>;

    /// Send a liveness probe.
    async fn ping(&self, conn: &mut Self::Connection) -> Result<(), DriverError>;

    /// Commit the current transaction.
    async fn commit(&self, conn: &mut Self::Connection) -> Result<(), DriverError>;

    /// Roll back the current transaction.
    async fn rollback(&self, conn: &mut Self::Connection) -> Result<(), DriverError>;

    /// Switch the session's autocommit mode.
    async fn set_autocommit(
        &self,
        conn: &mut Self::Connection,
        enabled: bool,
    ) -> Result<(), DriverError>;

    /// Gracefully terminate the connection.
    async fn close(&self, conn: Self::Connection) -> Result<(), DriverError>;

    /// Terminate the connection without talking to the server.
    fn force_close(&self, conn: Self::Connection) {
        drop(conn);
    }

    /// Run a statement that returns no rows.
    async fn execute(
        &self,
        conn: &mut Self::Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<ExecResult, DriverError>;

    /// Run a statement once per parameter set.
    async fn execute_many(
        &self,
        conn: &mut Self::Connection,
        sql: &str,
        batch: &[Vec<Value>],
    ) -> Result<ExecResult, DriverError> {
        let mut total = ExecResult::default();
        for params in batch {
            total = total.merge(self.execute(conn, sql, params).await?);
        }
        Ok(total)
    }

    /// Run a query and collect all rows.
    async fn fetch(
        &self,
        conn: &mut Self::Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, DriverError>;
}
