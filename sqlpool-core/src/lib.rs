//! # sqlpool-core
//!
//! A bounded, async pool of SQL connections.
//!
//! The pool is generic over a [`Driver`], which knows how to open, probe and
//! close connections and how to run statements. It provides:
//!
//! - a steady-state `normal_size` and a hard `max_size`, with overflow
//!   connections opened only after the configured retries are used up
//! - FIFO reuse of idle connections, with an optional bounded wait
//! - lazy lifetime expiry, checked when connections are returned and handed out
//! - optional pre-ping with in-place reconnect
//! - transaction-aware scope exit: commit on success, roll back and keep the
//!   connection on harmless errors, replace it on anything else
//! - a registry of named pools for applications talking to several servers
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use sqlpool_core::{AcquireOptions, Pool, PoolConfig, params};
//!
//! let pool = Pool::new(driver, PoolConfig::new().normal_size(5).max_size(20)).await?;
//!
//! let rows = pool
//!     .with_connection(AcquireOptions::default(), |conn| {
//!         Box::pin(async move {
//!             conn.execute("INSERT INTO t (name) VALUES (?)", &params!["a"]).await?;
//!             conn.fetch_all("SELECT * FROM t", &[]).await
//!         })
//!     })
//!     .await?;
//! ```
//!
//! ## Testing
//!
//! With the `mock` feature, [`testing::MockDriver`] provides an in-memory
//! driver that counts what the pool does and can simulate network failures.

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod logging;
pub mod pool;
pub mod registry;
pub mod value;

#[cfg(any(test, feature = "mock"))]
pub mod testing;

pub use config::{AcquireOptions, MAX_POOL_SIZE, MAX_RETRIES, PoolConfig};
pub use connection::PooledConnection;
pub use driver::Driver;
pub use error::{DriverError, DriverErrorKind, PoolError, PoolResult};
pub use pool::{Pool, PoolStats, PoolStatus};
pub use registry::{ConnectTarget, PoolRegistry};
pub use value::{ExecResult, Row, RowShape, Value};

/// Re-exports for glob import.
pub mod prelude {
    pub use crate::config::{AcquireOptions, PoolConfig};
    pub use crate::connection::PooledConnection;
    pub use crate::driver::Driver;
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::Pool;
    pub use crate::value::{Row, RowShape, Value};
}
