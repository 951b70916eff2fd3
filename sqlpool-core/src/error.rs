//! Error types for pool and driver operations.
//!
//! Two layers of errors exist:
//!
//! - [`DriverError`] is what a [`Driver`](crate::Driver) reports. It carries a
//!   [`DriverErrorKind`] so the pool can decide whether the connection that
//!   produced it is still safe to reuse.
//! - [`PoolError`] is what callers of the pool see.
//!
//! ```rust
//! use sqlpool_core::{DriverError, DriverErrorKind, PoolError};
//!
//! let err = DriverError::new(DriverErrorKind::Programming, "syntax error near 'SELEC'");
//! assert!(err.is_reusable());
//!
//! let err: PoolError = err.into();
//! assert!(err.is_reusable());
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Classification of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    /// Bad SQL, unknown table or column, wrong argument count.
    Programming,
    /// Constraint violation (duplicate key, foreign key, not null).
    Integrity,
    /// The server does not support the requested operation.
    NotSupported,
    /// A value was out of range or did not fit its column.
    Data,
    /// I/O or server-side failure; the connection may be unusable.
    Operational,
    /// The client side of the connection is closed or in a bad state.
    Interface,
    /// Anything the driver could not classify.
    Internal,
}

impl DriverErrorKind {
    /// Whether a connection that produced this kind of error can be returned
    /// to the pool as is.
    pub fn is_reusable(self) -> bool {
        matches!(self, Self::Programming | Self::Integrity | Self::NotSupported)
    }

    /// Whether this kind of error means the socket is likely dead.
    pub fn is_connection_broken(self) -> bool {
        matches!(self, Self::Operational | Self::Interface)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Programming => "programming",
            Self::Integrity => "integrity",
            Self::NotSupported => "not supported",
            Self::Data => "data",
            Self::Operational => "operational",
            Self::Interface => "interface",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error reported by a database driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error{}: {message}", code_suffix(.code))]
pub struct DriverError {
    /// Classification used for reuse decisions.
    pub kind: DriverErrorKind,
    /// Server error code, if the server sent one.
    pub code: Option<u16>,
    /// Human readable message.
    pub message: String,
}

impl DriverError {
    /// Create a new driver error.
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    /// Attach a server error code.
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Create an operational error.
    pub fn operational(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Operational, message)
    }

    /// Create an interface error.
    pub fn interface(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Interface, message)
    }

    /// Create a programming error.
    pub fn programming(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Programming, message)
    }

    /// See [`DriverErrorKind::is_reusable`].
    pub fn is_reusable(&self) -> bool {
        self.kind.is_reusable()
    }

    /// See [`DriverErrorKind::is_connection_broken`].
    pub fn is_connection_broken(&self) -> bool {
        self.kind.is_connection_broken()
    }
}

fn code_suffix(code: &Option<u16>) -> String {
    code.map(|c| format!(" ({})", c)).unwrap_or_default()
}

/// Errors surfaced by the pool and by pooled connections.
#[derive(Error, Debug)]
pub enum PoolError {
    /// No connection could be handed out after exhausting retries with the
    /// pool at its maximum size.
    #[error("can't get connection from pool({pool}) within {waited:?}: pool exhausted")]
    Exhausted {
        /// Name of the pool.
        pool: String,
        /// Total wait budget that was attempted.
        waited: Duration,
    },

    /// The connection was already handed back to its pool.
    #[error("connection has already been returned to the pool({pool})")]
    AlreadyReturned {
        /// Name of the pool.
        pool: String,
    },

    /// The connection's socket failed during a ping or a query.
    #[error("connection broken: {0}")]
    ConnectionBroken(DriverError),

    /// The connection is closed and may not be reconnected.
    #[error("connection already closed")]
    ConnectionClosed,

    /// The pool has been shut down.
    #[error("pool({pool}) is closed")]
    Closed {
        /// Name of the pool.
        pool: String,
    },

    /// Driver error that left the connection usable.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error raised by caller code inside a scoped block.
    #[error("{0}")]
    Application(Box<dyn std::error::Error + Send + Sync>),
}

impl PoolError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap an arbitrary caller error.
    pub fn application(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Application(err.into())
    }

    /// Classify a driver error observed on a live connection.
    pub(crate) fn from_driver(err: DriverError) -> Self {
        if err.is_connection_broken() {
            Self::ConnectionBroken(err)
        } else {
            Self::Driver(err)
        }
    }

    /// Whether the connection involved may go back to the pool untouched.
    pub fn is_reusable(&self) -> bool {
        match self {
            Self::Driver(e) => e.is_reusable(),
            _ => false,
        }
    }

    /// Check if this is an exhaustion error.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if this is a double-return error.
    pub fn is_already_returned(&self) -> bool {
        matches!(self, Self::AlreadyReturned { .. })
    }

    /// Check if this is a broken connection error.
    pub fn is_connection_broken(&self) -> bool {
        matches!(self, Self::ConnectionBroken(_))
    }

    /// The underlying driver error, if any.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Driver(e) | Self::ConnectionBroken(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reusable_kinds() {
        assert!(DriverErrorKind::Programming.is_reusable());
        assert!(DriverErrorKind::Integrity.is_reusable());
        assert!(DriverErrorKind::NotSupported.is_reusable());
        assert!(!DriverErrorKind::Operational.is_reusable());
        assert!(!DriverErrorKind::Internal.is_reusable());
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::new(DriverErrorKind::Integrity, "Duplicate entry '1'").with_code(1062);
        assert_eq!(err.to_string(), "integrity error (1062): Duplicate entry '1'");

        let err = DriverError::operational("broken pipe");
        assert_eq!(err.to_string(), "operational error: broken pipe");
    }

    #[test]
    fn test_from_driver_classifies_broken() {
        let err = PoolError::from_driver(DriverError::interface("socket closed"));
        assert!(err.is_connection_broken());
        assert!(!err.is_reusable());

        let err = PoolError::from_driver(DriverError::programming("bad sql"));
        assert!(matches!(err, PoolError::Driver(_)));
        assert!(err.is_reusable());
    }

    #[test]
    fn test_exhausted_message() {
        let err = PoolError::Exhausted {
            pool: "localhost-3306-root-test".to_string(),
            waited: Duration::from_millis(300),
        };
        assert!(err.is_exhausted());
        assert!(err.to_string().contains("localhost-3306-root-test"));
        assert!(err.to_string().contains("300ms"));
    }

    #[test]
    fn test_application_error_not_reusable() {
        let err = PoolError::application("user code failed");
        assert!(!err.is_reusable());
        assert!(err.driver_error().is_none());
    }
}
