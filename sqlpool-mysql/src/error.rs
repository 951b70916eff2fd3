//! Classification of `mysql_async` errors.
//!
//! Server errors are sorted by their error code, so that bad SQL and
//! constraint violations leave the connection in the pool while lost
//! connections and server-side failures get it replaced.

use mysql_async::{DriverError as MyDriverError, Error as MyError, IoError};
use sqlpool_core::{DriverError, DriverErrorKind};

/// `CR_CONN_HOST_ERROR`: client could not reach the server.
pub const CR_CONN_HOST_ERROR: u16 = 2003;
/// `CR_SERVER_LOST`: connection dropped mid-query.
pub const CR_SERVER_LOST: u16 = 2013;

const PROGRAMMING: &[u16] = &[
    1007, // ER_DB_CREATE_EXISTS
    1064, // ER_PARSE_ERROR
    1102, // ER_WRONG_DB_NAME
    1103, // ER_WRONG_TABLE_NAME
    1110, // ER_FIELD_SPECIFIED_TWICE
    1111, // ER_INVALID_GROUP_FUNC_USE
    1112, // ER_UNSUPPORTED_EXTENSION
    1113, // ER_TABLE_MUST_HAVE_COLUMNS
    1146, // ER_NO_SUCH_TABLE
    1149, // ER_SYNTAX_ERROR
    1166, // ER_WRONG_COLUMN_NAME
    1179, // ER_CANT_DO_THIS_DURING_AN_TRANSACTION
];

const DATA: &[u16] = &[
    1171, // ER_PRIMARY_CANT_HAVE_NULL
    1230, // ER_NO_DEFAULT
    1263, // ER_WARN_NULL_TO_NOTNULL
    1264, // ER_WARN_DATA_OUT_OF_RANGE
    1265, // ER_WARN_DATA_TRUNCATED
    1366, // ER_TRUNCATED_WRONG_VALUE_FOR_FIELD
    1367, // ER_ILLEGAL_VALUE_FOR_TYPE
    1406, // ER_DATA_TOO_LONG
    1441, // ER_DATETIME_FUNCTION_OVERFLOW
];

const INTEGRITY: &[u16] = &[
    1048, // ER_BAD_NULL_ERROR
    1062, // ER_DUP_ENTRY
    1215, // ER_CANNOT_ADD_FOREIGN
    1216, // ER_NO_REFERENCED_ROW
    1217, // ER_ROW_IS_REFERENCED
    1451, // ER_ROW_IS_REFERENCED_2
    1452, // ER_NO_REFERENCED_ROW_2
    4025, // ER_CONSTRAINT_FAILED
];

const NOT_SUPPORTED: &[u16] = &[
    1196, // ER_WARNING_NOT_COMPLETE_ROLLBACK
    1235, // ER_NOT_SUPPORTED_YET
    1286, // ER_UNKNOWN_STORAGE_ENGINE
    1289, // ER_FEATURE_DISABLED
];

/// Map a server error code to a kind.
pub fn kind_for_code(code: u16) -> DriverErrorKind {
    if PROGRAMMING.contains(&code) {
        DriverErrorKind::Programming
    } else if DATA.contains(&code) {
        DriverErrorKind::Data
    } else if INTEGRITY.contains(&code) {
        DriverErrorKind::Integrity
    } else if NOT_SUPPORTED.contains(&code) {
        DriverErrorKind::NotSupported
    } else if code < 1000 {
        DriverErrorKind::Internal
    } else {
        DriverErrorKind::Operational
    }
}

/// Convert a `mysql_async` error into a classified [`DriverError`].
pub fn classify(err: MyError) -> DriverError {
    match err {
        MyError::Server(e) => DriverError::new(kind_for_code(e.code), e.message).with_code(e.code),
        MyError::Io(IoError::Io(e)) => DriverError::operational(e.to_string()).with_code(CR_SERVER_LOST),
        MyError::Io(e) => DriverError::operational(e.to_string()),
        MyError::Driver(e) => {
            let kind = if matches!(e, MyDriverError::StmtParamsMismatch { .. }) {
                DriverErrorKind::Programming
            } else {
                DriverErrorKind::Interface
            };
            DriverError::new(kind, e.to_string())
        }
        MyError::Url(e) => DriverError::new(DriverErrorKind::Interface, e.to_string()),
        MyError::Other(e) => DriverError::new(DriverErrorKind::Internal, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::ServerError;

    fn server(code: u16) -> MyError {
        MyError::Server(ServerError {
            code,
            message: format!("error {}", code),
            state: "HY000".to_string(),
        })
    }

    #[test]
    fn test_server_codes() {
        assert_eq!(classify(server(1064)).kind, DriverErrorKind::Programming);
        assert_eq!(classify(server(1146)).kind, DriverErrorKind::Programming);
        assert_eq!(classify(server(1062)).kind, DriverErrorKind::Integrity);
        assert_eq!(classify(server(1235)).kind, DriverErrorKind::NotSupported);
        assert_eq!(classify(server(1406)).kind, DriverErrorKind::Data);
        assert_eq!(classify(server(1213)).kind, DriverErrorKind::Operational);
        assert_eq!(classify(server(999)).kind, DriverErrorKind::Internal);
    }

    #[test]
    fn test_code_is_kept() {
        let err = classify(server(1062));
        assert_eq!(err.code, Some(1062));
        assert!(err.is_reusable());
        assert!(err.to_string().contains("1062"));
    }

    #[test]
    fn test_io_error_breaks_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = classify(MyError::Io(IoError::Io(io)));
        assert!(err.is_connection_broken());
        assert_eq!(err.code, Some(CR_SERVER_LOST));
    }

    #[test]
    fn test_closed_connection() {
        let err = classify(MyError::Driver(MyDriverError::ConnectionClosed));
        assert_eq!(err.kind, DriverErrorKind::Interface);
    }
}
