//! [`Driver`] implementation over `mysql_async`.

use std::sync::Arc;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, Params};
use sqlpool_core::{ConnectTarget, Driver, DriverError, ExecResult, Row, Value};
use tracing::{debug, trace};

use crate::config::MysqlConfig;
use crate::error::{CR_CONN_HOST_ERROR, classify};
use crate::types::{from_mysql, to_mysql};

/// Opens `mysql_async` connections for a [`Pool`](sqlpool_core::Pool).
#[derive(Debug, Clone)]
pub struct MysqlDriver {
    config: MysqlConfig,
    opts: Opts,
}

impl MysqlDriver {
    /// Create a driver for the given settings.
    pub fn new(config: MysqlConfig) -> Self {
        let opts = config.to_opts();
        Self { config, opts }
    }

    /// The settings this driver connects with.
    pub fn config(&self) -> &MysqlConfig {
        &self.config
    }
}

fn params(values: &[Value]) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.iter().map(to_mysql).collect())
    }
}

fn convert_row(mut row: mysql_async::Row, columns: &Arc<[String]>) -> Row {
    let values = (0..row.len())
        .map(|i| {
            row.take::<mysql_async::Value, usize>(i)
                .map(from_mysql)
                .unwrap_or(Value::Null)
        })
        .collect();
    Row::new(Arc::clone(columns), values)
}

#[async_trait]
impl Driver for MysqlDriver {
    type Connection = Conn;

    fn target(&self) -> ConnectTarget {
        self.config.target()
    }

    async fn connect(&self) -> Result<Conn, DriverError> {
        debug!(host = %self.config.host, port = self.config.port, "Connecting to MySQL");
        let connecting = Conn::new(self.opts.clone());
        let conn = match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connecting).await.map_err(|_| {
                DriverError::operational(format!(
                    "Can't connect to MySQL server on '{}' (timed out after {:?})",
                    self.config.host, limit
                ))
                .with_code(CR_CONN_HOST_ERROR)
            })?,
            None => connecting.await,
        };
        conn.map_err(classify)
    }

    async fn ping(&self, conn: &mut Conn) -> Result<(), DriverError> {
        conn.ping().await.map_err(classify)
    }

    async fn commit(&self, conn: &mut Conn) -> Result<(), DriverError> {
        conn.query_drop("COMMIT").await.map_err(classify)
    }

    async fn rollback(&self, conn: &mut Conn) -> Result<(), DriverError> {
        conn.query_drop("ROLLBACK").await.map_err(classify)
    }

    async fn set_autocommit(&self, conn: &mut Conn, enabled: bool) -> Result<(), DriverError> {
        let sql = if enabled {
            "SET autocommit=1"
        } else {
            "SET autocommit=0"
        };
        conn.query_drop(sql).await.map_err(classify)
    }

    async fn close(&self, conn: Conn) -> Result<(), DriverError> {
        conn.disconnect().await.map_err(classify)
    }

    async fn execute(
        &self,
        conn: &mut Conn,
        sql: &str,
        values: &[Value],
    ) -> Result<ExecResult, DriverError> {
        trace!(sql = %sql, params = values.len(), "exec");
        if values.is_empty() {
            conn.query_drop(sql).await.map_err(classify)?;
        } else {
            conn.exec_drop(sql, params(values)).await.map_err(classify)?;
        }
        Ok(ExecResult {
            rows_affected: conn.affected_rows(),
            last_insert_id: conn.last_insert_id(),
        })
    }

    async fn fetch(
        &self,
        conn: &mut Conn,
        sql: &str,
        values: &[Value],
    ) -> Result<Vec<Row>, DriverError> {
        trace!(sql = %sql, params = values.len(), "fetch");
        // binary protocol, so numeric columns come back typed
        let rows: Vec<mysql_async::Row> = conn.exec(sql, params(values)).await.map_err(classify)?;

        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first
            .columns_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();
        Ok(rows.into_iter().map(|r| convert_row(r, &columns)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params() {
        assert!(matches!(params(&[]), Params::Empty));
        match params(&[Value::Int(1), Value::Null]) {
            Params::Positional(values) => assert_eq!(values.len(), 2),
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_target_from_config() {
        let driver = MysqlDriver::new(MysqlConfig::new("shop").username("app"));
        assert_eq!(driver.target().pool_name(), "localhost-3306-app-shop");
    }
}
