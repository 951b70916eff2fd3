//! `sqlpool status` command - Connect through a pool and report on it.

use sqlpool_core::{Driver, Pool, PoolStatus};
use sqlpool_mysql::{MysqlConfig, MysqlDriver};

use crate::cli::StatusArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the status command
pub async fn run(args: StatusArgs, config: Config) -> CliResult<()> {
    let url = config.database_url(args.url.clone())?;
    let driver = MysqlDriver::new(MysqlConfig::from_url(&url)?);
    let pool = Pool::new(driver, config.pool_config(None).pre_create(0)).await?;

    output::header("Pool Status");
    let result = probe(&pool, args.ping).await;
    pool.close().await;
    let status = result?;

    output::pool_status(&status);
    output::pool_stats(&pool.stats());
    output::newline();
    success("Connected");
    Ok(())
}

/// Check one connection out (pinging it if asked), return it, and take a
/// snapshot.
pub async fn probe<D: Driver>(pool: &Pool<D>, ping: bool) -> CliResult<PoolStatus> {
    let mut conn = pool.get().await?;
    if ping {
        conn.ping(true).await?;
    }
    conn.release().await?;
    Ok(pool.status())
}
