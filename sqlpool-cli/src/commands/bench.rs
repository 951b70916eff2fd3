//! `sqlpool bench` command - Compare connection strategies.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlpool_core::{Driver, Pool, PoolResult, PooledConnection};
use sqlpool_mysql::{MysqlConfig, MysqlDriver};
use tokio::task::JoinSet;

use crate::cli::{BenchArgs, BenchMode};
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv, success};

/// Outcome of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    /// Strategy measured.
    pub mode: BenchMode,
    /// Queries run.
    pub count: u64,
    /// Wall-clock time for all queries.
    pub elapsed: Duration,
}

impl BenchReport {
    /// Queries per second.
    pub fn queries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.count as f64 / secs
    }

    /// Average latency per query in milliseconds.
    pub fn avg_millis(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() * 1000.0 / self.count as f64
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {} finished within {:.3}s, {:.2} queries per second, avg {:.2} ms per query",
            self.count,
            self.elapsed.as_secs_f64(),
            self.queries_per_second(),
            self.avg_millis()
        )
    }
}

/// Run the bench command
pub async fn run(args: BenchArgs, config: Config) -> CliResult<()> {
    let url = config.database_url(args.url.clone())?;
    let mysql = MysqlConfig::from_url(&url)?;

    output::header("Benchmark");
    kv("Mode", args.mode.as_str());
    kv("Target", &mysql.target().pool_name());
    kv("Queries", &args.count.to_string());
    kv("Query", &args.query);

    let driver = MysqlDriver::new(mysql);
    let report = match args.mode {
        BenchMode::Pool => {
            let pool_config = config.pool_config(args.size);
            kv("Pool size", &format!("{}/{}", pool_config.normal_size, pool_config.max_size));
            kv("Tasks", &args.tasks.to_string());
            let pool = Pool::new(driver, pool_config).await?;
            let report = bench_pool(&pool, args.count, args.tasks, &args.query).await;
            pool.close().await;
            report?
        }
        BenchMode::OneConn => bench_one_conn(Arc::new(driver), args.count, &args.query).await?,
        BenchMode::NewConn => bench_new_conn(Arc::new(driver), args.count, &args.query).await?,
    };

    output::newline();
    success(&report.to_string());
    Ok(())
}

/// Split `count` queries over `tasks` tasks, each checking a connection out
/// of `pool` per query.
pub async fn bench_pool<D: Driver>(
    pool: &Pool<D>,
    count: u64,
    tasks: usize,
    sql: &str,
) -> CliResult<BenchReport> {
    let tasks = tasks.max(1) as u64;
    let started = Instant::now();

    let mut set = JoinSet::new();
    for task in 0..tasks {
        let share = count / tasks + u64::from(task < count % tasks);
        let pool = pool.clone();
        let sql = sql.to_string();
        set.spawn(async move {
            for _ in 0..share {
                let mut conn = pool.get().await?;
                conn.fetch_all(&sql, &[]).await?;
                conn.close().await?;
            }
            PoolResult::Ok(())
        });
    }

    while let Some(joined) = set.join_next().await {
        joined.map_err(|e| CliError::Bench(e.to_string()))??;
    }

    Ok(BenchReport {
        mode: BenchMode::Pool,
        count,
        elapsed: started.elapsed(),
    })
}

/// Run every query on one standalone connection.
pub async fn bench_one_conn<D: Driver>(
    driver: Arc<D>,
    count: u64,
    sql: &str,
) -> CliResult<BenchReport> {
    let mut conn = PooledConnection::connect(driver).await?;
    let started = Instant::now();
    for _ in 0..count {
        conn.fetch_all(sql, &[]).await?;
    }
    let elapsed = started.elapsed();
    conn.close().await?;

    Ok(BenchReport {
        mode: BenchMode::OneConn,
        count,
        elapsed,
    })
}

/// Open, use and close a standalone connection per query.
pub async fn bench_new_conn<D: Driver>(
    driver: Arc<D>,
    count: u64,
    sql: &str,
) -> CliResult<BenchReport> {
    let started = Instant::now();
    for _ in 0..count {
        let mut conn = PooledConnection::connect(Arc::clone(&driver)).await?;
        conn.fetch_all(sql, &[]).await?;
        conn.close().await?;
    }

    Ok(BenchReport {
        mode: BenchMode::NewConn,
        count,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlpool_core::PoolConfig;
    use sqlpool_core::testing::MockDriver;

    #[test]
    fn test_report_math() {
        let report = BenchReport {
            mode: BenchMode::Pool,
            count: 500,
            elapsed: Duration::from_millis(250),
        };
        assert_eq!(report.queries_per_second(), 2000.0);
        assert_eq!(report.avg_millis(), 0.5);
        assert!(report.to_string().starts_with("total 500 finished within 0.250s"));
    }

    #[test]
    fn test_report_empty() {
        let report = BenchReport {
            mode: BenchMode::OneConn,
            count: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.queries_per_second(), 0.0);
        assert_eq!(report.avg_millis(), 0.0);
    }

    #[tokio::test]
    async fn test_bench_pool_reuses_connections() {
        let driver = MockDriver::new();
        let config = Config::default().pool_config(Some(3));
        let pool = Pool::new(driver.clone(), config).await.unwrap();

        let report = bench_pool(&pool, 40, 3, "SELECT 1+1").await.unwrap();
        assert_eq!(report.count, 40);
        assert!(driver.connects() <= 3);
        assert_eq!(pool.available_count(), 3);
    }

    #[tokio::test]
    async fn test_bench_one_conn() {
        let driver = MockDriver::new();
        let report = bench_one_conn(Arc::new(driver.clone()), 10, "SELECT 1+1")
            .await
            .unwrap();
        assert_eq!(report.mode, BenchMode::OneConn);
        assert_eq!(driver.connects(), 1);
        assert_eq!(driver.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_bench_new_conn() {
        let driver = MockDriver::new();
        bench_new_conn(Arc::new(driver.clone()), 5, "SELECT 1+1")
            .await
            .unwrap();
        assert_eq!(driver.connects(), 5);
        assert_eq!(driver.closes(), 5);
    }

    #[tokio::test]
    async fn test_bench_pool_surfaces_errors() {
        let driver = MockDriver::new();
        let pool = Pool::new(driver.clone(), PoolConfig::new().normal_size(1).max_size(1))
            .await
            .unwrap();
        driver.fail_connects(true);
        assert!(matches!(
            bench_pool(&pool, 3, 1, "SELECT 1").await,
            Err(CliError::Pool(_))
        ));
    }
}
