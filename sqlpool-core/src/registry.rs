//! Pool identity and a registry of named pools.
//!
//! Applications that talk to more than one server (or as more than one user)
//! keep one pool per target. [`PoolRegistry`] is a plain value owned by the
//! application's composition root; there is no process-wide instance.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::PoolConfig;
use crate::driver::Driver;
use crate::error::PoolResult;
use crate::pool::Pool;

/// The server, account and schema a driver connects to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectTarget {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Default database.
    pub database: String,
}

impl Default for ConnectTarget {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            database: String::new(),
        }
    }
}

impl ConnectTarget {
    /// Derive the default pool name: `host-port-user-database`.
    pub fn pool_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.host, self.port, self.user, self.database)
    }
}

/// A set of named pools sharing one driver type.
pub struct PoolRegistry<D: Driver> {
    pools: RwLock<HashMap<String, Pool<D>>>,
}

impl<D: Driver> Default for PoolRegistry<D> {
    fn default() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }
}

impl<D: Driver> PoolRegistry<D> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool under its own name, replacing any previous pool with
    /// that name. The replaced pool is returned so the caller can close it.
    pub fn register(&self, pool: Pool<D>) -> Option<Pool<D>> {
        let name = pool.name().to_string();
        debug!(pool = %name, "Registering pool");
        self.pools.write().insert(name, pool)
    }

    /// Look up a pool by name.
    pub fn get(&self, name: &str) -> Option<Pool<D>> {
        self.pools.read().get(name).cloned()
    }

    /// Return the pool for the driver's target, building it on first use.
    ///
    /// The name comes from `config.name` or the driver's target. When two
    /// callers race to build the same pool, the first one registered wins and
    /// the loser's pool is closed.
    pub async fn get_or_create(&self, driver: D, config: PoolConfig) -> PoolResult<Pool<D>> {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| driver.target().pool_name());
        if let Some(pool) = self.get(&name) {
            return Ok(pool);
        }

        let pool = Pool::new(driver, config.name(name.clone())).await?;
        let existing = {
            let mut pools = self.pools.write();
            match pools.get(&name) {
                Some(existing) => Some(existing.clone()),
                None => {
                    pools.insert(name, pool.clone());
                    None
                }
            }
        };

        match existing {
            Some(existing) => {
                pool.close().await;
                Ok(existing)
            }
            None => Ok(pool),
        }
    }

    /// Remove a pool from the registry.
    pub fn remove(&self, name: &str) -> Option<Pool<D>> {
        self.pools.write().remove(name)
    }

    /// Names of all registered pools.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Close every registered pool and empty the registry.
    pub async fn close_all(&self) {
        let pools: Vec<Pool<D>> = self.pools.write().drain().map(|(_, p)| p).collect();
        for pool in pools {
            pool.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target_name() {
        assert_eq!(ConnectTarget::default().pool_name(), "localhost-3306--");
    }

    #[test]
    fn test_target_name() {
        let target = ConnectTarget {
            host: "db1".to_string(),
            port: 3307,
            user: "app".to_string(),
            database: "orders".to_string(),
        };
        assert_eq!(target.pool_name(), "db1-3307-app-orders");
    }
}
