//! Pool and acquisition configuration.

use std::time::Duration;

use serde::Deserialize;

/// Hard ceiling on `max_size`, whatever the caller asks for.
pub const MAX_POOL_SIZE: usize = 200;

/// Hard ceiling on acquire retries.
pub const MAX_RETRIES: u32 = 10;

/// Per-call acquisition settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AcquireOptions {
    /// How long one attempt waits for an idle connection. Zero means do not
    /// wait at all.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// How many more attempts to make once the pool is at its normal size.
    /// Values above [`MAX_RETRIES`] are clamped.
    pub retry_count: u32,
    /// Sleep between attempts.
    #[serde(rename = "retry_interval_ms", with = "millis")]
    pub retry_interval: Duration,
    /// Ping the server before handing out an idle connection, reconnecting
    /// if the socket is dead.
    pub pre_ping: bool,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            retry_count: 3,
            retry_interval: Duration::from_millis(100),
            pre_ping: false,
        }
    }
}

impl AcquireOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail immediately if nothing is idle and the pool is at its normal size
    /// and overflow is impossible.
    pub fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            retry_count: 0,
            retry_interval: Duration::ZERO,
            pre_ping: false,
        }
    }

    /// Set the per-attempt wait.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count.
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n;
        self
    }

    /// Set the sleep between attempts.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Enable or disable pre-ping.
    pub fn pre_ping(mut self, enabled: bool) -> Self {
        self.pre_ping = enabled;
        self
    }

    /// Retry count after clamping.
    pub fn effective_retries(&self) -> u32 {
        self.retry_count.min(MAX_RETRIES)
    }

    /// Total time an acquisition may spend waiting with these options.
    pub fn wait_budget(&self) -> Duration {
        let retries = self.effective_retries();
        self.timeout * (retries + 1) + self.retry_interval * retries
    }
}

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Steady-state number of connections.
    pub normal_size: usize,
    /// Maximum number of connections alive at once, idle or in use.
    pub max_size: usize,
    /// Pool name; derived from the driver's target when absent.
    pub name: Option<String>,
    /// Connections opened while building the pool. Zero means lazy.
    pub pre_create: usize,
    /// Maximum age of a connection. `None` disables expiry.
    #[serde(rename = "lifetime_secs", with = "lifetime_secs")]
    pub lifetime: Option<Duration>,
    /// Autocommit mode applied to every connection; also decides whether a
    /// returned connection is committed (on) or rolled back (off).
    pub autocommit: bool,
    /// Close connections above `normal_size` when they are returned instead
    /// of keeping them idle.
    pub shrink_overflow: bool,
    /// Options used by [`Pool::get`](crate::Pool::get).
    pub acquire: AcquireOptions,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            normal_size: 10,
            max_size: 100,
            name: None,
            pre_create: 0,
            lifetime: Some(Duration::from_secs(3600)),
            autocommit: true,
            shrink_overflow: true,
            acquire: AcquireOptions::default(),
        }
    }
}

impl PoolConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the normal size.
    pub fn normal_size(mut self, n: usize) -> Self {
        self.normal_size = n;
        self
    }

    /// Set the maximum size.
    pub fn max_size(mut self, n: usize) -> Self {
        self.max_size = n;
        self
    }

    /// Set the pool name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set how many connections to open up front.
    pub fn pre_create(mut self, n: usize) -> Self {
        self.pre_create = n;
        self
    }

    /// Set the maximum connection lifetime.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = if lifetime.is_zero() {
            None
        } else {
            Some(lifetime)
        };
        self
    }

    /// Disable lifetime expiry.
    pub fn no_lifetime(mut self) -> Self {
        self.lifetime = None;
        self
    }

    /// Set the autocommit mode.
    pub fn autocommit(mut self, enabled: bool) -> Self {
        self.autocommit = enabled;
        self
    }

    /// Enable or disable shrinking overflow connections on return.
    pub fn shrink_overflow(mut self, enabled: bool) -> Self {
        self.shrink_overflow = enabled;
        self
    }

    /// Set the default acquisition options.
    pub fn acquire(mut self, options: AcquireOptions) -> Self {
        self.acquire = options;
        self
    }

    /// Clamp sizes into a consistent range.
    ///
    /// `max_size` is capped at [`MAX_POOL_SIZE`] and kept at least 1,
    /// `normal_size` at most `max_size`, and `pre_create` at most `max_size`.
    pub fn normalized(mut self) -> Self {
        self.max_size = self.max_size.clamp(1, MAX_POOL_SIZE);
        self.normal_size = self.normal_size.min(self.max_size);
        self.pre_create = self.pre_create.min(self.max_size);
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod lifetime_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    /// Zero or negative seconds disable expiry.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<i64>::deserialize(d)?;
        Ok(secs
            .filter(|s| *s > 0)
            .map(|s| Duration::from_secs(s as u64)))
    }
}
