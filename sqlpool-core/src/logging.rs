//! Logging bootstrap.
//!
//! The pool logs through `tracing`. Applications that already install a
//! subscriber need nothing from this module. Otherwise call [`init`] once at
//! startup (requires the `tracing-subscriber` feature); it reads:
//!
//! - `SQLPOOL_DEBUG=true|1|yes` to turn on debug logging
//! - `SQLPOOL_LOG_LEVEL=trace|debug|info|warn|error` to pick a level
//! - `SQLPOOL_LOG_FORMAT=json|pretty|compact` (default: json)
//!
//! Nothing is installed unless one of the first two is set.
//!
//! Events emitted by the pool, by level:
//!
//! - `info`: pool created, pool closed
//! - `warn`: pool exhausted, a replacement connection could not be opened,
//!   a returned connection could not be reset or did not fit
//! - `debug`: connections created, reused, expired, discarded, returned
//! - `trace`: statements and closes

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "SQLPOOL_DEBUG";
const LEVEL_VAR: &str = "SQLPOOL_LOG_LEVEL";
const FORMAT_VAR: &str = "SQLPOOL_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether logging was requested at all.
    pub enabled: bool,
    /// Level directive applied to the sqlpool crates.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read the settings from `SQLPOOL_*` environment variables.
    pub fn from_env() -> Self {
        Self::resolve(
            env::var(DEBUG_VAR).ok().as_deref(),
            env::var(LEVEL_VAR).ok().as_deref(),
            env::var(FORMAT_VAR).ok().as_deref(),
        )
    }

    fn resolve(debug: Option<&str>, level: Option<&str>, format: Option<&str>) -> Self {
        let debug = debug.is_some_and(is_truthy);
        let fallback = if debug { "debug" } else { "warn" };
        let level_name = level.map(str::to_ascii_lowercase);
        let level = match level_name.as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => fallback,
        };
        Self {
            enabled: debug || level_name.is_some(),
            level,
            format: format.map(LogFormat::parse).unwrap_or(LogFormat::Json),
        }
    }

    /// `EnvFilter` directive covering every sqlpool crate.
    pub fn directive(&self) -> String {
        ["sqlpool", "sqlpool_core", "sqlpool_mysql", "sqlpool_cli"]
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Whether `SQLPOOL_DEBUG` is set.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR).is_ok_and(|v| is_truthy(&v))
}

/// Install a global subscriber according to [`LogSettings::from_env`].
///
/// Only the first call has any effect. Without the `tracing-subscriber`
/// feature this does nothing and events go to whatever subscriber the
/// application installed.
pub fn init() {
    INIT.call_once(|| {
        let settings = LogSettings::from_env();
        if !settings.enabled {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter =
                EnvFilter::try_new(settings.directive()).unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);
            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };
            if installed.is_ok() {
                tracing::info!(
                    level = settings.level,
                    format = ?settings.format,
                    "sqlpool logging initialized"
                );
            }
        }
    });
}

/// Turn on debug logging and install the subscriber.
///
/// # Safety
///
/// Writes `SQLPOOL_DEBUG` into the process environment; call it before any
/// threads are spawned.
pub fn init_debug() {
    // SAFETY: documented as startup-only.
    unsafe {
        env::set_var(DEBUG_VAR, "true");
    }
    init();
}
