//! `sqlpool version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::section("sqlpool");
    output::newline();

    kv("Version", VERSION);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";
    kv("Build", build_mode);

    kv(
        "Limits",
        &format!(
            "max pool size {}, max retries {}",
            sqlpool_core::MAX_POOL_SIZE,
            sqlpool_core::MAX_RETRIES
        ),
    );

    output::newline();
    output::section("Components");
    kv("sqlpool-core", VERSION);
    kv("sqlpool-mysql", VERSION);

    Ok(())
}
