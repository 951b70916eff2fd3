//! Terminal rendering for pool reports.

use owo_colors::OwoColorize;
use sqlpool_core::{PoolStats, PoolStatus};

const GAUGE_WIDTH: usize = 20;

/// Print a title with an underline.
pub fn header(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
    println!("{}", "─".repeat(text.chars().count()).dimmed());
    println!();
}

/// Print a section title.
pub fn section(text: &str) {
    println!("{}", text.bold().white());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {:<12} {}", format!("{}:", key).dimmed(), value);
}

/// Print a success line
pub fn success(text: &str) {
    println!("{} {}", "✔".green().bold(), text.green());
}

/// Print an error line to stderr
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

pub fn newline() {
    println!();
}

/// Occupancy of a pool: sizes, then a gauge of live connections against
/// `max_size` with the normal size marked.
pub fn pool_status(status: &PoolStatus) {
    kv("Name", &status.name);
    kv(
        "Size",
        &format!("normal {}, max {}", status.normal_size, status.max_size),
    );
    kv(
        "Connections",
        &format!(
            "{} {} idle, {} in use",
            gauge(status.in_use, status.outstanding, status.normal_size, status.max_size),
            status.idle,
            status.in_use
        ),
    );
}

/// Cumulative counters, skipping the ones still at zero.
pub fn pool_stats(stats: &PoolStats) {
    let counters = [
        ("Created", stats.created),
        ("Reused", stats.reused),
        ("Expired", stats.expired),
        ("Discarded", stats.discarded),
        ("Exhausted", stats.exhausted),
    ];
    for (name, value) in counters.iter().filter(|(_, v)| *v > 0) {
        kv(name, &value.to_string());
    }
}

/// `[##==|....]`: `#` in use, `=` idle, `|` the normal size, `.` headroom up
/// to the maximum.
fn gauge(in_use: usize, outstanding: usize, normal: usize, max: usize) -> String {
    let cells = max.clamp(1, GAUGE_WIDTH);
    let scale = |n: usize| (n * cells).div_ceil(max.max(1)).min(cells);
    let (busy, live, mark) = (scale(in_use), scale(outstanding), scale(normal));

    let mut bar = String::with_capacity(cells + 3);
    bar.push('[');
    for cell in 0..cells {
        if cell == mark && mark > 0 && mark < cells {
            bar.push('|');
        }
        bar.push(match cell {
            c if c < busy => '#',
            c if c < live => '=',
            _ => '.',
        });
    }
    bar.push(']');
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_gauge_small_pool() {
        assert_eq!(gauge(1, 3, 2, 4), "[#=|=.]");
        assert_eq!(gauge(0, 0, 4, 4), "[....]");
    }

    #[test]
    fn test_gauge_scales_large_pool() {
        let bar = gauge(100, 100, 50, 200);
        assert_eq!(bar.len(), GAUGE_WIDTH + 3);
        assert_eq!(bar, "[#####|#####..........]");
    }
}
