//! Human-readable sizes, durations and section banners for stderr/stdout
//! reports.

use std::time::Duration;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const BANNER_WIDTH: usize = 70;

/// `1536` -> `"1.50 KB"`; plain byte counts below 1 KiB.
pub fn human_bytes(n: u64) -> String {
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    match unit {
        0 => format!("{n} B"),
        _ => format!("{value:.2} {}", UNITS[unit]),
    }
}

pub fn fmt_duration(d: Duration) -> String {
    let micros = d.as_secs_f64() * 1e6;
    if micros < 1e3 {
        format!("{micros:.1} µs")
    } else if micros < 1e6 {
        format!("{:.1} ms", micros / 1e3)
    } else {
        format!("{:.2} s", d.as_secs_f64())
    }
}

/// Compression ratio; an empty output counts as one byte.
pub fn ratio(raw: u64, compressed: u64) -> f64 {
    raw as f64 / compressed.max(1) as f64
}

/// Bytes per second, formatted with [`human_bytes`].
pub fn throughput(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().max(1e-9);
    format!("{}/s", human_bytes((bytes as f64 / secs) as u64))
}

pub fn section(title: &str) {
    let fill = BANNER_WIDTH.saturating_sub(title.len() + 5);
    println!("━━━ {title} {}", "━".repeat(fill));
}
