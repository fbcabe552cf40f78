pub mod memory;
pub mod profile;

use std::time::Duration;

/// ANSI clear-screen-and-home, reissued before every redraw.
pub(crate) const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Shared knobs of the two poll loops.
pub struct PollOptions {
    pub interval: Duration,
    pub iterations: Option<u64>,
    pub top: usize,
}

/// Render a nanosecond total as seconds with millisecond precision.
pub(crate) fn format_ns(ns: u64) -> String {
    format!("{:.3}s", ns as f64 / 1e9)
}

/// Render an elapsed wall-clock duration, dropping sub-second noise.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}
