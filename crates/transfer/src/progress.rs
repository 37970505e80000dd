//! Progress display: bar rendering and status-edit throttling.

use std::time::Duration;

use tokio::time::Instant;

const BAR_CELLS: usize = 20;
const MIB: f64 = 1024.0 * 1024.0;

/// Default minimum interval between status-message edits.
pub const DEFAULT_EDIT_INTERVAL: Duration = Duration::from_secs(5);

/// Renders a `current`/`total` byte pair as a progress bar line.
///
/// Returns an empty string when the total is unknown or zero, so sizeless
/// downloads render no bar. The ratio is clamped to [0, 1] and an
/// over-reported `current` draws a full bar instead of erroring.
pub fn format_progress(current: u64, total: Option<u64>) -> String {
    let Some(total) = total.filter(|t| *t > 0) else {
        return String::new();
    };

    let ratio = (current as f64 / total as f64).clamp(0.0, 1.0);
    let filled = ((ratio * BAR_CELLS as f64) as usize).min(BAR_CELLS);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled));

    format!(
        "`{bar}` {:.1}% ({:.2} MiB / {:.2} MiB)",
        ratio * 100.0,
        current as f64 / MIB,
        total as f64 / MIB,
    )
}

/// Gates status edits to at most one per interval.
///
/// Armed at creation: the first chunk never fires an update, only
/// elapsed-time-gated ones do. The caller sends the job's opening status
/// line itself before streaming starts.
#[derive(Debug)]
pub struct UpdateThrottle {
    interval: Duration,
    last: Instant,
}

impl UpdateThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    /// Returns true, and re-arms, when the interval has elapsed since
    /// the last accepted tick.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}
