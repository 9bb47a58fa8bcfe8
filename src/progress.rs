use std::io::{self, Write};
use std::time::Instant;

use tracing_subscriber::EnvFilter;

/// Log filter from `RUST_LOG`-style directives; unset or invalid falls back to `warn`.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

/// Human-facing status lines on stderr, prefixed with elapsed time. Diagnostics go through
/// `tracing`; this is only the user-visible run log.
pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn silent() -> Self {
        Self::new(false)
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {}", msg.as_ref());
    }

    pub fn record(&self, current: usize, total: usize, dir_name: &str) {
        if !self.enabled {
            return;
        }
        let total = total.max(1);
        let current = current.min(total);
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] record {current}/{total} {dir_name}");
    }
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let m = seconds / 60;
    let s = seconds % 60;
    format!("{m:02}:{s:02}")
}
