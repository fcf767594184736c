//! Wall-clock and resident-memory measurement for query results.
//!
//! Figures are diagnostic only. Nothing in the engine enforces a budget.

use std::time::Instant;

/// Started at the beginning of a query, finished when the result is built.
pub struct Probe {
    started: Instant,
    rss_before_kb: Option<u64>,
}

impl Probe {
    /// Start timing. Reads the resident set size only when `collect_memory`.
    pub fn start(collect_memory: bool) -> Self {
        let rss_before_kb = if collect_memory { current_rss_kb() } else { None };
        Self {
            started: Instant::now(),
            rss_before_kb,
        }
    }

    /// Elapsed milliseconds and resident-set delta in KiB (0 when unavailable).
    pub fn finish(self) -> (f64, i64) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let memory_delta_kb = self
            .rss_before_kb
            .and_then(|before| current_rss_kb().map(|after| after as i64 - before as i64))
            .unwrap_or(0);
        (elapsed_ms, memory_delta_kb)
    }
}

/// `VmRSS` from `/proc/self/status`, in KiB.
#[cfg(target_os = "linux")]
pub fn current_rss_kb() -> Option<u64> {
    let status = match std::fs::read_to_string("/proc/self/status") {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("cannot read /proc/self/status: {}", e);
            return None;
        }
    };
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
}

#[cfg(not(target_os = "linux"))]
pub fn current_rss_kb() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_without_memory() {
        let probe = Probe::start(false);
        let (ms, delta) = probe.finish();
        assert!(ms >= 0.0);
        assert_eq!(delta, 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_rss_readable_on_linux() {
        assert!(current_rss_kb().unwrap_or(0) > 0);
    }
}
