//! Transfer progress accounting
//!
//! A [`ProgressTracker`] is a cheap cloneable handle shared by every worker of
//! a batch. Workers only add bytes; a single renderer polls snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const BAR_FILL: char = '=';
const BAR_HEAD: char = '>';

#[derive(Debug)]
struct Inner {
    current: AtomicU64,
    total: AtomicU64,
    started: Instant,
}

/// Shared byte counter for one transfer or batch
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: AtomicU64::new(0),
                total: AtomicU64::new(total),
                started: Instant::now(),
            }),
        }
    }

    /// Count transferred bytes
    pub fn add(&self, bytes: u64) {
        self.inner.current.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Grow the expected total, used while a batch is still being enumerated
    pub fn add_total(&self, bytes: u64) {
        self.inner.total.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn current(&self) -> u64 {
        self.inner.current.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::compute(self.current(), self.total(), self.elapsed())
    }
}

/// Point-in-time view of a tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub current: u64,
    pub total: u64,
    /// Completion in percent, capped at 100
    pub percent: f64,
    /// Bytes per second since the tracker was created
    pub throughput: f64,
    /// Remaining time, unknown until some bytes have moved
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    fn compute(current: u64, total: u64, elapsed: Duration) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            (current as f64 / total as f64 * 100.0).min(100.0)
        };

        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 { current as f64 / secs } else { 0.0 };

        let eta = (throughput > 0.0)
            .then(|| Duration::from_secs_f64(total.saturating_sub(current) as f64 / throughput));

        Self {
            current,
            total,
            percent,
            throughput,
            eta,
        }
    }

    /// `[=====>    ]  42.0% 1.2 MiB/s ETA 3s` with a bar of `width` cells
    pub fn render_line(&self, width: usize) -> String {
        let filled = ((self.percent / 100.0) * width as f64) as usize;
        let filled = filled.min(width);

        let mut bar = String::with_capacity(width);
        for i in 0..width {
            bar.push(match i.cmp(&filled) {
                std::cmp::Ordering::Less => BAR_FILL,
                std::cmp::Ordering::Equal if filled < width => BAR_HEAD,
                _ => ' ',
            });
        }

        let speed = humansize::format_size(self.throughput as u64, humansize::BINARY);
        let eta = match self.eta {
            Some(eta) => format!("{}s", eta.as_secs()),
            None => "calculating".to_string(),
        };
        format!("[{bar}] {:5.1}% {speed}/s ETA {eta}", self.percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_shared_between_clones() {
        let tracker = ProgressTracker::new(100);
        let clone = tracker.clone();
        tracker.add(30);
        clone.add(20);
        assert_eq!(tracker.current(), 50);
        clone.add_total(50);
        assert_eq!(tracker.total(), 150);
    }

    #[test]
    fn test_percent_capped() {
        let snap = ProgressSnapshot::compute(150, 100, Duration::from_secs(1));
        assert_eq!(snap.percent, 100.0);

        let snap = ProgressSnapshot::compute(25, 100, Duration::from_secs(1));
        assert_eq!(snap.percent, 25.0);

        let snap = ProgressSnapshot::compute(0, 0, Duration::from_secs(1));
        assert_eq!(snap.percent, 100.0);
    }

    #[test]
    fn test_throughput_and_eta() {
        let snap = ProgressSnapshot::compute(50, 150, Duration::from_secs(5));
        assert_eq!(snap.throughput, 10.0);
        assert_eq!(snap.eta, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_eta_unknown_without_progress() {
        let snap = ProgressSnapshot::compute(0, 100, Duration::from_secs(5));
        assert_eq!(snap.eta, None);
        assert!(snap.render_line(10).ends_with("ETA calculating"));
    }

    #[test]
    fn test_render_line_bar() {
        let snap = ProgressSnapshot::compute(50, 100, Duration::from_secs(1));
        let line = snap.render_line(10);
        assert!(line.starts_with("[=====>    ]"), "{line}");
        assert!(line.contains(" 50.0%"));

        let done = ProgressSnapshot::compute(100, 100, Duration::from_secs(1));
        assert!(done.render_line(4).starts_with("[====]"));
    }
}
