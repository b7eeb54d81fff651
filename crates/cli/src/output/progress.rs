//! Progress rendering for transfer operations
//!
//! Workers only bump the shared [`ProgressTracker`]; one renderer task polls
//! it. On a terminal an `indicatif` bar is drawn, otherwise a plain line is
//! written to stderr every few seconds.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use minx_core::ProgressTracker;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::OutputConfig;

const TICK: Duration = Duration::from_millis(100);
const PLAIN_EVERY: u32 = 50;
const PLAIN_WIDTH: usize = 30;

/// Handle to the renderer task of one command
#[derive(Debug)]
pub struct ProgressRenderer {
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProgressRenderer {
    /// Start rendering `tracker`, or do nothing when progress is suppressed
    pub fn start(config: &OutputConfig, tracker: &ProgressTracker, label: &str) -> Self {
        let stop = CancellationToken::new();
        if !config.shows_progress() {
            return Self { stop, task: None };
        }

        let tracker = tracker.clone();
        let token = stop.clone();
        let task = if console::Term::stderr().is_term() {
            let bar = ProgressBar::new(tracker.total());
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
            );
            bar.set_message(label.to_string());
            tokio::spawn(draw_bar(bar, tracker, token))
        } else {
            tokio::spawn(print_lines(label.to_string(), tracker, token))
        };

        Self {
            stop,
            task: Some(task),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.task.is_some()
    }

    /// Stop the renderer and wait for its final frame
    pub async fn finish(self) {
        self.stop.cancel();
        if let Some(task) = self.task {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "progress renderer ended abnormally");
            }
        }
    }
}

async fn draw_bar(bar: ProgressBar, tracker: ProgressTracker, stop: CancellationToken) {
    loop {
        bar.set_length(tracker.total().max(1));
        bar.set_position(tracker.current());
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(TICK) => {}
        }
    }
    bar.set_length(tracker.total().max(1));
    bar.set_position(tracker.current());
    bar.finish_and_clear();
}

async fn print_lines(label: String, tracker: ProgressTracker, stop: CancellationToken) {
    let mut ticks = 0u32;
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(TICK) => {}
        }
        ticks += 1;
        if ticks % PLAIN_EVERY == 0 {
            eprintln!("{label} {}", tracker.snapshot().render_line(PLAIN_WIDTH));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_renderer_suppressed_in_quiet_mode() {
        let config = OutputConfig {
            quiet: true,
            ..Default::default()
        };
        let renderer = ProgressRenderer::start(&config, &ProgressTracker::default(), "get");
        assert!(!renderer.is_visible());
        renderer.finish().await;
    }

    #[tokio::test]
    async fn test_renderer_suppressed_in_json_mode() {
        let config = OutputConfig {
            json: true,
            ..Default::default()
        };
        let renderer = ProgressRenderer::start(&config, &ProgressTracker::default(), "put");
        assert!(!renderer.is_visible());
    }

    #[tokio::test]
    async fn test_renderer_finishes_when_visible() {
        let tracker = ProgressTracker::new(10);
        let renderer = ProgressRenderer::start(&OutputConfig::default(), &tracker, "sync");
        assert!(renderer.is_visible());
        tracker.add(10);
        renderer.finish().await;
    }
}
