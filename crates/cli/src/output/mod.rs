//! Output formatting utilities
//!
//! Formatters for human-readable and JSON output, plus the progress renderer
//! that follows a transfer's [`minx_core::ProgressTracker`].

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::ProgressRenderer;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Whether a progress display may be drawn at all
    pub fn shows_progress(&self) -> bool {
        !(self.json || self.quiet || self.no_progress)
    }
}
