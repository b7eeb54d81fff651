//! Human-readable and JSON output
//!
//! Command results go to stdout. Errors and warnings go to stderr so that a
//! `--json` result can be piped straight into another tool.

use console::{Style, style};
use serde::Serialize;

use minx_core::Error;

use super::OutputConfig;
use crate::exit_code::ExitCode;

/// Writes command output according to the global output flags
///
/// In JSON mode only [`Formatter::json`] and errors produce output.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Prefix `message` with a status symbol, colored when allowed
    fn marked(&self, symbol: &str, color: Style, message: &str) -> String {
        if self.colors_enabled() {
            format!("{} {message}", color.apply_to(symbol))
        } else {
            format!("{symbol} {message}")
        }
    }

    /// Completed action; silent in quiet and JSON mode
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!("{}", self.marked("✓", Style::new().green(), message));
    }

    /// Printed in every mode; a JSON object on stderr with `--json`
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "error": message }));
        } else {
            eprintln!("{}", self.marked("✗", Style::new().red(), message));
        }
    }

    /// Report a fatal error and return its exit code
    pub fn fail(&self, context: &str, error: &Error) -> ExitCode {
        self.error(&format!("{context}: {error}"));
        ExitCode::from_error(error)
    }

    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        eprintln!("{}", self.marked("⚠", Style::new().yellow(), message));
    }

    /// Closing line of a batch: a success, or a warning when items failed
    pub fn summary(&self, message: &str, had_failures: bool) {
        if had_failures {
            self.warning(message);
        } else {
            self.success(message);
        }
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => self.error(&format!("cannot serialize output: {e}")),
        }
    }

    /// Plain result line, suppressed by `--quiet`
    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }

    /// Directory names are shown bold blue when colors are enabled
    pub fn dir_name(&self, name: &str) -> String {
        if self.colors_enabled() {
            style(name).blue().bold().to_string()
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Formatter {
        Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_default_is_colored_text() {
        let formatter = Formatter::default();
        assert!(!formatter.is_json());
        assert!(formatter.colors_enabled());
    }

    #[test]
    fn test_json_mode_disables_colors() {
        let formatter = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(formatter.is_json());
        assert!(!formatter.colors_enabled());
        assert_eq!(formatter.dir_name("docs/"), "docs/");
    }

    #[test]
    fn test_marked_without_colors() {
        let formatter = plain();
        assert_eq!(
            formatter.marked("✓", Style::new().green(), "Uploaded 3 files"),
            "✓ Uploaded 3 files"
        );
    }

    #[test]
    fn test_fail_maps_exit_code() {
        let code = plain().fail("ls", &Error::ObjectNotFound("/nope".into()));
        assert_eq!(code, ExitCode::NotFound);
        let code = plain().fail("cp", &Error::ObjectExists("/b.txt".into()));
        assert_eq!(code, ExitCode::Conflict);
    }
}
