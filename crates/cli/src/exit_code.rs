//! Exit code definitions for the minx CLI
//!
//! Scripts depend on these values; changing one is a breaking change.

use minx_core::Error;

/// Exit codes for the minx CLI application.
///
/// Only fatal top-level errors produce a non-zero code. Per-item failures of
/// a batch are reported in the summary line and still exit with `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Anything without a more specific code
    GeneralError = 1,

    /// User input error: invalid arguments, malformed path, bad config
    UsageError = 2,

    /// Retryable network error: timeout, connection reset
    NetworkError = 3,

    /// No active session or unknown session name
    SessionError = 4,

    /// Object or directory does not exist
    NotFound = 5,

    /// Destination exists, or a move left both copies behind
    Conflict = 6,

    /// Ctrl-C; partial files are kept for `-c`
    Interrupted = 130,
}

impl ExitCode {
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::NetworkError),
            4 => Some(Self::SessionError),
            5 => Some(Self::NotFound),
            6 => Some(Self::Conflict),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Exit code for a fatal core error
    pub fn from_error(error: &Error) -> Self {
        Self::from_i32(error.exit_code()).unwrap_or(Self::GeneralError)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::GeneralError => "Failed",
            Self::UsageError => "Invalid arguments or path",
            Self::NetworkError => "Network error, retry may help",
            Self::SessionError => "No usable session",
            Self::NotFound => "Object or directory not found",
            Self::Conflict => "Destination conflict",
            Self::Interrupted => "Interrupted",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::SessionError.as_i32(), 4);
        assert_eq!(ExitCode::Conflict.as_i32(), 6);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
        assert_eq!(ExitCode::from_i32(7), None);
    }

    #[test]
    fn test_from_error() {
        assert_eq!(
            ExitCode::from_error(&Error::InvalidPath("x".into())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from_error(&Error::SessionNotFound("x".into())),
            ExitCode::SessionError
        );
        assert_eq!(
            ExitCode::from_error(&Error::ObjectNotFound("x".into())),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from_error(&Error::MoveIncomplete {
                source_key: "a".into(),
                destination: "b".into(),
                reason: "denied".into(),
            }),
            ExitCode::Conflict
        );
        assert_eq!(ExitCode::from_error(&Error::Cancelled), ExitCode::Interrupted);
        assert_eq!(
            ExitCode::from_error(&Error::TransferFailed("x".into())),
            ExitCode::GeneralError
        );
    }

    #[test]
    fn test_exit_code_display() {
        let display = ExitCode::NotFound.to_string();
        assert!(display.contains('5'));
        assert!(display.contains("not found"));
    }
}
