//! Process exit codes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Query matched nothing
    NotFound = 3,
    IndexMissing = 4,
    /// `status --check` found a stale index
    Stale = 5,
    InvalidIndex = 6,
    ConfigError = 7,
    /// Interrupted with Ctrl-C
    Cancelled = 130,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
