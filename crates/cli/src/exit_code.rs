//! Process exit codes

use bucketfs_core::Error;

/// Exit codes reported by `bfs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments or a request the namespace cannot satisfy
    UsageError = 2,
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
    /// Operation exists but is not implemented
    UnsupportedFeature = 6,
}

impl ExitCode {
    /// Pick the exit code matching a storage error
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::NotFound(_) => ExitCode::NotFound,
            Error::InvalidOperation(_) | Error::Config(_) => ExitCode::UsageError,
            Error::NotImplemented(_) => ExitCode::UnsupportedFeature,
            Error::Network(_) | Error::Throttled(_) => ExitCode::NetworkError,
            Error::Auth(_) => ExitCode::AuthError,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
