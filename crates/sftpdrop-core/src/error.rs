// sftpdrop Error Types
//
// Every collaborator failure is wrapped with the action that was attempted
// and the path/address it targeted, then handed back to the caller.
// Nothing here retries, logs or panics.

use russh_sftp::protocol::StatusCode;
use thiserror::Error;

use crate::context::Done;

/// Boxed cause from the SSH layer (russh errors, channel/subsystem failures)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Cause reported by the SFTP layer
pub type SftpError = russh_sftp::client::error::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing environment variable {var}")]
    Config { var: String },

    #[error("failed to connect ssh to {addr}: {source}")]
    Connect { addr: String, source: BoxError },

    #[error("failed to start sftp session on {addr}: {source}")]
    Session { addr: String, source: BoxError },

    #[error("failed to close connection to {addr}: {source}")]
    Close { addr: String, source: BoxError },

    #[error("failed to open {path}: {source}")]
    Open { path: String, source: SftpError },

    #[error("failed to read directory {path}: {source}")]
    ReadDir { path: String, source: SftpError },

    #[error("failed to remove {path}: {source}")]
    Remove { path: String, source: SftpError },

    #[error("failed to save file {path}: {source}")]
    Save { path: String, source: std::io::Error },

    #[error("{op} {target} cancelled")]
    Cancelled { op: &'static str, target: String },

    #[error("{op} {target} deadline exceeded")]
    DeadlineExceeded { op: &'static str, target: String },

    #[error("client is closed")]
    Closed,
}

impl Error {
    /// Maps a finished Context onto the matching cancellation variant.
    pub(crate) fn interrupted(done: Done, op: &'static str, target: &str) -> Self {
        let target = target.to_string();
        match done {
            Done::Cancelled        => Error::Cancelled { op, target },
            Done::DeadlineExceeded => Error::DeadlineExceeded { op, target },
        }
    }

    /// True when the server answered an operation with `SSH_FX_NO_SUCH_FILE`.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Open { source, .. }
            | Error::ReadDir { source, .. }
            | Error::Remove { source, .. } => matches!(
                source,
                SftpError::Status(status) if matches!(status.status_code, StatusCode::NoSuchFile)
            ),
            _ => false,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled { .. } | Error::DeadlineExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
