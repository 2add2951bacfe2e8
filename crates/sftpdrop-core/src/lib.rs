// sftpdrop Core Library (russh based)
//
// A deliberately small SFTP client for pushing files to partners that have
// no API. One Client wraps exactly one SSH connection and one SFTP session.
//
// session : SSH connect/auth + SFTP subsystem (Connector, SshConnector)
// sftp    : Client facade (open, read_dir, remove, save) + FileEntry
// context : cancellation / deadline carried by every operation

pub mod config;
pub mod context;
pub mod error;
pub mod session;
pub mod sftp;
pub mod utils;

pub use config::Config;
pub use context::{Context, Done};
pub use error::{Error, Result};
pub use session::{Connector, SshConnector, SshTransport, Transport};
pub use sftp::{Client, FileEntry, RemoteFile, RemoteFs, SAVE_FLAGS};
