// sftpdrop SFTP (russh-sftp based)
//
// FileEntry : remote directory entry (rebuilt on every listing)
// RemoteFs  : the file-transfer primitives the Client needs
// Client    : close, open, read_dir, remove, save, save_bytes, save_string
//
// The surface is intentionally small: no mkdir, rename, chmod or recursive
// delete. Everything a partner upload needs, nothing that can do damage.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use russh_sftp::client::fs::File;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace};

use crate::context::Context;
use crate::error::{Error, Result, SftpError};
use crate::session::{Connector, SshConnector, Transport};
use crate::utils::{mtime_str, permission_str};

const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// Open flags used when creating an upload destination.
///
/// Least-privilege create: write + create + truncate, never READ. Some
/// managed transfer services (AWS Transfer Family among them) refuse to
/// create a file when the open request also asks for read access.
pub const SAVE_FLAGS: OpenFlags = OpenFlags::WRITE
    .union(OpenFlags::CREATE)
    .union(OpenFlags::TRUNCATE);

// ── FileEntry ────────────────────────────────────────────────────────────────

/// Remote directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub permissions: Option<u32>,  // unix mode bits incl. file type
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub mtime: Option<u64>,        // unix timestamp
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.permissions.is_some_and(|p| p & 0o170000 == 0o040000)
    }

    /// "drwxr-xr-x" form; without mode bits only the dir flag is known
    pub fn permission_str(&self) -> String {
        match self.permissions {
            Some(p) => permission_str(p),
            None    => if self.is_dir() { "d?????????" } else { "----------" }.to_string(),
        }
    }

    pub fn modified(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.mtime.and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0))
    }

    /// ls -la style date
    pub fn mtime_str(&self) -> String {
        self.mtime
            .map(|t| mtime_str(t, chrono::Utc::now()))
            .unwrap_or_else(|| "?".to_string())
    }
}

// ── RemoteFs ─────────────────────────────────────────────────────────────────

/// File-transfer session primitives.
///
/// Implementations must be safe for concurrent calls; the Client adds no
/// locking of its own.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Byte stream bound to one remote path, closed via `shutdown()`.
    type File: AsyncRead + AsyncWrite + Unpin + Send;

    async fn open_with_flags(&self, path: &str, flags: OpenFlags) -> std::result::Result<Self::File, SftpError>;

    /// Entries in server order, `.` and `..` included if the server sends them.
    async fn read_dir(&self, path: &str) -> std::result::Result<Vec<FileEntry>, SftpError>;

    async fn remove_file(&self, path: &str) -> std::result::Result<(), SftpError>;

    async fn close(&self) -> std::result::Result<(), SftpError>;
}

// russh-sftp multiplexes requests by id, concurrent calls are fine
#[async_trait]
impl RemoteFs for SftpSession {
    type File = File;

    async fn open_with_flags(&self, path: &str, flags: OpenFlags) -> std::result::Result<File, SftpError> {
        SftpSession::open_with_flags(self, path, flags).await
    }

    async fn read_dir(&self, path: &str) -> std::result::Result<Vec<FileEntry>, SftpError> {
        let dir = SftpSession::read_dir(self, path).await?;
        Ok(dir
            .map(|e| {
                let attrs = e.metadata();
                FileEntry {
                    name: e.file_name(),
                    size: attrs.size.unwrap_or(0),
                    permissions: attrs.permissions,
                    uid: attrs.uid,
                    gid: attrs.gid,
                    mtime: attrs.mtime.map(|t| t as u64),
                }
            })
            .collect())
    }

    async fn remove_file(&self, path: &str) -> std::result::Result<(), SftpError> {
        SftpSession::remove_file(self, path).await
    }

    async fn close(&self) -> std::result::Result<(), SftpError> {
        SftpSession::close(self).await
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Stream returned by [`Client::open`]
pub type RemoteFile<C = SshConnector> = <<C as Connector>::Fs as RemoteFs>::File;

/// Client for managing files on a remote SFTP server.
///
/// Owns one transport connection and one SFTP session. All operations take
/// `&self`, so a Client can be shared (e.g. in an `Arc`) between tasks.
/// Every operation is bounded by the [`Context`] it is given.
pub struct Client<C: Connector = SshConnector> {
    addr: String,
    // kept so close() can tear down the SSH connection explicitly
    transport: C::Transport,
    fs: C::Fs,
    closed: AtomicBool,
}

impl<C: Connector> Client<C> {
    pub(crate) fn from_parts(addr: String, transport: C::Transport, fs: C::Fs) -> Self {
        Self { addr, transport, fs, closed: AtomicBool::new(false) }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() { Err(Error::Closed) } else { Ok(()) }
    }

    /// Closes the SFTP session, then the SSH connection under it.
    ///
    /// Idempotent: only the first call does any work, later calls return
    /// `Ok(())`. Operations after close fail with [`Error::Closed`].
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("[session] closing {}", self.addr);

        let sftp = self.fs.close().await;
        let ssh  = self.transport.disconnect().await;

        sftp.map_err(|e| Error::Close { addr: self.addr.clone(), source: Box::new(e) })?;
        ssh.map_err(|source| Error::Close { addr: self.addr.clone(), source })?;
        Ok(())
    }

    /// Opens an existing remote file for reading, positioned at offset 0.
    ///
    /// The caller owns the stream and closes it with `shutdown()`.
    pub async fn open(&self, ctx: &Context, path: &str) -> Result<RemoteFile<C>> {
        self.ensure_open()?;
        debug!("[sftp] open {}", path);

        ctx.run(self.fs.open_with_flags(path, OpenFlags::READ))
            .await
            .map_err(|done| Error::interrupted(done, "open", path))?
            .map_err(|source| Error::Open { path: path.to_string(), source })
    }

    /// Lists the directory at `path`.
    ///
    /// Order is whatever the server sent; `.` and `..` are dropped.
    pub async fn read_dir(&self, ctx: &Context, path: &str) -> Result<Vec<FileEntry>> {
        self.ensure_open()?;
        debug!("[sftp] read_dir {}", path);

        let entries = ctx.run(self.fs.read_dir(path))
            .await
            .map_err(|done| Error::interrupted(done, "read directory", path))?
            .map_err(|source| Error::ReadDir { path: path.to_string(), source })?;

        Ok(entries
            .into_iter()
            .filter(|e| e.name != "." && e.name != "..")
            .collect())
    }

    /// Deletes a single remote file.
    pub async fn remove(&self, ctx: &Context, path: &str) -> Result<()> {
        self.ensure_open()?;
        debug!("[sftp] remove {}", path);

        ctx.run(self.fs.remove_file(path))
            .await
            .map_err(|done| Error::interrupted(done, "remove", path))?
            .map_err(|source| Error::Remove { path: path.to_string(), source })
    }

    /// Creates (or truncates) `path` and copies all of `reader` into it.
    ///
    /// The destination is opened with [`SAVE_FLAGS`] and is closed before
    /// returning on every path, including a failed or interrupted copy. A
    /// partially written file is left on the server. Returns bytes written.
    pub async fn save<R>(&self, ctx: &Context, path: &str, mut reader: R) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.ensure_open()?;
        debug!("[sftp] save {}", path);

        let mut file = ctx.run(self.fs.open_with_flags(path, SAVE_FLAGS))
            .await
            .map_err(|done| Error::interrupted(done, "save", path))?
            .map_err(|source| Error::Open { path: path.to_string(), source })?;

        let copied = ctx.run(copy_chunks(&mut reader, &mut file, path)).await;
        let closed = file.shutdown().await;

        let written = copied
            .map_err(|done| Error::interrupted(done, "save", path))?
            .map_err(|source| Error::Save { path: path.to_string(), source })?;
        closed.map_err(|source| Error::Save { path: path.to_string(), source })?;

        debug!("[sftp] saved {} ({} bytes)", path, written);
        Ok(written)
    }

    /// [`save`](Self::save) from an in-memory buffer.
    pub async fn save_bytes(&self, ctx: &Context, path: &str, bytes: &[u8]) -> Result<u64> {
        self.save(ctx, path, bytes).await
    }

    /// [`save`](Self::save) from a string.
    pub async fn save_string(&self, ctx: &Context, path: &str, text: &str) -> Result<u64> {
        self.save(ctx, path, text.as_bytes()).await
    }
}

async fn copy_chunks<R, W>(reader: &mut R, writer: &mut W, path: &str) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf         = vec![0u8; CHUNK_SIZE];
    let mut transferred = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 { break; }

        writer.write_all(&buf[..n]).await?;
        transferred += n as u64;
        trace!("[sftp] {} +{} ({} total)", path, n, transferred);
    }

    writer.flush().await?;
    Ok(transferred)
}
