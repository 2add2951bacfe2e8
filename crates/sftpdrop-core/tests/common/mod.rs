//! In-memory SFTP server used by the integration tests.
//!
//! Behaves like a strict managed transfer service: creating a file with an
//! open request that also asks for READ is refused with PermissionDenied.
//! Counters expose how many connections and file handles are still open so
//! tests can check nothing leaks.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};

use async_trait::async_trait;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::{OpenFlags, Status, StatusCode};
use sftpdrop_core::error::BoxError;
use sftpdrop_core::{Client, Config, Connector, Context, FileEntry, RemoteFs, Transport};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub const USER: &str = "alice";
pub const PASSWORD: &str = "correct horse";
pub const ADDR: &str = "fake.sftp.test:22";

type Shared = Arc<Mutex<Vec<u8>>>;

#[derive(Default)]
struct ServerState {
    files: Mutex<BTreeMap<String, Shared>>,
    open_requests: Mutex<Vec<(String, OpenFlags)>>,
    connections: AtomicUsize,
    handles: AtomicUsize,
    sessions_closed: AtomicUsize,
    fail_sessions: AtomicBool,
    stall_sessions: AtomicBool,
    stall_opens: AtomicBool,
    write_limit: Mutex<Option<usize>>,
}

#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<ServerState>,
}

fn status(code: StatusCode, message: &str) -> SftpError {
    SftpError::Status(Status {
        id: 0,
        status_code: code,
        error_message: message.to_string(),
        language_tag: "en-US".to_string(),
    })
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector { server: self.clone() }
    }

    pub async fn client(&self) -> Client<FakeConnector> {
        Client::connect_with(&self.connector(), &Context::background(), &config())
            .await
            .expect("fake connect")
    }

    /// SFTP subsystem requests fail after a successful login
    pub fn fail_sessions(&self) {
        self.state.fail_sessions.store(true, Ordering::SeqCst);
    }

    /// SFTP subsystem requests never answer
    pub fn stall_sessions(&self) {
        self.state.stall_sessions.store(true, Ordering::SeqCst);
    }

    /// open requests never answer
    pub fn stall_opens(&self) {
        self.state.stall_opens.store(true, Ordering::SeqCst);
    }

    /// writes that would grow a file past `limit` bytes fail
    pub fn limit_writes(&self, limit: usize) {
        *self.state.write_limit.lock().unwrap() = Some(limit);
    }

    pub fn put(&self, path: &str, data: &[u8]) {
        self.state.files.lock().unwrap()
            .insert(path.to_string(), Arc::new(Mutex::new(data.to_vec())));
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state.files.lock().unwrap()
            .get(path)
            .map(|f| f.lock().unwrap().clone())
    }

    pub fn open_requests(&self) -> Vec<(String, OpenFlags)> {
        self.state.open_requests.lock().unwrap().clone()
    }

    pub fn open_connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.state.handles.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.sessions_closed.load(Ordering::SeqCst)
    }
}

pub fn config() -> Config {
    Config::new(USER, PASSWORD, ADDR)
}

// ── Connector / Transport ───────────────────────────────────────────────────

pub struct FakeConnector {
    server: FakeServer,
}

pub struct FakeTransport {
    server: FakeServer,
    disconnected: AtomicBool,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn disconnect(&self) -> Result<(), BoxError> {
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            self.server.state.connections.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;
    type Fs = FakeFs;

    async fn connect(&self, config: &Config) -> Result<FakeTransport, BoxError> {
        if config.user != USER || config.password != PASSWORD {
            return Err(Box::new(russh::Error::NotAuthenticated));
        }
        self.server.state.connections.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTransport { server: self.server.clone(), disconnected: AtomicBool::new(false) })
    }

    async fn open_session(&self, _transport: &FakeTransport) -> Result<FakeFs, BoxError> {
        if self.server.state.fail_sessions.load(Ordering::SeqCst) {
            return Err("subsystem request failed".into());
        }
        if self.server.state.stall_sessions.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(FakeFs { server: self.server.clone() })
    }
}

// ── RemoteFs ────────────────────────────────────────────────────────────────

pub struct FakeFs {
    server: FakeServer,
}

#[async_trait]
impl RemoteFs for FakeFs {
    type File = FakeFile;

    async fn open_with_flags(&self, path: &str, flags: OpenFlags) -> Result<FakeFile, SftpError> {
        let state = &self.server.state;
        state.open_requests.lock().unwrap().push((path.to_string(), flags));

        if state.stall_opens.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let data = {
            let mut files = state.files.lock().unwrap();
            if flags.contains(OpenFlags::CREATE) {
                if flags.contains(OpenFlags::READ) {
                    return Err(status(StatusCode::PermissionDenied, "create with read access denied"));
                }
                let file = files.entry(path.to_string()).or_default().clone();
                if flags.contains(OpenFlags::TRUNCATE) {
                    file.lock().unwrap().clear();
                }
                file
            } else {
                match files.get(path) {
                    Some(file) => file.clone(),
                    None => return Err(status(StatusCode::NoSuchFile, "no such file")),
                }
            }
        };

        state.handles.fetch_add(1, Ordering::SeqCst);
        Ok(FakeFile {
            data,
            pos: 0,
            write_limit: *state.write_limit.lock().unwrap(),
            server: self.server.clone(),
            closed: false,
        })
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>, SftpError> {
        if path != "." {
            return Err(status(StatusCode::NoSuchFile, "no such directory"));
        }
        let dot = |name: &str| FileEntry {
            name: name.to_string(),
            size: 0,
            permissions: Some(0o040755),
            uid: None,
            gid: None,
            mtime: None,
        };

        let files = self.server.state.files.lock().unwrap();
        // reverse order: callers must not rely on sorting
        let mut entries = vec![dot("."), dot("..")];
        entries.extend(files.iter().rev().map(|(name, data)| FileEntry {
            name: name.clone(),
            size: data.lock().unwrap().len() as u64,
            permissions: Some(0o100644),
            uid: Some(1000),
            gid: Some(1000),
            mtime: Some(1_700_000_000),
        }));
        Ok(entries)
    }

    async fn remove_file(&self, path: &str) -> Result<(), SftpError> {
        match self.server.state.files.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(status(StatusCode::NoSuchFile, "no such file")),
        }
    }

    async fn close(&self) -> Result<(), SftpError> {
        self.server.state.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── FakeFile ────────────────────────────────────────────────────────────────

/// Handle onto a shared buffer; only `shutdown()` counts as a close.
pub struct FakeFile {
    data: Shared,
    pos: usize,
    write_limit: Option<usize>,
    server: FakeServer,
    closed: bool,
}

impl AsyncRead for FakeFile {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let data = this.data.lock().unwrap();
        let start = this.pos.min(data.len());
        let n = (data.len() - start).min(buf.remaining());
        buf.put_slice(&data[start..start + n]);
        this.pos = start + n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for FakeFile {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let mut data = this.data.lock().unwrap();
        if this.write_limit.is_some_and(|limit| data.len() + buf.len() > limit) {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection lost")));
        }
        data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.closed {
            this.closed = true;
            this.server.state.handles.fetch_sub(1, Ordering::SeqCst);
        }
        Poll::Ready(Ok(()))
    }
}
