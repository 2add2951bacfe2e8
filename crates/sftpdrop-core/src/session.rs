// sftpdrop Session (russh based)
//
// Session establisher: SSH connect + password auth with russh, then an
// SFTP session on a "sftp" subsystem channel with russh-sftp.
//
//   connect()       → Transport   (fails → Error::Connect, nothing left open)
//   open_session()  → RemoteFs    (fails → transport disconnected, Error::Session)
//
// Connector is the seam between the Client and the network; SshConnector
// is the real one.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::Context;
use crate::error::{BoxError, Error, Result};
use crate::sftp::{Client, RemoteFs};

/// Established transport layer, released once by disconnect().
#[async_trait]
pub trait Transport: Send + Sync {
    async fn disconnect(&self) -> std::result::Result<(), BoxError>;
}

/// Builds the two session layers a Client owns.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;
    type Fs: RemoteFs;

    /// Opens and authenticates the transport connection.
    async fn connect(&self, config: &Config) -> std::result::Result<Self::Transport, BoxError>;

    /// Layers a file-transfer session on an established transport.
    async fn open_session(&self, transport: &Self::Transport) -> std::result::Result<Self::Fs, BoxError>;
}

// russh client handler (server events)
struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        // INSECURE: every host key is accepted, no known_hosts check
        Ok(true)
    }
}

pub struct SshTransport {
    handle: client::Handle<ClientHandler>,
}

#[async_trait]
impl Transport for SshTransport {
    async fn disconnect(&self) -> std::result::Result<(), BoxError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// russh + russh-sftp connector
#[derive(Clone)]
pub struct SshConnector {
    ssh_config: Arc<client::Config>,
}

impl SshConnector {
    pub fn new(ssh_config: client::Config) -> Self {
        Self { ssh_config: Arc::new(ssh_config) }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(client::Config::default())
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Transport = SshTransport;
    type Fs = SftpSession;

    async fn connect(&self, config: &Config) -> std::result::Result<SshTransport, BoxError> {
        let mut handle = client::connect(self.ssh_config.clone(), config.addr.as_str(), ClientHandler).await?;

        let authed = handle.authenticate_password(config.user.as_str(), config.password.as_str()).await?;
        if !authed {
            // don't leave the rejected connection behind
            let _ = handle.disconnect(Disconnect::ByApplication, "", "en").await;
            return Err(Box::new(russh::Error::NotAuthenticated));
        }
        debug!("[session] authenticated as {}", config.user);

        Ok(SshTransport { handle })
    }

    async fn open_session(&self, transport: &SshTransport) -> std::result::Result<SftpSession, BoxError> {
        let channel = transport.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        Ok(sftp)
    }
}

impl Client {
    /// Connects over SSH and starts an SFTP session.
    ///
    /// The returned Client is safe to share between tasks.
    pub async fn connect(ctx: &Context, config: &Config) -> Result<Self> {
        Self::connect_with(&SshConnector::default(), ctx, config).await
    }
}

impl<C: Connector> Client<C> {
    /// Establishes both layers through `connector`.
    ///
    /// Either both layers are live in the returned Client or nothing is left
    /// open: a transport whose SFTP session could not be started is
    /// disconnected before the error is returned.
    pub async fn connect_with(connector: &C, ctx: &Context, config: &Config) -> Result<Self> {
        let addr = config.addr.as_str();
        info!("[session] connecting to {} as {}", addr, config.user);

        let transport = ctx.run(connector.connect(config))
            .await
            .map_err(|done| Error::interrupted(done, "connect", addr))?
            .map_err(|source| Error::Connect { addr: addr.to_string(), source })?;

        let fs = match ctx.run(connector.open_session(&transport)).await {
            Ok(Ok(fs)) => fs,
            Ok(Err(source)) => {
                release(&transport, addr).await;
                return Err(Error::Session { addr: addr.to_string(), source });
            }
            Err(done) => {
                release(&transport, addr).await;
                return Err(Error::interrupted(done, "connect", addr));
            }
        };

        info!("[session] SFTP ready on {}", addr);
        Ok(Client::from_parts(addr.to_string(), transport, fs))
    }
}

// half-open transport: the session error is what the caller needs to see
async fn release<T: Transport>(transport: &T, addr: &str) {
    if let Err(e) = transport.disconnect().await {
        warn!("[session] disconnect from {} after failed setup: {}", addr, e);
    }
}
