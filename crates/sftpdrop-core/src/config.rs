// sftpdrop Connection Config
//
// {user, password, addr} triple. Supplied once when the Client is built and
// never mutated afterwards.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Username for the SSH login
    pub user: String,
    /// Password for the SSH login
    pub password: String,
    /// Server address including port, e.g. `sftp.partner.example:22`
    pub addr: String,
}

impl Config {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        addr: impl Into<String>,
    ) -> Self {
        Self { user: user.into(), password: password.into(), addr: addr.into() }
    }

    /// Reads `<PREFIX>_USER`, `<PREFIX>_PASSWORD` and `<PREFIX>_ADDRESS`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Ok(Self {
            user:     env_var(prefix, "USER")?,
            password: env_var(prefix, "PASSWORD")?,
            addr:     env_var(prefix, "ADDRESS")?,
        })
    }
}

fn env_var(prefix: &str, key: &str) -> Result<String> {
    let var = format!("{}_{}", prefix, key);
    std::env::var(&var).map_err(|_| Error::Config { var })
}

// password never ends up in logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("addr", &self.addr)
            .finish()
    }
}
