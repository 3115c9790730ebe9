//! Hypervisor host targets and their probe credentials

use secrecy::{ExposeSecret, SecretString};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Username/password pair used to open the probe channel.
///
/// These are the host's own shell credentials, separate from whatever
/// credentials an inventory service needs to list the hosts.
#[derive(Clone)]
pub struct Credentials {
    /// Login name on the host
    pub username: String,
    password: SecretString,
}

impl Credentials {
    /// Creates credentials from a username and password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Creates credentials from an already wrapped secret
    pub fn with_secret(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// Returns the password for the authentication call
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A host to probe during one collection cycle
#[derive(Debug, Clone)]
pub struct Host {
    /// Hostname or IP address
    pub address: String,
    /// SSH port
    pub port: u16,
    /// Probe credentials
    pub credentials: Credentials,
}

impl Host {
    /// Creates a host on the default SSH port
    pub fn new(address: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_SSH_PORT,
            credentials,
        }
    }

    /// Sets a non-default port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.port == DEFAULT_SSH_PORT {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}
