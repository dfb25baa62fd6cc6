//! Configuration for redwire
//!
//! Centralized connection settings with sensible defaults, plus parsing of
//! `redis://[[user]:password@]host[:port][/db]` URLs.

use std::time::Duration;

use crate::error::{RedwireError, Result};

/// Standard server port used when a URL or builder does not set one
pub const DEFAULT_PORT: u16 = 6379;

/// Logical databases are numbered `0..DATABASE_COUNT`
pub const DATABASE_COUNT: u8 = 16;

/// Default size of the transport's read-ahead buffer
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Smallest read-ahead buffer the transport accepts
pub const MIN_READ_BUFFER_SIZE: usize = 16;

const URL_SCHEME: &str = "redis://";

/// Connection configuration
#[derive(Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint
    // -------------------------------------------------------------------------
    /// Server host name or IP address
    pub host: String,

    /// Server TCP port
    pub port: u16,

    /// Logical database selected after connecting (0 skips SELECT)
    pub database: u8,

    // -------------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------------
    /// ACL user name, sent only together with a password
    pub username: Option<String>,

    /// Password for AUTH
    pub password: Option<String>,

    // -------------------------------------------------------------------------
    // Socket Configuration
    // -------------------------------------------------------------------------
    /// Connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Disable Nagle's algorithm
    pub nodelay: bool,

    /// Size of the read-ahead buffer (bytes)
    pub read_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            database: 0,
            username: None,
            password: None,
            connect_timeout_ms: 0,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            nodelay: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .field("write_timeout_ms", &self.write_timeout_ms)
            .field("nodelay", &self.nodelay)
            .field("read_buffer_size", &self.read_buffer_size)
            .finish()
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a `redis://[[user]:password@]host[:port][/db]` URL
    ///
    /// Anything not named in the URL keeps its default.
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| RedwireError::Config(format!("unsupported URL scheme: {url}")))?;

        let mut config = Self::default();

        // Userinfo ends at the last '@' so passwords may contain '@'.
        let rest = match rest.rsplit_once('@') {
            Some((userinfo, endpoint)) => {
                match userinfo.split_once(':') {
                    Some((user, password)) => {
                        if !user.is_empty() {
                            config.username = Some(user.to_string());
                        }
                        config.password = Some(password.to_string());
                    }
                    None => config.password = Some(userinfo.to_string()),
                }
                endpoint
            }
            None => rest,
        };

        let (host_port, database) = match rest.split_once('/') {
            Some((host_port, db)) => (host_port, Some(db)),
            None => (rest, None),
        };

        let host = match host_port.split_once(':') {
            Some((host, port)) => {
                config.port = port
                    .parse()
                    .map_err(|_| RedwireError::Config(format!("invalid port: {port:?}")))?;
                host
            }
            None => host_port,
        };
        if host.is_empty() {
            return Err(RedwireError::Config(format!("missing host in URL: {url}")));
        }
        config.host = host.to_string();

        if let Some(db) = database.filter(|db| !db.is_empty()) {
            config.database = db
                .parse()
                .map_err(|_| RedwireError::Config(format!("invalid database index: {db:?}")))?;
        }
        config.validate()?;

        Ok(config)
    }

    /// Check invariants the builder and URL parser cannot express in types
    pub fn validate(&self) -> Result<()> {
        if self.database >= DATABASE_COUNT {
            return Err(RedwireError::Config(format!(
                "invalid database index {} (must be below {})",
                self.database, DATABASE_COUNT
            )));
        }
        if self.host.is_empty() {
            return Err(RedwireError::Config("host must not be empty".to_string()));
        }
        if self.username.is_some() && self.password.is_none() {
            return Err(RedwireError::Config(
                "username given without a password".to_string(),
            ));
        }
        if self.read_buffer_size < MIN_READ_BUFFER_SIZE {
            return Err(RedwireError::Config(format!(
                "read buffer of {} bytes is below the minimum of {}",
                self.read_buffer_size, MIN_READ_BUFFER_SIZE
            )));
        }
        Ok(())
    }

    /// `host:port` string used for address resolution
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a duration, if enabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    /// Read timeout as a duration, if enabled
    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    /// Write timeout as a duration, if enabled
    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the logical database selected after connecting
    pub fn database(mut self, database: u8) -> Self {
        self.config.database = database;
        self
    }

    /// Set the AUTH password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the ACL user name (requires a password)
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Set the read-ahead buffer size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
