//! Configuration management for sessiond
//!
//! Loads settings from TOML file at ~/.sessiond/config.toml

use crate::error::{Result, SessionError};
use crate::sid::RandomIdGenerator;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Session store and cookie configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 19480)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Optional API key guarding the admin endpoints
    /// Required in Authorization header if set: "Authorization: Bearer <key>"
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_port() -> u16 {
    19480
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            api_key: None,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the registered backend to use
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Cookie carrying the session identifier
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Idle lifetime in seconds; also the cookie Max-Age (0 omits it)
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,

    /// Seconds between garbage collection sweeps (0 disables the sweeper)
    #[serde(default = "default_gc_interval")]
    pub gc_interval_secs: u64,

    /// Random bytes per session identifier
    #[serde(default = "default_id_bytes")]
    pub id_bytes: usize,

    /// Optional bound on live sessions; least recently used are evicted first
    #[serde(default)]
    pub max_entries: Option<usize>,
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_cookie_name() -> String {
    "sessiond_sid".to_string()
}

fn default_max_lifetime() -> u64 {
    3600
}

fn default_gc_interval() -> u64 {
    60
}

fn default_id_bytes() -> usize {
    64
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            provider: default_provider(),
            cookie_name: default_cookie_name(),
            max_lifetime_secs: default_max_lifetime(),
            gc_interval_secs: default_gc_interval(),
            id_bytes: default_id_bytes(),
            max_entries: None,
        }
    }
}

impl SessionConfig {
    /// Reject settings the manager cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_empty() {
            return Err(SessionError::Config(
                "session.provider must not be empty".to_string(),
            ));
        }
        if !is_cookie_token(&self.cookie_name) {
            return Err(SessionError::Config(format!(
                "session.cookie_name is not a valid cookie name: {:?}",
                self.cookie_name
            )));
        }
        RandomIdGenerator::new(self.id_bytes)?;
        if self.max_entries == Some(0) {
            return Err(SessionError::Config(
                "session.max_entries must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// RFC 6265 cookie-name token check
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                        | b'{'
                        | b'}'
                )
        })
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(SessionError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Load configuration from file or use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// Startup configuration: the file if present (defaults otherwise), then
    /// environment overrides. A file that exists but does not parse is an error.
    pub fn resolve<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = expand_path(path.as_ref());
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Command-line listener overrides, applied last
    pub fn override_listener(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".sessiond").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".sessiond/config.toml"))
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.session.validate()
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SessionError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SESSIOND_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SESSIOND_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(key) = std::env::var("SESSIOND_SERVER_API_KEY") {
            self.server.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Ok(name) = std::env::var("SESSIOND_COOKIE_NAME") {
            self.session.cookie_name = name;
        }
        if let Ok(secs) = std::env::var("SESSIOND_MAX_LIFETIME_SECS") {
            if let Ok(secs) = secs.parse() {
                self.session.max_lifetime_secs = secs;
            }
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# sessiond configuration

[server]
# Port to listen on (default: 19480)
port = 19480

# Host to bind to
# "127.0.0.1" = localhost only (recommended)
host = "127.0.0.1"

# Optional API key for the /api/admin endpoints
# If set, clients must send: Authorization: Bearer <api_key>
# api_key = "your-secret-key"

[session]
# Registered backend name
provider = "memory"

# Cookie carrying the session identifier
cookie_name = "sessiond_sid"

# Seconds a session may stay idle before the sweeper removes it
max_lifetime_secs = 3600

# Seconds between sweeps (0 disables the sweeper)
gc_interval_secs = 60

# Random bytes per identifier (minimum 32)
id_bytes = 64

# Upper bound on live sessions, least recently used evicted first
# max_entries = 100000
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
