//! TOML configuration for the inspector.
//!
//! Read from the path given on the command line, or `mc-inspect.toml` in the
//! working directory.  Every field has a default, so a missing file or a file
//! with only some sections is fine:
//!
//! ```toml
//! [inspector]
//! log_level = "info"
//!
//! [network]
//! bind_address = "0.0.0.0"
//! port = 25565
//! max_buffered_bytes = 2097152
//!
//! [protocol]
//! accepted_protocols = [4, 5, 47, 107, 108, 109, 110, 210, 315, 316, 335, 338, 340]
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.  The
//! `[protocol]` table is the decoder's own [`DecoderConfig`], embedded as is.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use mc_core::DecoderConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file used when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "mc-inspect.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` and `port` do not form a socket address.
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level inspector configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectConfig {
    #[serde(default)]
    pub inspector: InspectorConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default = "default_protocol")]
    pub protocol: DecoderConfig,
}

/// General behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectorConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to listen on.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on bytes held for one connection while waiting for a
    /// packet to complete.
    #[serde(default = "default_max_buffered_bytes")]
    pub max_buffered_bytes: usize,
}

impl NetworkConfig {
    /// Combines `bind_address` and `port` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `bind_address` is not an IP
    /// address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_address, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    25565
}
fn default_max_buffered_bytes() -> usize {
    2 * 1024 * 1024
}
/// Release protocol numbers from the legacy-probe era through 1.12.2.
fn default_protocol() -> DecoderConfig {
    DecoderConfig::accepting([4, 5, 47, 107, 108, 109, 110, 210, 315, 316, 335, 338, 340])
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            inspector: InspectorConfig::default(),
            network: NetworkConfig::default(),
            protocol: default_protocol(),
        }
    }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_buffered_bytes: default_max_buffered_bytes(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads the config at `path`, returning `InspectConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<InspectConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InspectConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
