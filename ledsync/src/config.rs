//! Configuration management for ledsync.
//!
//! The daemon is configured entirely from environment variables:
//!
//! | Variable             | Default           |
//! |----------------------|-------------------|
//! | `PORT`               | `5000`            |
//! | `LEDSYNC_BIND`       | `0.0.0.0`         |
//! | `LEDSYNC_STATE_FILE` | `data/state.json` |
//! | `LEDSYNC_ENV`        | development       |
//!
//! `LEDSYNC_ENV=production` selects production mode. When it is unset, the
//! older `FLASK_ENV` variable is consulted the same way.

use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};
use tracing_subscriber::filter::LevelFilter;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_STATE_FILE: &str = "data/state.json";

/// Development or production operation.
///
/// Development mode logs at DEBUG by default and serves the API docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    /// Whether debugging aids (verbose logs, API docs) are enabled.
    pub fn is_debug(self) -> bool {
        self == Mode::Development
    }

    /// Log level used when `RUST_LOG` is not set.
    pub fn default_log_level(self) -> LevelFilter {
        match self {
            Mode::Development => LevelFilter::DEBUG,
            Mode::Production => LevelFilter::INFO,
        }
    }
}

/// Main configuration structure for the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to listen on
    pub bind: IpAddr,

    /// TCP port to listen on
    pub port: u16,

    /// Location of the persisted state record
    pub state_file: PathBuf,

    /// Operating mode
    pub mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            mode: Mode::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration using `lookup` to resolve variable names.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got {port:?}")))?;
        }

        if let Some(bind) = get("LEDSYNC_BIND") {
            config.bind = bind.trim().parse().map_err(|_| {
                Error::Config(format!("LEDSYNC_BIND must be an IP address, got {bind:?}"))
            })?;
        }

        if let Some(path) = get("LEDSYNC_STATE_FILE") {
            config.state_file = PathBuf::from(path);
        }

        if let Some(mode) = get("LEDSYNC_ENV").or_else(|| get("FLASK_ENV")) {
            config.mode = Mode::from_name(&mode);
        }

        Ok(config)
    }

    /// Socket address the HTTP server binds.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
