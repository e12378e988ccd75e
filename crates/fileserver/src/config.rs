//! Server configuration from environment variables

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default host to bind to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port to listen on
pub const DEFAULT_PORT: u16 = 8080;

/// Default size of each streamed body chunk in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Runtime configuration for the file server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Fixed directory every request is resolved against (`FILE_SERVER_ROOT`)
    pub root: PathBuf,
    /// Host to bind to (`FILE_SERVER_HOST`)
    pub host: String,
    /// Port to listen on (`FILE_SERVER_PORT`)
    pub port: u16,
    /// Streamed chunk size in bytes (`FILE_SERVER_CHUNK_SIZE`)
    pub chunk_size: usize,
}

impl ServerConfig {
    /// Load configuration from the process environment
    ///
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse, or if no root is
    /// configured and the working directory cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = match non_empty(lookup("FILE_SERVER_ROOT")) {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir()?,
        };

        let host = non_empty(lookup("FILE_SERVER_HOST")).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var("FILE_SERVER_PORT", lookup("FILE_SERVER_PORT"), DEFAULT_PORT)?;
        let chunk_size = parse_var(
            "FILE_SERVER_CHUNK_SIZE",
            lookup("FILE_SERVER_CHUNK_SIZE"),
            DEFAULT_CHUNK_SIZE,
        )?;

        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FILE_SERVER_CHUNK_SIZE",
                value: "0".to_string(),
                reason: "chunk size must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            root,
            host,
            port,
            chunk_size,
        })
    }

    /// Socket address string for binding, e.g. `0.0.0.0:8080`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(value) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
