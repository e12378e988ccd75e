//! HTTP file server for streaming downloads from a fixed directory
//!
//! Files are looked up relative to a single base directory, guarded against
//! path traversal, and streamed back with chunked transfer encoding so that
//! memory use does not grow with file size.

mod config;
mod content_type;
mod error;
mod retriever;
mod server;
mod state;

pub use config::{ServerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_HOST, DEFAULT_PORT};
pub use content_type::content_type_for;
pub use error::{ConfigError, RetrieveError};
pub use retriever::{validate_path, FileRetriever, FileStream};
pub use server::{
    chunked_body, content_disposition, shutdown_signal, ApiInfo, FileQuery, FileServerApi,
    HealthResponse, FILE_ROUTE,
};
pub use state::ServerState;

/// Result type alias for file server operations
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
