//! Shared, read-only server state

use std::path::Path;
use std::sync::Arc;

use crate::config::{ServerConfig, DEFAULT_CHUNK_SIZE};
use crate::error::RetrieveError;
use crate::retriever::FileRetriever;

/// State handed to every request handler
///
/// Cloned per request; nothing in it is mutable after startup.
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Retriever bound to the fixed base directory
    retriever: Arc<FileRetriever>,
    /// Size of each streamed body chunk in bytes
    chunk_size: usize,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    /// * `base_dir` - Directory all requested paths are resolved against
    /// * `chunk_size` - Size of each streamed body chunk in bytes
    ///
    /// # Errors
    /// Fails if `base_dir` does not resolve to a directory.
    pub fn new(base_dir: impl AsRef<Path>, chunk_size: usize) -> Result<Self, RetrieveError> {
        let retriever = FileRetriever::new(base_dir)?;
        tracing::debug!("Serving files from {}", retriever.base_dir().display());
        Ok(Self {
            retriever: Arc::new(retriever),
            chunk_size: chunk_size.max(1),
        })
    }

    /// Build state from a loaded configuration
    pub fn from_config(config: &ServerConfig) -> Result<Self, RetrieveError> {
        Self::new(&config.root, config.chunk_size)
    }

    /// Get the file retriever
    pub fn retriever(&self) -> &FileRetriever {
        &self.retriever
    }

    /// Get the streaming chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl TryFrom<&Path> for ServerState {
    type Error = RetrieveError;

    fn try_from(base_dir: &Path) -> Result<Self, Self::Error> {
        Self::new(base_dir, DEFAULT_CHUNK_SIZE)
    }
}
