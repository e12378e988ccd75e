//! Error types for file retrieval and server configuration

use thiserror::Error;

/// Message returned for paths rejected by the traversal check
pub const INVALID_PATH_MESSAGE: &str = "Invalid file path";

/// Message returned when the path exists but is not a regular file
pub const NOT_A_FILE_MESSAGE: &str = "Path is not a file";

/// Message returned when nothing exists at the requested path
pub const NOT_FOUND_MESSAGE: &str = "File not found";

/// Failure of a single retrieval
///
/// Every variant is terminal for the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrieveError {
    /// Traversal attempt, absolute path, or a path that is not a regular file
    #[error("{0}")]
    InvalidPath(String),

    /// No filesystem entry at the resolved location
    #[error("{0}")]
    NotFound(String),

    /// Open or probe failure on an otherwise valid path
    #[error("Error processing file: {0}")]
    Io(String),
}

impl RetrieveError {
    pub fn invalid_path() -> Self {
        Self::InvalidPath(INVALID_PATH_MESSAGE.to_string())
    }

    pub fn not_a_file() -> Self {
        Self::InvalidPath(NOT_A_FILE_MESSAGE.to_string())
    }

    pub fn not_found() -> Self {
        Self::NotFound(NOT_FOUND_MESSAGE.to_string())
    }

    /// HTTP status code the boundary layer answers with
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPath(_) => 400,
            Self::NotFound(_) => 404,
            Self::Io(_) => 500,
        }
    }
}

impl From<std::io::Error> for RetrieveError {
    fn from(err: std::io::Error) -> Self {
        RetrieveError::Io(err.to_string())
    }
}

/// Invalid server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// The working directory could not be determined for the default root
    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RetrieveError::invalid_path().status_code(), 400);
        assert_eq!(RetrieveError::not_a_file().status_code(), 400);
        assert_eq!(RetrieveError::not_found().status_code(), 404);
        assert_eq!(RetrieveError::Io("boom".to_string()).status_code(), 500);
    }

    #[test]
    fn test_messages() {
        assert_eq!(RetrieveError::invalid_path().to_string(), "Invalid file path");
        assert_eq!(RetrieveError::not_a_file().to_string(), "Path is not a file");
        assert_eq!(RetrieveError::not_found().to_string(), "File not found");
    }

    #[test]
    fn test_io_error_keeps_underlying_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = RetrieveError::from(io);
        assert_eq!(err.to_string(), "Error processing file: access denied");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            name: "FILE_SERVER_PORT",
            value: "http".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value \"http\" for FILE_SERVER_PORT: invalid digit found in string"
        );
    }
}
