//! Secure file retrieval relative to a fixed base directory
//!
//! [`FileRetriever`] is the only place where caller input touches the
//! filesystem. It knows nothing about HTTP; the server translates its
//! [`RetrieveError`]s into status codes.

use mime_guess::mime::Mime;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::File;

use crate::content_type::content_type_for;
use crate::error::RetrieveError;

/// Fallback attachment name when the request path has no final segment
const DEFAULT_FILE_NAME: &str = "download";

/// Reject paths that could escape the base directory
///
/// Operates on the literal string, before any path normalization, so it never
/// touches the filesystem.
pub fn validate_path(path: &str) -> Result<(), RetrieveError> {
    if path.contains("..") || path.starts_with('/') {
        return Err(RetrieveError::invalid_path());
    }
    Ok(())
}

/// An open, read-only file ready to be streamed, with its response metadata
#[derive(Debug)]
pub struct FileStream {
    file: File,
    content_type: Mime,
    file_name: String,
    len: u64,
}

impl FileStream {
    /// Content type inferred from the filename suffix
    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }

    /// Final segment of the requested path
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File size when it was opened
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Give up the metadata and take ownership of the open handle
    pub fn into_file(self) -> File {
        self.file
    }
}

/// Resolves caller paths against a single fixed directory
#[derive(Debug, Clone)]
pub struct FileRetriever {
    /// Canonical form of the configured root
    base_dir: PathBuf,
}

impl FileRetriever {
    /// Create a retriever rooted at `base_dir`
    ///
    /// The directory is canonicalized once here so that later containment
    /// checks compare like with like.
    ///
    /// # Errors
    /// Returns `Io` if the directory cannot be resolved and `InvalidPath` if
    /// it resolves to something other than a directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, RetrieveError> {
        let base_dir = std::fs::canonicalize(base_dir.as_ref())?;
        if !base_dir.is_dir() {
            return Err(RetrieveError::InvalidPath(format!(
                "Base directory is not a directory: {}",
                base_dir.display()
            )));
        }
        Ok(Self { base_dir })
    }

    /// Canonical base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Open the file at `path`, relative to the base directory
    ///
    /// # Arguments
    /// * `path` - Caller supplied relative path, e.g. `documents/example.txt`
    ///
    /// # Returns
    /// * `Ok(FileStream)` - Handle positioned at offset 0 plus metadata
    /// * `Err(RetrieveError)` - `InvalidPath`, `NotFound` or `Io`
    pub async fn retrieve(&self, path: &str) -> Result<FileStream, RetrieveError> {
        validate_path(path)?;

        let resolved = self.base_dir.join(path);

        let metadata = match tokio::fs::metadata(&resolved).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                tracing::error!("Permission denied probing {}: {}", resolved.display(), e);
                return Err(e.into());
            }
            Err(e) => {
                tracing::debug!("No entry at {}: {}", resolved.display(), e);
                return Err(RetrieveError::not_found());
            }
        };

        // Symlinks may still point outside the root
        let canonical = tokio::fs::canonicalize(&resolved).await?;
        if !canonical.starts_with(&self.base_dir) {
            tracing::warn!(
                "Rejected {}: resolves to {} outside {}",
                path,
                canonical.display(),
                self.base_dir.display()
            );
            return Err(RetrieveError::invalid_path());
        }

        if !metadata.is_file() {
            return Err(RetrieveError::not_a_file());
        }

        let content_type = content_type_for(path);
        let file_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

        let file = File::open(&canonical).await.map_err(|e| {
            tracing::error!("Failed to open {}: {}", canonical.display(), e);
            RetrieveError::from(e)
        })?;

        Ok(FileStream {
            file,
            content_type,
            file_name,
            len: metadata.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn create_test_root() -> (TempDir, FileRetriever) {
        let dir = TempDir::new().unwrap();
        let retriever = FileRetriever::new(dir.path()).unwrap();
        (dir, retriever)
    }

    #[test]
    fn test_validate_rejects_parent_segments() {
        for path in ["..", "../etc/passwd", "../../etc/passwd", "a/../b", "a/..", "file..txt"] {
            assert_eq!(validate_path(path), Err(RetrieveError::invalid_path()), "{}", path);
        }
    }

    #[test]
    fn test_validate_rejects_absolute() {
        for path in ["/", "/etc/passwd", "//server/share"] {
            assert_eq!(validate_path(path), Err(RetrieveError::invalid_path()), "{}", path);
        }
    }

    #[test]
    fn test_validate_accepts_relative() {
        for path in ["report.pdf", "documents/example.txt", "./notes.txt", ".hidden", ""] {
            assert!(validate_path(path).is_ok(), "{}", path);
        }
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(FileRetriever::new(&missing), Err(RetrieveError::Io(_))));
    }

    #[test]
    fn test_new_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(FileRetriever::new(&file), Err(RetrieveError::InvalidPath(_))));
    }

    #[test]
    fn test_base_dir_is_canonical() {
        let (dir, retriever) = create_test_root();
        assert_eq!(retriever.base_dir(), dir.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_retrieve_regular_file() {
        let (dir, retriever) = create_test_root();
        std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.7").unwrap();

        let stream = retriever.retrieve("report.pdf").await.unwrap();
        assert_eq!(stream.content_type().as_ref(), "application/pdf");
        assert_eq!(stream.file_name(), "report.pdf");
        assert_eq!(stream.len(), 8);

        let mut contents = Vec::new();
        stream.into_file().read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_retrieve_nested_file_uses_base_name() {
        let (dir, retriever) = create_test_root();
        std::fs::create_dir_all(dir.path().join("documents/2024")).unwrap();
        std::fs::write(dir.path().join("documents/2024/Example.TXT"), b"hello").unwrap();

        let stream = retriever.retrieve("documents/2024/Example.TXT").await.unwrap();
        assert_eq!(stream.file_name(), "Example.TXT");
        assert_eq!(stream.content_type().as_ref(), "text/plain");
    }

    #[tokio::test]
    async fn test_retrieve_unknown_suffix() {
        let (dir, retriever) = create_test_root();
        std::fs::write(dir.path().join("blob.bin"), [0u8, 1, 2]).unwrap();

        let stream = retriever.retrieve("blob.bin").await.unwrap();
        assert_eq!(stream.content_type().as_ref(), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_retrieve_empty_file() {
        let (dir, retriever) = create_test_root();
        std::fs::write(dir.path().join("empty.log"), b"").unwrap();

        let stream = retriever.retrieve("empty.log").await.unwrap();
        assert!(stream.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_traversal_never_reaches_disk() {
        let outer = TempDir::new().unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
        std::fs::create_dir(outer.path().join("root")).unwrap();
        let retriever = FileRetriever::new(outer.path().join("root")).unwrap();

        // The target exists, so anything but InvalidPath means the check was skipped
        let result = retriever.retrieve("../secret.txt").await;
        assert_eq!(result.unwrap_err(), RetrieveError::invalid_path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_retrieve_absolute_path() {
        let (dir, retriever) = create_test_root();
        let absolute = dir.path().join("a.txt");
        std::fs::write(&absolute, b"a").unwrap();

        let result = retriever.retrieve(absolute.to_str().unwrap()).await;
        assert_eq!(result.unwrap_err(), RetrieveError::invalid_path());
    }

    #[tokio::test]
    async fn test_retrieve_missing_file() {
        let (_dir, retriever) = create_test_root();
        let result = retriever.retrieve("missing.txt").await;
        assert_eq!(result.unwrap_err(), RetrieveError::not_found());
    }

    #[tokio::test]
    async fn test_retrieve_through_file_prefix() {
        let (dir, retriever) = create_test_root();
        std::fs::write(dir.path().join("plain.txt"), b"x").unwrap();

        let result = retriever.retrieve("plain.txt/child").await;
        assert_eq!(result.unwrap_err(), RetrieveError::not_found());
    }

    #[tokio::test]
    async fn test_retrieve_directory() {
        let (dir, retriever) = create_test_root();
        std::fs::create_dir(dir.path().join("somedir")).unwrap();

        let result = retriever.retrieve("somedir").await;
        assert_eq!(result.unwrap_err(), RetrieveError::not_a_file());
    }

    #[tokio::test]
    async fn test_retrieve_empty_path_is_root_directory() {
        let (_dir, retriever) = create_test_root();
        let result = retriever.retrieve("").await;
        assert_eq!(result.unwrap_err(), RetrieveError::not_a_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_retrieve_symlink_inside_root() {
        let (dir, retriever) = create_test_root();
        std::fs::write(dir.path().join("target.json"), b"{}").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.json"), dir.path().join("link.json")).unwrap();

        let stream = retriever.retrieve("link.json").await.unwrap();
        assert_eq!(stream.file_name(), "link.json");
        assert_eq!(stream.content_type().as_ref(), "application/json");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_retrieve_symlink_to_directory() {
        let (dir, retriever) = create_test_root();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let result = retriever.retrieve("alias").await;
        assert_eq!(result.unwrap_err(), RetrieveError::not_a_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_retrieve_symlink_escaping_root() {
        let outer = TempDir::new().unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
        std::fs::create_dir(outer.path().join("root")).unwrap();
        std::os::unix::fs::symlink(
            outer.path().join("secret.txt"),
            outer.path().join("root").join("escape.txt"),
        )
        .unwrap();
        let retriever = FileRetriever::new(outer.path().join("root")).unwrap();

        let result = retriever.retrieve("escape.txt").await;
        assert_eq!(result.unwrap_err(), RetrieveError::invalid_path());
    }

    #[tokio::test]
    async fn test_concurrent_retrievals() {
        let (dir, retriever) = create_test_root();
        for i in 0..8 {
            std::fs::write(dir.path().join(format!("file{}.txt", i)), format!("content {}", i)).unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let retriever = retriever.clone();
                tokio::spawn(async move { retriever.retrieve(&format!("file{}.txt", i)).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let stream = handle.await.unwrap().unwrap();
            assert_eq!(stream.file_name(), format!("file{}.txt", i));
        }
    }
}
