//! Byte fetching for the metadata loader

use std::collections::HashMap;
use std::path::PathBuf;

use url::Url;

/// Fetches the bytes behind a resolved URL
pub trait Transport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetch-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Reads plain paths and `file://` URLs from disk
#[derive(Debug, Clone, Default)]
pub struct FileTransport {
    /// Directory relative paths are resolved against
    pub root: Option<PathBuf>,
}

impl FileTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, url: &str) -> Result<PathBuf, FetchError> {
        if let Ok(parsed) = Url::parse(url)
            && parsed.scheme() == "file"
        {
            return parsed
                .to_file_path()
                .map_err(|_| FetchError::InvalidUrl(url.to_string()));
        }
        let path = PathBuf::from(url);
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        })
    }
}

impl Transport for FileTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.path_for(url)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(path.display().to_string()),
            _ => FetchError::Io(e.to_string()),
        })
    }
}

/// Serves payloads registered in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, data: impl Into<Vec<u8>>) {
        self.entries.insert(url.to_string(), data.into());
    }

    pub fn with(mut self, url: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(url, data);
        self
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.entries
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_transport() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("view.json"), b"{}").unwrap();

        let transport = FileTransport::with_root(dir.path());
        assert_eq!(transport.fetch("view.json").unwrap(), b"{}");

        let url = Url::from_file_path(dir.path().join("view.json")).unwrap();
        assert_eq!(FileTransport::new().fetch(url.as_str()).unwrap(), b"{}");

        assert!(matches!(
            transport.fetch("missing.json"),
            Err(FetchError::NotFound(_))
        ));
    }

    #[test]
    fn test_memory_transport() {
        let transport = MemoryTransport::new().with("a.json", "[]");
        assert_eq!(transport.fetch("a.json").unwrap(), b"[]");
        assert!(transport.fetch("b.json").is_err());
    }
}
