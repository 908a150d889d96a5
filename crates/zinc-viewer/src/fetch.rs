//! Network and disk fetching for metadata loads
//!
//! Requests run on background threads; results are fed back to the loader
//! on the calling thread.

use std::sync::Arc;
use std::sync::mpsc;

use parking_lot::Mutex;
use url::Url;
use zinc_core::{FetchError, FileTransport, LoadRequest, MetadataLoader, RequestId, Scene, Transport};

/// Largest payload accepted over HTTP
const MAX_BODY_SIZE: u64 = 256 * 1024 * 1024;

/// Fetches `http(s)://` URLs with ureq and everything else from disk
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    files: FileTransport,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = ureq::get(url)
            .header("User-Agent", concat!("zinc/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(404) => FetchError::NotFound(url.to_string()),
                ureq::Error::StatusCode(status) => FetchError::Status {
                    status,
                    url: url.to_string(),
                },
                other => FetchError::Io(other.to_string()),
            })?;

        response
            .into_body()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| FetchError::Io(e.to_string()))
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => self.fetch_http(url),
            _ => self.files.fetch(url),
        }
    }
}

/// Counters shared with the fetch threads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub started: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes: u64,
}

pub type SharedFetchStats = Arc<Mutex<FetchStats>>;

struct Fetched {
    id: RequestId,
    result: Result<Vec<u8>, FetchError>,
}

/// Runs loader requests on background threads
pub struct Fetcher {
    transport: Arc<dyn Transport + Send + Sync>,
    sender: mpsc::Sender<Fetched>,
    receiver: mpsc::Receiver<Fetched>,
    outstanding: usize,
    stats: SharedFetchStats,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport + Send + Sync>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            transport,
            sender,
            receiver,
            outstanding: 0,
            stats: Arc::new(Mutex::new(FetchStats::default())),
        }
    }

    pub fn stats(&self) -> SharedFetchStats {
        Arc::clone(&self.stats)
    }

    fn spawn(&mut self, request: LoadRequest) {
        let transport = Arc::clone(&self.transport);
        let sender = self.sender.clone();
        let stats = Arc::clone(&self.stats);
        self.outstanding += 1;
        stats.lock().started += 1;

        std::thread::spawn(move || {
            tracing::debug!("Fetching {}", request.url);
            let result = transport.fetch(&request.url);
            {
                let mut stats = stats.lock();
                match &result {
                    Ok(data) => {
                        stats.succeeded += 1;
                        stats.bytes += data.len() as u64;
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!("Fetch of {} failed: {}", request.url, e);
                    }
                }
            }
            // The receiver is gone only when the fetcher was dropped
            let _ = sender.send(Fetched {
                id: request.id,
                result,
            });
        });
    }

    /// Serve the loader until it has no requests left
    ///
    /// Returns the number of responses handed back to the loader.
    pub fn drive(&mut self, loader: &mut MetadataLoader, scene: &mut Scene) -> usize {
        let mut handled = 0;
        loop {
            for request in loader.take_requests() {
                self.spawn(request);
            }
            if self.outstanding == 0 {
                return handled;
            }
            let Ok(fetched) = self.receiver.recv() else {
                return handled;
            };
            self.outstanding -= 1;
            if let Ok(data) = &fetched.result {
                let size = data.len() as u64;
                loader.report_progress(fetched.id, size, size);
            }
            loader.handle_response(scene, fetched.id, fetched.result);
            handled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zinc_core::{LoaderConfig, MemoryTransport};

    #[test]
    fn test_http_transport_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.json");
        std::fs::write(&path, b"{}").unwrap();

        let transport = HttpTransport::new();
        assert_eq!(transport.fetch(path.to_str().unwrap()).unwrap(), b"{}");
        let url = Url::from_file_path(&path).unwrap();
        assert_eq!(transport.fetch(url.as_str()).unwrap(), b"{}");
    }

    #[test]
    fn test_fetcher_drives_loader() {
        let base = "https://example.org/models/";
        let transport = MemoryTransport::new()
            .with(
                &format!("{}metadata.json", base),
                r#"[{"Type":"Surfaces","URL":"a.json"},{"Type":"Points","URL":"missing.json"}]"#,
            )
            .with(
                &format!("{}a.json", base),
                r#"{"vertices":[0,0,0,1,0,0,0,1,0],"faces":[0,0,1,2]}"#,
            );
        let mut fetcher = Fetcher::new(Arc::new(transport));
        let mut scene = Scene::default();
        let mut loader = MetadataLoader::new(LoaderConfig {
            count_failed_items: true,
            ..Default::default()
        });

        loader.load_metadata_url(&format!("{}metadata.json", base));
        let handled = fetcher.drive(&mut loader, &mut scene);

        assert_eq!(handled, 3);
        assert!(loader.is_complete());
        assert_eq!(scene.tree().object_count(), 1);
        let stats = *fetcher.stats().lock();
        assert_eq!(stats.started, 3);
        assert_eq!(stats.failed, 1);
    }
}
