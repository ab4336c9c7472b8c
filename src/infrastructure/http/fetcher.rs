//! HTTP downloads into the local cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, header};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::domain::errors::FetchError;
use crate::domain::ports::{FetchedFile, FetcherPort};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Streams response bodies straight to disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher. Without a timeout a stalled transfer waits forever.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::request("<client>", e.to_string()))?;
        Ok(Self { client })
    }

    /// Logs what the server says about `url` before downloading it.
    async fn inspect_head(&self, url: &str) {
        match self.client.head(url).send().await {
            Ok(response) => {
                let headers = response.headers();
                let content_type = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                let content_length = headers
                    .get(header::CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                debug!(
                    url,
                    status = response.status().as_u16(),
                    content_type,
                    content_length,
                    "Remote resource headers"
                );
            }
            Err(e) => warn!(url, error = %e, "HEAD request failed"),
        }
    }

    async fn stream_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::request(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FetchError::stream(url, e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl FetcherPort for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedFile, FetchError> {
        self.inspect_head(url).await;

        match self.stream_to(url, dest).await {
            Ok(bytes) => {
                info!(url, dest = %dest.display(), bytes, "Download complete");
                Ok(FetchedFile {
                    path: PathBuf::from(dest),
                    bytes,
                })
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(dest).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(dest = %dest.display(), error = %cleanup, "Failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::sync::Arc;

    use super::*;
    use parking_lot::Mutex;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Keeps the level and message of every event.
    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<(Level, String)>>>);

    struct Message<'a>(&'a mut String);

    impl Visit for Message<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                let _ = write!(self.0, "{value:?}");
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Recorded {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut message = String::new();
            event.record(&mut Message(&mut message));
            self.0.lock().push((*event.metadata().level(), message));
        }
    }

    /// Answers every request on a local port with `status` and `body`.
    async fn serve(status: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    if !request.starts_with(b"HEAD") {
                        let _ = socket.write_all(body).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fetch_writes_body_to_disk() {
        let base = serve("200 OK", b"\x89PNG fake image bytes").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cat.png");

        let fetched = HttpFetcher::new(Some(Duration::from_secs(5)))
            .unwrap()
            .fetch(&format!("{base}/cat.png"), &dest)
            .await
            .unwrap();

        assert_eq!(fetched.path, dest);
        assert_eq!(fetched.bytes, 21);
        assert_eq!(std::fs::read(&dest).unwrap(), b"\x89PNG fake image bytes");
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_file() {
        let base = serve("404 Not Found", b"gone").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.png");

        let err = HttpFetcher::new(None)
            .unwrap()
            .fetch(&format!("{base}/missing.png"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();

        let err = HttpFetcher::new(Some(Duration::from_secs(2)))
            .unwrap()
            .fetch(&format!("http://{addr}/x.png"), &dir.path().join("x.png"))
            .await
            .unwrap_err();

        assert!(err.is_network_error());
    }

    #[tokio::test]
    async fn test_failed_head_request_is_a_warning() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();

        let recorded = Recorded::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(recorded.clone()),
        );

        HttpFetcher::new(Some(Duration::from_secs(2)))
            .unwrap()
            .fetch(&format!("http://{addr}/x.png"), &dir.path().join("x.png"))
            .await
            .unwrap_err();

        let events = recorded.0.lock();
        assert!(
            events
                .iter()
                .any(|(level, message)| *level == Level::WARN && message == "HEAD request failed")
        );
    }
}
