use crate::config::DEFAULT_DOWNLOAD_TIMEOUT;
use crate::error::{Error, Result};
use crate::models::DownloadOutcome;
use crate::services::progress::{ConsoleObserver, DownloadObserver, ProgressTracker};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use url::Url;

/// Fallback file name when the URI has no usable last path segment
const DEFAULT_FILE_NAME: &str = "download";

/// Per-call download options
#[derive(Clone, Default)]
pub struct DownloadOptions {
    /// Suppress every observer call, custom or default (default: false)
    pub quiet: bool,

    /// Event sink; `None` uses [`ConsoleObserver`] (default: none)
    pub observer: Option<Arc<dyn DownloadObserver>>,
}

impl DownloadOptions {
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            observer: None,
        }
    }

    pub fn with_observer(observer: Arc<dyn DownloadObserver>) -> Self {
        Self {
            quiet: false,
            observer: Some(observer),
        }
    }
}

/// Streams a single HTTP(S) GET to a local file.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl Downloader {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Downloads `uri` to `destination`, or to the URI's last path segment.
    ///
    /// The timeout covers the request, the body and the final sync. On
    /// expiry the in-flight request is dropped, which closes its connection
    /// and the destination file.
    pub async fn download(
        &self,
        uri: &str,
        destination: Option<&Path>,
        options: DownloadOptions,
    ) -> Result<DownloadOutcome> {
        let url = Url::parse(uri)?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        }

        let path = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_destination(&url));

        let observer: Option<Arc<dyn DownloadObserver>> = if options.quiet {
            None
        } else {
            Some(options.observer.unwrap_or_else(|| Arc::new(ConsoleObserver)))
        };

        info!("Downloading {} to {}", uri, path.display());

        let result = match tokio::time::timeout(
            self.timeout,
            self.fetch(uri, url, &path, observer.as_deref()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        };

        match &result {
            Ok(outcome) => info!(
                "Downloaded {} ({} bytes) to {}",
                outcome.uri,
                outcome.downloaded,
                outcome.path.display()
            ),
            Err(e) => {
                warn!("Download of {} failed: {}", uri, e);
                if let Some(observer) = &observer {
                    observer.on_error(e);
                }
            }
        }

        result
    }

    async fn fetch(
        &self,
        uri: &str,
        url: Url,
        path: &Path,
        observer: Option<&dyn DownloadObserver>,
    ) -> Result<DownloadOutcome> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                uri: uri.to_string(),
            });
        }

        let mut tracker = ProgressTracker::new(response.content_length());
        let mut writer = BufWriter::new(File::create(path).await?);

        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            let progress = tracker.record(chunk.len());
            debug!(
                downloaded = progress.downloaded,
                total = ?progress.total,
                "received {} bytes",
                chunk.len()
            );
            if let Some(observer) = observer {
                observer.on_data(&progress);
            }
        }

        // An empty body never yields a chunk; still report its final state
        if tracker.downloaded() == 0 {
            if let Some(observer) = observer {
                observer.on_data(&tracker.snapshot());
            }
        }

        writer.flush().await?;
        let file = writer.into_inner();
        file.sync_all().await?;
        drop(file);

        let outcome = DownloadOutcome {
            uri: uri.to_string(),
            path: path.to_path_buf(),
            total: tracker.total(),
            downloaded: tracker.downloaded(),
        };

        if let Some(observer) = observer {
            observer.on_end(&outcome);
        }

        Ok(outcome)
    }
}

/// Last non-empty path segment of the URL, decoded and reduced to a bare file name.
pub fn default_destination(url: &Url) -> PathBuf {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .and_then(|decoded| Path::new(&decoded).file_name().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME))
}
