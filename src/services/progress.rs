use crate::error::Error;
use crate::models::DownloadOutcome;

const BYTES_PER_KB: f64 = 1024.0;

/// Point-in-time view of a streaming transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub downloaded: u64,
    /// Declared total, absent when the server sent no Content-Length
    pub total: Option<u64>,
    /// Percentage in `0.0..=100.0`; `None` when the total is unknown
    pub percent: Option<f64>,
    pub downloaded_kb: f64,
    pub total_kb: Option<f64>,
}

/// Percentage of `downloaded` against `total`. An empty body counts as complete.
pub fn percent_of(downloaded: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(0) => Some(100.0),
        Some(total) if downloaded >= total => Some(100.0),
        Some(total) => Some(downloaded as f64 * 100.0 / total as f64),
        None => None,
    }
}

/// Running byte counter that produces [`Progress`] snapshots.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    downloaded: u64,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total,
            downloaded: 0,
        }
    }

    /// Accounts for a received chunk and returns the updated snapshot.
    pub fn record(&mut self, chunk_len: usize) -> Progress {
        self.downloaded += chunk_len as u64;
        self.snapshot()
    }

    pub fn snapshot(&self) -> Progress {
        Progress {
            downloaded: self.downloaded,
            total: self.total,
            percent: percent_of(self.downloaded, self.total),
            downloaded_kb: self.downloaded as f64 / BYTES_PER_KB,
            total_kb: self.total.map(|t| t as f64 / BYTES_PER_KB),
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }
}

/// Receives download lifecycle events, inline and in byte-arrival order.
///
/// Every method has a default that prints a human-readable line, so an
/// implementation only overrides the events it cares about.
pub trait DownloadObserver: Send + Sync {
    fn on_data(&self, progress: &Progress) {
        match progress.percent {
            Some(percent) => println!(
                "{:.2}% ({:.1} / {:.1} kB)",
                percent,
                progress.downloaded_kb,
                progress.total_kb.unwrap_or_default()
            ),
            None => println!("{:.1} kB", progress.downloaded_kb),
        }
    }

    fn on_end(&self, outcome: &DownloadOutcome) {
        println!(
            "Downloaded {} to {} ({} bytes)",
            outcome.uri,
            outcome.path.display(),
            outcome.downloaded
        );
    }

    fn on_error(&self, error: &Error) {
        eprintln!("Download failed: {}", error);
    }
}

/// Observer that keeps all the printing defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl DownloadObserver for ConsoleObserver {}
