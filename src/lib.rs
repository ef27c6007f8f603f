pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::config::TransferConfig;
pub use crate::error::{Error, Result};
pub use crate::models::{ConversionSpec, DownloadOutcome, FileDescriptor, OpArg};
pub use crate::services::download::{DownloadOptions, Downloader};
pub use crate::services::progress::{ConsoleObserver, DownloadObserver, Progress};
pub use crate::services::upload::{UploadLog, UploadOptions};

use crate::services::image_processor::{ImageProcessor, RasterProcessor};
use crate::services::storage::StorageService;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Transfer pipeline: its configuration plus the storage, image and HTTP collaborators.
#[derive(Clone)]
pub struct Pipeline {
    pub config: TransferConfig,
    pub storage: Arc<dyn StorageService>,
    pub images: Arc<dyn ImageProcessor>,
    pub downloader: Downloader,
}

impl Pipeline {
    pub fn new(config: TransferConfig, storage: Arc<dyn StorageService>) -> Self {
        let downloader = Downloader::new(config.download_timeout);
        Self {
            config,
            storage,
            images: Arc::new(RasterProcessor),
            downloader,
        }
    }

    /// Builds the pipeline against S3 using the configured credentials and region.
    pub async fn connect(config: TransferConfig) -> Self {
        let storage = infrastructure::storage::setup_storage(&config).await;
        Self::new(config, storage)
    }

    pub fn with_image_processor(mut self, images: Arc<dyn ImageProcessor>) -> Self {
        self.images = images;
        self
    }

    pub async fn upload(
        &self,
        files: &mut [FileDescriptor],
        options: &UploadOptions,
    ) -> Result<Vec<String>> {
        services::upload::upload(
            self.storage.as_ref(),
            self.images.as_ref(),
            files,
            options,
            &self.config,
        )
        .await
    }

    pub async fn convert<'a>(
        &self,
        files: &'a mut [FileDescriptor],
        spec: &ConversionSpec,
    ) -> Result<Vec<&'a mut FileDescriptor>> {
        services::convert::convert(self.images.as_ref(), files, spec).await
    }

    pub async fn download(
        &self,
        uri: &str,
        destination: Option<&Path>,
        options: DownloadOptions,
    ) -> Result<DownloadOutcome> {
        self.downloader.download(uri, destination, options).await
    }

    pub async fn info(&self, path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
        services::metadata::info(path).await
    }
}
