use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::models::{ConversionSpec, FileDescriptor};
use crate::services::convert::convert;
use crate::services::image_processor::ImageProcessor;
use crate::services::storage::StorageService;
use crate::utils::keys::destination_key;
use crate::utils::mime::content_type_for;
use std::fmt;
use std::sync::Arc;
use tokio::fs::File;
use tracing::{debug, error, info};

pub type LogFn = Arc<dyn Fn(&FileDescriptor) + Send + Sync>;

/// What to do after each successful upload
#[derive(Clone, Default)]
pub enum UploadLog {
    #[default]
    Silent,
    /// Print the public URL
    Print,
    /// Call back with the updated descriptor
    Callback(LogFn),
}

impl fmt::Debug for UploadLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadLog::Silent => f.write_str("Silent"),
            UploadLog::Print => f.write_str("Print"),
            UploadLog::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Per-call upload options
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Destination bucket (default: the configured bucket)
    pub bucket: Option<String>,

    /// Prefix each key with a millisecond timestamp (default: false)
    pub timestamp: bool,

    /// Conversion to run first (default: the configured conversion, if any)
    pub convert: Option<ConversionSpec>,

    /// Per-upload logging (default: silent)
    pub log: UploadLog,
}

/// Converts the batch if a spec applies, then uploads every file one at a time.
///
/// Returns the public URLs in input order. The first failed upload stops the
/// batch; files uploaded before it keep their `url`.
pub async fn upload<S, P>(
    storage: &S,
    processor: &P,
    files: &mut [FileDescriptor],
    options: &UploadOptions,
    defaults: &TransferConfig,
) -> Result<Vec<String>>
where
    S: StorageService + ?Sized,
    P: ImageProcessor + ?Sized,
{
    let bucket = options
        .bucket
        .as_deref()
        .or(defaults.bucket.as_deref())
        .ok_or_else(|| Error::Config("no destination bucket configured".to_string()))?;

    if let Some(spec) = options.convert.as_ref().or(defaults.convert.as_ref()) {
        convert(processor, files, spec).await?;
    }

    let mut urls = Vec::with_capacity(files.len());

    for file in files.iter_mut() {
        let key = destination_key(&file.name, options.timestamp);
        let content_type = content_type_for(&key);
        debug!("Uploading {} as {}/{} ({})", file.path.display(), bucket, key, content_type);

        let body = File::open(&file.path).await?;
        if let Err(e) = storage
            .put_object(bucket, &key, Box::new(body), &content_type)
            .await
        {
            error!("Upload of {}/{} failed: {}", bucket, key, e);
            return Err(e);
        }

        let url = storage.object_url(bucket, &key);
        file.name = key;
        file.url = Some(url.clone());

        match &options.log {
            UploadLog::Silent => {}
            UploadLog::Print => println!("{}", url),
            UploadLog::Callback(log) => log(&*file),
        }
        urls.push(url);
    }

    info!("Uploaded {} file(s) to {}", urls.len(), bucket);
    Ok(urls)
}
