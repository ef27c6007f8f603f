use crate::config::TransferConfig;
use crate::services::storage::S3StorageService;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &TransferConfig) -> Arc<S3StorageService> {
    let mut loader = aws_config::from_env().region(Region::new(config.region.clone()));

    if let (Some(key), Some(secret)) = (&config.key, &config.secret) {
        loader = loader.credentials_provider(Credentials::new(
            key.clone(),
            secret.clone(),
            None,
            None,
            "static",
        ));
    }

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.endpoint.is_some())
        .build();

    info!(
        "☁️  S3 Storage: {} (Region: {}, Bucket: {})",
        config.endpoint.as_deref().unwrap_or("aws"),
        config.region,
        config.bucket.as_deref().unwrap_or("<per upload>")
    );

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3StorageService::new(
        s3_client,
        config.region.clone(),
        config.endpoint.clone(),
    ))
}
