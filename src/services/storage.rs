use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Part size for multipart uploads; bodies under this size go up in one request
pub const PART_SIZE: usize = 8 * 1024 * 1024;

/// Characters left as-is in object keys of public URLs
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

pub type Body<'a> = Box<dyn AsyncRead + Unpin + Send + 'a>;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Stores `body` under `bucket/key`, overwriting any existing object.
    async fn put_object<'a>(
        &self,
        bucket: &str,
        key: &str,
        body: Body<'a>,
        content_type: &str,
    ) -> Result<()>;

    /// Public URL of `bucket/key`.
    fn object_url(&self, bucket: &str, key: &str) -> String;
}

pub struct S3StorageService {
    client: Client,
    region: String,
    endpoint: Option<String>,
}

impl S3StorageService {
    pub fn new(client: Client, region: impl Into<String>, endpoint: Option<String>) -> Self {
        Self {
            client,
            region: region.into(),
            endpoint,
        }
    }

    async fn put_single(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(Error::storage)?;
        Ok(())
    }

    /// Uploads parts strictly one after another, starting with `first`.
    async fn put_multipart(
        &self,
        bucket: &str,
        key: &str,
        first: Vec<u8>,
        reader: &mut Body<'_>,
        content_type: &str,
    ) -> Result<()> {
        let multipart_upload_res = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(Error::storage)?;

        let upload_id = multipart_upload_res
            .upload_id()
            .ok_or_else(|| Error::storage("No upload ID"))?
            .to_string();

        let parts = self
            .upload_parts(bucket, key, &upload_id, first, reader)
            .await;

        let completed_parts = match parts {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(
                    "Multipart upload of {}/{} failed, aborting: {}",
                    bucket,
                    key,
                    e
                );
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::error!("Failed to abort upload {}: {}", upload_id, abort);
                }
                return Err(e);
            }
        };

        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await
            .map_err(Error::storage)?;

        Ok(())
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        first: Vec<u8>,
        reader: &mut Body<'_>,
    ) -> Result<Vec<CompletedPart>> {
        let mut completed_parts = Vec::new();
        let mut part_number = 1;
        let mut chunk = first;

        while !chunk.is_empty() {
            let upload_part_res = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .body(ByteStream::from(chunk))
                .part_number(part_number)
                .send()
                .await
                .map_err(Error::storage)?;

            completed_parts.push(
                CompletedPart::builder()
                    .e_tag(upload_part_res.e_tag().unwrap_or_default())
                    .part_number(part_number)
                    .build(),
            );

            part_number += 1;
            chunk = read_part(reader).await?;
        }

        Ok(completed_parts)
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn put_object<'a>(
        &self,
        bucket: &str,
        key: &str,
        mut body: Body<'a>,
        content_type: &str,
    ) -> Result<()> {
        let first = read_part(&mut body).await?;

        if first.len() < PART_SIZE {
            return self
                .put_single(bucket, key, Bytes::from(first), content_type)
                .await;
        }

        self.put_multipart(bucket, key, first, &mut body, content_type)
            .await
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let key = utf8_percent_encode(key, KEY_ENCODE_SET);
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
            None if self.region == "us-east-1" => {
                format!("https://{}.s3.amazonaws.com/{}", bucket, key)
            }
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key),
        }
    }
}

/// Reads up to [`PART_SIZE`] bytes; an empty result means end of stream.
async fn read_part(reader: &mut Body<'_>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    reader.take(PART_SIZE as u64).read_to_end(&mut buffer).await?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    fn service(region: &str, endpoint: Option<&str>) -> S3StorageService {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new("key", "secret", None, None, "static"))
            .build();
        S3StorageService::new(
            Client::from_conf(config),
            region,
            endpoint.map(str::to_string),
        )
    }

    #[test]
    fn test_object_url_default_region() {
        let storage = service("us-east-1", None);
        assert_eq!(
            storage.object_url("7ino", "sirloin-logo.png"),
            "https://7ino.s3.amazonaws.com/sirloin-logo.png"
        );
        assert_eq!(
            storage.object_url("7ino", "dir/my logo.png"),
            "https://7ino.s3.amazonaws.com/dir/my%20logo.png"
        );
    }

    #[test]
    fn test_object_url_region_and_endpoint() {
        let storage = service("eu-north-1", None);
        assert_eq!(
            storage.object_url("bucket", "a.png"),
            "https://bucket.s3.eu-north-1.amazonaws.com/a.png"
        );

        let storage = service("us-east-1", Some("http://127.0.0.1:9000/"));
        assert_eq!(
            storage.object_url("uploads", "a.png"),
            "http://127.0.0.1:9000/uploads/a.png"
        );
    }

    #[tokio::test]
    async fn test_read_part_splits_stream() {
        let data = vec![7u8; PART_SIZE + 10];
        let mut body: Body<'_> = Box::new(std::io::Cursor::new(data));
        assert_eq!(read_part(&mut body).await.unwrap().len(), PART_SIZE);
        assert_eq!(read_part(&mut body).await.unwrap().len(), 10);
        assert!(read_part(&mut body).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_part_short_body_stays_small() {
        let mut body: Body<'_> = Box::new(std::io::Cursor::new(b"tiny".to_vec()));
        let part = read_part(&mut body).await.unwrap();
        assert_eq!(part, b"tiny");
        assert!(part.capacity() < PART_SIZE);
    }
}
