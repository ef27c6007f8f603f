use crate::error::{Error, Result};
use crate::models::ConversionSpec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Default window for a single download, from request to flushed file.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Pipeline configuration supplied at setup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Object storage access key (default: none, falls back to the AWS credential chain)
    pub key: Option<String>,

    /// Object storage secret (default: none)
    pub secret: Option<String>,

    /// Default destination bucket (default: none, must then be given per upload)
    pub bucket: Option<String>,

    /// Storage region (default: "us-east-1")
    pub region: String,

    /// Custom S3-compatible endpoint, addressed path-style (default: none)
    pub endpoint: Option<String>,

    /// Conversion applied to every upload that does not override it (default: none)
    pub convert: Option<ConversionSpec>,

    /// Download timeout (default: 10 seconds)
    #[serde(with = "duration_secs")]
    pub download_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            key: None,
            secret: None,
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            convert: None,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }
}

impl TransferConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let default = Self::default();

        let convert = match env::var("DUGG_CONVERT") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                serde_json::from_str(&raw)
                    .map_err(|e| Error::Config(format!("DUGG_CONVERT: {}", e)))?,
            ),
            _ => default.convert,
        };

        Ok(Self {
            key: env::var("DUGG_KEY").ok().or(default.key),
            secret: env::var("DUGG_SECRET").ok().or(default.secret),
            bucket: env::var("DUGG_BUCKET").ok().or(default.bucket),
            region: env::var("DUGG_REGION").unwrap_or(default.region),
            endpoint: env::var("DUGG_ENDPOINT").ok().or(default.endpoint),
            convert,
            download_timeout: match env::var("DUGG_TIMEOUT_SECS") {
                Ok(raw) if !raw.trim().is_empty() => parse_timeout_secs(&raw)
                    .map_err(|e| Error::Config(format!("DUGG_TIMEOUT_SECS: {}", e)))?,
                _ => default.download_timeout,
            },
        })
    }

    /// Load configuration from a JSON file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}

/// Seconds, possibly fractional, as a timeout.
fn timeout_from_secs(secs: f64) -> std::result::Result<Duration, String> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("timeout must be a non-negative number of seconds, got {}", secs))
}

fn parse_timeout_secs(raw: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {:?}", raw))?;
    timeout_from_secs(secs)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        super::timeout_from_secs(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TransferConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.download_timeout, Duration::from_secs(10));
        assert!(config.bucket.is_none());
        assert!(config.convert.is_none());
    }

    #[test]
    fn test_from_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bucket": "7ino", "download_timeout": 2.5, "convert": {{"resize": [120, 120], "greyscale": []}}}}"#
        )
        .unwrap();

        let config = TransferConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bucket.as_deref(), Some("7ino"));
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.download_timeout, Duration::from_millis(2500));

        let spec = config.convert.unwrap();
        let names: Vec<&str> = spec.operations().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["resize", "greyscale"]);
    }

    #[test]
    fn test_parse_timeout_secs() {
        assert_eq!(parse_timeout_secs("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_timeout_secs(" 30 ").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout_secs("0").unwrap(), Duration::ZERO);
        assert!(parse_timeout_secs("ten").is_err());
        assert!(parse_timeout_secs("-1").is_err());
        assert!(parse_timeout_secs("NaN").is_err());
        assert!(parse_timeout_secs("inf").is_err());
    }

    #[test]
    fn test_from_env_timeout() {
        // Only this test touches DUGG_TIMEOUT_SECS
        unsafe { env::set_var("DUGG_TIMEOUT_SECS", "1.5") };
        let config = TransferConfig::from_env().unwrap();
        assert_eq!(config.download_timeout, Duration::from_millis(1500));

        unsafe { env::set_var("DUGG_TIMEOUT_SECS", "soon") };
        let err = TransferConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.starts_with("DUGG_TIMEOUT_SECS")));

        unsafe { env::remove_var("DUGG_TIMEOUT_SECS") };
        let config = TransferConfig::from_env().unwrap();
        assert_eq!(config.download_timeout, DEFAULT_DOWNLOAD_TIMEOUT);
    }

    #[test]
    fn test_from_file_rejects_negative_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"download_timeout": -3}}"#).unwrap();
        assert!(matches!(
            TransferConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = TransferConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
