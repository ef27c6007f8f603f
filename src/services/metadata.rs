use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::process::Command;
use tracing::error;

/// External tool that prints `Tag Name : value` lines
const EXIFTOOL: &str = "exiftool";

/// Runs exiftool on `path` and returns its tags keyed in snake_case
/// (`File Name` becomes `file_name`).
pub async fn info(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let output = Command::new(EXIFTOOL)
        .arg(path.as_os_str())
        .output()
        .await
        .map_err(|e| Error::Metadata(format!("failed to run {}: {}", EXIFTOOL, e)))?;

    if !output.status.success() {
        let err_msg = String::from_utf8_lossy(&output.stderr);
        error!("{} failed: {}", EXIFTOOL, err_msg);
        return Err(Error::Metadata(format!("{} failed: {}", EXIFTOOL, err_msg.trim())));
    }

    Ok(parse_tags(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_tags(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (snake_case(name), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn snake_case(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let stdout = "ExifTool Version Number         : 12.40\n\
                      File Name                       : sirloin-logo.png\n\
                      File Size                       : 11 kB\n\
                      Image Size                      : 120x120\n\
                      File Modification Date/Time     : 2019:07:31 08:00:19+00:00\n\
                      garbage line\n";
        let tags = parse_tags(stdout);
        assert_eq!(tags["file_name"], "sirloin-logo.png");
        assert_eq!(tags["file_size"], "11 kB");
        assert_eq!(tags["image_size"], "120x120");
        assert_eq!(tags["file_modification_date/time"], "2019:07:31 08:00:19+00:00");
        assert!(!tags.contains_key("garbage_line"));
    }
}
