use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Milliseconds since the epoch, bumped so that successive calls in this
/// process never return the same value.
pub fn next_timestamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(previous + 1)
}

/// Destination key for an upload: `<millis><name>` when timestamped.
pub fn destination_key(name: &str, timestamp: bool) -> String {
    if timestamp {
        format!("{}{}", next_timestamp(), name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_strictly_increase() {
        let stamps: Vec<i64> = (0..1000).map(|_| next_timestamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_destination_key() {
        assert_eq!(destination_key("logo.png", false), "logo.png");

        let key = destination_key("logo.png", true);
        let prefix = key.strip_suffix("logo.png").unwrap();
        assert!(!prefix.is_empty());
        assert!(prefix.chars().all(|c| c.is_ascii_digit()));
    }
}
