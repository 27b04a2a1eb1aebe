//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a PCM byte count into seconds of audio
///
/// Assumes interleaved signed 16-bit samples.
pub fn pcm_bytes_to_secs(bytes: u64, sample_rate: u32, channels: u16) -> f64 {
    let bytes_per_second = sample_rate as u64 * channels as u64 * 2;
    if bytes_per_second == 0 {
        return 0.0;
    }
    bytes as f64 / bytes_per_second as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_pcm_bytes_to_secs() {
        // 48kHz stereo s16le = 192000 bytes per second
        assert_eq!(pcm_bytes_to_secs(192_000, 48_000, 2), 1.0);
        assert_eq!(pcm_bytes_to_secs(96_000, 48_000, 2), 0.5);
        assert_eq!(pcm_bytes_to_secs(0, 48_000, 2), 0.0);
    }

    #[test]
    fn test_pcm_bytes_to_secs_zero_rate() {
        assert_eq!(pcm_bytes_to_secs(1000, 0, 2), 0.0);
    }
}
