/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Render Unix millis as RFC 3339 for logs and receipts
///
/// Out-of-range values fall back to the raw number.
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_millis(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2024-01-01 UTC
        assert!(now_millis() > 1_704_067_200_000);
    }
}
