use chrono::{DateTime, Utc};

// Re-export Instant so native and wasm builds time things the same way
pub use web_time::Instant as AppInstant;

pub const MS_IN_S: i64 = 1000;
pub const MS_IN_MIN: i64 = MS_IN_S * 60;
pub const MS_IN_H: i64 = MS_IN_MIN * 60;
pub const MS_IN_D: i64 = MS_IN_H * 24;

pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

pub fn now_timestamp_ms() -> i64 {
    now_utc().timestamp_millis()
}

/// Display form of an epoch-millisecond timestamp. Out-of-range input shows as "invalid".
pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => dt.format(STANDARD_TIME_FORMAT).to_string(),
        None => "invalid".to_string(),
    }
}

pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return format!("-{}", format_duration(ms.saturating_neg()));
    }
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }
    let months = days / 30;
    if months < 12 {
        return format!("{}M", months);
    }
    let years = months / 12;
    let rem_months = months % 12;
    format!("{}Y {}M", years, rem_months)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59 * MS_IN_S), "59s");
        assert_eq!(format_duration(5 * MS_IN_MIN), "5m");
        assert_eq!(format_duration(23 * MS_IN_H), "23h");
        assert_eq!(format_duration(2 * MS_IN_D), "2d");
        assert_eq!(format_duration(400 * MS_IN_D), "1Y 1M");
        assert_eq!(format_duration(-3 * MS_IN_MIN), "-3m");
    }

    #[test]
    fn test_epoch_ms_to_utc() {
        assert_eq!(epoch_ms_to_utc(0), "1970-01-01 00:00:00");
        assert_eq!(epoch_ms_to_utc(i64::MAX), "invalid");
    }
}
