//! RFC 1123 dates for the `Date` header.
//!
//! Names come from fixed tables so output never depends on the host locale.

use chrono::{DateTime, Datelike, Timelike, Utc};

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Format a timestamp, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
pub fn format_http_date(ts: DateTime<Utc>) -> String {
    format!(
        "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
        WEEKDAY_NAMES[ts.weekday().num_days_from_monday() as usize],
        ts.day(),
        MONTH_NAMES[ts.month0() as usize],
        ts.year(),
        ts.hour(),
        ts.minute(),
        ts.second()
    )
}

/// The current time in `Date` header format.
pub fn date_time_string() -> String {
    format_http_date(Utc::now())
}

/// Parse a date produced by [`format_http_date`].
#[cfg(test)]
pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, "%a, %d %b %Y %H:%M:%S GMT")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_epoch() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(format_http_date(ts), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_zero_padding() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(format_http_date(ts), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn test_parse_reproduces_calendar_fields() {
        for secs in [0i64, 784_111_777, 951_782_400, 1_700_000_000, 4_102_444_799] {
            let ts = Utc.timestamp_opt(secs, 0).unwrap();
            let parsed = parse_http_date(&format_http_date(ts)).unwrap();
            assert_eq!(parsed, ts);
            assert_eq!(parsed.weekday(), ts.weekday());
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_http_date("yesterday").is_none());
        assert!(parse_http_date("Thu, 01 Jan 1970 00:00:00 PST").is_none());
    }

    #[test]
    fn test_now_has_expected_shape() {
        let now = date_time_string();
        assert_eq!(now.len(), 29);
        assert!(now.ends_with(" GMT"));
        assert!(parse_http_date(&now).is_some());
    }
}
