//! Parsing helpers for the loosely-typed text columns of the legacy store.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Legacy timestamps are RFC 3339, SQLite `CURRENT_TIMESTAMP` text (UTC), or a bare date.
pub fn parse_legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    parse_legacy_date(s).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// A calendar date, accepting a trailing time component.
pub fn parse_legacy_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let date_part = s.get(..10)?;
    let rest = &s[10..];
    if rest.starts_with(' ') || rest.starts_with('T') {
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    } else {
        None
    }
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Day-of-month from a legacy alert-day column, which holds either the day
/// number itself or a full date; for a date only the day component is kept.
pub fn parse_alert_day(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Ok(day) = s.parse::<u32>() {
        return (1..=31).contains(&day).then_some(day);
    }
    parse_legacy_date(s).map(|d| d.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_in_all_legacy_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 7, 2, 11, 30, 0).unwrap();
        assert_eq!(parse_legacy_timestamp("2024-07-02 11:30:00"), Some(expected));
        assert_eq!(parse_legacy_timestamp("2024-07-02T11:30:00Z"), Some(expected));
        assert_eq!(parse_legacy_timestamp("2024-07-02T13:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_legacy_timestamp("2024-07-02"),
            Some(Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_legacy_timestamp("yesterday"), None);
    }

    #[test]
    fn alert_day_from_date_keeps_only_the_day() {
        assert_eq!(parse_alert_day("2024-07-25"), Some(25));
        assert_eq!(parse_alert_day("2023-12-31 00:00:00"), Some(31));
        assert_eq!(parse_alert_day(" 7 "), Some(7));
    }

    #[test]
    fn alert_day_rejects_garbage() {
        assert_eq!(parse_alert_day("0"), None);
        assert_eq!(parse_alert_day("32"), None);
        assert_eq!(parse_alert_day("2024-02-30"), None);
        assert_eq!(parse_alert_day("soon"), None);
    }

    #[test]
    fn time_of_day_with_or_without_seconds() {
        assert_eq!(parse_time_of_day("09:00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_time_of_day("14:30:15"), NaiveTime::from_hms_opt(14, 30, 15));
        assert_eq!(parse_time_of_day("25:00"), None);
    }
}
