//! Lenient timestamp parsing for mixed-format `DateTime` columns.
//!
//! Raw exports mix ISO timestamps, slash and dot separated dates, US
//! month-first dates, 12-hour clocks and the Korean `오전`/`오후` meridiem.
//! Values that match none of the known layouts become `None` and are
//! counted so the caller can surface a warning.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Date-and-time layouts tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%Y/%m/%d %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Date-only layouts, midnight assumed.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%m/%d/%Y"];

/// Korean meridiem placed between date and time: `2022-01-26 오후 3:05:00`.
static KOREAN_MERIDIEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<date>\S+)\s+(?P<meridiem>오전|오후)\s*(?P<hour>\d{1,2}):(?P<rest>\d{2}(?::\d{2}(?:\.\d+)?)?)$")
        .expect("Invalid regex: KOREAN_MERIDIEM")
});

/// Parse a single timestamp, returning `None` when no layout matches.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(converted) = convert_korean_meridiem(value) {
        return parse_timestamp(&converted);
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }

    parse_date_only(value).and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parse a calendar date, accepting a full timestamp as well.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    parse_date_only(value).or_else(|| parse_timestamp(value).map(|ts| ts.date()))
}

fn parse_date_only(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Rewrite `오전/오후 h:mm[:ss]` into a 24-hour clock.
fn convert_korean_meridiem(value: &str) -> Option<String> {
    let caps = KOREAN_MERIDIEM.captures(value)?;
    let mut hour: u32 = caps["hour"].parse().ok()?;
    if hour > 12 {
        return None;
    }
    match &caps["meridiem"] {
        "오후" if hour < 12 => hour += 12,
        "오전" if hour == 12 => hour = 0,
        _ => {}
    }
    Some(format!("{} {:02}:{}", &caps["date"], hour, &caps["rest"]))
}

/// Result of coercing a whole column.
#[derive(Debug, Clone, Default)]
pub struct ParsedTimestamps {
    pub values: Vec<Option<NaiveDateTime>>,
    /// Entries that ended up missing, including cells that were already null.
    pub failures: usize,
}

/// Coerce every cell of a timestamp column.
pub fn parse_timestamp_column<'a, I>(raw: I) -> ParsedTimestamps
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let values: Vec<Option<NaiveDateTime>> = raw
        .into_iter()
        .map(|cell| cell.and_then(parse_timestamp))
        .collect();
    let failures = values.iter().filter(|v| v.is_none()).count();
    ParsedTimestamps { values, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn ts(date: (i32, u32, u32), time: (u32, u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(time.0, time.1, time.2).unwrap())
    }

    #[test]
    fn test_iso_variants() {
        let expected = ts((2022, 1, 26), (9, 30, 0));
        assert_eq!(parse_timestamp("2022-01-26 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2022-01-26T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2022-01-26 09:30"), Some(expected));
        assert_eq!(parse_timestamp("2022/01/26 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2022.01.26 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2022-01-26 09:30:00 "), Some(expected));
    }

    #[test]
    fn test_fractional_and_rfc3339() {
        let parsed = parse_timestamp("2022-01-26 09:30:00.250").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2022, 1, 26).unwrap());

        let rfc = parse_timestamp("2022-01-26T09:30:00+09:00").unwrap();
        assert_eq!(rfc, ts((2022, 1, 26), (9, 30, 0)));
    }

    #[test]
    fn test_date_only_and_us_layout() {
        assert_eq!(parse_timestamp("2022-01-26"), Some(ts((2022, 1, 26), (0, 0, 0))));
        assert_eq!(
            parse_timestamp("01/26/2022 18:05:00"),
            Some(ts((2022, 1, 26), (18, 5, 0)))
        );
    }

    #[test]
    fn test_meridiem_clocks() {
        assert_eq!(
            parse_timestamp("2022-01-26 오후 3:05:00"),
            Some(ts((2022, 1, 26), (15, 5, 0)))
        );
        assert_eq!(
            parse_timestamp("2022-01-26 오전 12:10:00"),
            Some(ts((2022, 1, 26), (0, 10, 0)))
        );
        assert_eq!(
            parse_timestamp("2022-01-26 오후 12:00:00"),
            Some(ts((2022, 1, 26), (12, 0, 0)))
        );
        assert_eq!(
            parse_timestamp("2022-01-26 03:05:00 PM"),
            Some(ts((2022, 1, 26), (15, 5, 0)))
        );
    }

    #[test]
    fn test_unparseable_values() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2022-13-40 09:00:00"), None);
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        let day = NaiveDate::from_ymd_opt(2022, 5, 11).unwrap();
        assert_eq!(parse_date("2022-05-11"), Some(day));
        assert_eq!(parse_date("2022-05-11 23:59:59"), Some(day));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_column_failures_are_counted() {
        let parsed = parse_timestamp_column(vec![
            Some("2022-01-26 08:00:00"),
            Some("garbage"),
            None,
            Some("2022-01-27"),
        ]);
        assert_eq!(parsed.values.len(), 4);
        assert_eq!(parsed.failures, 2);
        assert!(parsed.values[0].is_some());
        assert!(parsed.values[3].is_some());
    }
}
