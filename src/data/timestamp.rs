//! Vendor timestamp correction.
//!
//! Whoop sends sleep bounds like `2022-04-24T05:12:45.12+00:00`: the fraction may
//! have fewer than three digits and the offset is always `+00:00`, with the real
//! offset delivered separately as `timezoneOffset` (`-0700`). We repair both before
//! parsing.
//!
//! Parsed timestamps can also be moved to a caller-chosen display offset.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::{Captures, Regex};

use crate::domain::{FieldValue, Record};
use crate::error::AppError;

static FRACTION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\.([0-9]{0,3})([+-])").ok());
static OFFSET: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[+-][0-9]{2}:[0-9]{2}$").ok());

/// Repair a Whoop timestamp and its separate `±HHMM` offset into a parsed datetime.
pub fn normalize_whoop_timestamp(raw: &str, tz_offset: &str) -> Result<DateTime<FixedOffset>, AppError> {
    let offset = colon_offset(tz_offset)
        .ok_or_else(|| AppError::malformed("Whoop", format!("invalid timezone offset '{tz_offset}'")))?;

    let (Some(fraction), Some(offset_re)) = (FRACTION.as_ref(), OFFSET.as_ref()) else {
        return Err(AppError::Config("timestamp patterns failed to compile".to_string()));
    };

    let padded = fraction.replace(raw.trim(), |caps: &Captures<'_>| format!(".{:0<3}{}", &caps[1], &caps[2]));
    let corrected = offset_re.replace(&padded, offset.as_str());

    DateTime::parse_from_rfc3339(&corrected)
        .or_else(|_| DateTime::parse_from_str(&corrected, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .map_err(|e| AppError::malformed("Whoop", format!("invalid timestamp '{raw}': {e}")))
}

/// `-0700` -> `-07:00`. Already-colonized offsets pass through.
fn colon_offset(tz: &str) -> Option<String> {
    let tz = tz.trim();
    let (sign, rest) = tz.split_at_checked(1)?;
    if sign != "+" && sign != "-" {
        return None;
    }
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{sign}{}:{}", &digits[..2], &digits[2..]))
}

/// Parse a display offset: `UTC`, `Z`, `+05:30` or `-0700`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, AppError> {
    let raw = raw.trim();
    let invalid = || AppError::Config(format!("Invalid UTC offset '{raw}' (expected UTC, +HH:MM or -HHMM)."));
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let colon = colon_offset(raw).ok_or_else(invalid)?;
    let (hours, minutes) = (&colon[1..3], &colon[4..6]);
    let secs = hours.parse::<i32>().map_err(|_| invalid())? * 3600 + minutes.parse::<i32>().map_err(|_| invalid())? * 60;
    let secs = if colon.starts_with('-') { -secs } else { secs };
    FixedOffset::east_opt(secs).ok_or_else(invalid)
}

/// Shift the timestamp `fields` of `record` to `tz`. The instants are unchanged.
pub fn localize(record: &mut Record, fields: &[&str], tz: FixedOffset) {
    for field in fields {
        if let Some(FieldValue::Timestamp(ts)) = record.get(field) {
            let local = ts.with_timezone(&tz);
            record.set(*field, local);
        }
    }
}

/// Unix milliseconds to a UTC timestamp.
pub fn from_unix_millis(millis: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(millis).map(|ts| ts.fixed_offset())
}

/// Parse a naive vendor timestamp, reading it as UTC.
pub fn naive_as_utc(raw: &str) -> Option<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_fractions_and_applies_offset() {
        let ts = normalize_whoop_timestamp("2022-04-24T05:12:45.12+00:00", "-0700").unwrap();
        assert_eq!(ts.to_rfc3339(), "2022-04-24T05:12:45.120-07:00");
    }

    #[test]
    fn empty_fraction_is_padded_to_zero() {
        let ts = normalize_whoop_timestamp("2022-04-24T05:12:45.+00:00", "+0200").unwrap();
        assert_eq!(ts.to_rfc3339(), "2022-04-24T05:12:45+02:00");
    }

    #[test]
    fn accepts_space_separated_and_colon_offsets() {
        let ts = normalize_whoop_timestamp("2022-04-24 23:01:02.5+00:00", "+05:30").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn rejects_malformed_offsets() {
        assert!(matches!(
            normalize_whoop_timestamp("2022-04-24T05:12:45.12+00:00", "PST"),
            Err(AppError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn unix_millis_are_utc() {
        let ts = from_unix_millis(1_650_758_400_000).unwrap();
        assert_eq!(ts.to_rfc3339(), "2022-04-24T00:00:00+00:00");
    }

    #[test]
    fn naive_timestamps_read_as_utc() {
        let ts = naive_as_utc("2022-04-24T23:10:30.000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2022-04-24T23:10:30+00:00");
        assert!(naive_as_utc("yesterday").is_none());
    }

    #[test]
    fn display_offsets_parse_in_both_spellings() {
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(parse_utc_offset("-0700").unwrap().local_minus_utc(), -7 * 3600);
        assert!(matches!(parse_utc_offset("America/Denver"), Err(AppError::Config(_))));
        assert!(parse_utc_offset("+25:00").is_err());
    }

    #[test]
    fn localize_keeps_the_instant() {
        let ts = DateTime::parse_from_rfc3339("2022-04-24T05:00:00-07:00").unwrap();
        let mut record = Record::new().with("start", ts).with("score", 80_i64);
        localize(&mut record, &["start", "score", "missing"], parse_utc_offset("+02:00").unwrap());

        let Some(FieldValue::Timestamp(local)) = record.get("start") else {
            panic!("start is not a timestamp");
        };
        assert_eq!(local.to_rfc3339(), "2022-04-24T14:00:00+02:00");
        assert_eq!(*local, ts);
        assert_eq!(record.get("score"), Some(&FieldValue::Int(80)));
    }
}
