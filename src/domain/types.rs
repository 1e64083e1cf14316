//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by either a vendor client or a synthetic generator
//! - filtered by date without knowing which one produced them
//! - rendered to the terminal or exported to JSON/CSV

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::ValueEnum;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::AppError;

/// Every metric a supported device can report.
///
/// The set is closed: a name that does not parse into one of these variants is
/// rejected before any device logic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    Sleep,
    Steps,
    MinutesVeryActive,
    MinutesLightlyActive,
    MinutesFairlyActive,
    Distance,
    MinutesSedentary,
    HeartRateDay,
    Hrv,
    DistanceDay,
    Cycles,
    Sleeps,
    Workouts,
    HeartRate,
    HealthMetrics,
}

impl DataType {
    pub const ALL: [DataType; 15] = [
        DataType::Sleep,
        DataType::Steps,
        DataType::MinutesVeryActive,
        DataType::MinutesLightlyActive,
        DataType::MinutesFairlyActive,
        DataType::Distance,
        DataType::MinutesSedentary,
        DataType::HeartRateDay,
        DataType::Hrv,
        DataType::DistanceDay,
        DataType::Cycles,
        DataType::Sleeps,
        DataType::Workouts,
        DataType::HeartRate,
        DataType::HealthMetrics,
    ];

    /// Name used by callers and by the vendor APIs.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Sleep => "sleep",
            DataType::Steps => "steps",
            DataType::MinutesVeryActive => "minutesVeryActive",
            DataType::MinutesLightlyActive => "minutesLightlyActive",
            DataType::MinutesFairlyActive => "minutesFairlyActive",
            DataType::Distance => "distance",
            DataType::MinutesSedentary => "minutesSedentary",
            DataType::HeartRateDay => "heart_rate_day",
            DataType::Hrv => "hrv",
            DataType::DistanceDay => "distance_day",
            DataType::Cycles => "cycles",
            DataType::Sleeps => "sleeps",
            DataType::Workouts => "workouts",
            DataType::HeartRate => "heart_rate",
            DataType::HealthMetrics => "health_metrics",
        }
    }

    /// Record field that places a record on the calendar.
    pub fn date_field(self) -> &'static str {
        match self {
            DataType::Sleep => "dateOfSleep",
            DataType::Steps
            | DataType::MinutesVeryActive
            | DataType::MinutesLightlyActive
            | DataType::MinutesFairlyActive
            | DataType::Distance
            | DataType::MinutesSedentary
            | DataType::HeartRateDay
            | DataType::Hrv
            | DataType::DistanceDay => "dateTime",
            DataType::Cycles | DataType::HealthMetrics => "day",
            DataType::Sleeps | DataType::Workouts => "time_lower_bound",
            DataType::HeartRate => "timestamp",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DataType::Sleep => "nightly sleep summary",
            DataType::Steps => "steps per day",
            DataType::MinutesVeryActive => "minutes of high activity per day",
            DataType::MinutesLightlyActive => "minutes of light activity per day",
            DataType::MinutesFairlyActive => "minutes of fair activity per day",
            DataType::Distance => "distance per day, in miles",
            DataType::MinutesSedentary => "minutes with no activity per day",
            DataType::HeartRateDay => "heart rate, one sample per minute",
            DataType::Hrv => "nightly heart rate variability (RMSSD)",
            DataType::DistanceDay => "distance moved per minute",
            DataType::Cycles => "physiological cycles with recovery and strain",
            DataType::Sleeps => "sleeps and naps linked to cycles",
            DataType::Workouts => "workouts linked to cycles",
            DataType::HeartRate => "heart rate time series",
            DataType::HealthMetrics => "health monitor metrics per cycle",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| AppError::UnsupportedDataType {
                data_type: s.to_string(),
                device: "any device".to_string(),
            })
    }
}

/// Devices with a vendor client and a synthetic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DeviceKind {
    FitbitSense,
    Whoop,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 2] = [DeviceKind::FitbitSense, DeviceKind::Whoop];

    /// Registry key, `<vendor>/<device>`.
    pub fn key(self) -> &'static str {
        match self {
            DeviceKind::FitbitSense => "fitbit/fitbit_sense",
            DeviceKind::Whoop => "whoop/whoop_user",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DeviceKind::FitbitSense => "Fitbit Sense",
            DeviceKind::Whoop => "Whoop",
        }
    }

    pub fn supported_types(self) -> &'static [DataType] {
        match self {
            DeviceKind::FitbitSense => &[
                DataType::Sleep,
                DataType::Steps,
                DataType::MinutesVeryActive,
                DataType::MinutesLightlyActive,
                DataType::MinutesFairlyActive,
                DataType::Distance,
                DataType::MinutesSedentary,
                DataType::HeartRateDay,
                DataType::Hrv,
                DataType::DistanceDay,
            ],
            DeviceKind::Whoop => &[
                DataType::Cycles,
                DataType::Sleeps,
                DataType::Workouts,
                DataType::HeartRate,
                DataType::HealthMetrics,
            ],
        }
    }

    pub fn supports(self, data_type: DataType) -> bool {
        self.supported_types().contains(&data_type)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DeviceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceKind::ALL
            .into_iter()
            .find(|d| d.key() == s || d.to_possible_value().is_some_and(|v| v.matches(s, true)))
            .ok_or_else(|| AppError::Config(format!("Unknown device '{s}'.")))
    }
}

/// Where a device gets its records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Synthetic,
    Real,
}

/// A single value inside a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
    Null,
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Calendar date of a date or timestamp value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Timestamp(ts) => Some(ts.date_naive()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Date(v) => write!(f, "{v}"),
            FieldValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            FieldValue::Null => Ok(()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// One row of wearable data: field names mapped to values, in column order.
///
/// Column order is kept as inserted so exports line up with the vendor's own
/// layout. Setting an existing field replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Calendar date stored under `key`, if that field holds a date or timestamp.
    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.get(key).and_then(FieldValue::as_date)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Union of the field names of `records`, in order of first appearance.
pub fn column_names(records: &[Record]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for key in records.iter().flat_map(Record::keys) {
        if !columns.contains(&key) {
            columns.push(key);
        }
    }
    columns
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_names_round_trip() {
        for t in DataType::ALL {
            assert_eq!(t.name().parse::<DataType>().unwrap(), t);
        }
        assert!(matches!(
            "calories".parse::<DataType>(),
            Err(AppError::UnsupportedDataType { .. })
        ));
    }

    #[test]
    fn device_kind_parses_registry_key_and_cli_name() {
        assert_eq!("fitbit/fitbit_sense".parse::<DeviceKind>().unwrap(), DeviceKind::FitbitSense);
        assert_eq!("whoop".parse::<DeviceKind>().unwrap(), DeviceKind::Whoop);
        assert!("garmin/fenix".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn device_type_tables_do_not_overlap() {
        for t in DeviceKind::FitbitSense.supported_types() {
            assert!(!DeviceKind::Whoop.supports(*t), "{t} listed for both devices");
        }
        let total = DeviceKind::FitbitSense.supported_types().len() + DeviceKind::Whoop.supported_types().len();
        assert_eq!(total, DataType::ALL.len());
    }

    #[test]
    fn record_keeps_column_order_and_replaces_in_place() {
        let mut r = Record::new().with("dateTime", NaiveDate::from_ymd_opt(2022, 4, 24).unwrap()).with("value", 10_i64);
        r.set("dateTime", NaiveDate::from_ymd_opt(2022, 4, 25).unwrap());
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["dateTime", "value"]);
        assert_eq!(r.date("dateTime"), NaiveDate::from_ymd_opt(2022, 4, 25));
        assert_eq!(r.get("value").and_then(FieldValue::as_f64), Some(10.0));
    }

    #[test]
    fn record_serializes_as_flat_object() {
        let r = Record::new()
            .with("dateTime", NaiveDate::from_ymd_opt(2022, 4, 24).unwrap())
            .with("value", 8123_i64)
            .with("note", None::<String>);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"dateTime":"2022-04-24","value":8123,"note":null}"#);
    }

    #[test]
    fn timestamp_values_report_their_local_date() {
        let ts = DateTime::parse_from_rfc3339("2022-04-24T23:30:00-07:00").unwrap();
        assert_eq!(FieldValue::from(ts).as_date(), NaiveDate::from_ymd_opt(2022, 4, 24));
    }

    #[test]
    fn column_names_union_in_first_seen_order() {
        let records = vec![
            Record::new().with("day", "a").with("rhr", 52_i64),
            Record::new().with("day", "b").with("hrv", 60_i64).with("rhr", 50_i64),
        ];
        assert_eq!(column_names(&records), vec!["day", "rhr", "hrv"]);
    }
}
