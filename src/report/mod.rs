//! Reporting utilities: per-field summaries and formatted terminal output.

use chrono::NaiveDate;

use crate::domain::{DataType, Record, column_names};

pub mod format;

pub use format::*;

/// Min/mean/max of one numeric field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStats {
    pub field: String,
    pub count: usize,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Overview of a fetched series.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub data_type: String,
    pub records: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub fields: Vec<FieldStats>,
}

/// Summarize `records`: the date span by the type's dating field plus stats for
/// every field that holds numbers. Null and non-numeric values are skipped.
pub fn summarize(data_type: DataType, records: &[Record]) -> Summary {
    let dates: Vec<NaiveDate> = records.iter().filter_map(|r| r.date(data_type.date_field())).collect();

    let fields = column_names(records)
        .into_iter()
        .filter_map(|column| {
            let values: Vec<f64> = records
                .iter()
                .filter_map(|r| r.get(column).and_then(|v| v.as_f64()))
                .collect();
            if values.is_empty() {
                return None;
            }
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Some(FieldStats {
                field: column.to_string(),
                count: values.len(),
                min,
                mean,
                max,
            })
        })
        .collect();

    Summary {
        data_type: data_type.name().to_string(),
        records: records.len(),
        first_day: dates.iter().min().copied(),
        last_day: dates.iter().max().copied(),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 4, d).unwrap()
    }

    #[test]
    fn summarize_basic() {
        let records = vec![
            Record::new().with("dateTime", day(24)).with("value", 100_i64),
            Record::new().with("dateTime", day(25)).with("value", FieldValue::Null),
            Record::new().with("dateTime", day(26)).with("value", 300_i64),
        ];
        let summary = summarize(DataType::Steps, &records);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.first_day, Some(day(24)));
        assert_eq!(summary.last_day, Some(day(26)));
        assert_eq!(summary.fields.len(), 1);

        let value = &summary.fields[0];
        assert_eq!(value.field, "value");
        assert_eq!(value.count, 2);
        assert_eq!((value.min, value.mean, value.max), (100.0, 200.0, 300.0));
    }

    #[test]
    fn summarize_empty() {
        let summary = summarize(DataType::Sleep, &[]);
        assert_eq!(summary.records, 0);
        assert!(summary.first_day.is_none());
        assert!(summary.fields.is_empty());
    }
}
