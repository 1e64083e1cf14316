//! Export records to CSV or JSON.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.
//! CSV columns are the union of every record's fields; missing cells stay empty.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::domain::{Record, column_names};
use crate::error::AppError;

/// File format picked from an export path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(AppError::Config(format!(
                "Expected a .csv or .json export path (got: {}).",
                path.display()
            ))),
        }
    }
}

/// Write `records` to `path` in the format its extension names.
pub fn export_records(path: &Path, records: &[Record]) -> Result<(), AppError> {
    let format = ExportFormat::from_path(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create export file '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    match format {
        ExportFormat::Csv => write_csv(&mut writer, records)?,
        ExportFormat::Json => write_json(&mut writer, records)?,
    }
    writer
        .flush()
        .map_err(|e| AppError::Io(format!("Failed to write export file '{}': {e}", path.display())))?;
    info!(path = %path.display(), records = records.len(), ?format, "exported records");
    Ok(())
}

/// CSV with a header row over the union of the records' columns.
pub fn write_csv(writer: impl Write, records: &[Record]) -> Result<(), AppError> {
    let columns = column_names(records);
    let mut csv = csv::Writer::from_writer(writer);
    if !columns.is_empty() {
        csv.write_record(&columns)
            .map_err(|e| AppError::Io(format!("Failed to write CSV header: {e}")))?;
    }
    for r in records {
        let row = columns.iter().map(|c| r.get(c).map(ToString::to_string).unwrap_or_default());
        csv.write_record(row)
            .map_err(|e| AppError::Io(format!("Failed to write CSV row: {e}")))?;
    }
    csv.flush()
        .map_err(|e| AppError::Io(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

/// Pretty-printed JSON array of flat objects.
pub fn write_json(mut writer: impl Write, records: &[Record]) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| AppError::Io(format!("Failed to write JSON: {e}")))?;
    writeln!(writer).map_err(|e| AppError::Io(format!("Failed to write JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new()
                .with("dateOfSleep", NaiveDate::from_ymd_opt(2022, 4, 24).unwrap())
                .with("minutesAsleep", 410_i64),
            Record::new()
                .with("dateOfSleep", NaiveDate::from_ymd_opt(2022, 4, 25).unwrap())
                .with("minutesAsleep", 388_i64)
                .with("startTime", DateTime::parse_from_rfc3339("2022-04-24T22:41:00+00:00").unwrap()),
        ]
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a/b.json")).unwrap(), ExportFormat::Json);
        assert!(ExportFormat::from_path(Path::new("out.txt")).is_err());
        assert!(ExportFormat::from_path(Path::new("out")).is_err());
    }

    #[test]
    fn csv_uses_union_of_columns() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &records()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "dateOfSleep,minutesAsleep,startTime");
        assert_eq!(lines[1], "2022-04-24,410,");
        assert_eq!(lines[2], "2022-04-25,388,2022-04-24T22:41:00+00:00");
    }

    #[test]
    fn export_writes_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sleep.csv");
        export_records(&path, &records()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), 3);
        assert_eq!(reader.records().count(), 2);
    }

    #[test]
    fn export_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sleep.json");
        export_records(&path, &records()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["minutesAsleep"], 410);
        assert_eq!(rows[1]["dateOfSleep"], "2022-04-25");
        assert!(rows[0].get("startTime").is_none());
    }

    #[test]
    fn export_rejects_unknown_extension_without_creating_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sleep.xlsx");
        assert!(matches!(export_records(&path, &records()), Err(AppError::Config(_))));
        assert!(!path.exists());
    }
}
