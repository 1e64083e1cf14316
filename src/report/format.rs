//! Formatted terminal output.
//!
//! Formatting lives in one place so fetch and filter code stays free of
//! presentation details. Every function returns a `String`; the caller prints.

use crate::domain::{DataSource, DeviceKind, FieldValue, Record, column_names};
use crate::report::Summary;

/// Widest a table cell may get before it is cut.
const MAX_CELL_WIDTH: usize = 26;

/// List each device with its key and supported types.
pub fn format_types(devices: &[DeviceKind]) -> String {
    let mut out = String::new();
    for (i, device) in devices.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{} ({})\n", device.display_name(), device.key()));
        for t in device.supported_types() {
            out.push_str(&format!("  {:<22} {}\n", t.name(), t.description()));
        }
    }
    out
}

/// Render records as an aligned table over the union of their columns.
///
/// At most `limit` rows are shown; a trailing line reports how many were left out.
pub fn format_table(records: &[Record], limit: Option<usize>) -> String {
    if records.is_empty() {
        return "(no records)\n".to_string();
    }

    let columns = column_names(records);
    let shown = limit.unwrap_or(records.len()).min(records.len());
    let rows: Vec<Vec<String>> = records[..shown]
        .iter()
        .map(|r| {
            columns
                .iter()
                .map(|c| truncate(&r.get(c).map(fmt_value).unwrap_or_default(), MAX_CELL_WIDTH))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count().min(MAX_CELL_WIDTH)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns.iter().map(|c| truncate(c, MAX_CELL_WIDTH)).collect();
    push_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }

    if shown < records.len() {
        out.push_str(&format!("... {} more record(s)\n", records.len() - shown));
    }
    out
}

/// Render a [`Summary`] for the terminal.
pub fn format_summary(summary: &Summary, device: DeviceKind, source: DataSource) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} / {} ({}) ===\n",
        device.display_name(),
        summary.data_type,
        source_label(source)
    ));
    out.push_str(&format!("Records: {}\n", summary.records));
    match (summary.first_day, summary.last_day) {
        (Some(first), Some(last)) => out.push_str(&format!("Days: {first} .. {last}\n")),
        _ => out.push_str("Days: -\n"),
    }

    if summary.fields.is_empty() {
        return out;
    }
    out.push('\n');
    out.push_str(format!("{:<28} {:>6} {:>12} {:>12} {:>12}", "field", "n", "min", "mean", "max").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<28} {:-<6} {:-<12} {:-<12} {:-<12}", "", "", "", "", "").trim_end());
    out.push('\n');
    for f in &summary.fields {
        out.push_str(&format!(
            "{:<28} {:>6} {:>12} {:>12} {:>12}\n",
            truncate(&f.field, 28),
            f.count,
            fmt_number(f.min),
            fmt_number(f.mean),
            fmt_number(f.max),
        ));
    }
    out
}

fn source_label(source: DataSource) -> &'static str {
    match source {
        DataSource::Synthetic => "synthetic",
        DataSource::Real => "real",
    }
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn fmt_value(v: &FieldValue) -> String {
    match v {
        FieldValue::Float(x) => fmt_number(*x),
        FieldValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
        other => other.to_string(),
    }
}

fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::DataType;
    use crate::report::summarize;

    fn steps(days: u32) -> Vec<Record> {
        (1..=days)
            .map(|d| {
                Record::new()
                    .with("dateTime", NaiveDate::from_ymd_opt(2022, 4, d).unwrap())
                    .with("value", 1000_i64 * i64::from(d))
            })
            .collect()
    }

    #[test]
    fn table_has_header_rule_and_rows() {
        let table = format_table(&steps(2), None);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "dateTime    value");
        assert_eq!(lines[1], "----------  -----");
        assert_eq!(lines[2], "2022-04-01  1000");
    }

    #[test]
    fn table_limit_reports_hidden_rows() {
        let table = format_table(&steps(5), Some(2));
        assert_eq!(table.lines().count(), 5);
        assert!(table.ends_with("... 3 more record(s)\n"));
    }

    #[test]
    fn table_fills_missing_columns_with_blanks() {
        let records = vec![
            Record::new().with("a", 1_i64),
            Record::new().with("a", 2_i64).with("b", 1.5),
        ];
        let table = format_table(&records, None);
        assert!(table.lines().next().unwrap().contains('b'));
        assert!(table.contains("1.500"));
    }

    #[test]
    fn empty_table() {
        assert_eq!(format_table(&[], None), "(no records)\n");
    }

    #[test]
    fn types_lists_every_supported_type() {
        let out = format_types(&[DeviceKind::Whoop]);
        assert!(out.starts_with("Whoop (whoop/whoop_user)"));
        for t in DeviceKind::Whoop.supported_types() {
            assert!(out.contains(t.name()));
        }
    }

    #[test]
    fn summary_shows_span_and_stats() {
        let summary = summarize(DataType::Steps, &steps(3));
        let out = format_summary(&summary, DeviceKind::FitbitSense, DataSource::Synthetic);
        assert!(out.starts_with("=== Fitbit Sense / steps (synthetic) ==="));
        assert!(out.contains("Records: 3"));
        assert!(out.contains("Days: 2022-04-01 .. 2022-04-03"));
        assert!(out.contains("2000"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
