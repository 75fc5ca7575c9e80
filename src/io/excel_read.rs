use std::path::{Path, PathBuf};

use calamine::{DataType, Reader, Xlsx, open_workbook};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use tracing::debug;

use crate::config::FieldNames;
use crate::error::Result;
use crate::io::{TableStore, unknown_view};
use crate::model::{CellValue, RawRecord};

/// A workbook acting as a table store. Each worksheet is a view; its first
/// row names the fields.
///
/// Numbers in the start and end columns are Excel serial dates. Other
/// numeric cells stay plain numbers.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    path: PathBuf,
    fields: FieldNames,
}

impl WorkbookStore {
    pub fn new(path: &Path, fields: &FieldNames) -> Self {
        Self {
            path: path.to_path_buf(),
            fields: fields.clone(),
        }
    }
}

impl TableStore for WorkbookStore {
    fn view_names(&self) -> Result<Vec<String>> {
        let workbook: Xlsx<_> = open_workbook(&self.path)?;
        Ok(workbook.sheet_names().to_vec())
    }

    fn list_records(&self, view: &str) -> Result<Vec<RawRecord>> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)?;
        let range = match workbook.worksheet_range(view) {
            Some(range) => range?,
            None => return Err(unknown_view(view, self.view_names()?)),
        };

        let records = read_records(&range, &self.fields);
        debug!(view, record_count = records.len(), "read worksheet");
        Ok(records)
    }
}

fn read_records(range: &calamine::Range<DataType>, fields: &FieldNames) -> Vec<RawRecord> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_string(Some(cell)).trim().to_string())
            .collect(),
        None => return Vec::new(),
    };
    // A blank id field name means every row is numbered.
    let id_field = fields.id.trim();
    let id_column = if id_field.is_empty() {
        None
    } else {
        headers.iter().position(|header| header == id_field)
    };

    let mut records = Vec::new();
    for (row_idx, row) in rows.enumerate() {
        if row.iter().all(|cell| matches!(cell, DataType::Empty)) {
            continue;
        }

        // Sheet rows are 1-based and the header occupies the first one.
        let id = id_column
            .map(|col| cell_to_string(row.get(col)).trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("row-{}", row_idx + 2));

        let mut record = RawRecord::new(id);
        for (col_idx, cell) in row.iter().enumerate() {
            let header = headers.get(col_idx).map(String::as_str).unwrap_or_default();
            if header.is_empty() || Some(col_idx) == id_column {
                continue;
            }
            let is_date = header == fields.start || header == fields.end;
            record.set_field(header, cell_to_value(cell, is_date));
        }
        records.push(record);
    }
    records
}

fn cell_to_value(cell: &DataType, is_date: bool) -> CellValue {
    match cell {
        DataType::String(value) if value.trim().is_empty() => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) if is_date => serial_cell(*value),
        DataType::Int(value) if is_date => serial_cell(*value as f64),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(serial) => serial_cell(*serial),
        DataType::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

// Out-of-range serials stay text so the loader rejects them.
fn serial_cell(serial: f64) -> CellValue {
    excel_serial_to_utc(serial)
        .map(CellValue::Timestamp)
        .unwrap_or_else(|| CellValue::Text(serial.to_string()))
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Converts an Excel serial date (days since 1899-12-30, fractional part is
/// the time of day) to an instant. Workbook dates carry no zone; UTC is assumed.
pub fn excel_serial_to_utc(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let naive = epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)?;
    Some(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn serial_dates_resolve_to_utc() {
        // 45413.375 is 2024-05-01 09:00.
        let instant = excel_serial_to_utc(45413.375).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        assert!(excel_serial_to_utc(f64::NAN).is_none());
    }

    #[test]
    fn blank_strings_become_empty_cells() {
        assert_eq!(cell_to_value(&DataType::String("  ".into()), false), CellValue::Empty);
        assert_eq!(cell_to_value(&DataType::Int(3), false), CellValue::Number(3.0));
    }

    #[test]
    fn numbers_in_date_columns_are_serial_dates() {
        let nine = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(
            cell_to_value(&DataType::Float(45413.375), true),
            CellValue::Timestamp(nine)
        );
        assert_eq!(
            cell_to_value(&DataType::Int(45413), true),
            CellValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(cell_to_value(&DataType::Float(45413.375), false), CellValue::Number(45413.375));
    }

    #[test]
    fn unrepresentable_serial_becomes_text() {
        assert!(matches!(cell_to_value(&DataType::Float(1e300), true), CellValue::Text(_)));
    }
}
