use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::io::{TableStore, unknown_view};
use crate::model::{CellValue, RawRecord};

/// A JSON record export acting as a table store.
///
/// Two layouts are accepted:
///
/// ```json
/// { "views": { "Upcoming Reservations": [ { "id": "rec1", "fields": { "Items": ["Camera"] } } ] } }
/// ```
///
/// or a bare array of records, which is returned for whichever view is
/// requested. Records without a `fields` object use their remaining keys as
/// fields.
#[derive(Debug, Clone)]
pub struct JsonStore {
    document: Value,
}

impl JsonStore {
    /// Reads and parses the export at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_value(serde_json::from_str(&data)?)
    }

    /// Wraps an already parsed export.
    pub fn from_value(document: Value) -> Result<Self> {
        match &document {
            Value::Array(_) => {}
            Value::Object(object) if object.get("views").is_some_and(Value::is_object) => {}
            _ => {
                return Err(ToolError::InvalidStore(
                    "expected an array of records or an object with a 'views' map".into(),
                ));
            }
        }
        Ok(Self { document })
    }

    fn view_records(&self, view: &str) -> Result<&[Value]> {
        let records = match &self.document {
            Value::Array(records) => Some(records),
            Value::Object(object) => object
                .get("views")
                .and_then(|views| views.get(view))
                .and_then(Value::as_array),
            _ => None,
        };
        match records {
            Some(records) => Ok(records.as_slice()),
            None => Err(unknown_view(view, self.view_names()?)),
        }
    }
}

impl TableStore for JsonStore {
    fn view_names(&self) -> Result<Vec<String>> {
        Ok(match &self.document {
            Value::Object(object) => object
                .get("views")
                .and_then(Value::as_object)
                .map(|views| views.keys().cloned().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        })
    }

    fn list_records(&self, view: &str) -> Result<Vec<RawRecord>> {
        let records = self
            .view_records(view)?
            .iter()
            .enumerate()
            .map(|(index, value)| parse_record(index, value))
            .collect::<Result<Vec<_>>>()?;
        debug!(view, record_count = records.len(), "read JSON view");
        Ok(records)
    }
}

fn parse_record(index: usize, value: &Value) -> Result<RawRecord> {
    let object = value.as_object().ok_or_else(|| {
        ToolError::InvalidStore(format!("record {index} is not a JSON object"))
    })?;

    let id = match object.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("row-{}", index + 1),
    };

    let mut record = RawRecord::new(id);
    match object.get("fields") {
        Some(Value::Object(fields)) => ingest_fields(&mut record, fields.iter()),
        Some(_) => {
            return Err(ToolError::InvalidStore(format!(
                "record {index}: 'fields' must be an object"
            )));
        }
        None => ingest_fields(
            &mut record,
            object.iter().filter(|(key, _)| key.as_str() != "id"),
        ),
    }
    Ok(record)
}

fn ingest_fields<'a>(record: &mut RawRecord, fields: impl Iterator<Item = (&'a String, &'a Value)>) {
    for (name, value) in fields {
        record.set_field(name.as_str(), json_to_cell(value));
    }
}

fn json_to_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Bool(value) => CellValue::Bool(*value),
        Value::Number(number) => number
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(number.to_string())),
        Value::String(value) if value.trim().is_empty() => CellValue::Empty,
        Value::String(value) => CellValue::Text(value.clone()),
        Value::Array(items) if items.is_empty() => CellValue::Empty,
        Value::Array(items) => CellValue::List(items.iter().map(display_item).collect()),
        Value::Object(object) => CellValue::Text(object_display(object)),
    }
}

fn display_item(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        Value::Object(object) => object_display(object),
        other => other.to_string(),
    }
}

// Linked records and collaborators render as their name.
fn object_display(object: &Map<String, Value>) -> String {
    match object.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => Value::Object(object.clone()).to_string(),
    }
}
