use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Identifier assigned to a record by the table store. Opaque to the
/// detector, which only compares identifiers for equality.
pub type RecordId = String;

/// Separator the table platform uses when rendering multi-valued link fields.
pub const DISPLAY_SEPARATOR: &str = ", ";

/// A raw cell value as exposed by a table store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Plain text.
    Text(String),
    /// Numeric cell. Numbers reaching the loader as timestamps are epoch
    /// milliseconds; workbook serial dates are converted by the store.
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Date/time cell already resolved to an instant by the store.
    Timestamp(DateTime<Utc>),
    /// Multi-valued cell such as a list of linked record names.
    List(Vec<String>),
    /// Explicitly empty cell.
    Empty,
}

impl CellValue {
    /// Renders the value the way the table platform displays it.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Text(value) => value.clone(),
            CellValue::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{}", *value as i64)
            }
            CellValue::Number(value) => value.to_string(),
            CellValue::Bool(value) => value.to_string(),
            CellValue::Timestamp(value) => value.to_rfc3339_opts(SecondsFormat::Secs, true),
            CellValue::List(items) => items.join(DISPLAY_SEPARATOR),
            CellValue::Empty => String::new(),
        }
    }
}

/// A record returned by [`TableStore::list_records`](crate::io::TableStore::list_records).
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    id: RecordId,
    fields: BTreeMap<String, CellValue>,
}

impl RawRecord {
    /// Creates a record without any field values.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style helper used by the store adapters and tests.
    pub fn with_field(mut self, name: impl Into<String>, value: CellValue) -> Self {
        self.set_field(name, value);
        self
    }

    /// Inserts or replaces a field value.
    pub fn set_field(&mut self, name: impl Into<String>, value: CellValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw value of the named field, `None` when the field is absent.
    pub fn cell_value(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    /// Display string of the named field, empty when the field is absent.
    pub fn cell_value_as_string(&self, field: &str) -> String {
        self.cell_value(field)
            .map(CellValue::display_string)
            .unwrap_or_default()
    }
}

/// Resources booked by a reservation. Keeps the first-seen order of the
/// identifiers and never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSet(Vec<String>);

impl ResourceSet {
    /// Parses the display string of a link field (`"Camera, Tripod"`).
    /// Blank tokens are dropped.
    pub fn parse_display(display: &str) -> Self {
        display
            .split(DISPLAY_SEPARATOR)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.0.iter().any(|item| item == resource)
    }

    /// Number of `other`'s resources that are also booked by `self`.
    pub fn shared_count(&self, other: &ResourceSet) -> usize {
        other.iter().filter(|resource| self.contains(resource)).count()
    }
}

impl<S: Into<String>> FromIterator<S> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ResourceSet::default();
        for item in iter {
            let item = item.into();
            if !set.contains(&item) {
                set.0.push(item);
            }
        }
        set
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(DISPLAY_SEPARATOR))
    }
}

/// A booking of one or more resources for a time interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: RecordId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resources: ResourceSet,
    pub responsible_party: String,
}

impl Reservation {
    /// True when `self` starts inside `other`, both bounds inclusive.
    pub fn starts_during(&self, other: &Reservation) -> bool {
        self.start >= other.start && self.start <= other.end
    }

    /// True when `self` covers all of `other`, both bounds inclusive.
    pub fn contains(&self, other: &Reservation) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}

/// Why a record was left out of conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordErrorKind {
    #[error("field '{field}' is empty")]
    MissingTimestamp { field: String },

    #[error("field '{field}' holds '{value}', which is not a timestamp")]
    InvalidTimestamp { field: String, value: String },

    #[error("duplicate record id")]
    DuplicateId,
}

/// A per-record problem found while loading. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {id}: {kind}")]
pub struct RecordError {
    pub id: RecordId,
    pub kind: RecordErrorKind,
}

// Exported as `{id, reason, kind}` with `reason` the human readable message.
impl Serialize for RecordError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RecordError", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("reason", &self.kind.to_string())?;
        state.serialize_field("kind", &self.kind)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_display_splits_and_dedups() {
        let set = ResourceSet::parse_display("Camera, Tripod, Camera");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["Camera", "Tripod"]);
        assert_eq!(set.to_string(), "Camera, Tripod");
    }

    #[test]
    fn parse_display_empty_string_is_empty_set() {
        assert!(ResourceSet::parse_display("").is_empty());
        assert!(ResourceSet::parse_display("  ").is_empty());
    }

    #[test]
    fn parse_display_keeps_commas_without_space() {
        // Only ", " separates tokens, matching the platform's rendering.
        let set = ResourceSet::parse_display("Lens 24,70mm, Tripod");
        assert_eq!(set.len(), 2);
        assert!(set.contains("Lens 24,70mm"));
    }

    #[test]
    fn shared_count_counts_other_side() {
        let a: ResourceSet = ["X", "Y"].into_iter().collect();
        let b: ResourceSet = ["Y", "Z", "X"].into_iter().collect();
        assert_eq!(a.shared_count(&b), 2);
        assert_eq!(b.shared_count(&a), 2);
        assert_eq!(a.shared_count(&ResourceSet::default()), 0);
    }

    #[test]
    fn display_string_of_cells() {
        assert_eq!(CellValue::Number(42.0).display_string(), "42");
        assert_eq!(CellValue::Number(1.5).display_string(), "1.5");
        assert_eq!(
            CellValue::List(vec!["Ana".into(), "Bo".into()]).display_string(),
            "Ana, Bo"
        );
        assert_eq!(CellValue::Empty.display_string(), "");
    }

    #[test]
    fn record_error_serializes_reason() {
        let error = RecordError {
            id: "rec4".into(),
            kind: RecordErrorKind::InvalidTimestamp {
                field: "Start Date/Time".into(),
                value: "soon".into(),
            },
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["id"], "rec4");
        assert_eq!(
            json["reason"],
            "field 'Start Date/Time' holds 'soon', which is not a timestamp"
        );
        assert_eq!(json["kind"]["type"], "invalid_timestamp");
    }

    #[test]
    fn missing_field_displays_empty() {
        let record = RawRecord::new("rec1").with_field("Items", CellValue::Text("X".into()));
        assert_eq!(record.cell_value_as_string("Items"), "X");
        assert_eq!(record.cell_value_as_string("Member"), "");
        assert!(record.cell_value("Member").is_none());
    }
}
