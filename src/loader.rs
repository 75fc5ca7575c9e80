use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{info, instrument, warn};

use crate::config::FieldNames;
use crate::error::Result;
use crate::io::TableStore;
use crate::model::{CellValue, RawRecord, RecordError, RecordErrorKind, Reservation, ResourceSet};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Reservations read from one view, plus the records that had to be left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedReservations {
    pub reservations: Vec<Reservation>,
    pub skipped: Vec<RecordError>,
}

/// Fetches every record in `view` and converts it into a [`Reservation`].
///
/// Only the fetch itself can fail. Records with unreadable timestamps or a
/// repeated id are skipped with a warning and listed in
/// [`LoadedReservations::skipped`].
#[instrument(level = "info", skip(store, fields))]
pub fn load_reservations(
    store: &dyn TableStore,
    view: &str,
    fields: &FieldNames,
) -> Result<LoadedReservations> {
    let records = store.list_records(view)?;
    let loaded = reservations_from_records(&records, fields);
    info!(
        loaded = loaded.reservations.len(),
        skipped = loaded.skipped.len(),
        "loaded reservations"
    );
    Ok(loaded)
}

/// Converts already fetched records, keeping their order.
pub fn reservations_from_records(records: &[RawRecord], fields: &FieldNames) -> LoadedReservations {
    let mut loaded = LoadedReservations::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for record in records {
        if !seen.insert(record.id()) {
            skip(&mut loaded, record, RecordErrorKind::DuplicateId);
            continue;
        }
        match to_reservation(record, fields) {
            Ok(reservation) => loaded.reservations.push(reservation),
            Err(kind) => skip(&mut loaded, record, kind),
        }
    }
    loaded
}

fn skip(loaded: &mut LoadedReservations, record: &RawRecord, kind: RecordErrorKind) {
    let error = RecordError {
        id: record.id().to_string(),
        kind,
    };
    warn!(record = %error.id, reason = %error.kind, "skipping reservation");
    loaded.skipped.push(error);
}

fn to_reservation(
    record: &RawRecord,
    fields: &FieldNames,
) -> std::result::Result<Reservation, RecordErrorKind> {
    let start = read_instant(record, &fields.start)?;
    let end = read_instant(record, &fields.end)?;
    if start > end {
        warn!(record = record.id(), %start, %end, "reservation ends before it starts");
    }

    Ok(Reservation {
        id: record.id().to_string(),
        start,
        end,
        resources: ResourceSet::parse_display(&record.cell_value_as_string(&fields.resources)),
        responsible_party: record.cell_value_as_string(&fields.person),
    })
}

fn read_instant(
    record: &RawRecord,
    field: &str,
) -> std::result::Result<DateTime<Utc>, RecordErrorKind> {
    let invalid = |value: String| RecordErrorKind::InvalidTimestamp {
        field: field.to_string(),
        value,
    };

    match record.cell_value(field) {
        None | Some(CellValue::Empty) => Err(RecordErrorKind::MissingTimestamp {
            field: field.to_string(),
        }),
        Some(CellValue::Timestamp(instant)) => Ok(*instant),
        Some(CellValue::Number(millis)) => {
            epoch_millis(*millis).ok_or_else(|| invalid(millis.to_string()))
        }
        Some(CellValue::Text(text)) => parse_instant(text).ok_or_else(|| invalid(text.clone())),
        Some(other) => Err(invalid(other.display_string())),
    }
}

fn epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() || millis.fract() != 0.0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Parses an RFC 3339 instant. Values without an offset, including bare
/// dates, are read as UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
