use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::detect::{ConflictPair, Detection};
use crate::model::{RecordError, Reservation};

pub const CONFLICTS_HEADING: &str =
    "## Conflict(s) detected within the Reservations. Please see below.";
pub const NO_CONFLICTS_MESSAGE: &str = "#### There are no conflicts at this time.";

/// Column titles of the conflict table.
pub const COLUMNS: [&str; 4] = ["Resource", "Start", "End", "Member"];

/// One conflicted reservation as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub id: String,
    pub resource: String,
    pub start: String,
    pub end: String,
    pub member: String,
}

impl ReportRow {
    /// Cells in [`COLUMNS`] order.
    pub fn cells(&self) -> [&str; 4] {
        [&self.resource, &self.start, &self.end, &self.member]
    }
}

/// Everything a run produced, ready to be rendered or exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub view: String,
    pub conflicts: Vec<ReportRow>,
    pub pairs: Vec<ConflictPair>,
    pub skipped: Vec<RecordError>,
}

impl ConflictReport {
    /// Builds the report rows in conflict discovery order.
    pub fn new(
        view: &str,
        reservations: &[Reservation],
        detection: &Detection,
        skipped: &[RecordError],
        date_format: &str,
    ) -> Self {
        let by_id: HashMap<&str, &Reservation> = reservations
            .iter()
            .map(|reservation| (reservation.id.as_str(), reservation))
            .collect();

        let conflicts = detection
            .conflicts
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|reservation| ReportRow {
                id: reservation.id.clone(),
                resource: reservation.resources.to_string(),
                start: reservation.start.format(date_format).to_string(),
                end: reservation.end.format(date_format).to_string(),
                member: reservation.responsible_party.clone(),
            })
            .collect();

        Self {
            view: view.to_string(),
            conflicts,
            pairs: detection.pairs.clone(),
            skipped: skipped.to_vec(),
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Human readable report: a heading and a table, or the all-clear line.
    pub fn render_text(&self) -> String {
        self.to_string()
    }

    /// Pretty printed JSON export.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_conflicts() {
            let mut builder = Builder::default();
            builder.push_record(COLUMNS);
            for row in &self.conflicts {
                builder.push_record(row.cells());
            }
            let table = builder.build().with(Style::rounded()).to_string();
            writeln!(f, "{CONFLICTS_HEADING}")?;
            writeln!(f)?;
            writeln!(f, "{table}")?;
        } else {
            writeln!(f, "{NO_CONFLICTS_MESSAGE}")?;
        }

        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "{} record(s) were not checked:", self.skipped.len())?;
            for error in &self.skipped {
                writeln!(f, "  - {error}")?;
            }
        }
        Ok(())
    }
}
