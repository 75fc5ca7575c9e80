use std::fs;
use std::path::Path;

use tracing::{info, instrument};

use crate::config::CheckConfig;
use crate::detect::detect_conflicts;
use crate::error::Result;
use crate::io::{TableStore, excel_write};
use crate::loader::load_reservations;
use crate::report::ConflictReport;

/// Loads the configured view, detects conflicts and builds the report.
#[instrument(level = "info", skip_all, fields(view = %config.view, sharing = ?config.sharing))]
pub fn run_check(store: &dyn TableStore, config: &CheckConfig) -> Result<ConflictReport> {
    config.validate()?;

    let loaded = load_reservations(store, &config.view, &config.fields)?;
    let detection = detect_conflicts(&loaded.reservations, config.sharing);
    info!(
        conflicted = detection.conflicts.len(),
        pairs = detection.pairs.len(),
        "conflict detection finished"
    );

    Ok(ConflictReport::new(
        &config.view,
        &loaded.reservations,
        &detection,
        &loaded.skipped,
        &config.date_format,
    ))
}

/// Writes the report as pretty printed JSON.
#[instrument(level = "info", skip(report), fields(output = %output.display()))]
pub fn export_json(report: &ConflictReport, output: &Path) -> Result<()> {
    fs::write(output, report.to_json()?)?;
    Ok(())
}

/// Writes the report as an Excel workbook.
#[instrument(level = "info", skip(report), fields(output = %output.display()))]
pub fn export_workbook(report: &ConflictReport, output: &Path) -> Result<()> {
    excel_write::write_report(output, report)
}
