use std::path::Path;

use rust_xlsxwriter::{Table, Workbook, Worksheet};

use crate::error::Result;
use crate::report::{COLUMNS, ConflictReport};

/// Sheet listing the conflicted reservations.
pub const CONFLICTS_SHEET: &str = "Conflicts";
/// Sheet listing records that were left out of the check.
pub const SKIPPED_SHEET: &str = "Skipped";

/// Writes the report as a workbook with one table per sheet.
pub fn write_report(path: &Path, report: &ConflictReport) -> Result<()> {
    let mut workbook = Workbook::new();

    let conflict_rows: Vec<Vec<&str>> = report
        .conflicts
        .iter()
        .map(|row| row.cells().to_vec())
        .collect();
    write_table(workbook.add_worksheet(), CONFLICTS_SHEET, &COLUMNS, &conflict_rows)?;

    if !report.skipped.is_empty() {
        let reasons: Vec<String> = report
            .skipped
            .iter()
            .map(|error| error.kind.to_string())
            .collect();
        let skipped_rows: Vec<Vec<&str>> = report
            .skipped
            .iter()
            .zip(&reasons)
            .map(|(error, reason)| vec![error.id.as_str(), reason.as_str()])
            .collect();
        write_table(
            workbook.add_worksheet(),
            SKIPPED_SHEET,
            &["Record", "Reason"],
            &skipped_rows,
        )?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_table(
    worksheet: &mut Worksheet,
    name: &str,
    columns: &[&str],
    rows: &[Vec<&str>],
) -> Result<()> {
    worksheet.set_name(name)?;

    for (col_idx, header) in columns.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            worksheet.write_string((row_idx + 1) as u32, col_idx as u16, *cell)?;
        }
    }

    // A table needs at least one data row.
    if !rows.is_empty() {
        // Tables carry an autofilter on the header row by default.
        let table = Table::new();
        let col_end = (columns.len() as u16).saturating_sub(1);
        worksheet.add_table(0, 0, rows.len() as u32, col_end, &table)?;
    }
    Ok(())
}
