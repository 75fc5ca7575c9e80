//! Table store adapters and report writers.

pub mod excel_read;
pub mod excel_write;
pub mod json_read;

use std::path::Path;

use crate::config::FieldNames;
use crate::error::{Result, ToolError};
use crate::model::RawRecord;

pub use excel_read::WorkbookStore;
pub use json_read::JsonStore;

/// Read access to a tabular data store.
pub trait TableStore {
    /// Names of the views that can be listed.
    fn view_names(&self) -> Result<Vec<String>>;

    /// Returns every record visible in `view`, in the store's order.
    fn list_records(&self, view: &str) -> Result<Vec<RawRecord>>;
}

/// On-disk layouts understood by [`open_store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Workbook,
    Json,
}

/// Infers the store layout from the file extension.
pub fn detect_format(path: &Path) -> Option<StoreFormat> {
    let extension = path.extension()?.to_ascii_lowercase();
    match extension.to_str()? {
        "xlsx" | "xlsm" => Some(StoreFormat::Workbook),
        "json" => Some(StoreFormat::Json),
        _ => None,
    }
}

/// Opens the store at `path`. Workbooks use `fields` to find the id column
/// and the date columns.
pub fn open_store(
    path: &Path,
    format: Option<StoreFormat>,
    fields: &FieldNames,
) -> Result<Box<dyn TableStore>> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let format = format.or_else(|| detect_format(path)).ok_or_else(|| {
        ToolError::InvalidStore(format!(
            "unable to infer store format from extension for file {}",
            path.display()
        ))
    })?;

    Ok(match format {
        StoreFormat::Workbook => Box::new(WorkbookStore::new(path, fields)),
        StoreFormat::Json => Box::new(JsonStore::open(path)?),
    })
}

pub(crate) fn unknown_view(view: &str, available: Vec<String>) -> ToolError {
    ToolError::UnknownView {
        view: view.to_string(),
        available,
    }
}
