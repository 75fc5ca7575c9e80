use std::fs;
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detect::SharingPolicy;
use crate::error::{Result, ToolError};

/// View holding the reservations that still lie ahead.
pub const DEFAULT_VIEW: &str = "Upcoming Reservations";
/// Default rendering of start/end instants in reports.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Names of the reservation table fields read by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldNames {
    /// Column holding the record id. Workbook rows without one are numbered.
    pub id: String,
    /// Link field to the assets table.
    pub resources: String,
    pub start: String,
    pub end: String,
    /// Link field to the people table.
    pub person: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            resources: "Items".to_string(),
            start: "Start Date/Time".to_string(),
            end: "End Date/Time".to_string(),
            person: "Member".to_string(),
        }
    }
}

/// Settings for a conflict check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckConfig {
    pub view: String,
    pub fields: FieldNames,
    pub sharing: SharingPolicy,
    pub date_format: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            view: DEFAULT_VIEW.to_string(),
            fields: FieldNames::default(),
            sharing: SharingPolicy::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl CheckConfig {
    /// Reads a JSON configuration file. Keys left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        let config: CheckConfig = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "loaded configuration file");
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every record unreadable.
    pub fn validate(&self) -> Result<()> {
        if self.view.trim().is_empty() {
            return Err(ToolError::InvalidConfig("view name is empty".into()));
        }

        let fields = [
            ("resources", &self.fields.resources),
            ("start", &self.fields.start),
            ("end", &self.fields.end),
            ("person", &self.fields.person),
        ];
        for (role, name) in fields {
            if name.trim().is_empty() {
                return Err(ToolError::InvalidConfig(format!("{role} field name is empty")));
            }
        }
        if self.fields.start == self.fields.end {
            return Err(ToolError::InvalidConfig(format!(
                "start and end both read field '{}'",
                self.fields.start
            )));
        }

        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ToolError::InvalidConfig(format!(
                "invalid date format '{}'",
                self.date_format
            )));
        }
        Ok(())
    }
}
