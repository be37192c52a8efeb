//! FILENAME: core/pivot-engine/src/config.rs
//! Engine configuration, loaded from JSON.
//!
//! Every field has a default, so `{}` is a complete configuration and a
//! partial document only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::drilldown::{DrilldownPolicy, DrilldownRule};
use crate::error::PivotError;
use crate::grouper::HeaderSort;
use crate::header_field::{standard_group_fields, FieldRegistry, FieldSpec, DEFAULT_COLUMN, DEFAULT_ROW};
use crate::log_info;

fn default_row() -> String {
    DEFAULT_ROW.to_string()
}

fn default_column() -> String {
    DEFAULT_COLUMN.to_string()
}

fn default_excluded_statuses() -> Vec<String> {
    vec!["TEST_NA".to_string()]
}

fn default_incomplete_statuses() -> Vec<String> {
    vec!["RUNNING".to_string()]
}

fn default_triage_status() -> String {
    "GOOD".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_row")]
    pub default_row: String,
    #[serde(default = "default_column")]
    pub default_column: String,
    #[serde(default)]
    pub header_sort: HeaderSort,
    #[serde(default = "standard_group_fields")]
    pub group_fields: Vec<FieldSpec>,
    /// Statuses never shown in the pivot.
    #[serde(default = "default_excluded_statuses")]
    pub excluded_statuses: Vec<String>,
    /// Statuses hidden unless "show incomplete" is on.
    #[serde(default = "default_incomplete_statuses")]
    pub incomplete_statuses: Vec<String>,
    /// Status filtered out when switching to the triage table.
    #[serde(default = "default_triage_status")]
    pub triage_status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drilldown_rules: Vec<DrilldownRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_row: default_row(),
            default_column: default_column(),
            header_sort: HeaderSort::default(),
            group_fields: standard_group_fields(),
            excluded_statuses: default_excluded_statuses(),
            incomplete_statuses: default_incomplete_statuses(),
            triage_status: default_triage_status(),
            drilldown_rules: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, PivotError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        log_info!(
            "CONFIG",
            "loaded {} group fields, default {} vs. {}",
            config.group_fields.len(),
            config.default_row,
            config.default_column
        );
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, PivotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validated field catalogue.
    pub fn registry(&self) -> Result<FieldRegistry, PivotError> {
        FieldRegistry::from_config(self)
    }

    pub fn drilldown_policy(&self) -> DrilldownPolicy {
        DrilldownPolicy::with_rules(&self.drilldown_rules)
    }
}

impl FieldRegistry {
    pub fn from_config(config: &EngineConfig) -> Result<Self, PivotError> {
        FieldRegistry::from_specs(&config.group_fields, &config.default_row, &config.default_column)
    }
}
