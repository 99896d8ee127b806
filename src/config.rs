//! Dashboard configuration
//!
//! Every field has a default, so a JSON file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::efficiency::{SubgroupSelector, DEFAULT_EPSILON};
use crate::error::{PipelineError, Result};

/// A labor provider, recognised by an operator-id pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaborGroup {
    pub code: String,
    /// Case-insensitive regex, e.g. "^JOU"
    pub pattern: String,
    /// Render employee curves, quadrant and ranking for this group
    #[serde(default = "default_true")]
    pub deep_dive: bool,
}

fn default_true() -> bool {
    true
}

impl LaborGroup {
    pub fn new(code: &str, pattern: &str, deep_dive: bool) -> Self {
        Self {
            code: code.to_string(),
            pattern: pattern.to_string(),
            deep_dive,
        }
    }

    pub fn selector(&self) -> Result<SubgroupSelector> {
        SubgroupSelector::including(&self.pattern)
    }

    /// Operator-id prefix used for the volume-by-group chart; the code itself.
    pub fn prefix(&self) -> &str {
        &self.code
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuadrantReference {
    #[default]
    Median,
    Mean,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub default_file_path: PathBuf,
    pub sorter_name: String,
    pub sorting_center: String,
    pub labor_groups: Vec<LaborGroup>,
    /// Horizontal reference line on the employee curves
    pub benchmark: f64,
    pub epsilon: f64,
    pub bottom_n: usize,
    pub quadrant_reference: QuadrantReference,
    pub cache_capacity: usize,
    /// Largest accepted upload body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_file_path: PathBuf::from("data/scan_records.csv"),
            sorter_name: "sorter".to_string(),
            sorting_center: "MIA.H".to_string(),
            labor_groups: vec![
                LaborGroup::new("JOU", "^JOU", true),
                LaborGroup::new("RD", "^RD", true),
                LaborGroup::new("pr", "^pr", false),
            ],
            benchmark: 600.0,
            epsilon: DEFAULT_EPSILON,
            bottom_n: 3,
            quadrant_reference: QuadrantReference::Median,
            cache_capacity: 8,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl DashboardConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: DashboardConfig = serde_json::from_str(&contents)
            .map_err(|e| PipelineError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(PipelineError::Config("epsilon must be positive".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(PipelineError::Config("max_upload_bytes must be positive".into()));
        }
        if !self.benchmark.is_finite() {
            return Err(PipelineError::Config("benchmark must be finite".into()));
        }
        for group in &self.labor_groups {
            if group.code.trim().is_empty() {
                return Err(PipelineError::Config("labor group code must not be empty".into()));
            }
            group.selector()?;
        }
        Ok(())
    }

    pub fn group(&self, code: &str) -> Option<&LaborGroup> {
        self.labor_groups.iter().find(|g| g.code.eq_ignore_ascii_case(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.benchmark, 600.0);
        assert_eq!(config.epsilon, 1e-9);
        assert_eq!(config.labor_groups.len(), 3);
        assert_eq!(config.max_upload_bytes, 64 * 1024 * 1024);
        assert!(config.validate().is_ok());
        assert_eq!(config.group("jou").map(|g| g.pattern.as_str()), Some("^JOU"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"benchmark": 450, "quadrant_reference": "mean"}}"#).unwrap();

        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.benchmark, 450.0);
        assert_eq!(config.quadrant_reference, QuadrantReference::Mean);
        assert_eq!(config.sorter_name, "sorter");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut config = DashboardConfig::default();
        config.labor_groups.push(LaborGroup::new("bad", "([", true));
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = DashboardConfig::load(Some(Path::new("/nonexistent/dashboard.json"))).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
