use serde::{Deserialize, Serialize};

use crate::errors::{BillingError, Result};

/// billing engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// missed periods tolerated before a borrower counts as delinquent
    pub delinquency_grace_periods: u32,
    /// joins every violated rule into a single validation message
    pub validation_separator: String,
}

impl BillingConfig {
    /// standard policy: one period behind is tolerated, two is delinquent
    pub fn standard() -> Self {
        Self {
            delinquency_grace_periods: 1,
            validation_separator: "; ".to_string(),
        }
    }

    /// strict policy: any missed period past the current one is delinquent
    pub fn strict() -> Self {
        Self {
            delinquency_grace_periods: 0,
            ..Self::standard()
        }
    }

    /// load from json, falling back to standard values for absent fields
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            BillingError::validation(format!("invalid billing configuration: {}", e))
        })
    }

    pub(crate) fn join_violations(&self, violations: &[String]) -> String {
        violations.join(&self.validation_separator)
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::standard()
    }
}
