use crate::alias::{AliasTable, ColumnFallback};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How one kind of source (actual or budget) names its sheet and columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceProfile {
    pub sheet: String,
    pub aliases: AliasTable,
    pub entity_aliases: Vec<String>,
    pub entity_fallback: ColumnFallback,
    pub period_aliases: Vec<String>,
    pub period_fallback: ColumnFallback,
}

impl Default for SourceProfile {
    fn default() -> Self {
        Self {
            sheet: "bd".to_string(),
            aliases: AliasTable::default(),
            entity_aliases: vec!["EMPRESA".to_string(), "CLIENTE".to_string()],
            entity_fallback: ColumnFallback::First,
            period_aliases: vec![
                "TIMES".to_string(),
                "PERIODO".to_string(),
                "COMPETENCIA".to_string(),
            ],
            period_fallback: ColumnFallback::Last,
        }
    }
}

impl SourceProfile {
    pub fn budget() -> Self {
        Self {
            sheet: "orcamento".to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.aliases.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DreConfig {
    pub actual: SourceProfile,
    pub budget: SourceProfile,
}

impl Default for DreConfig {
    fn default() -> Self {
        Self {
            actual: SourceProfile::default(),
            budget: SourceProfile::budget(),
        }
    }
}

impl DreConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: DreConfig = serde_json::from_str(s)?;
        config.actual.validate()?;
        config.budget.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }
}
