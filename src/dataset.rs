use crate::alias::{resolve_structural, ResolvedFields};
use crate::cache::LoadedSource;
use crate::config::SourceProfile;
use crate::dre::{aggregate, DreBlock};
use crate::error::{DreError, Result};
use crate::period::{normalize, normalize_text};
use crate::types::Table;
use log::debug;
use std::collections::BTreeSet;

/// Optional exact-match filters. The period is compared on its normalized
/// label, so `"09/2025"` and `"2025-09"` select the same rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub entity: Option<String>,
    pub period: Option<String>,
}

impl RecordFilter {
    /// Per-client view.
    pub fn client(entity: &str, period: &str) -> Self {
        Self {
            entity: Some(entity.to_string()),
            period: Some(period.to_string()),
        }
    }

    /// Consolidated view: every entity in one period.
    pub fn consolidated(period: &str) -> Self {
        Self {
            entity: None,
            period: Some(period.to_string()),
        }
    }
}

/// A loaded table bound to a source profile: financial fields, entity column
/// and period column are resolved once, and every row's period is normalized
/// up front.
#[derive(Debug, Clone)]
pub struct Dataset {
    table: Table,
    sheet: String,
    fields: ResolvedFields,
    entity_col: Option<usize>,
    period_col: Option<usize>,
    entities: Vec<Option<String>>,
    periods: Vec<String>,
}

impl Dataset {
    pub fn new(source: LoadedSource, profile: &SourceProfile) -> Result<Self> {
        let LoadedSource { table, sheet, .. } = source;
        if table.columns().is_empty() {
            return Err(DreError::SourceUnavailable(format!(
                "sheet '{}' has no columns",
                sheet
            )));
        }

        let fields = profile.aliases.resolve_all(table.columns());
        let entity_col = resolve_structural(
            table.columns(),
            &profile.entity_aliases,
            profile.entity_fallback,
        )
        .and_then(|c| table.column_index(c));
        let period_col = resolve_structural(
            table.columns(),
            &profile.period_aliases,
            profile.period_fallback,
        )
        .and_then(|c| table.column_index(c));

        let entities = (0..table.len())
            .map(|r| entity_col.and_then(|c| table.cell(r, c).as_text()))
            .collect();
        let periods = (0..table.len())
            .map(|r| period_col.map(|c| normalize(table.cell(r, c))).unwrap_or_default())
            .collect();

        debug!(
            "dataset '{}': entity column {:?}, period column {:?}",
            sheet,
            entity_col.map(|c| &table.columns()[c]),
            period_col.map(|c| &table.columns()[c])
        );

        Ok(Self {
            table,
            sheet,
            fields,
            entity_col,
            period_col,
            entities,
            periods,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn fields(&self) -> &ResolvedFields {
        &self.fields
    }

    pub fn entity_column(&self) -> Option<&str> {
        self.entity_col.map(|c| self.table.columns()[c].as_str())
    }

    pub fn period_column(&self) -> Option<&str> {
        self.period_col.map(|c| self.table.columns()[c].as_str())
    }

    /// Entity of row `row`, if the cell is present.
    pub fn entity_of(&self, row: usize) -> Option<&str> {
        self.entities.get(row).and_then(|e| e.as_deref())
    }

    /// Normalized period label of row `row` (empty when missing).
    pub fn period_of(&self, row: usize) -> &str {
        self.periods.get(row).map(String::as_str).unwrap_or("")
    }

    /// Sorted, de-duplicated entity names.
    pub fn entities(&self) -> Vec<String> {
        self.entities
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted, de-duplicated period labels, blanks excluded.
    pub fn periods(&self) -> Vec<String> {
        self.periods
            .iter()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Row indices that pass `filter`.
    pub fn filter(&self, filter: &RecordFilter) -> Vec<usize> {
        let entity = filter.entity.as_deref().map(str::trim);
        let period = filter.period.as_deref().map(normalize_text);
        (0..self.table.len())
            .filter(|&r| match entity {
                Some(e) => self.entity_of(r) == Some(e),
                None => true,
            })
            .filter(|&r| match &period {
                Some(p) => self.period_of(r) == p.as_str(),
                None => true,
            })
            .collect()
    }

    pub fn dre(&self, filter: &RecordFilter) -> DreBlock {
        let rows = self.filter(filter);
        aggregate(&self.table, &rows, &self.fields)
    }
}
