//! Canonical-field resolution: finds which raw column of a sheet carries a
//! given financial concept.

use crate::error::{DreError, Result};
use crate::util::{fold_header, fold_header_unaccented};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    GrossRevenue,
    LegalDeductions,
    Salary,
    TransportVoucher,
    FoodVoucher,
    MealVoucher,
    Attendance,
    TotalCharges,
    ExtraShift,
    Freelance,
    CostAllocation,
    ConsumableMaterial,
}

impl CanonicalField {
    /// Operating cost lines in statement order.
    pub const COST_LINES: [CanonicalField; 10] = [
        CanonicalField::Salary,
        CanonicalField::TransportVoucher,
        CanonicalField::FoodVoucher,
        CanonicalField::MealVoucher,
        CanonicalField::Attendance,
        CanonicalField::TotalCharges,
        CanonicalField::ExtraShift,
        CanonicalField::Freelance,
        CanonicalField::CostAllocation,
        CanonicalField::ConsumableMaterial,
    ];

    /// Statement label as printed on the DRE.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::GrossRevenue => "(+) FATURAMENTO BRUTO",
            CanonicalField::LegalDeductions => "(–) DEDUÇÕES LEGAIS",
            CanonicalField::Salary => "(–) SALÁRIO",
            CanonicalField::TransportVoucher => "(–) VALE TRANSPORTE",
            CanonicalField::FoodVoucher => "(–) VALE ALIMENTAÇÃO",
            CanonicalField::MealVoucher => "(–) VALE REFEIÇÃO",
            CanonicalField::Attendance => "(–) ASSIDUIDADE",
            CanonicalField::TotalCharges => "(–) TOTAL ENCARGOS",
            CanonicalField::ExtraShift => "(–) FT",
            CanonicalField::Freelance => "(–) FREELANCE",
            CanonicalField::CostAllocation => "(–) RATEIO MP",
            CanonicalField::ConsumableMaterial => "(–) MATERIAL DE CONSUMO",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub field: CanonicalField,
    pub aliases: Vec<String>,
}

/// Ordered `field -> aliases` dictionary. Alias order inside an entry is the
/// match priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn new(entries: Vec<AliasEntry>) -> Result<Self> {
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.field) {
                return Err(DreError::InvalidConfig(format!(
                    "field {} listed more than once",
                    entry.field
                )));
            }
            if entry.aliases.iter().all(|a| a.trim().is_empty()) {
                return Err(DreError::InvalidConfig(format!(
                    "field {} has no aliases",
                    entry.field
                )));
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.aliases.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve every field in the table against one sheet's columns.
    pub fn resolve_all(&self, columns: &[String]) -> ResolvedFields {
        let resolved: Vec<(CanonicalField, Option<String>)> = self
            .entries
            .iter()
            .map(|e| (e.field, resolve(columns, &e.aliases).map(str::to_string)))
            .collect();
        for (field, column) in &resolved {
            match column {
                Some(c) => debug!("{} -> column '{}'", field, c),
                None => warn!("{} unavailable: no matching column", field),
            }
        }
        ResolvedFields { resolved }
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        let entry = |field, aliases: &[&str]| AliasEntry {
            field,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        };
        Self {
            entries: vec![
                entry(
                    CanonicalField::GrossRevenue,
                    &["FAT MÊS $", "FAT MES $", "FAT_MES_$", "FAT_MES", "FAT", "FATURAMENTO BRUTO", "RECEITA BRUTA"],
                ),
                entry(
                    CanonicalField::LegalDeductions,
                    &["DEDUÇÕES LEGAIS", "DEDUCOES LEGAIS", "DEDUCOES", "DEDUÇÕES"],
                ),
                entry(CanonicalField::Salary, &["SALÁRIO", "SALARIO"]),
                entry(CanonicalField::TransportVoucher, &["VALE TRANSPORTE", "VT"]),
                entry(
                    CanonicalField::FoodVoucher,
                    &["VALE ALIMENTAÇÃO", "VALE ALIMENTACAO", "VA"],
                ),
                entry(CanonicalField::MealVoucher, &["VALE REFEIÇÃO", "VALE REFEICAO", "VR"]),
                entry(CanonicalField::Attendance, &["ASSIDUIDADE"]),
                entry(
                    CanonicalField::TotalCharges,
                    &["TOTAL ENCARGOS", "ENCARGOS", "TOTAL_ENCARGOS"],
                ),
                entry(CanonicalField::ExtraShift, &["FT"]),
                entry(CanonicalField::Freelance, &["FREELANCE"]),
                entry(CanonicalField::CostAllocation, &["RATEIO MP", "RATEIO_MP", "RATEIO"]),
                entry(
                    CanonicalField::ConsumableMaterial,
                    &["MATERIAL DE CONSUMO", "MATERIAL_CONSUMO", "MAT CONSUMO"],
                ),
            ],
        }
    }
}

/// Outcome of resolving an `AliasTable` against one sheet. Unresolved fields
/// are kept so they can be reported as unavailable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedFields {
    resolved: Vec<(CanonicalField, Option<String>)>,
}

impl ResolvedFields {
    pub fn column(&self, field: CanonicalField) -> Option<&str> {
        self.resolved
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, c)| c.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Option<&str>)> {
        self.resolved.iter().map(|(f, c)| (*f, c.as_deref()))
    }

    /// Fields with no matching column ("field unavailable" diagnostics).
    pub fn unavailable(&self) -> Vec<CanonicalField> {
        self.resolved
            .iter()
            .filter(|(_, c)| c.is_none())
            .map(|(f, _)| *f)
            .collect()
    }
}

/// First alias present in `columns`, returned as the raw column name.
///
/// For each alias in priority order, a column equal after case/space/sign
/// folding wins; failing that, a column equal once diacritics are also
/// dropped. Only then is the next alias tried.
pub fn resolve<'a, S: AsRef<str>>(columns: &'a [String], aliases: &[S]) -> Option<&'a str> {
    let folded: Vec<String> = columns.iter().map(|c| fold_header(c)).collect();
    let unaccented: Vec<String> = columns.iter().map(|c| fold_header_unaccented(c)).collect();
    for alias in aliases {
        let alias = alias.as_ref();
        if alias.trim().is_empty() {
            continue;
        }
        let key = fold_header(alias);
        if let Some(idx) = folded.iter().position(|c| *c == key) {
            return Some(columns[idx].as_str());
        }
        let key = fold_header_unaccented(alias);
        if let Some(idx) = unaccented.iter().position(|c| *c == key) {
            return Some(columns[idx].as_str());
        }
    }
    None
}

/// Positional default used when a structural column cannot be matched by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFallback {
    None,
    First,
    Last,
}

/// Resolution for structural columns (entity, period): alias match, then
/// substring containment of any alias, then the positional fallback. Never
/// used for financial line items.
pub fn resolve_structural<'a, S: AsRef<str>>(
    columns: &'a [String],
    aliases: &[S],
    fallback: ColumnFallback,
) -> Option<&'a str> {
    if let Some(c) = resolve(columns, aliases) {
        return Some(c);
    }
    for alias in aliases {
        let key = fold_header_unaccented(alias.as_ref());
        if key.is_empty() {
            continue;
        }
        if let Some(c) = columns
            .iter()
            .find(|c| fold_header_unaccented(c).contains(&key))
        {
            debug!("structural column '{}' matched by substring '{}'", c, key);
            return Some(c.as_str());
        }
    }
    let positional = match fallback {
        ColumnFallback::None => None,
        ColumnFallback::First => columns.first(),
        ColumnFallback::Last => columns.last(),
    };
    if let Some(c) = positional {
        warn!("no structural column matched {:?}; falling back to '{}'", fallback, c);
    }
    positional.map(String::as_str)
}
