use crate::util::parse_f64_safe;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One cell of a loaded source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Missing,
}

impl Scalar {
    /// Numeric value for summing. Missing cells, dates, non-numeric text and
    /// non-finite numbers all count as zero.
    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::Number(n) if n.is_finite() => *n,
            Scalar::Number(_) => 0.0,
            Scalar::Text(s) => parse_f64_safe(Some(s)).unwrap_or(0.0),
            Scalar::Date(_) | Scalar::Missing => 0.0,
        }
    }

    /// Trimmed text form, `None` for missing or blank cells.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Date(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Scalar::Missing => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }
}

/// A loaded sheet: trimmed column headers plus rows that all share them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Headers are trimmed and blank ones become `Unnamed: <index>`. Rows are
    /// padded with `Missing` or truncated to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        let columns: Vec<String> = columns
            .into_iter()
            .enumerate()
            .map(|(idx, c)| {
                let c = c.trim();
                if c.is_empty() {
                    format!("Unnamed: {}", idx)
                } else {
                    c.to_string()
                }
            })
            .collect();
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Scalar::Missing);
                r
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `(row, col)`; out-of-range lookups read as `Missing`.
    pub fn cell(&self, row: usize, col: usize) -> &Scalar {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Scalar::Missing)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DreLineRow {
    #[serde(rename = "Line")]
    #[tabled(rename = "Line")]
    pub line: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "AV%")]
    #[tabled(rename = "AV%")]
    pub share_of_gross: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct VarianceExportRow {
    #[serde(rename = "Line")]
    #[tabled(rename = "Line")]
    pub line: String,
    #[serde(rename = "Budget")]
    #[tabled(rename = "Budget")]
    pub budget: String,
    #[serde(rename = "Actual")]
    #[tabled(rename = "Actual")]
    pub actual: String,
    #[serde(rename = "DeltaAbs")]
    #[tabled(rename = "DeltaAbs")]
    pub delta_abs: String,
    #[serde(rename = "DeltaPct")]
    #[tabled(rename = "DeltaPct")]
    pub delta_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingExportRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "GrossRevenue")]
    #[tabled(rename = "GrossRevenue")]
    pub gross_revenue: String,
    #[serde(rename = "ContributionMargin")]
    #[tabled(rename = "ContributionMargin")]
    pub contribution_margin: String,
    #[serde(rename = "MarginRatio")]
    #[tabled(rename = "MarginRatio")]
    pub margin_ratio: String,
}

/// Flat, unformatted DRE block for dashboard exports: one column per field.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DreSummaryRow {
    #[serde(rename = "Entity")]
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "GrossRevenue")]
    #[tabled(rename = "GrossRevenue")]
    pub gross_revenue: f64,
    #[serde(rename = "Deductions")]
    #[tabled(rename = "Deductions")]
    pub deductions: f64,
    #[serde(rename = "NetRevenue")]
    #[tabled(rename = "NetRevenue")]
    pub net_revenue: f64,
    #[serde(rename = "TotalCost")]
    #[tabled(rename = "TotalCost")]
    pub total_cost: f64,
    #[serde(rename = "ContributionMargin")]
    #[tabled(rename = "ContributionMargin")]
    pub contribution_margin: f64,
}

/// Long-form statement export: one row per group and statement line, cost
/// lines included.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DreSummaryLineRow {
    #[serde(rename = "Entity")]
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Line")]
    #[tabled(rename = "Line")]
    pub line: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: f64,
    #[serde(rename = "AV%")]
    #[tabled(rename = "AV%")]
    pub share_of_gross: f64,
}
