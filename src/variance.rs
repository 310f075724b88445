//! Budget vs actual comparison over already-aggregated DRE blocks. Each side
//! resolves its own columns before it gets here, so the raw column names of
//! the two sources never need to agree.

use crate::alias::CanonicalField;
use crate::dre::{DreBlock, LineKind};
use crate::util::safe_div;
use serde::Serialize;

/// Lines compared by [`compare`], in order.
pub const VARIANCE_LINES: [LineKind; 5] = [
    LineKind::GrossRevenue,
    LineKind::Deductions,
    LineKind::NetRevenue,
    LineKind::TotalCost,
    LineKind::ContributionMargin,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceRow {
    pub line: LineKind,
    pub budget: f64,
    pub actual: f64,
    /// `actual - budget`
    pub delta_abs: f64,
    /// `delta_abs / budget`, defined as 0 when the budget is 0.
    pub delta_pct: f64,
}

impl VarianceRow {
    pub fn new(line: LineKind, budget: f64, actual: f64) -> Self {
        let delta_abs = actual - budget;
        Self {
            line,
            budget,
            actual,
            delta_abs,
            delta_pct: safe_div(delta_abs, budget),
        }
    }
}

pub fn compare(budget: &DreBlock, actual: &DreBlock) -> Vec<VarianceRow> {
    VARIANCE_LINES
        .iter()
        .map(|&line| VarianceRow::new(line, budget.value(line), actual.value(line)))
        .collect()
}

/// Per-cost-line variance. Lines come in the budget's order, followed by any
/// line only the actual side carries.
pub fn compare_cost_lines(budget: &DreBlock, actual: &DreBlock) -> Vec<VarianceRow> {
    let mut fields: Vec<CanonicalField> = budget.cost_lines().iter().map(|(f, _)| *f).collect();
    for (f, _) in actual.cost_lines() {
        if !fields.contains(f) {
            fields.push(*f);
        }
    }
    fields
        .into_iter()
        .map(|f| VarianceRow::new(LineKind::Cost(f), budget.cost(f), actual.cost(f)))
        .collect()
}
