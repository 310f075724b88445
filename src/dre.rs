//! The standardized income-statement block (DRE) and its aggregation.

use crate::alias::{CanonicalField, ResolvedFields};
use crate::types::Table;
use crate::util::safe_div;
use log::debug;
use serde::Serialize;
use std::fmt;

/// One line of the rendered statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LineKind {
    GrossRevenue,
    Deductions,
    NetRevenue,
    TotalCost,
    Cost(CanonicalField),
    ContributionMargin,
}

impl LineKind {
    pub fn label(&self) -> &'static str {
        match self {
            LineKind::GrossRevenue => CanonicalField::GrossRevenue.label(),
            LineKind::Deductions => CanonicalField::LegalDeductions.label(),
            LineKind::NetRevenue => "(=) FATURAMENTO LÍQUIDO",
            LineKind::TotalCost => "(–) CSP",
            LineKind::Cost(field) => field.label(),
            LineKind::ContributionMargin => "(=) MARGEM DE CONTRIBUIÇÃO",
        }
    }

    /// Subtotal lines are highlighted when rendered.
    pub fn is_subtotal(&self) -> bool {
        !matches!(self, LineKind::Deductions | LineKind::Cost(_))
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DreLine {
    pub kind: LineKind,
    pub value: f64,
    /// Value over gross revenue ("AV%"), zero when there is no revenue.
    pub share_of_gross: f64,
}

/// Aggregated statement for one record subset. Derived totals are computed on
/// construction and the block is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DreBlock {
    gross_revenue: f64,
    deductions: f64,
    net_revenue: f64,
    cost_lines: Vec<(CanonicalField, f64)>,
    total_cost: f64,
    contribution_margin: f64,
}

impl DreBlock {
    pub fn from_parts(
        gross_revenue: f64,
        deductions: f64,
        cost_lines: Vec<(CanonicalField, f64)>,
    ) -> Self {
        let net_revenue = gross_revenue - deductions;
        let total_cost = cost_lines.iter().map(|(_, v)| v).sum::<f64>();
        Self {
            gross_revenue,
            deductions,
            net_revenue,
            cost_lines,
            total_cost,
            contribution_margin: net_revenue - total_cost,
        }
    }

    pub fn gross_revenue(&self) -> f64 {
        self.gross_revenue
    }

    pub fn deductions(&self) -> f64 {
        self.deductions
    }

    pub fn net_revenue(&self) -> f64 {
        self.net_revenue
    }

    pub fn cost_lines(&self) -> &[(CanonicalField, f64)] {
        &self.cost_lines
    }

    pub fn cost(&self, field: CanonicalField) -> f64 {
        self.cost_lines
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn contribution_margin(&self) -> f64 {
        self.contribution_margin
    }

    /// Contribution margin over gross revenue.
    pub fn margin_ratio(&self) -> f64 {
        safe_div(self.contribution_margin, self.gross_revenue)
    }

    pub fn value(&self, kind: LineKind) -> f64 {
        match kind {
            LineKind::GrossRevenue => self.gross_revenue,
            LineKind::Deductions => self.deductions,
            LineKind::NetRevenue => self.net_revenue,
            LineKind::TotalCost => self.total_cost,
            LineKind::Cost(field) => self.cost(field),
            LineKind::ContributionMargin => self.contribution_margin,
        }
    }

    /// Statement in display order with each line's share of gross revenue.
    pub fn statement_lines(&self) -> Vec<DreLine> {
        let mut kinds = vec![
            LineKind::GrossRevenue,
            LineKind::Deductions,
            LineKind::NetRevenue,
            LineKind::TotalCost,
        ];
        kinds.extend(self.cost_lines.iter().map(|(f, _)| LineKind::Cost(*f)));
        kinds.push(LineKind::ContributionMargin);
        kinds
            .into_iter()
            .map(|kind| {
                let value = self.value(kind);
                DreLine {
                    kind,
                    value,
                    share_of_gross: safe_div(value, self.gross_revenue),
                }
            })
            .collect()
    }
}

fn sum_column(table: &Table, rows: &[usize], column: Option<&str>) -> f64 {
    let Some(col) = column.and_then(|c| table.column_index(c)) else {
        return 0.0;
    };
    rows.iter().map(|&r| table.cell(r, col).as_f64()).sum()
}

/// Sum the resolved fields over `rows`. Unresolved fields contribute zero;
/// cost lines keep the order in which `fields` lists them.
pub fn aggregate(table: &Table, rows: &[usize], fields: &ResolvedFields) -> DreBlock {
    let gross = sum_column(table, rows, fields.column(CanonicalField::GrossRevenue));
    let deductions = sum_column(table, rows, fields.column(CanonicalField::LegalDeductions));
    let cost_lines: Vec<(CanonicalField, f64)> = fields
        .iter()
        .filter(|(f, _)| {
            !matches!(f, CanonicalField::GrossRevenue | CanonicalField::LegalDeductions)
        })
        .map(|(f, column)| (f, sum_column(table, rows, column)))
        .collect();
    debug!("aggregated {} rows into DRE block", rows.len());
    DreBlock::from_parts(gross, deductions, cost_lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasTable;
    use crate::types::Scalar;
    use pretty_assertions::assert_eq;

    fn table(columns: &[&str], rows: Vec<Vec<Scalar>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn all_rows(t: &Table) -> Vec<usize> {
        (0..t.len()).collect()
    }

    #[test]
    fn single_record_scenario() {
        let t = table(
            &["EMPRESA", "TIMES", "FAT MÊS $", "DEDUÇÕES LEGAIS", "SALÁRIO"],
            vec![vec![
                Scalar::Text("A".into()),
                Scalar::Text("2025-09".into()),
                Scalar::Number(10000.0),
                Scalar::Number(1000.0),
                Scalar::Number(3000.0),
            ]],
        );
        let fields = AliasTable::default().resolve_all(t.columns());
        let block = aggregate(&t, &all_rows(&t), &fields);
        assert_eq!(block.gross_revenue(), 10000.0);
        assert_eq!(block.deductions(), 1000.0);
        assert_eq!(block.net_revenue(), 9000.0);
        assert_eq!(block.total_cost(), 3000.0);
        assert_eq!(block.contribution_margin(), 6000.0);
        assert_eq!(block.cost(CanonicalField::Salary), 3000.0);
        assert_eq!(block.cost(CanonicalField::Freelance), 0.0);
    }

    #[test]
    fn missing_column_equals_zero_filled_column() {
        let base = table(
            &["FAT", "SALARIO"],
            vec![
                vec![Scalar::Number(500.0), Scalar::Number(100.0)],
                vec![Scalar::Number(250.0), Scalar::Missing],
            ],
        );
        let filled = table(
            &["FAT", "SALARIO", "FREELANCE"],
            vec![
                vec![Scalar::Number(500.0), Scalar::Number(100.0), Scalar::Number(0.0)],
                vec![Scalar::Number(250.0), Scalar::Missing, Scalar::Number(0.0)],
            ],
        );
        let aliases = AliasTable::default();
        let a = aggregate(&base, &all_rows(&base), &aliases.resolve_all(base.columns()));
        let b = aggregate(&filled, &all_rows(&filled), &aliases.resolve_all(filled.columns()));
        assert_eq!(a, b);
        assert_eq!(a.total_cost(), 100.0);
    }

    #[test]
    fn cost_lines_follow_alias_table_order() {
        let t = table(&["RATEIO", "VT", "SALARIO"], vec![]);
        let fields = AliasTable::default().resolve_all(t.columns());
        let block = aggregate(&t, &[], &fields);
        let order: Vec<CanonicalField> = block.cost_lines().iter().map(|(f, _)| *f).collect();
        assert_eq!(order, CanonicalField::COST_LINES.to_vec());
    }

    #[test]
    fn identities_hold_and_shares_are_guarded() {
        let block = DreBlock::from_parts(
            0.0,
            120.0,
            vec![(CanonicalField::Salary, 80.5), (CanonicalField::TotalCharges, 19.5)],
        );
        assert_eq!(block.net_revenue(), block.gross_revenue() - block.deductions());
        assert_eq!(block.contribution_margin(), block.net_revenue() - block.total_cost());
        assert_eq!(block.margin_ratio(), 0.0);
        assert!(block.statement_lines().iter().all(|l| l.share_of_gross == 0.0));
    }

    #[test]
    fn statement_lines_in_display_order() {
        let block = DreBlock::from_parts(1000.0, 100.0, vec![(CanonicalField::Salary, 300.0)]);
        let lines = block.statement_lines();
        let labels: Vec<&str> = lines.iter().map(|l| l.kind.label()).collect();
        assert_eq!(
            labels,
            vec![
                "(+) FATURAMENTO BRUTO",
                "(–) DEDUÇÕES LEGAIS",
                "(=) FATURAMENTO LÍQUIDO",
                "(–) CSP",
                "(–) SALÁRIO",
                "(=) MARGEM DE CONTRIBUIÇÃO",
            ]
        );
        assert_eq!(lines[0].share_of_gross, 1.0);
        assert_eq!(lines[5].value, 600.0);
        assert_eq!(lines[5].share_of_gross, 0.6);
    }
}
