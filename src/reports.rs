use crate::dre::DreBlock;
use crate::group::{GroupKey, GroupedBlocks, RankMetric, RankingEntry};
use crate::types::{
    DreLineRow, DreSummaryLineRow, DreSummaryRow, RankingExportRow, VarianceExportRow,
};
use crate::util::{format_money, format_pct};
use crate::variance::VarianceRow;

pub fn dre_statement_rows(block: &DreBlock) -> Vec<DreLineRow> {
    block
        .statement_lines()
        .into_iter()
        .map(|line| DreLineRow {
            line: line.kind.label().to_string(),
            value: format_money(line.value),
            share_of_gross: format_pct(line.share_of_gross),
        })
        .collect()
}

/// Statement rows for the terminal preview: subtotal lines are bolded.
pub fn dre_statement_preview(block: &DreBlock) -> Vec<DreLineRow> {
    block
        .statement_lines()
        .into_iter()
        .zip(dre_statement_rows(block))
        .map(|(line, mut row)| {
            if line.kind.is_subtotal() {
                row.line = format!("**{}**", row.line);
            }
            row
        })
        .collect()
}

pub fn variance_export_rows(rows: &[VarianceRow]) -> Vec<VarianceExportRow> {
    rows.iter()
        .map(|r| VarianceExportRow {
            line: r.line.label().to_string(),
            budget: format_money(r.budget),
            actual: format_money(r.actual),
            delta_abs: format_money(r.delta_abs),
            delta_pct: format_pct(r.delta_pct),
        })
        .collect()
}

pub fn ranking_export_rows(ranking: &[RankingEntry], metric: RankMetric) -> Vec<RankingExportRow> {
    ranking
        .iter()
        .map(|entry| RankingExportRow {
            rank: entry.rank,
            group: entry.key.join(" | "),
            metric: if metric.is_ratio() {
                format_pct(entry.value)
            } else {
                format_money(entry.value)
            },
            gross_revenue: format_money(entry.block.gross_revenue()),
            contribution_margin: format_money(entry.block.contribution_margin()),
            margin_ratio: format_pct(entry.block.margin_ratio()),
        })
        .collect()
}

fn key_part(grouped: &GroupedBlocks, key: &[String], wanted: GroupKey) -> String {
    grouped
        .keys()
        .iter()
        .position(|k| *k == wanted)
        .and_then(|i| key.get(i))
        .cloned()
        .unwrap_or_default()
}

/// One unformatted row per group, for dashboard exports.
pub fn summary_rows(grouped: &GroupedBlocks) -> Vec<DreSummaryRow> {
    let part = |key: &[String], wanted: GroupKey| key_part(grouped, key, wanted);
    grouped
        .groups()
        .iter()
        .map(|(key, block)| DreSummaryRow {
            entity: part(key, GroupKey::Entity),
            period: part(key, GroupKey::Period),
            gross_revenue: block.gross_revenue(),
            deductions: block.deductions(),
            net_revenue: block.net_revenue(),
            total_cost: block.total_cost(),
            contribution_margin: block.contribution_margin(),
        })
        .collect()
}

/// Every statement line of every group, unformatted.
pub fn summary_line_rows(grouped: &GroupedBlocks) -> Vec<DreSummaryLineRow> {
    grouped
        .groups()
        .iter()
        .flat_map(|(key, block)| {
            let entity = key_part(grouped, key, GroupKey::Entity);
            let period = key_part(grouped, key, GroupKey::Period);
            block
                .statement_lines()
                .into_iter()
                .map(move |line| DreSummaryLineRow {
                    entity: entity.clone(),
                    period: period.clone(),
                    line: line.kind.label().to_string(),
                    value: line.value,
                    share_of_gross: line.share_of_gross,
                })
        })
        .collect()
}
