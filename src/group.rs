//! Per-group DRE blocks and the dashboard rankings built on them.

use crate::dataset::{Dataset, RecordFilter};
use crate::dre::{aggregate, DreBlock};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKey {
    Entity,
    Period,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankMetric {
    GrossRevenue,
    TotalCost,
    ContributionMargin,
    /// Contribution margin over gross revenue.
    MarginRatio,
}

impl RankMetric {
    pub fn value(&self, block: &DreBlock) -> f64 {
        match self {
            RankMetric::GrossRevenue => block.gross_revenue(),
            RankMetric::TotalCost => block.total_cost(),
            RankMetric::ContributionMargin => block.contribution_margin(),
            RankMetric::MarginRatio => block.margin_ratio(),
        }
    }

    pub fn is_ratio(&self) -> bool {
        matches!(self, RankMetric::MarginRatio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub rank: usize,
    pub key: Vec<String>,
    pub value: f64,
    pub block: DreBlock,
}

/// DRE blocks keyed by the tuple of group values, in `keys` order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBlocks {
    keys: Vec<GroupKey>,
    groups: BTreeMap<Vec<String>, DreBlock>,
}

impl GroupedBlocks {
    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn groups(&self) -> &BTreeMap<Vec<String>, DreBlock> {
        &self.groups
    }

    pub fn get(&self, key: &[&str]) -> Option<&DreBlock> {
        let key: Vec<String> = key.iter().map(|k| k.to_string()).collect();
        self.groups.get(&key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn entity_part<'a>(&self, key: &'a [String]) -> &'a str {
        self.keys
            .iter()
            .position(|k| *k == GroupKey::Entity)
            .and_then(|i| key.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Groups ordered by `metric`, ties broken by entity name then by the
    /// full key, truncated to `top_n` when given.
    pub fn rank(
        &self,
        metric: RankMetric,
        order: SortOrder,
        top_n: Option<usize>,
    ) -> Vec<RankingEntry> {
        let mut scored: Vec<(f64, &Vec<String>, &DreBlock)> = self
            .groups
            .iter()
            .map(|(key, block)| (metric.value(block), key, block))
            .collect();

        scored.sort_by(|a, b| {
            let by_value = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
            let by_value = match order {
                SortOrder::Ascending => by_value,
                SortOrder::Descending => by_value.reverse(),
            };
            by_value
                .then_with(|| self.entity_part(a.1).cmp(self.entity_part(b.1)))
                .then_with(|| a.1.cmp(b.1))
        });

        scored
            .into_iter()
            .take(top_n.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(idx, (value, key, block))| RankingEntry {
                rank: idx + 1,
                key: key.clone(),
                value,
                block: block.clone(),
            })
            .collect()
    }
}

/// Aggregate each distinct key tuple of the filtered rows independently.
/// Rows with a blank entity or period are left out of groupings on that key.
pub fn aggregate_by(dataset: &Dataset, filter: &RecordFilter, keys: &[GroupKey]) -> GroupedBlocks {
    let mut members: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for row in dataset.filter(filter) {
        let key: Option<Vec<String>> = keys
            .iter()
            .map(|k| match k {
                GroupKey::Entity => dataset.entity_of(row).map(str::to_string),
                GroupKey::Period => {
                    let p = dataset.period_of(row);
                    (!p.is_empty()).then(|| p.to_string())
                }
            })
            .collect();
        if let Some(key) = key {
            members.entry(key).or_default().push(row);
        }
    }

    let groups: BTreeMap<Vec<String>, DreBlock> = members
        .into_iter()
        .map(|(key, rows)| {
            let block = aggregate(dataset.table(), &rows, dataset.fields());
            (key, block)
        })
        .collect();
    debug!("grouped by {:?}: {} groups", keys, groups.len());

    GroupedBlocks {
        keys: keys.to_vec(),
        groups,
    }
}
