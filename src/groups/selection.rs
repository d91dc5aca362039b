use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::groups::GroupPerformance;

/// Smallest tile size so flat groups stay visible on the heatmap
const MIN_TILE_VALUE: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeatmapTile {
    pub group_id: String,
    pub value: f64,
    pub change: f64,
}

/// First `n` groups of a ranking
pub fn top(ranked: &[GroupPerformance], n: usize) -> Vec<GroupPerformance> {
    ranked.iter().take(n).cloned().collect()
}

/// Worst `n` groups, worst first. Empty unless at least `n` groups ranked.
pub fn bottom(ranked: &[GroupPerformance], n: usize) -> Vec<GroupPerformance> {
    if n == 0 || ranked.len() < n {
        return Vec::new();
    }
    ranked.iter().rev().take(n).cloned().collect()
}

/// Top `n` followed by bottom `n`, each group at most once
pub fn select_extremes(ranked: &[GroupPerformance], n: usize) -> Vec<GroupPerformance> {
    let head = &ranked[..n.min(ranked.len())];
    let tail = &ranked[ranked.len().saturating_sub(n)..];

    let mut seen: HashSet<&str> = HashSet::new();
    head.iter()
        .chain(tail.iter())
        .filter(|g| seen.insert(g.group_id.as_str()))
        .cloned()
        .collect()
}

pub fn heatmap(ranked: &[GroupPerformance], n: usize) -> Vec<HeatmapTile> {
    select_extremes(ranked, n)
        .into_iter()
        .map(|g| HeatmapTile {
            value: g.avg_return.abs().max(MIN_TILE_VALUE),
            change: g.avg_return,
            group_id: g.group_id,
        })
        .collect()
}
