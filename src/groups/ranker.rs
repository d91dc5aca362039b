/// Theme / sector performance ranking
///
/// For every group with enough qualifying members (present in the
/// cross-section, trading, defined return):
/// 1. avg_return: unweighted mean member return (%)
/// 2. sync_rate: % of members with a positive return
/// 3. trading_value_share: group turnover as % of the whole day's turnover
/// 4. total_market_cap: sum of member capitalisations
///
/// Groups are then ranked by avg_return descending. The sort is stable, so
/// equal returns keep membership order.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::GroupConfig;
use crate::models::{CrossSection, CrossSectionRow, Group, GroupKind, GroupMembership};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupPerformance {
    pub group_id: String,
    pub kind: GroupKind,
    pub date: NaiveDate,
    /// Unweighted mean member return (%)
    pub avg_return: f64,
    pub sync_rate: f64,
    pub member_count: usize,
    pub trading_value_share: Option<f64>,
    pub total_market_cap: Option<f64>,
    /// Cap-weighted mean member return (%); a separate notion from `avg_return`
    pub cap_weighted_return: Option<f64>,
    pub top_members: Vec<String>,
    pub rank: usize,
    pub prev_rank: Option<usize>,
}

pub struct GroupPerformanceRanker {
    min_members: usize,
    top_members: usize,
}

impl Default for GroupPerformanceRanker {
    fn default() -> Self {
        Self::from_config(&GroupConfig::default())
    }
}

impl GroupPerformanceRanker {
    pub fn new(min_members: usize, top_members: usize) -> Self {
        Self {
            min_members,
            top_members,
        }
    }

    pub fn from_config(config: &GroupConfig) -> Self {
        Self::new(config.min_members, config.top_stocks)
    }

    /// Rank every qualifying group for the cross-section's date.
    ///
    /// `prior` is the previous trading date's ranking; groups missing from it
    /// get `prev_rank = None`.
    pub fn rank(
        &self,
        kind: GroupKind,
        membership: &GroupMembership,
        cross_section: &CrossSection,
        prior: &[GroupPerformance],
    ) -> Vec<GroupPerformance> {
        let rows = cross_section.index();
        let total_turnover = cross_section.total_trading_value();

        let mut ranked: Vec<GroupPerformance> = membership
            .groups()
            .iter()
            .filter_map(|group| self.evaluate(kind, group, cross_section.date, &rows, total_turnover))
            .collect();

        ranked.sort_by(|a, b| b.avg_return.total_cmp(&a.avg_return));

        let prior_ranks: HashMap<&str, usize> = prior
            .iter()
            .map(|p| (p.group_id.as_str(), p.rank))
            .collect();

        for (i, perf) in ranked.iter_mut().enumerate() {
            perf.rank = i + 1;
            perf.prev_rank = prior_ranks.get(perf.group_id.as_str()).copied();
        }

        tracing::debug!(
            date = %cross_section.date,
            ?kind,
            groups = membership.len(),
            ranked = ranked.len(),
            "groups ranked"
        );

        ranked
    }

    /// Rank against `cross_section`, deriving `prev_rank` by re-running the
    /// same ranking on the prior trading date's cross-section.
    pub fn rank_with_prior_section(
        &self,
        kind: GroupKind,
        membership: &GroupMembership,
        cross_section: &CrossSection,
        prior_section: Option<&CrossSection>,
    ) -> Vec<GroupPerformance> {
        let prior = prior_section
            .map(|p| self.rank(kind, membership, p, &[]))
            .unwrap_or_default();
        self.rank(kind, membership, cross_section, &prior)
    }

    fn evaluate(
        &self,
        kind: GroupKind,
        group: &Group,
        date: NaiveDate,
        rows: &HashMap<&str, &CrossSectionRow>,
        total_turnover: f64,
    ) -> Option<GroupPerformance> {
        let members: Vec<(&CrossSectionRow, f64)> = group
            .members
            .iter()
            .filter_map(|id| rows.get(id.as_str()))
            .filter(|row| row.is_trading())
            .filter_map(|row| row.daily_return().map(|r| (*row, r)))
            .collect();

        if members.len() < self.min_members {
            tracing::debug!(
                group = %group.id,
                qualifying = members.len(),
                "group excluded: insufficient members"
            );
            return None;
        }

        let n = members.len() as f64;
        let avg_return = 100.0 * members.iter().map(|(_, r)| r).sum::<f64>() / n;
        let positive = members.iter().filter(|(_, r)| *r > 0.0).count();
        let sync_rate = 100.0 * positive as f64 / n;

        let group_turnover: f64 = members.iter().map(|(row, _)| row.trading_value()).sum();
        let trading_value_share =
            (total_turnover > 0.0).then(|| 100.0 * group_turnover / total_turnover);

        let caps: Vec<(f64, f64)> = members
            .iter()
            .filter_map(|(row, r)| row.market_cap.filter(|c| *c > 0.0).map(|c| (c, *r)))
            .collect();
        let total_market_cap = (!caps.is_empty()).then(|| caps.iter().map(|(c, _)| c).sum::<f64>());
        let cap_weighted_return = total_market_cap
            .map(|total| 100.0 * caps.iter().map(|(c, r)| c * r).sum::<f64>() / total);

        let mut by_return = members.clone();
        by_return.sort_by(|a, b| b.1.total_cmp(&a.1));
        let top_members = by_return
            .iter()
            .take(self.top_members)
            .map(|(row, _)| {
                if row.name.is_empty() {
                    row.instrument_id.clone()
                } else {
                    row.name.clone()
                }
            })
            .collect();

        Some(GroupPerformance {
            group_id: group.id.clone(),
            kind,
            date,
            avg_return,
            sync_rate,
            member_count: members.len(),
            trading_value_share,
            total_market_cap,
            cap_weighted_return,
            top_members,
            rank: 0,
            prev_rank: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 11).unwrap()
    }

    fn row(id: &str, ret_pct: f64, volume: f64, cap: Option<f64>) -> CrossSectionRow {
        CrossSectionRow {
            instrument_id: id.to_string(),
            name: String::new(),
            close: 100.0 * (1.0 + ret_pct / 100.0),
            volume,
            prior_close: Some(100.0),
            ma20: None,
            history_days: 30,
            market_cap: cap,
        }
    }

    fn membership(groups: &[(&str, &[&str])]) -> GroupMembership {
        groups
            .iter()
            .map(|(id, members)| (id.to_string(), members.iter().map(|m| m.to_string()).collect::<Vec<_>>()))
            .collect()
    }

    #[test]
    fn test_avg_return_and_sync_rate() {
        let cs = CrossSection::new(
            date(),
            vec![
                row("A", 2.0, 10.0, None),
                row("B", 1.0, 10.0, None),
                row("C", -1.0, 10.0, None),
                row("D", -3.0, 10.0, None),
            ],
        );
        let groups = membership(&[("Batteries", &["A", "B", "C", "D"])]);
        let ranked = GroupPerformanceRanker::default().rank(GroupKind::Theme, &groups, &cs, &[]);

        assert_eq!(ranked.len(), 1);
        let g = &ranked[0];
        assert!((g.avg_return + 0.25).abs() < 1e-9);
        assert!((g.sync_rate - 50.0).abs() < 1e-9);
        assert_eq!(g.member_count, 4);
        assert_eq!(g.rank, 1);
        assert_eq!(g.prev_rank, None);
    }

    #[test]
    fn test_small_groups_are_excluded() {
        let cs = CrossSection::new(
            date(),
            vec![
                row("A", 2.0, 10.0, None),
                row("B", 1.0, 10.0, None),
                row("C", 1.0, 0.0, None), // halted
                row("D", 1.0, 10.0, None),
            ],
        );
        // Only two qualifying members; "Z" is not in the cross-section at all
        let groups = membership(&[("Small", &["A", "B", "C", "Z"]), ("Ok", &["A", "B", "D"])]);
        let ranked = GroupPerformanceRanker::default().rank(GroupKind::Theme, &groups, &cs, &[]);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].group_id, "Ok");
    }

    #[test]
    fn test_ties_keep_membership_order() {
        let cs = CrossSection::new(
            date(),
            vec![
                row("A", 1.0, 10.0, None),
                row("B", 1.0, 10.0, None),
                row("C", 1.0, 10.0, None),
                row("D", 3.0, 10.0, None),
            ],
        );
        let groups = membership(&[
            ("First", &["A", "B", "C"]),
            ("Leader", &["B", "C", "D"]),
            ("Second", &["C", "B", "A"]),
        ]);
        let ranked = GroupPerformanceRanker::default().rank(GroupKind::Theme, &groups, &cs, &[]);

        let order: Vec<&str> = ranked.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, vec!["Leader", "First", "Second"]);
        assert_eq!(ranked.iter().map(|g| g.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_turnover_share_and_caps() {
        let cs = CrossSection::new(
            date(),
            vec![
                row("A", 0.0, 10.0, Some(300.0)),
                row("B", 0.0, 10.0, Some(100.0)),
                row("C", 10.0, 10.0, None),
                row("X", 0.0, 30.0, Some(1000.0)),
            ],
        );
        let groups = membership(&[("G", &["A", "B", "C"])]);
        let ranked = GroupPerformanceRanker::default().rank(GroupKind::Sector, &groups, &cs, &[]);
        let g = &ranked[0];

        // Closes: 100, 100, 110, 100 with volumes 10, 10, 10, 30
        let expected_share = 100.0 * 3100.0 / 6100.0;
        assert!((g.trading_value_share.unwrap() - expected_share).abs() < 1e-9);
        assert_eq!(g.total_market_cap, Some(400.0));
        // Uncapitalised C does not move the cap-weighted return
        assert!(g.cap_weighted_return.unwrap().abs() < 1e-9);
        assert!((g.avg_return - 10.0 / 3.0).abs() < 1e-9);
        assert_eq!(g.top_members[0], "C");
    }

    #[test]
    fn test_prev_rank_from_prior_section() {
        let prior = CrossSection::new(
            date() - chrono::Duration::days(1),
            vec![
                row("A", 5.0, 10.0, None),
                row("B", 5.0, 10.0, None),
                row("C", 5.0, 10.0, None),
                row("D", -5.0, 10.0, None),
                row("E", -5.0, 10.0, None),
                row("F", -5.0, 10.0, None),
            ],
        );
        let current = CrossSection::new(
            date(),
            vec![
                row("A", -1.0, 10.0, None),
                row("B", -1.0, 10.0, None),
                row("C", -1.0, 10.0, None),
                row("D", 2.0, 10.0, None),
                row("E", 2.0, 10.0, None),
                row("F", 2.0, 10.0, None),
                row("G", 9.0, 10.0, None),
                row("H", 9.0, 10.0, None),
                row("I", 9.0, 10.0, None),
            ],
        );
        let groups = membership(&[
            ("Winners", &["A", "B", "C"]),
            ("Losers", &["D", "E", "F"]),
            ("New", &["G", "H", "I"]),
        ]);
        let ranked = GroupPerformanceRanker::default().rank_with_prior_section(
            GroupKind::Theme,
            &groups,
            &current,
            Some(&prior),
        );

        let by_id: HashMap<&str, &GroupPerformance> =
            ranked.iter().map(|g| (g.group_id.as_str(), g)).collect();
        assert_eq!(by_id["New"].rank, 1);
        assert_eq!(by_id["New"].prev_rank, None);
        assert_eq!(by_id["Losers"].rank, 2);
        assert_eq!(by_id["Losers"].prev_rank, Some(2));
        assert_eq!(by_id["Winners"].rank, 3);
        assert_eq!(by_id["Winners"].prev_rank, Some(1));
    }
}
