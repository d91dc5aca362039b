use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::FlowPoint;

/// Net flow summed per investor type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct InvestorTotals {
    pub foreign: f64,
    pub institution: f64,
    pub individual: f64,
}

impl InvestorTotals {
    fn add(mut self, point: &FlowPoint) -> Self {
        self.foreign += point.foreign;
        self.institution += point.institution;
        self.individual += point.individual;
        self
    }
}

/// Investor flow card for one market
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestorFlow {
    pub market: String,
    /// Chronological, ending with the latest point on or before the run date
    pub points: Vec<FlowPoint>,
    pub today: InvestorTotals,
    /// Sums over the last `cumulative_days` points
    pub cumulative: InvestorTotals,
    pub cumulative_days: usize,
}

/// Build the flow card from raw points: later-dated and non-finite points are
/// dropped, the last `keep` are kept and the last `sum_days` are summed.
///
/// None when nothing is left.
pub fn investor_flow(
    market: &str,
    points: &[FlowPoint],
    as_of: NaiveDate,
    keep: usize,
    sum_days: usize,
) -> Option<InvestorFlow> {
    let mut eligible: Vec<FlowPoint> = points
        .iter()
        .filter(|p| {
            p.date <= as_of
                && p.foreign.is_finite()
                && p.institution.is_finite()
                && p.individual.is_finite()
        })
        .cloned()
        .collect();
    eligible.sort_by_key(|p| p.date);
    eligible.dedup_by_key(|p| p.date);

    let today = InvestorTotals::default().add(eligible.last()?);
    let recent = &eligible[eligible.len().saturating_sub(sum_days)..];
    let cumulative = recent.iter().fold(InvestorTotals::default(), InvestorTotals::add);
    let cumulative_days = recent.len();

    let points = eligible.split_off(eligible.len().saturating_sub(keep));

    Some(InvestorFlow {
        market: market.to_string(),
        points,
        today,
        cumulative,
        cumulative_days,
    })
}

/// Sum of net foreign flow over the last `days` points on or before `as_of`.
///
/// Returns None when the feed has nothing for the window, so the regime
/// sub-score can fall back to neutral.
pub fn cumulative_flow(points: &[FlowPoint], as_of: NaiveDate, days: usize) -> Option<f64> {
    let mut eligible: Vec<&FlowPoint> = points
        .iter()
        .filter(|p| p.date <= as_of && p.foreign.is_finite())
        .collect();

    if eligible.is_empty() || days == 0 {
        return None;
    }

    eligible.sort_by_key(|p| p.date);
    let start = eligible.len().saturating_sub(days);
    Some(eligible[start..].iter().map(|p| p.foreign).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, foreign: f64) -> FlowPoint {
        FlowPoint {
            date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            foreign,
            institution: 0.0,
            individual: -foreign,
            other: 0.0,
        }
    }

    #[test]
    fn test_sums_last_five_days() {
        let points: Vec<FlowPoint> = (2..=9).map(|d| point(d, d as f64 * 100.0)).collect();
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();

        // Days 5..=9
        assert_eq!(cumulative_flow(&points, as_of, 5), Some(3500.0));
    }

    #[test]
    fn test_ignores_points_after_run_date() {
        let points = vec![point(10, 1000.0), point(3, -200.0), point(4, 50.0)];
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();

        assert_eq!(cumulative_flow(&points, as_of, 5), Some(-150.0));
    }

    #[test]
    fn test_investor_flow_card() {
        let mut points: Vec<FlowPoint> = (2..=13)
            .map(|d| FlowPoint {
                date: NaiveDate::from_ymd_opt(2026, 2, d).unwrap(),
                foreign: 100.0,
                institution: -40.0,
                individual: -60.0,
                other: 0.0,
            })
            .collect();
        points.push(point(20, 9999.0));
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 13).unwrap();

        let flow = investor_flow("KOSPI", &points, as_of, 10, 5).unwrap();
        assert_eq!(flow.market, "KOSPI");
        assert_eq!(flow.points.len(), 10);
        assert_eq!(flow.points.last().unwrap().date, as_of);
        assert_eq!(flow.today.foreign, 100.0);
        assert_eq!(flow.cumulative_days, 5);
        assert!((flow.cumulative.foreign - 500.0).abs() < 1e-9);
        assert!((flow.cumulative.institution + 200.0).abs() < 1e-9);
        assert!((flow.cumulative.individual + 300.0).abs() < 1e-9);

        // Short history sums what there is
        let flow = investor_flow("KOSPI", &points[..2], as_of, 10, 5).unwrap();
        assert_eq!(flow.cumulative_days, 2);
        assert!((flow.cumulative.foreign - 200.0).abs() < 1e-9);

        assert!(investor_flow("KOSPI", &[point(20, 1.0)], as_of, 10, 5).is_none());
    }

    #[test]
    fn test_missing_feed_is_none() {
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        assert_eq!(cumulative_flow(&[], as_of, 5), None);
    }
}
