use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::breadth::BreadthStats;
use crate::config::SummaryConfig;
use crate::indicators::trailing_mean;
use crate::models::CrossSection;

/// Floor applied to the average turnover before dividing
const MIN_TURNOVER_AVG: f64 = 0.01;

/// Traffic-light signal shown next to a ratio metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Green,
    Yellow,
    Red,
}

impl Signal {
    pub fn from_ratio(value: f64, green_at: f64, red_below: f64) -> Self {
        if value >= green_at {
            Signal::Green
        } else if value < red_below {
            Signal::Red
        } else {
            Signal::Yellow
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub up: usize,
    pub down: usize,
    pub flat: usize,
    pub adr: f64,
    pub trading_value: f64,
}

impl DaySummary {
    pub fn new(breadth: &BreadthStats, cross_section: &CrossSection) -> Self {
        Self {
            date: breadth.date,
            up: breadth.advances,
            down: breadth.declines,
            flat: breadth.flat,
            adr: breadth.adr,
            trading_value: cross_section.settled_trading_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummarySignals {
    pub adr: Signal,
    pub trading_value: Signal,
}

/// Share (%) of the day's turnover taken by the largest names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnoverConcentration {
    pub top10: f64,
    pub top20: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSummary {
    pub date: NaiveDate,
    pub latest: DaySummary,
    pub sparkline: Vec<DaySummary>,
    pub trading_value_avg: f64,
    pub trading_value_ratio: f64,
    pub signals: SummarySignals,
    pub concentration: Option<TurnoverConcentration>,
}

pub fn turnover_concentration(cross_section: &CrossSection) -> Option<TurnoverConcentration> {
    let mut values: Vec<f64> = cross_section
        .rows
        .iter()
        .filter(|r| r.is_trading())
        .map(|r| r.trading_value())
        .collect();
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return None;
    }

    values.sort_by(|a, b| b.total_cmp(a));
    let share = |n: usize| 100.0 * values.iter().take(n).sum::<f64>() / total;

    Some(TurnoverConcentration {
        top10: share(10),
        top20: share(20),
    })
}

/// Today's turnover over its trailing average (today included)
///
/// `turnover_history` is chronological and ends with the run date.
pub fn trading_value_ratio(turnover_history: &[f64], avg_days: usize) -> Option<(f64, f64)> {
    let today = *turnover_history.last()?;
    let avg = trailing_mean(turnover_history, avg_days)?;
    Some((avg, today / avg.max(MIN_TURNOVER_AVG)))
}

/// Assemble the summary card from the sparkline days (chronological, ending
/// with the run date) and the turnover history.
pub fn build_market_summary(
    sparkline: Vec<DaySummary>,
    turnover_history: &[f64],
    latest_section: &CrossSection,
    config: &SummaryConfig,
) -> Option<MarketSummary> {
    let latest = sparkline.last()?.clone();
    let (avg, ratio) = trading_value_ratio(turnover_history, config.turnover_avg_days)?;

    let signals = SummarySignals {
        adr: Signal::from_ratio(latest.adr, config.signal_green, config.signal_red),
        trading_value: Signal::from_ratio(ratio, config.signal_green, config.signal_red),
    };

    Some(MarketSummary {
        date: latest.date,
        latest,
        sparkline,
        trading_value_avg: avg,
        trading_value_ratio: ratio,
        signals,
        concentration: turnover_concentration(latest_section),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breadth::BreadthCalculator;
    use crate::models::CrossSectionRow;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 11).unwrap()
    }

    fn section(turnovers: &[f64]) -> CrossSection {
        CrossSection::new(
            date(),
            turnovers
                .iter()
                .enumerate()
                .map(|(i, &tv)| CrossSectionRow {
                    instrument_id: format!("S{}", i),
                    name: String::new(),
                    close: 1.0,
                    volume: tv,
                    prior_close: Some(1.0),
                    ma20: None,
                    history_days: 0,
                    market_cap: None,
                })
                .collect(),
        )
    }

    fn day(adr: f64) -> DaySummary {
        DaySummary {
            date: date(),
            up: 10,
            down: 10,
            flat: 0,
            adr,
            trading_value: 10.0,
        }
    }

    #[test]
    fn test_day_turnover_skips_rows_without_prior_close() {
        let row = |id: &str, prior_close: Option<f64>| CrossSectionRow {
            instrument_id: id.to_string(),
            name: String::new(),
            close: 100.0,
            volume: 10.0,
            prior_close,
            ma20: None,
            history_days: 0,
            market_cap: None,
        };
        let cs = CrossSection::new(date(), vec![row("OLD", Some(100.0)), row("NEW", None)]);
        let breadth = BreadthCalculator::default().compute(&cs, None, &Default::default());

        let day = DaySummary::new(&breadth, &cs);
        assert_eq!(day.flat, 1);
        assert!((day.trading_value - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_signal_bands() {
        assert_eq!(Signal::from_ratio(1.2, 1.2, 0.8), Signal::Green);
        assert_eq!(Signal::from_ratio(1.19, 1.2, 0.8), Signal::Yellow);
        assert_eq!(Signal::from_ratio(0.8, 1.2, 0.8), Signal::Yellow);
        assert_eq!(Signal::from_ratio(0.79, 1.2, 0.8), Signal::Red);
    }

    #[test]
    fn test_concentration() {
        let mut turnovers = vec![1.0; 30];
        turnovers[0] = 71.0;
        let conc = turnover_concentration(&section(&turnovers)).unwrap();

        // total = 100, top10 = 71 + 9, top20 = 71 + 19
        assert!((conc.top10 - 80.0).abs() < 1e-9);
        assert!((conc.top20 - 90.0).abs() < 1e-9);
        assert!(turnover_concentration(&section(&[0.0, 0.0])).is_none());
    }

    #[test]
    fn test_trading_value_ratio() {
        let (avg, ratio) = trading_value_ratio(&[10.0, 10.0, 10.0, 20.0], 4).unwrap();
        assert!((avg - 12.5).abs() < 1e-12);
        assert!((ratio - 1.6).abs() < 1e-12);

        // Average floored
        let (_, ratio) = trading_value_ratio(&[0.0], 20).unwrap();
        assert_eq!(ratio, 0.0);
        assert!(trading_value_ratio(&[], 20).is_none());
    }

    #[test]
    fn test_build_market_summary() {
        let config = SummaryConfig::default();
        let summary = build_market_summary(
            vec![day(1.0), day(0.5)],
            &[10.0, 10.0, 11.0],
            &section(&[5.0, 5.0]),
            &config,
        )
        .unwrap();

        assert_eq!(summary.latest.adr, 0.5);
        assert_eq!(summary.signals.adr, Signal::Red);
        assert_eq!(summary.signals.trading_value, Signal::Yellow);
        assert_eq!(summary.sparkline.len(), 2);
        assert!(summary.concentration.is_some());
    }
}
