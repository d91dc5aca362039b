// Synthetic market generator
//
// Seeded random-walk market used by the CLI demo mode and by tests. The
// output is a MarketSnapshot, so it flows through exactly the same source
// and pipeline code as real extracted data.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};

use crate::models::{ExtremeKind, FlowPoint};
use crate::source::{BarRecord, ExtremeRecord, InstrumentRecord, MarketSnapshot};

const THEMES: &[&str] = &[
    "AI Semiconductors",
    "Secondary Batteries",
    "Shipbuilding",
    "Defense",
    "Nuclear Power",
    "Biotech",
    "Robotics",
    "Cosmetics",
    "Entertainment",
    "Banks",
    "Game",
    "Hydrogen",
];

const SECTORS: &[&str] = &[
    "IT",
    "Materials",
    "Industrials",
    "Health Care",
    "Financials",
    "Consumer Discretionary",
    "Communication Services",
    "Energy",
];

const INDICES: &[(&str, f64)] = &[("KOSPI", 2500.0), ("KOSDAQ", 800.0)];

const HALT_PROBABILITY: f64 = 0.01;
/// Every n-th instrument lists partway through the window
const LATE_LISTING_EVERY: usize = 20;
/// Trading bars looked back for 52-week extremes
const EXTREME_WINDOW: usize = 250;
/// Minimum history before an instrument can print an extreme
const EXTREME_MIN_HISTORY: usize = 20;

/// Overall market direction for a generated window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Upward drift (+0.2% daily average)
    Bull,
    /// Downward drift (-0.2% daily average)
    Bear,
    /// No drift, modest noise
    Sideways,
    /// No drift, ±4% daily swings
    Volatile,
}

impl MarketScenario {
    fn drift(self) -> f64 {
        match self {
            MarketScenario::Bull => 0.002,
            MarketScenario::Bear => -0.002,
            MarketScenario::Sideways | MarketScenario::Volatile => 0.0,
        }
    }

    fn noise(self) -> f64 {
        match self {
            MarketScenario::Bull | MarketScenario::Bear => 0.015,
            MarketScenario::Sideways => 0.01,
            MarketScenario::Volatile => 0.04,
        }
    }
}

/// Generates reproducible synthetic market snapshots
pub struct SyntheticMarketGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticMarketGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 20_000.0,
            base_volume: 500_000.0,
        }
    }

    /// Generate `days` business days ending on (or just before) `end`
    /// for `instruments` stocks, plus indices, memberships and flows.
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        instruments: usize,
        days: usize,
        end: NaiveDate,
    ) -> MarketSnapshot {
        let calendar = business_days(end, days);

        let mut records = Vec::with_capacity(instruments);
        let mut extremes = Vec::new();

        for i in 0..instruments {
            let id = format!("{:06}", (i + 1) * 10);

            let listed_from = if (i + 1) % LATE_LISTING_EVERY == 0 && !calendar.is_empty() {
                calendar.len() - self.rng.gen_range(1..=calendar.len().min(10))
            } else {
                0
            };

            let start_price = self.base_price * self.rng.gen_range(0.1..5.0);
            let base_volume = self.base_volume * self.rng.gen_range(0.2..4.0);
            let bars = self.random_walk(scenario, &calendar[listed_from..], start_price, base_volume, true);

            extremes.extend(extreme_flags(&id, &bars));

            let shares = self.rng.gen_range(1.0e6..5.0e7);
            records.push(InstrumentRecord {
                market_cap: bars.last().map(|b| (b.close * shares).round()),
                name: format!("Synthetic {}", i + 1),
                id,
                bars,
            });
        }

        let indices = INDICES
            .iter()
            .map(|&(id, level)| InstrumentRecord {
                id: id.to_string(),
                name: id.to_string(),
                market_cap: None,
                bars: self.random_walk(scenario, &calendar, level, 4.0e8, false),
            })
            .collect();

        let themes = self.themes(&records);
        let sectors = sectors(&records);
        let foreign_flow = self.flows(scenario, &calendar);

        tracing::debug!(
            ?scenario,
            instruments,
            days = calendar.len(),
            extremes = extremes.len(),
            "synthetic market generated"
        );

        MarketSnapshot {
            instruments: records,
            indices,
            themes,
            sectors,
            extremes,
            foreign_flow,
        }
    }

    fn random_walk(
        &mut self,
        scenario: MarketScenario,
        dates: &[NaiveDate],
        start_price: f64,
        base_volume: f64,
        halts: bool,
    ) -> Vec<BarRecord> {
        let mut bars: Vec<BarRecord> = Vec::with_capacity(dates.len());
        let mut price = start_price;

        for &date in dates {
            // Halted sessions repeat the last close with no volume
            if halts && !bars.is_empty() && self.rng.gen_bool(HALT_PROBABILITY) {
                bars.push(BarRecord {
                    date,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: 0.0,
                });
                continue;
            }

            let change = scenario.drift() + self.rng.gen_range(-scenario.noise()..scenario.noise());
            let open = price * (1.0 + self.rng.gen_range(-0.005..0.005));
            price = (price * (1.0 + change)).max(1.0);

            bars.push(BarRecord {
                date,
                open,
                high: open.max(price) * (1.0 + self.rng.gen_range(0.0..0.01)),
                low: open.min(price) * (1.0 - self.rng.gen_range(0.0..0.01)),
                close: price,
                volume: (base_volume * self.rng.gen_range(0.5..1.8)).round(),
            });
        }

        bars
    }

    /// Theme membership in the `{"themes": {"<id>": {name, stocks}}}` shape
    fn themes(&mut self, records: &[InstrumentRecord]) -> Value {
        let mut members: Vec<Vec<&InstrumentRecord>> = vec![Vec::new(); THEMES.len()];

        for record in records {
            let first = self.rng.gen_range(0..THEMES.len());
            members[first].push(record);
            // About a third of names belong to a second theme
            if self.rng.gen_bool(0.33) {
                let second = self.rng.gen_range(0..THEMES.len());
                if second != first {
                    members[second].push(record);
                }
            }
        }

        let themes: Map<String, Value> = THEMES
            .iter()
            .zip(members)
            .enumerate()
            .map(|(i, (name, stocks))| {
                let stocks: Vec<Value> = stocks
                    .iter()
                    .map(|r| json!({"code": r.id, "name": r.name}))
                    .collect();
                ((i + 1).to_string(), json!({"name": name, "stocks": stocks}))
            })
            .collect();

        json!({ "themes": themes })
    }

    fn flows(&mut self, scenario: MarketScenario, calendar: &[NaiveDate]) -> HashMap<String, Vec<FlowPoint>> {
        // Flows in units of 100M KRW
        let bias = scenario.drift() * 5.0e5;

        INDICES
            .iter()
            .map(|&(market, _)| {
                let points = calendar
                    .iter()
                    .map(|&date| {
                        let foreign = bias + self.rng.gen_range(-1500.0..1500.0);
                        let institution: f64 = self.rng.gen_range(-1000.0..1000.0);
                        FlowPoint {
                            date,
                            foreign: foreign.round(),
                            institution: institution.round(),
                            individual: (-(foreign + institution)).round(),
                            other: 0.0,
                        }
                    })
                    .collect();
                (market.to_string(), points)
            })
            .collect()
    }
}

/// Sector membership in the `[{"name", "tickers"}]` shape
fn sectors(records: &[InstrumentRecord]) -> Value {
    let sectors: Vec<Value> = SECTORS
        .iter()
        .enumerate()
        .map(|(s, name)| {
            let tickers: Vec<&str> = records
                .iter()
                .enumerate()
                .filter(|(i, _)| i % SECTORS.len() == s)
                .map(|(_, r)| r.id.as_str())
                .collect();
            json!({"name": name, "tickers": tickers})
        })
        .collect();

    Value::Array(sectors)
}

/// The last `days` weekdays up to and including `end`, ascending
fn business_days(end: NaiveDate, days: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(days);
    let mut current = end;

    while dates.len() < days {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        current -= Duration::days(1);
    }

    dates.reverse();
    dates
}

/// Flag trading bars whose close breaks the prior 52-week range
fn extreme_flags(id: &str, bars: &[BarRecord]) -> Vec<ExtremeRecord> {
    let trading: Vec<&BarRecord> = bars.iter().filter(|b| b.volume > 0.0).collect();
    let mut flags = Vec::new();

    for (i, bar) in trading.iter().enumerate().skip(EXTREME_MIN_HISTORY) {
        let window = &trading[i.saturating_sub(EXTREME_WINDOW)..i];
        let high = window.iter().map(|b| b.close).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.close).fold(f64::MAX, f64::min);

        let kind = if bar.close > high {
            ExtremeKind::High
        } else if bar.close < low {
            ExtremeKind::Low
        } else {
            continue;
        };

        flags.push(ExtremeRecord {
            date: bar.date,
            instrument_id: id.to_string(),
            kind,
        });
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::membership_from_json;

    fn end() -> NaiveDate {
        // Saturday
        NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()
    }

    #[test]
    fn test_business_days_skip_weekends() {
        let dates = business_days(end(), 6);

        assert_eq!(dates.len(), 6);
        assert_eq!(dates.last(), Some(&NaiveDate::from_ymd_opt(2026, 2, 13).unwrap()));
        assert_eq!(dates.first(), Some(&NaiveDate::from_ymd_opt(2026, 2, 6).unwrap()));
        assert!(dates
            .iter()
            .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn test_same_seed_same_market() {
        let a = SyntheticMarketGenerator::new(7).generate(MarketScenario::Sideways, 30, 40, end());
        let b = SyntheticMarketGenerator::new(7).generate(MarketScenario::Sideways, 30, 40, end());
        let c = SyntheticMarketGenerator::new(8).generate(MarketScenario::Sideways, 30, 40, end());

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_snapshot_shape() {
        let snapshot = SyntheticMarketGenerator::new(42).generate(MarketScenario::Bull, 40, 60, end());

        assert_eq!(snapshot.instruments.len(), 40);
        assert_eq!(snapshot.indices.len(), 2);
        assert_eq!(snapshot.foreign_flow["KOSPI"].len(), 60);

        // Late listings carry fewer bars
        assert!(snapshot.instruments[19].bars.len() < 60);
        assert_eq!(snapshot.instruments[0].bars.len(), 60);

        for record in &snapshot.instruments {
            for bar in &record.bars {
                assert!(bar.high >= bar.close && bar.high >= bar.open);
                assert!(bar.low <= bar.close && bar.low <= bar.open);
                assert!(bar.close >= 1.0);
            }
        }

        let themes = membership_from_json(&snapshot.themes).unwrap();
        let sectors = membership_from_json(&snapshot.sectors).unwrap();
        assert!(!themes.is_empty());
        assert_eq!(sectors.len(), SECTORS.len());
        assert_eq!(sectors.group_of("000010"), Some("IT"));
    }

    #[test]
    fn test_bull_outpaces_bear() {
        let mean_growth = |scenario| {
            let snapshot = SyntheticMarketGenerator::new(3).generate(scenario, 50, 120, end());
            let full: Vec<&InstrumentRecord> = snapshot
                .instruments
                .iter()
                .filter(|r| r.bars.len() == 120)
                .collect();
            full.iter()
                .map(|r| r.bars[119].close / r.bars[0].close)
                .sum::<f64>()
                / full.len() as f64
        };

        assert!(mean_growth(MarketScenario::Bull) > 1.0);
        assert!(mean_growth(MarketScenario::Bear) < 1.0);
    }

    #[test]
    fn test_extreme_flags_need_history() {
        let bars: Vec<BarRecord> = (0..30)
            .map(|i| BarRecord {
                date: end() - Duration::days(30 - i),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 100.0 + i as f64,
                volume: 1.0,
            })
            .collect();
        let flags = extreme_flags("X", &bars);

        // Monotone rise: every bar past the warm-up is a new high
        assert_eq!(flags.len(), 30 - EXTREME_MIN_HISTORY);
        assert!(flags.iter().all(|f| f.kind == ExtremeKind::High));
    }
}
