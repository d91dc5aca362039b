use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::BreadthConfig;
use crate::error::EngineError;
use crate::indicators::{simple_return, TimeSeriesWindow};
use crate::Result;

/// One instrument, one trading date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Bars with no volume are halted / non-trading and never feed statistics
    pub fn is_trading(&self) -> bool {
        self.volume > 0.0
    }
}

/// Date-ordered bars for a single instrument.
///
/// Construction enforces strictly ascending dates, so every consumer can rely
/// on `bars[i - 1]` being the previous present trading date.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InstrumentSeries {
    instrument_id: String,
    name: String,
    bars: Vec<Bar>,
    /// Positions of trading bars in `bars`, ascending
    #[serde(skip)]
    trading: Vec<usize>,
    #[serde(skip)]
    trading_closes: Vec<f64>,
}

impl InstrumentSeries {
    pub fn new(
        instrument_id: impl Into<String>,
        name: impl Into<String>,
        bars: Vec<Bar>,
    ) -> Result<Self> {
        let instrument_id = instrument_id.into();
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(EngineError::UnorderedSeries {
                    instrument_id,
                    date: pair[1].date,
                });
            }
        }

        let trading: Vec<usize> = bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_trading())
            .map(|(i, _)| i)
            .collect();
        let trading_closes = trading.iter().map(|&i| bars[i].close).collect();

        Ok(Self {
            instrument_id,
            name: name.into(),
            bars,
            trading,
            trading_closes,
        })
    }

    /// Sort and de-duplicate (last bar per date wins) before validating
    pub fn from_unsorted(
        instrument_id: impl Into<String>,
        name: impl Into<String>,
        mut bars: Vec<Bar>,
    ) -> Result<Self> {
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self::new(instrument_id, name, deduped)
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// Positions of the trading bars (volume > 0) within `bars()`
    pub fn trading_positions(&self) -> &[usize] {
        &self.trading
    }

    /// Closes of trading bars only, aligned with `trading_positions()`
    pub fn trading_closes(&self) -> &[f64] {
        &self.trading_closes
    }

    /// Index of `date` among the trading bars; `None` if absent or halted
    pub fn trading_index_of(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.index_of(date)?;
        self.trading.binary_search(&idx).ok()
    }

    /// Trading bars in date order
    pub fn trading_bars(&self) -> impl Iterator<Item = &Bar> + '_ {
        self.trading.iter().map(move |&i| &self.bars[i])
    }
}

/// One instrument's row in a single day's cross-section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrossSectionRow {
    pub instrument_id: String,
    #[serde(default)]
    pub name: String,
    pub close: f64,
    pub volume: f64,
    pub prior_close: Option<f64>,
    pub ma20: Option<f64>,
    /// Trading bars present in the trailing history window (30 calendar days)
    #[serde(default)]
    pub history_days: usize,
    pub market_cap: Option<f64>,
}

impl CrossSectionRow {
    pub fn is_trading(&self) -> bool {
        self.volume > 0.0
    }

    pub fn trading_value(&self) -> f64 {
        self.close * self.volume
    }

    /// Fractional return against the prior close; `None` when undefined
    pub fn daily_return(&self) -> Option<f64> {
        simple_return(self.prior_close?, self.close)
    }

    pub fn change_pct(&self) -> Option<f64> {
        self.daily_return().map(|r| r * 100.0)
    }
}

/// All instruments' rows for one trading date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrossSection {
    pub date: NaiveDate,
    pub rows: Vec<CrossSectionRow>,
}

impl CrossSection {
    pub fn new(date: NaiveDate, rows: Vec<CrossSectionRow>) -> Self {
        Self { date, rows }
    }

    /// Build the cross-section for `date` from per-instrument series.
    ///
    /// Prior close is the immediately preceding present bar; MA20 and the
    /// history count only look at trading bars.
    pub fn from_series(
        date: NaiveDate,
        series: &[InstrumentSeries],
        market_caps: &HashMap<String, f64>,
        config: &BreadthConfig,
    ) -> Self {
        let window_start = date - Duration::days(config.history_window_days);

        let rows = series
            .iter()
            .filter_map(|s| {
                let idx = s.index_of(date)?;
                let bar = &s.bars()[idx];
                let prior_close = idx.checked_sub(1).map(|p| s.bars()[p].close);

                let ma20 = s.trading_index_of(date).and_then(|t| {
                    TimeSeriesWindow::trading(s).moving_average(config.ma_window, t)
                });
                let history_days = s
                    .trading_bars()
                    .filter(|b| b.date > window_start && b.date <= date)
                    .count();

                Some(CrossSectionRow {
                    instrument_id: s.instrument_id().to_string(),
                    name: s.name().to_string(),
                    close: bar.close,
                    volume: bar.volume,
                    prior_close,
                    ma20,
                    history_days,
                    market_cap: market_caps.get(s.instrument_id()).copied(),
                })
            })
            .collect();

        Self { date, rows }
    }

    pub fn get(&self, instrument_id: &str) -> Option<&CrossSectionRow> {
        self.rows.iter().find(|r| r.instrument_id == instrument_id)
    }

    /// Flat id → row lookup
    pub fn index(&self) -> HashMap<&str, &CrossSectionRow> {
        self.rows
            .iter()
            .map(|r| (r.instrument_id.as_str(), r))
            .collect()
    }

    /// Turnover of every trading row
    pub fn total_trading_value(&self) -> f64 {
        self.rows
            .iter()
            .filter(|r| r.is_trading())
            .map(|r| r.trading_value())
            .sum()
    }

    /// Turnover of trading rows that also have a defined return, i.e. the
    /// names that count towards the day's advances and declines
    pub fn settled_trading_value(&self) -> f64 {
        self.rows
            .iter()
            .filter(|r| r.is_trading() && r.daily_return().is_some())
            .map(|r| r.trading_value())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Theme,
    Sector,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: String,
    pub members: Vec<String>,
}

/// Group → ordered, de-duplicated member ids. Group order is insertion order
/// and doubles as the ranking tie-break.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroupMembership {
    groups: Vec<Group>,
}

impl GroupMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, merging into an existing one with the same id
    pub fn insert<I, S>(&mut self, id: impl Into<String>, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let pos = match self.groups.iter().position(|g| g.id == id) {
            Some(pos) => pos,
            None => {
                self.groups.push(Group {
                    id,
                    members: Vec::new(),
                });
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[pos];
        let mut seen: HashSet<String> = group.members.iter().cloned().collect();
        for member in members {
            let member = member.into();
            if seen.insert(member.clone()) {
                group.members.push(member);
            }
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Reverse lookup: first group listing the instrument
    pub fn group_of(&self, instrument_id: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.members.iter().any(|m| m == instrument_id))
            .map(|g| g.id.as_str())
    }
}

impl<S: Into<String>, M: Into<String>> FromIterator<(S, Vec<M>)> for GroupMembership {
    fn from_iter<T: IntoIterator<Item = (S, Vec<M>)>>(iter: T) -> Self {
        let mut membership = GroupMembership::new();
        for (id, members) in iter {
            membership.insert(id, members);
        }
        membership
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExtremeKind {
    High,
    Low,
}

/// 52-week extreme flags for one date, produced upstream
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtremeFlags {
    flags: HashSet<(String, ExtremeKind)>,
}

impl ExtremeFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument_id: impl Into<String>, kind: ExtremeKind) {
        self.flags.insert((instrument_id.into(), kind));
    }

    pub fn contains(&self, instrument_id: &str, kind: ExtremeKind) -> bool {
        self.flags.contains(&(instrument_id.to_string(), kind))
    }

    pub fn count(&self, kind: ExtremeKind) -> usize {
        self.flags.iter().filter(|(_, k)| *k == kind).count()
    }
}

impl FromIterator<(String, ExtremeKind)> for ExtremeFlags {
    fn from_iter<T: IntoIterator<Item = (String, ExtremeKind)>>(iter: T) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

/// Net investor flow for one market and date, in units of 100M KRW
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowPoint {
    pub date: NaiveDate,
    pub foreign: f64,
    #[serde(default)]
    pub institution: f64,
    #[serde(default)]
    pub individual: f64,
    #[serde(default)]
    pub other: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn bar(day: u32, close: f64, volume: f64) -> Bar {
        Bar {
            instrument_id: "005930".to_string(),
            date: d(day),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let result = InstrumentSeries::new("005930", "", vec![bar(3, 10.0, 1.0), bar(2, 11.0, 1.0)]);
        assert!(matches!(result, Err(EngineError::UnorderedSeries { .. })));

        let dup = InstrumentSeries::new("005930", "", vec![bar(2, 10.0, 1.0), bar(2, 11.0, 1.0)]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_series_from_unsorted_dedups_last_wins() {
        let series = InstrumentSeries::from_unsorted(
            "005930",
            "",
            vec![bar(4, 12.0, 1.0), bar(2, 10.0, 1.0), bar(4, 13.0, 1.0)],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[1].close, 13.0);
    }

    #[test]
    fn test_row_return_undefined_without_prior() {
        let mut row = CrossSectionRow {
            instrument_id: "A".to_string(),
            name: String::new(),
            close: 102.0,
            volume: 10.0,
            prior_close: None,
            ma20: None,
            history_days: 0,
            market_cap: None,
        };
        assert_eq!(row.daily_return(), None);

        row.prior_close = Some(0.0);
        assert_eq!(row.daily_return(), None);

        row.prior_close = Some(100.0);
        assert!((row.change_pct().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_section_from_series() {
        let bars = vec![
            bar(2, 100.0, 10.0),
            bar(3, 0.0, 0.0),
            bar(4, 110.0, 10.0),
            bar(5, 121.0, 10.0),
        ];
        let series = vec![InstrumentSeries::new("005930", "Samsung", bars).unwrap()];
        let caps = HashMap::from([("005930".to_string(), 5000.0)]);
        let config = BreadthConfig::default();

        let cs = CrossSection::from_series(d(5), &series, &caps, &config);
        let row = cs.get("005930").unwrap();
        assert_eq!(row.prior_close, Some(110.0));
        // MA over trading bars only: (100 + 110 + 121) / 3
        assert!((row.ma20.unwrap() - 110.333_333).abs() < 1e-3);
        assert_eq!(row.history_days, 3);
        assert_eq!(row.market_cap, Some(5000.0));
        assert_eq!(row.name, "Samsung");

        // Instruments without a bar on the date are absent, not zero-filled
        let empty = CrossSection::from_series(d(9), &series, &caps, &config);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_series_tracks_trading_bars() {
        let series = InstrumentSeries::new(
            "005930",
            "",
            vec![bar(2, 100.0, 10.0), bar(3, 100.0, 0.0), bar(4, 110.0, 10.0)],
        )
        .unwrap();

        assert_eq!(series.trading_positions(), &[0, 2]);
        assert_eq!(series.trading_closes(), &[100.0, 110.0]);
        assert_eq!(series.trading_index_of(d(4)), Some(1));
        assert_eq!(series.trading_index_of(d(3)), None);
        assert_eq!(series.trading_index_of(d(9)), None);
        assert_eq!(series.trading_bars().count(), 2);
    }

    #[test]
    fn test_settled_turnover_needs_prior_close() {
        let row = |id: &str, prior_close: Option<f64>, volume: f64| CrossSectionRow {
            instrument_id: id.to_string(),
            name: String::new(),
            close: 100.0,
            volume,
            prior_close,
            ma20: None,
            history_days: 0,
            market_cap: None,
        };
        let cs = CrossSection::new(
            d(5),
            vec![
                row("OLD", Some(100.0), 10.0),
                row("NEW", None, 10.0),
                row("HALT", Some(100.0), 0.0),
            ],
        );

        assert_eq!(cs.total_trading_value(), 2000.0);
        assert_eq!(cs.settled_trading_value(), 1000.0);
    }

    #[test]
    fn test_membership_dedups_and_keeps_order() {
        let mut membership = GroupMembership::new();
        membership.insert("HBM", vec!["A", "B", "A"]);
        membership.insert("Robots", vec!["C"]);
        membership.insert("HBM", vec!["B", "D"]);

        assert_eq!(membership.len(), 2);
        assert_eq!(membership.groups()[0].members, vec!["A", "B", "D"]);
        assert_eq!(membership.group_of("C"), Some("Robots"));
    }

    #[test]
    fn test_extreme_flags_count() {
        let flags: ExtremeFlags = vec![
            ("A".to_string(), ExtremeKind::High),
            ("B".to_string(), ExtremeKind::High),
            ("C".to_string(), ExtremeKind::Low),
        ]
        .into_iter()
        .collect();

        assert_eq!(flags.count(ExtremeKind::High), 2);
        assert_eq!(flags.count(ExtremeKind::Low), 1);
        assert!(flags.contains("C", ExtremeKind::Low));
        assert!(!flags.contains("C", ExtremeKind::High));
    }
}
