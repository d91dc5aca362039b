use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::BreadthConfig;
use crate::error::EngineError;
use crate::models::{
    Bar, CrossSection, DateRange, ExtremeFlags, ExtremeKind, FlowPoint, GroupKind,
    GroupMembership, InstrumentSeries,
};
use crate::source::membership::membership_from_json;
use crate::source::MarketDataSource;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BarRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    pub bars: Vec<BarRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtremeRecord {
    pub date: NaiveDate,
    pub instrument_id: String,
    pub kind: ExtremeKind,
}

/// Already-materialised market data, as handed over by an upstream extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketSnapshot {
    pub instruments: Vec<InstrumentRecord>,
    pub indices: Vec<InstrumentRecord>,
    /// Theme membership in any accepted document shape
    pub themes: serde_json::Value,
    /// Sector membership in any accepted document shape
    pub sectors: serde_json::Value,
    pub extremes: Vec<ExtremeRecord>,
    /// Market name → daily investor flow
    pub foreign_flow: HashMap<String, Vec<FlowPoint>>,
}

impl MarketSnapshot {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn to_series(record: &InstrumentRecord) -> Result<InstrumentSeries> {
    let bars = record
        .bars
        .iter()
        .map(|b| Bar {
            instrument_id: record.id.clone(),
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        })
        .collect();
    InstrumentSeries::from_unsorted(record.id.clone(), record.name.clone(), bars)
}

fn clip(series: &InstrumentSeries, range: DateRange) -> Result<InstrumentSeries> {
    let bars = series
        .bars()
        .iter()
        .filter(|b| range.contains(b.date))
        .cloned()
        .collect();
    InstrumentSeries::new(series.instrument_id(), series.name(), bars)
}

/// In-memory [`MarketDataSource`] over a [`MarketSnapshot`]
pub struct SnapshotSource {
    series: Vec<InstrumentSeries>,
    indices: Vec<InstrumentSeries>,
    market_caps: HashMap<String, f64>,
    themes: Option<GroupMembership>,
    sectors: Option<GroupMembership>,
    extremes: Vec<ExtremeRecord>,
    flows: HashMap<String, Vec<FlowPoint>>,
    calendar: Vec<NaiveDate>,
    breadth: BreadthConfig,
}

impl SnapshotSource {
    pub fn new(snapshot: MarketSnapshot, breadth: BreadthConfig) -> Result<Self> {
        let series = snapshot
            .instruments
            .iter()
            .map(to_series)
            .collect::<Result<Vec<_>>>()?;
        let indices = snapshot
            .indices
            .iter()
            .map(to_series)
            .collect::<Result<Vec<_>>>()?;

        let market_caps = snapshot
            .instruments
            .iter()
            .filter_map(|r| r.market_cap.map(|c| (r.id.clone(), c)))
            .collect();

        let calendar: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|s| s.bars().iter().filter(|b| b.is_trading()).map(|b| b.date))
            .collect();

        let themes = parse_membership(&snapshot.themes, "themes")?;
        let sectors = parse_membership(&snapshot.sectors, "sectors")?;

        tracing::info!(
            instruments = series.len(),
            trade_dates = calendar.len(),
            "snapshot source loaded"
        );

        Ok(Self {
            series,
            indices,
            market_caps,
            themes,
            sectors,
            extremes: snapshot.extremes,
            flows: snapshot.foreign_flow,
            calendar: calendar.into_iter().collect(),
            breadth,
        })
    }

    pub fn from_path(path: &Path, breadth: BreadthConfig) -> Result<Self> {
        Self::new(MarketSnapshot::from_path(path)?, breadth)
    }
}

fn parse_membership(doc: &serde_json::Value, what: &str) -> Result<Option<GroupMembership>> {
    if doc.is_null() {
        tracing::warn!("snapshot has no {} membership", what);
        return Ok(None);
    }
    membership_from_json(doc).map(Some)
}

impl MarketDataSource for SnapshotSource {
    fn trade_dates(&self, until: NaiveDate, limit: usize) -> Result<Vec<NaiveDate>> {
        let eligible: Vec<NaiveDate> = self
            .calendar
            .iter()
            .copied()
            .filter(|d| *d <= until)
            .collect();
        let start = eligible.len().saturating_sub(limit);
        Ok(eligible[start..].to_vec())
    }

    fn latest_trade_date(&self) -> Option<NaiveDate> {
        self.calendar.last().copied()
    }

    fn fetch_bars(&self, instrument_id: &str, range: DateRange) -> Result<InstrumentSeries> {
        let series = self
            .series
            .iter()
            .find(|s| s.instrument_id() == instrument_id)
            .ok_or_else(|| EngineError::MissingData(format!("no bars for {}", instrument_id)))?;
        clip(series, range)
    }

    fn fetch_universe(&self, range: DateRange) -> Result<Vec<InstrumentSeries>> {
        self.series.iter().map(|s| clip(s, range)).collect()
    }

    fn fetch_cross_section(&self, date: NaiveDate) -> Result<CrossSection> {
        let cross_section =
            CrossSection::from_series(date, &self.series, &self.market_caps, &self.breadth);
        if cross_section.is_empty() {
            return Err(EngineError::MissingData(format!("no cross-section for {}", date)));
        }
        Ok(cross_section)
    }

    fn fetch_group_membership(&self, kind: GroupKind) -> Result<GroupMembership> {
        let membership = match kind {
            GroupKind::Theme => self.themes.as_ref(),
            GroupKind::Sector => self.sectors.as_ref(),
        };
        membership
            .cloned()
            .ok_or_else(|| EngineError::MissingData(format!("no {:?} membership", kind)))
    }

    fn fetch_market_cap(&self, instrument_id: &str, _date: NaiveDate) -> Option<f64> {
        self.market_caps.get(instrument_id).copied()
    }

    fn fetch_52week_extreme_flags(&self, date: NaiveDate) -> Result<ExtremeFlags> {
        Ok(self
            .extremes
            .iter()
            .filter(|e| e.date == date)
            .map(|e| (e.instrument_id.clone(), e.kind))
            .collect())
    }

    fn fetch_foreign_flow(&self, range: DateRange, market: &str) -> Result<Vec<FlowPoint>> {
        let points = self
            .flows
            .get(market)
            .ok_or_else(|| EngineError::MissingData(format!("no investor flow for {}", market)))?;
        Ok(points
            .iter()
            .filter(|p| range.contains(p.date))
            .cloned()
            .collect())
    }

    fn fetch_index(&self, index_id: &str, range: DateRange) -> Result<InstrumentSeries> {
        let series = self
            .indices
            .iter()
            .find(|s| s.instrument_id() == index_id)
            .ok_or_else(|| EngineError::MissingData(format!("no index series {}", index_id)))?;
        clip(series, range)
    }
}
