// Daily report pipeline
//
// Pulls one trading day (plus the trailing history it needs) from a
// MarketDataSource and derives every report section. Only a missing trade
// calendar aborts the run; any other unavailable feed leaves its section
// empty and is logged.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::breadth::{build_market_summary, BreadthCalculator, BreadthStats, DaySummary, MarketSummary};
use crate::config::{EngineConfig, GroupConfig};
use crate::error::EngineError;
use crate::groups::{
    bottom, heatmap, sector_treemap, select_extremes, top, GroupPerformance,
    GroupPerformanceRanker, HeatmapTile, SectorTile,
};
use crate::indicators::{build_index_chart, realized_volatility, IndexChart};
use crate::models::{
    CrossSection, DateRange, ExtremeFlags, ExtremeKind, GroupKind, GroupMembership,
    InstrumentSeries,
};
use crate::regime::{
    cumulative_flow, investor_flow, InvestorFlow, RegimeInputs, RegimeScorer, RegimeSnapshot,
};
use crate::scanner::{scan, ScannerRow};
use crate::source::MarketDataSource;
use crate::Result;

/// Calendar days of bars fetched for volume ratios and index charts
const SERIES_LOOKBACK_DAYS: i64 = 120;
/// Calendar days of investor flow fetched before the run date
const FLOW_LOOKBACK_DAYS: i64 = 30;
/// Calendar days fetched for the investor flow cards
const FLOW_CARD_LOOKBACK_DAYS: i64 = 60;
/// Sessions of investor flow shown per market
const FLOW_CARD_POINTS: usize = 30;

/// Ranked groups plus the presentation slices derived from them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupReport {
    /// Groups in the membership, qualifying or not
    pub total: usize,
    pub ranked: Vec<GroupPerformance>,
    pub top: Vec<GroupPerformance>,
    pub bottom: Vec<GroupPerformance>,
    /// Top and bottom groups for detail cards, each once
    pub presented: Vec<GroupPerformance>,
    pub heatmap: Vec<HeatmapTile>,
}

impl GroupReport {
    pub fn new(total: usize, ranked: Vec<GroupPerformance>, config: &GroupConfig) -> Self {
        Self {
            total,
            top: top(&ranked, config.top_n),
            bottom: bottom(&ranked, config.top_n),
            presented: select_extremes(&ranked, config.top_n),
            heatmap: heatmap(&ranked, config.heatmap_n),
            ranked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub summary: Option<MarketSummary>,
    /// Chronological, ending with the run date when it had data
    pub breadth_history: Vec<BreadthStats>,
    pub themes: Option<GroupReport>,
    pub sectors: Option<GroupReport>,
    pub sector_treemap: Vec<SectorTile>,
    pub regime: RegimeSnapshot,
    /// One card per market that has a flow feed
    pub investor_flow: Vec<InvestorFlow>,
    pub new_highs: Vec<ScannerRow>,
    pub new_lows: Vec<ScannerRow>,
    pub index_charts: Vec<IndexChart>,
}

/// One trading day's cross-section with the breadth derived from it
struct DayState {
    section: CrossSection,
    flags: ExtremeFlags,
    breadth: BreadthStats,
}

pub struct DailyPipeline {
    config: EngineConfig,
    breadth: BreadthCalculator,
    ranker: GroupPerformanceRanker,
    scorer: RegimeScorer,
}

impl Default for DailyPipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DailyPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            breadth: BreadthCalculator::from_config(&config.breadth),
            ranker: GroupPerformanceRanker::from_config(&config.groups),
            scorer: RegimeScorer::from_config(&config.regime),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the report for `date`, or for the latest trade date when `None`.
    ///
    /// A requested date that is not a trade date resolves to the last trade
    /// date before it.
    pub fn run(&self, source: &dyn MarketDataSource, date: Option<NaiveDate>) -> Result<DailyReport> {
        let requested = date
            .or_else(|| source.latest_trade_date())
            .ok_or_else(|| EngineError::MissingData("trade calendar is empty".to_string()))?;

        let summary_cfg = &self.config.summary;
        let history_len = summary_cfg
            .breadth_history_days
            .max(summary_cfg.turnover_avg_days)
            .max(summary_cfg.sparkline_days)
            .max(2);

        let dates = source.trade_dates(requested, history_len)?;
        let Some(&run_date) = dates.last() else {
            return Err(EngineError::MissingData(format!(
                "no trade dates on or before {}",
                requested
            )));
        };
        if run_date != requested {
            tracing::info!(%requested, %run_date, "requested date is not a trade date");
        }

        tracing::info!(date = %run_date, history = dates.len(), "building daily report");

        let days = self.load_days(source, &dates);
        let latest = days.last().filter(|d| d.section.date == run_date);
        let prior = latest.and(days.len().checked_sub(2).map(|i| &days[i]));

        if latest.is_none() {
            tracing::warn!(date = %run_date, "no cross-section for run date, report will be sparse");
        }

        let summary = self.summary(&days, latest);

        let series_range = DateRange::new(run_date - Duration::days(SERIES_LOOKBACK_DAYS), run_date);

        let theme_membership = fetch_membership(source, GroupKind::Theme);
        let sector_membership = fetch_membership(source, GroupKind::Sector);

        let themes = self.group_report(GroupKind::Theme, theme_membership.as_ref(), latest, prior);
        let sectors = self.group_report(GroupKind::Sector, sector_membership.as_ref(), latest, prior);

        let treemap = match (&sector_membership, latest) {
            (Some(membership), Some(day)) => sector_treemap(membership, &day.section),
            _ => Vec::new(),
        };

        let regime = self.regime(source, run_date, latest, summary.as_ref());
        let investor_flow = self.investor_flow(source, run_date);

        let (new_highs, new_lows) = match latest {
            Some(day) => {
                let universe = source.fetch_universe(series_range).unwrap_or_else(|e| {
                    tracing::warn!("universe fetch failed, volume ratios unavailable: {}", e);
                    Vec::new()
                });
                let sectors = sector_membership.unwrap_or_default();
                (
                    scan(ExtremeKind::High, &day.section, &day.flags, &sectors, &universe),
                    scan(ExtremeKind::Low, &day.section, &day.flags, &sectors, &universe),
                )
            }
            None => (Vec::new(), Vec::new()),
        };

        let index_charts = self.index_charts(source, series_range);

        let breadth_history = days
            .iter()
            .rev()
            .take(summary_cfg.breadth_history_days)
            .rev()
            .map(|d| d.breadth.clone())
            .collect();

        tracing::info!(
            date = %run_date,
            composite = regime.composite,
            regime = %regime.regime,
            new_highs = new_highs.len(),
            new_lows = new_lows.len(),
            "daily report built"
        );

        Ok(DailyReport {
            date: run_date,
            summary,
            breadth_history,
            themes,
            sectors,
            sector_treemap: treemap,
            regime,
            investor_flow,
            new_highs,
            new_lows,
            index_charts,
        })
    }

    fn investor_flow(&self, source: &dyn MarketDataSource, date: NaiveDate) -> Vec<InvestorFlow> {
        let range = DateRange::new(date - Duration::days(FLOW_CARD_LOOKBACK_DAYS), date);

        self.config
            .summary
            .index_ids
            .iter()
            .filter_map(|market| {
                let points = source
                    .fetch_foreign_flow(range, market)
                    .map_err(|e| tracing::warn!(%market, "investor flow unavailable: {}", e))
                    .ok()?;
                let flow = investor_flow(
                    market,
                    &points,
                    date,
                    FLOW_CARD_POINTS,
                    self.config.regime.flow_days,
                );
                if flow.is_none() {
                    tracing::warn!(%market, %date, "no investor flow on or before run date");
                }
                flow
            })
            .collect()
    }

    fn load_days(&self, source: &dyn MarketDataSource, dates: &[NaiveDate]) -> Vec<DayState> {
        let mut days: Vec<DayState> = Vec::with_capacity(dates.len());

        for &date in dates {
            let section = match source.fetch_cross_section(date) {
                Ok(section) => section,
                Err(e) => {
                    tracing::warn!(%date, "skipping trade date: {}", e);
                    continue;
                }
            };

            let flags = source.fetch_52week_extreme_flags(date).unwrap_or_else(|e| {
                tracing::warn!(%date, "52-week flags unavailable, counting none: {}", e);
                ExtremeFlags::new()
            });

            let prior = days.last().map(|d| &d.section);
            let breadth = self.breadth.compute(&section, prior, &flags);

            days.push(DayState {
                section,
                flags,
                breadth,
            });
        }

        days
    }

    fn summary(&self, days: &[DayState], latest: Option<&DayState>) -> Option<MarketSummary> {
        let latest = latest?;
        let cfg = &self.config.summary;

        let sparkline: Vec<DaySummary> = days
            .iter()
            .rev()
            .take(cfg.sparkline_days)
            .rev()
            .map(|d| DaySummary::new(&d.breadth, &d.section))
            .collect();
        let turnover: Vec<f64> = days
            .iter()
            .map(|d| d.section.settled_trading_value())
            .collect();

        let summary = build_market_summary(sparkline, &turnover, &latest.section, cfg);
        if summary.is_none() {
            tracing::warn!(date = %latest.section.date, "market summary unavailable");
        }
        summary
    }

    fn group_report(
        &self,
        kind: GroupKind,
        membership: Option<&GroupMembership>,
        latest: Option<&DayState>,
        prior: Option<&DayState>,
    ) -> Option<GroupReport> {
        let membership = membership?;
        let latest = latest?;

        let ranked = self.ranker.rank_with_prior_section(
            kind,
            membership,
            &latest.section,
            prior.map(|d| &d.section),
        );
        Some(GroupReport::new(membership.len(), ranked, &self.config.groups))
    }

    fn regime(
        &self,
        source: &dyn MarketDataSource,
        date: NaiveDate,
        latest: Option<&DayState>,
        summary: Option<&MarketSummary>,
    ) -> RegimeSnapshot {
        let cfg = &self.config.regime;

        let flow_range = DateRange::new(date - Duration::days(FLOW_LOOKBACK_DAYS), date);
        let foreign_flow = match source.fetch_foreign_flow(flow_range, &cfg.flow_market) {
            Ok(points) => cumulative_flow(&points, date, cfg.flow_days),
            Err(e) => {
                tracing::warn!(market = %cfg.flow_market, "investor flow unavailable: {}", e);
                None
            }
        };

        let volatility = self.config.summary.index_ids.first().and_then(|id| {
            let range = DateRange::new(date - Duration::days(SERIES_LOOKBACK_DAYS), date);
            match source.fetch_index(id, range) {
                Ok(series) => realized_volatility(series.trading_closes(), cfg.volatility_window),
                Err(e) => {
                    tracing::warn!(index = %id, "index series unavailable for volatility: {}", e);
                    None
                }
            }
        });

        let inputs = latest
            .map(|d| RegimeInputs::from_breadth(&d.breadth))
            .unwrap_or_default()
            .with_trading_value_ratio(summary.map(|s| s.trading_value_ratio))
            .with_foreign_flow(foreign_flow)
            .with_volatility(volatility);

        self.scorer.score(date, &inputs)
    }

    fn index_charts(&self, source: &dyn MarketDataSource, range: DateRange) -> Vec<IndexChart> {
        let lookback = self.config.summary.lookback_trade_dates;

        self.config
            .summary
            .index_ids
            .iter()
            .filter_map(|id| match source.fetch_index(id, range) {
                Ok(series) => chart_or_warn(&series, lookback),
                Err(e) => {
                    tracing::warn!(index = %id, "index chart skipped: {}", e);
                    None
                }
            })
            .collect()
    }
}

fn chart_or_warn(series: &InstrumentSeries, lookback: usize) -> Option<IndexChart> {
    let chart = build_index_chart(series, lookback);
    if chart.is_none() {
        tracing::warn!(index = %series.instrument_id(), "index series has no valid bars");
    }
    chart
}

fn fetch_membership(source: &dyn MarketDataSource, kind: GroupKind) -> Option<GroupMembership> {
    match source.fetch_group_membership(kind) {
        Ok(membership) => Some(membership),
        Err(e) => {
            tracing::warn!(?kind, "group membership unavailable: {}", e);
            None
        }
    }
}
