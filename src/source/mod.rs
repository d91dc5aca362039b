// Collaborator boundary: where materialised market data comes from
pub mod membership;
pub mod snapshot;

use chrono::NaiveDate;

use crate::models::{
    CrossSection, DateRange, ExtremeFlags, FlowPoint, GroupKind, GroupMembership,
    InstrumentSeries,
};
use crate::Result;

pub use membership::membership_from_json;
pub use snapshot::{BarRecord, ExtremeRecord, InstrumentRecord, MarketSnapshot, SnapshotSource};

/// Provider of already-materialised daily market data.
///
/// Implementations own all I/O, retries and defaults. A fetch that has
/// nothing to return reports `EngineError::MissingData`; the pipeline turns
/// that into an undefined section rather than aborting.
pub trait MarketDataSource: Send + Sync {
    /// Trading dates on or before `until`, ascending, at most `limit`
    fn trade_dates(&self, until: NaiveDate, limit: usize) -> Result<Vec<NaiveDate>>;

    fn latest_trade_date(&self) -> Option<NaiveDate>;

    fn fetch_bars(&self, instrument_id: &str, range: DateRange) -> Result<InstrumentSeries>;

    /// Every instrument's bars within `range`
    fn fetch_universe(&self, range: DateRange) -> Result<Vec<InstrumentSeries>>;

    /// Must carry each instrument's prior-day close
    fn fetch_cross_section(&self, date: NaiveDate) -> Result<CrossSection>;

    fn fetch_group_membership(&self, kind: GroupKind) -> Result<GroupMembership>;

    fn fetch_market_cap(&self, instrument_id: &str, date: NaiveDate) -> Option<f64>;

    fn fetch_52week_extreme_flags(&self, date: NaiveDate) -> Result<ExtremeFlags>;

    fn fetch_foreign_flow(&self, range: DateRange, market: &str) -> Result<Vec<FlowPoint>>;

    fn fetch_index(&self, index_id: &str, range: DateRange) -> Result<InstrumentSeries>;
}
