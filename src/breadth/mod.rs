// Market breadth module
pub mod calculator;
pub mod summary;

pub use calculator::{BreadthCalculator, BreadthStats};
pub use summary::{
    build_market_summary, trading_value_ratio, turnover_concentration, DaySummary,
    MarketSummary, Signal, SummarySignals, TurnoverConcentration,
};
