// Core modules
pub mod breadth;
pub mod config;
pub mod error;
pub mod groups;
pub mod indicators;
pub mod models;
pub mod pipeline;
pub mod regime;
pub mod scanner;
pub mod source;
pub mod synthetic;

// Re-export commonly used types
pub use breadth::{BreadthCalculator, BreadthStats};
pub use crate::config::EngineConfig;
pub use error::EngineError;
pub use groups::{GroupPerformance, GroupPerformanceRanker};
pub use indicators::TimeSeriesWindow;
pub use models::*;
pub use pipeline::{DailyPipeline, DailyReport};
pub use regime::{RegimeScorer, RegimeSnapshot};
pub use source::{MarketDataSource, MarketSnapshot, SnapshotSource};

// Error handling
pub type Result<T> = std::result::Result<T, EngineError>;
