// Time-series indicators module
// Trailing moving averages, returns, realised volatility and the index chart

pub mod index_chart;
pub mod moving_average;
pub mod returns;
pub mod window;

pub use index_chart::{build_index_chart, IndexCandle, IndexChart};
pub use moving_average::{sma_series, trailing_mean, trailing_sma};
pub use returns::{percent_returns, realized_volatility, simple_return};
pub use window::TimeSeriesWindow;
