use std::borrow::Cow;

use crate::indicators::moving_average::trailing_sma;
use crate::indicators::returns::simple_return;
use crate::models::InstrumentSeries;

/// Per-instrument trailing statistics over an ordered series.
///
/// Returns are only taken between consecutive present bars; a missing
/// trading date is never gap-filled. An empty series yields `None` for
/// everything.
pub struct TimeSeriesWindow<'a> {
    series: &'a InstrumentSeries,
    closes: Cow<'a, [f64]>,
}

impl<'a> TimeSeriesWindow<'a> {
    pub fn new(series: &'a InstrumentSeries) -> Self {
        Self {
            series,
            closes: Cow::Owned(series.closes()),
        }
    }

    /// Window over trading bars only; halted sessions are skipped and
    /// indices refer to `InstrumentSeries::trading_index_of`
    pub fn trading(series: &'a InstrumentSeries) -> Self {
        Self {
            series,
            closes: Cow::Borrowed(series.trading_closes()),
        }
    }

    pub fn instrument_id(&self) -> &str {
        self.series.instrument_id()
    }

    /// Simple moving average of closes ending at `at_index`, partial window allowed
    pub fn moving_average(&self, window: usize, at_index: usize) -> Option<f64> {
        trailing_sma(&self.closes, window, at_index)
    }

    /// One MA value per bar
    pub fn moving_averages(&self, window: usize) -> Vec<Option<f64>> {
        (0..self.closes.len())
            .map(|i| self.moving_average(window, i))
            .collect()
    }

    /// Return from the previous present bar to `at_index`
    pub fn daily_return(&self, at_index: usize) -> Option<f64> {
        if at_index == 0 || at_index >= self.closes.len() {
            return None;
        }
        simple_return(self.closes[at_index - 1], self.closes[at_index])
    }

    /// Day-over-day returns aligned with bars (first is always `None`)
    pub fn returns(&self) -> Vec<Option<f64>> {
        (0..self.closes.len()).map(|i| self.daily_return(i)).collect()
    }

    pub fn latest_return(&self) -> Option<f64> {
        self.daily_return(self.closes.len().checked_sub(1)?)
    }
}
