/// Index candle chart with MA20 / MA60 overlays
///
/// Volume is rescaled against the 90th percentile of positive volumes so one
/// outlier session cannot flatten the rest of the chart.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::moving_average::sma_series;
use crate::models::InstrumentSeries;

const VOLUME_PERCENTILE: f64 = 0.9;
const VOLUME_CAP: f64 = 3.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexCandle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Normalised volume, `None` for sessions without volume
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexChart {
    pub instrument_id: String,
    pub candles: Vec<IndexCandle>,
    pub ma20: Vec<f64>,
    pub ma60: Vec<f64>,
}

/// Build the chart from the last `lookback` valid bars of `series`.
///
/// Bars with any non-positive OHLC field are incomplete and dropped.
pub fn build_index_chart(series: &InstrumentSeries, lookback: usize) -> Option<IndexChart> {
    let valid: Vec<_> = series
        .bars()
        .iter()
        .filter(|b| b.open > 0.0 && b.high > 0.0 && b.low > 0.0 && b.close > 0.0)
        .collect();

    if valid.is_empty() {
        return None;
    }

    let start = valid.len().saturating_sub(lookback);
    let recent = &valid[start..];

    let reference = volume_reference(recent.iter().map(|b| b.volume));

    let candles: Vec<IndexCandle> = recent
        .iter()
        .map(|b| IndexCandle {
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: (b.volume > 0.0).then(|| (b.volume / reference).min(VOLUME_CAP)),
        })
        .collect();

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    Some(IndexChart {
        instrument_id: series.instrument_id().to_string(),
        ma20: sma_series(&closes, 20),
        ma60: sma_series(&closes, 60),
        candles,
    })
}

/// 90th-percentile positive volume, floored at 1
fn volume_reference(volumes: impl Iterator<Item = f64>) -> f64 {
    let mut positive: Vec<f64> = volumes.filter(|v| *v > 0.0).collect();
    if positive.is_empty() {
        return 1.0;
    }

    positive.sort_by(|a, b| a.total_cmp(b));
    let idx = ((positive.len() as f64 * VOLUME_PERCENTILE) as usize).min(positive.len() - 1);
    positive[idx].max(1.0)
}
