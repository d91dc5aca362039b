/// Cross-sectional breadth for one trading day
///
/// Only trading rows (volume > 0) count. Advances/declines additionally need
/// a defined prior close, and the MA20 breadth needs enough recent history
/// so freshly listed names do not skew it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::BreadthConfig;
use crate::models::{CrossSection, CrossSectionRow, ExtremeFlags, ExtremeKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreadthStats {
    pub date: NaiveDate,
    pub advances: usize,
    pub declines: usize,
    pub flat: usize,
    /// advances / max(declines, 1)
    pub adr: f64,
    pub pct_above_ma20: f64,
    /// Rows that passed the history guard
    pub ma_considered: usize,
    pub new_highs: usize,
    pub new_lows: usize,
    pub spread: i64,
}

impl BreadthStats {
    /// new highs / (new highs + new lows), undefined on a day with neither
    pub fn high_ratio(&self) -> Option<f64> {
        let total = self.new_highs + self.new_lows;
        (total > 0).then(|| self.new_highs as f64 / total as f64)
    }
}

pub struct BreadthCalculator {
    min_history_days: usize,
}

impl Default for BreadthCalculator {
    fn default() -> Self {
        Self::from_config(&BreadthConfig::default())
    }
}

impl BreadthCalculator {
    pub fn new(min_history_days: usize) -> Self {
        Self { min_history_days }
    }

    pub fn from_config(config: &BreadthConfig) -> Self {
        Self::new(config.min_history_days)
    }

    /// Compute breadth for `cross_section`.
    ///
    /// `prior` fills in prior closes the cross-section itself lacks.
    pub fn compute(
        &self,
        cross_section: &CrossSection,
        prior: Option<&CrossSection>,
        extremes: &ExtremeFlags,
    ) -> BreadthStats {
        let prior_index = prior.map(|p| p.index());
        let prior_close_of = |row: &CrossSectionRow| -> Option<f64> {
            row.prior_close
                .or_else(|| {
                    prior_index
                        .as_ref()
                        .and_then(|idx| idx.get(row.instrument_id.as_str()))
                        .map(|p| p.close)
                })
                .filter(|c| *c != 0.0 && c.is_finite())
        };

        let trading = || cross_section.rows.iter().filter(|r| r.is_trading());

        let (advances, declines, flat) = trading()
            .filter_map(|r| prior_close_of(r).map(|p| (r.close, p)))
            .fold((0, 0, 0), |(up, down, flat), (close, prior_close)| {
                if close > prior_close {
                    (up + 1, down, flat)
                } else if close < prior_close {
                    (up, down + 1, flat)
                } else {
                    (up, down, flat + 1)
                }
            });

        let adr = advances as f64 / declines.max(1) as f64;

        let (above, ma_considered) = trading()
            .filter(|r| r.history_days >= self.min_history_days)
            .filter_map(|r| r.ma20.map(|ma| r.close > ma))
            .fold((0usize, 0usize), |(above, total), is_above| {
                (above + usize::from(is_above), total + 1)
            });
        let pct_above_ma20 = 100.0 * above as f64 / ma_considered.max(1) as f64;

        let new_highs = trading()
            .filter(|r| extremes.contains(&r.instrument_id, ExtremeKind::High))
            .count();
        let new_lows = trading()
            .filter(|r| extremes.contains(&r.instrument_id, ExtremeKind::Low))
            .count();

        tracing::debug!(
            date = %cross_section.date,
            advances,
            declines,
            flat,
            ma_considered,
            "breadth computed"
        );

        BreadthStats {
            date: cross_section.date,
            advances,
            declines,
            flat,
            adr,
            pct_above_ma20,
            ma_considered,
            new_highs,
            new_lows,
            spread: new_highs as i64 - new_lows as i64,
        }
    }
}
