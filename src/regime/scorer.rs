/// Composite market regime scorer
///
/// Normalises six market-wide metrics onto 0-100 sub-scores and combines
/// them with fixed weights:
/// - adr: advance/decline ratio
/// - breadth: % of instruments above their MA20
/// - hlSpread: new highs / (new highs + new lows)
/// - tradingValue: today's turnover / 20-day average turnover
/// - foreignFlow: 5-day cumulative net foreign flow
/// - volatility: stdev of recent index returns (inverted)
///
/// Any unavailable input scores neutral (50) and is listed in `defaulted`,
/// so one missing feed never blocks the snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::breadth::BreadthStats;
use crate::config::RegimeConfig;
use crate::regime::label::{LabelThresholds, RegimeLabel};
use crate::regime::normalize::{clamp_score, Normalization, NEUTRAL_SCORE};
use crate::regime::weights::{Component, RegimeComponents, RegimeWeights};

/// Raw metrics feeding the scorer; `None` means the feed was unavailable
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RegimeInputs {
    pub adr: Option<f64>,
    pub pct_above_ma20: Option<f64>,
    pub high_ratio: Option<f64>,
    pub trading_value_ratio: Option<f64>,
    pub foreign_flow_cum: Option<f64>,
    pub volatility: Option<f64>,
}

impl RegimeInputs {
    /// Breadth-derived inputs. Metrics computed over an empty population
    /// count as unavailable rather than as extreme readings.
    pub fn from_breadth(breadth: &BreadthStats) -> Self {
        let considered = breadth.advances + breadth.declines + breadth.flat;
        Self {
            adr: (considered > 0).then_some(breadth.adr),
            pct_above_ma20: (breadth.ma_considered > 0).then_some(breadth.pct_above_ma20),
            high_ratio: breadth.high_ratio(),
            ..Self::default()
        }
    }

    pub fn with_trading_value_ratio(mut self, ratio: Option<f64>) -> Self {
        self.trading_value_ratio = ratio;
        self
    }

    pub fn with_foreign_flow(mut self, flow: Option<f64>) -> Self {
        self.foreign_flow_cum = flow;
        self
    }

    pub fn with_volatility(mut self, volatility: Option<f64>) -> Self {
        self.volatility = volatility;
        self
    }

    fn raw(&self, component: Component) -> Option<f64> {
        match component {
            Component::Adr => self.adr,
            Component::Breadth => self.pct_above_ma20,
            Component::HlSpread => self.high_ratio,
            Component::TradingValue => self.trading_value_ratio,
            Component::ForeignFlow => self.foreign_flow_cum,
            Component::Volatility => self.volatility,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegimeSnapshot {
    pub date: NaiveDate,
    pub components: RegimeComponents,
    pub weights: RegimeWeights,
    pub composite: f64,
    pub regime: RegimeLabel,
    pub label: String,
    /// Sub-scores that fell back to neutral
    pub defaulted: Vec<Component>,
}

pub struct RegimeScorer {
    weights: RegimeWeights,
    normalization: Normalization,
    thresholds: LabelThresholds,
}

impl Default for RegimeScorer {
    fn default() -> Self {
        Self {
            weights: RegimeWeights::default(),
            normalization: Normalization::default(),
            thresholds: LabelThresholds::default(),
        }
    }
}

impl RegimeScorer {
    pub fn new(
        weights: RegimeWeights,
        normalization: Normalization,
        thresholds: LabelThresholds,
    ) -> Self {
        Self {
            weights,
            normalization,
            thresholds,
        }
    }

    pub fn from_config(config: &RegimeConfig) -> Self {
        Self::new(
            config.weights,
            config.normalization.clone(),
            config.thresholds,
        )
    }

    /// Normalise one raw metric; `None` when unavailable
    pub fn sub_score(&self, component: Component, raw: f64) -> Option<f64> {
        let n = &self.normalization;
        match component {
            Component::Adr => n.adr_score(raw),
            Component::Breadth => n.breadth_score(raw),
            Component::HlSpread => n.hl_spread_score(raw),
            Component::TradingValue => n.trading_value_score(raw),
            Component::ForeignFlow => n.foreign_flow_score(raw),
            Component::Volatility => n.volatility_score(raw),
        }
    }

    pub fn score(&self, date: NaiveDate, inputs: &RegimeInputs) -> RegimeSnapshot {
        let mut components = RegimeComponents::uniform(NEUTRAL_SCORE);
        let mut defaulted = Vec::new();

        for component in Component::ALL {
            match inputs.raw(component).and_then(|raw| self.sub_score(component, raw)) {
                Some(score) => components.set(component, score),
                None => {
                    tracing::warn!(
                        component = component.as_str(),
                        "regime input unavailable, using neutral score"
                    );
                    defaulted.push(component);
                }
            }
        }

        self.combine(date, components, defaulted)
    }

    /// Weighted composite and label for already-normalised sub-scores
    pub fn combine(
        &self,
        date: NaiveDate,
        components: RegimeComponents,
        defaulted: Vec<Component>,
    ) -> RegimeSnapshot {
        let composite = clamp_score(self.weights.dot(&components));
        let regime = self.thresholds.classify(composite);

        tracing::debug!(%date, composite, %regime, "regime scored");

        RegimeSnapshot {
            date,
            components,
            weights: self.weights,
            composite,
            regime,
            label: regime.display_label().to_string(),
            defaulted,
        }
    }
}
