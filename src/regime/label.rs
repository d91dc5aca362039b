use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::Result;

/// Discrete market regime derived from the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegimeLabel {
    RiskOn,
    NeutralBullish,
    Neutral,
    NeutralBearish,
    RiskOff,
}

impl RegimeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegimeLabel::RiskOn => "risk-on",
            RegimeLabel::NeutralBullish => "neutral-bullish",
            RegimeLabel::Neutral => "neutral",
            RegimeLabel::NeutralBearish => "neutral-bearish",
            RegimeLabel::RiskOff => "risk-off",
        }
    }

    /// Dashboard caption
    pub fn display_label(&self) -> &'static str {
        match self {
            RegimeLabel::RiskOn => "RISK ON",
            RegimeLabel::NeutralBullish => "NEUTRAL BULL",
            RegimeLabel::Neutral => "NEUTRAL",
            RegimeLabel::NeutralBearish => "NEUTRAL BEAR",
            RegimeLabel::RiskOff => "RISK OFF",
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds of each band (inclusive). Anything below `neutral_bearish`
/// is risk-off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelThresholds {
    pub risk_on: f64,
    pub neutral_bullish: f64,
    pub neutral: f64,
    pub neutral_bearish: f64,
}

impl Default for LabelThresholds {
    fn default() -> Self {
        Self {
            risk_on: 70.0,
            neutral_bullish: 55.0,
            neutral: 45.0,
            neutral_bearish: 30.0,
        }
    }
}

impl LabelThresholds {
    pub fn classify(&self, composite: f64) -> RegimeLabel {
        if composite >= self.risk_on {
            RegimeLabel::RiskOn
        } else if composite >= self.neutral_bullish {
            RegimeLabel::NeutralBullish
        } else if composite >= self.neutral {
            RegimeLabel::Neutral
        } else if composite >= self.neutral_bearish {
            RegimeLabel::NeutralBearish
        } else {
            RegimeLabel::RiskOff
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [
            self.risk_on,
            self.neutral_bullish,
            self.neutral,
            self.neutral_bearish,
        ];
        if bounds.iter().any(|b| !(0.0..=100.0).contains(b)) {
            return Err(EngineError::InvalidConfig(
                "regime thresholds must lie within [0, 100]".to_string(),
            ));
        }
        if bounds.windows(2).any(|w| w[1] >= w[0]) {
            return Err(EngineError::InvalidConfig(
                "regime thresholds must be strictly descending".to_string(),
            ));
        }
        Ok(())
    }
}
