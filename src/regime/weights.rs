use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::Result;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// The six sub-scores that make up the composite
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    Adr,
    Breadth,
    HlSpread,
    TradingValue,
    ForeignFlow,
    Volatility,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Adr,
        Component::Breadth,
        Component::HlSpread,
        Component::TradingValue,
        Component::ForeignFlow,
        Component::Volatility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Adr => "adr",
            Component::Breadth => "breadth",
            Component::HlSpread => "hlSpread",
            Component::TradingValue => "tradingValue",
            Component::ForeignFlow => "foreignFlow",
            Component::Volatility => "volatility",
        }
    }
}

/// Per-component 0-100 sub-scores
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegimeComponents {
    pub adr: f64,
    pub breadth: f64,
    pub hl_spread: f64,
    pub trading_value: f64,
    pub foreign_flow: f64,
    pub volatility: f64,
}

impl RegimeComponents {
    pub fn uniform(score: f64) -> Self {
        Self {
            adr: score,
            breadth: score,
            hl_spread: score,
            trading_value: score,
            foreign_flow: score,
            volatility: score,
        }
    }

    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Adr => self.adr,
            Component::Breadth => self.breadth,
            Component::HlSpread => self.hl_spread,
            Component::TradingValue => self.trading_value,
            Component::ForeignFlow => self.foreign_flow,
            Component::Volatility => self.volatility,
        }
    }

    pub fn set(&mut self, component: Component, value: f64) {
        match component {
            Component::Adr => self.adr = value,
            Component::Breadth => self.breadth = value,
            Component::HlSpread => self.hl_spread = value,
            Component::TradingValue => self.trading_value = value,
            Component::ForeignFlow => self.foreign_flow = value,
            Component::Volatility => self.volatility = value,
        }
    }
}

/// Composite weights. Must sum to 1.0; checked when configuration loads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegimeWeights {
    pub adr: f64,
    pub breadth: f64,
    pub hl_spread: f64,
    pub trading_value: f64,
    pub foreign_flow: f64,
    pub volatility: f64,
}

impl Default for RegimeWeights {
    fn default() -> Self {
        Self {
            adr: 0.20,
            breadth: 0.20,
            hl_spread: 0.15,
            trading_value: 0.15,
            foreign_flow: 0.15,
            volatility: 0.15,
        }
    }
}

impl RegimeWeights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Adr => self.adr,
            Component::Breadth => self.breadth,
            Component::HlSpread => self.hl_spread,
            Component::TradingValue => self.trading_value,
            Component::ForeignFlow => self.foreign_flow,
            Component::Volatility => self.volatility,
        }
    }

    pub fn sum(&self) -> f64 {
        Component::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(c) = Component::ALL
            .iter()
            .find(|c| !self.get(**c).is_finite() || self.get(**c) < 0.0)
        {
            return Err(EngineError::InvalidConfig(format!(
                "regime weight '{}' must be a non-negative number, got {}",
                c.as_str(),
                self.get(*c)
            )));
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::InvalidConfig(format!(
                "regime weights must sum to 1.0, got {:.6}",
                sum
            )));
        }
        Ok(())
    }

    /// Weighted inner product with the sub-scores
    pub fn dot(&self, components: &RegimeComponents) -> f64 {
        Component::ALL
            .iter()
            .map(|c| self.get(*c) * components.get(*c))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = RegimeWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-12);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let weights = RegimeWeights {
            adr: -0.1,
            breadth: 0.5,
            ..RegimeWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_dot_of_uniform_components() {
        let weights = RegimeWeights::default();
        let composite = weights.dot(&RegimeComponents::uniform(50.0));
        assert!((composite - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_component_accessors_roundtrip() {
        let mut components = RegimeComponents::uniform(0.0);
        for (i, c) in Component::ALL.iter().enumerate() {
            components.set(*c, i as f64);
        }
        assert_eq!(components.get(Component::Volatility), 5.0);
        assert_eq!(components.hl_spread, 2.0);
    }
}
