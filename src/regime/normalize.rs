/// Piecewise-linear normalisation curves mapping raw metrics onto 0-100.
///
/// Each curve is a list of anchors with strictly ascending `x`. Inputs
/// outside the anchored range take the nearest endpoint's score, and every
/// result is clamped to [0, 100].

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::Result;

pub const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub score: f64,
}

impl Anchor {
    pub const fn new(x: f64, score: f64) -> Self {
        Self { x, score }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Curve(Vec<Anchor>);

impl Curve {
    pub fn new(anchors: Vec<Anchor>) -> Self {
        Self(anchors)
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.0
    }

    /// Evaluate the curve; `None` for non-finite input
    pub fn score(&self, raw: f64) -> Option<f64> {
        if !raw.is_finite() {
            return None;
        }

        let anchors = &self.0;
        let first = anchors.first()?;
        let last = anchors.last()?;

        let score = if raw <= first.x {
            first.score
        } else if raw >= last.x {
            last.score
        } else {
            anchors
                .windows(2)
                .find(|w| raw >= w[0].x && raw <= w[1].x)
                .map(|w| {
                    let t = (raw - w[0].x) / (w[1].x - w[0].x);
                    w[0].score + t * (w[1].score - w[0].score)
                })?
        };

        Some(clamp_score(score))
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.0.len() < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "normalization.{} needs at least two anchors",
                name
            )));
        }
        if self.0.iter().any(|a| !a.x.is_finite() || !a.score.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "normalization.{} has a non-finite anchor",
                name
            )));
        }
        if self.0.windows(2).any(|w| w[1].x <= w[0].x) {
            return Err(EngineError::InvalidConfig(format!(
                "normalization.{} anchors must be strictly ascending in x",
                name
            )));
        }
        Ok(())
    }
}

pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// One curve per regime component.
///
/// Anchors put the neutral raw value at 50 where a neutral value exists
/// (ADR 1.0, turnover ratio 1.0, zero flow) and the endpoints at empirically
/// chosen extremes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Normalization {
    pub adr: Curve,
    pub breadth: Curve,
    pub hl_spread: Curve,
    pub trading_value: Curve,
    pub foreign_flow: Curve,
    pub volatility: Curve,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            adr: Curve::new(vec![
                Anchor::new(0.5, 0.0),
                Anchor::new(1.0, 50.0),
                Anchor::new(2.0, 100.0),
            ]),
            breadth: Curve::new(vec![Anchor::new(0.0, 0.0), Anchor::new(100.0, 100.0)]),
            hl_spread: Curve::new(vec![Anchor::new(0.0, 0.0), Anchor::new(1.0, 100.0)]),
            // (ratio - 0.5) * 100
            trading_value: Curve::new(vec![Anchor::new(0.5, 0.0), Anchor::new(1.5, 100.0)]),
            // (flow / 5000 + 1) * 50
            foreign_flow: Curve::new(vec![
                Anchor::new(-5000.0, 0.0),
                Anchor::new(5000.0, 100.0),
            ]),
            // Inverted: calm markets score high
            volatility: Curve::new(vec![Anchor::new(0.5, 100.0), Anchor::new(3.0, 0.0)]),
        }
    }
}

impl Normalization {
    pub fn validate(&self) -> Result<()> {
        self.adr.validate("adr")?;
        self.breadth.validate("breadth")?;
        self.hl_spread.validate("hl_spread")?;
        self.trading_value.validate("trading_value")?;
        self.foreign_flow.validate("foreign_flow")?;
        self.volatility.validate("volatility")?;
        Ok(())
    }

    pub fn adr_score(&self, adr: f64) -> Option<f64> {
        self.adr.score(adr)
    }

    pub fn breadth_score(&self, pct_above_ma20: f64) -> Option<f64> {
        self.breadth.score(pct_above_ma20)
    }

    pub fn hl_spread_score(&self, high_ratio: f64) -> Option<f64> {
        self.hl_spread.score(high_ratio)
    }

    pub fn trading_value_score(&self, ratio: f64) -> Option<f64> {
        self.trading_value.score(ratio)
    }

    pub fn foreign_flow_score(&self, flow: f64) -> Option<f64> {
        self.foreign_flow.score(flow)
    }

    pub fn volatility_score(&self, vol: f64) -> Option<f64> {
        self.volatility.score(vol)
    }
}
