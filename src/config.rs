use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::regime::{LabelThresholds, Normalization, RegimeWeights};
use crate::Result;

const ENV_PREFIX: &str = "MARKET_DAILY";

/// All engine tunables. Every section falls back to its `Default`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub breadth: BreadthConfig,
    pub groups: GroupConfig,
    pub regime: RegimeConfig,
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BreadthConfig {
    pub ma_window: usize,
    /// Calendar days inspected by the insufficient-history guard
    pub history_window_days: i64,
    pub min_history_days: usize,
}

impl Default for BreadthConfig {
    fn default() -> Self {
        Self {
            ma_window: 20,
            history_window_days: 30,
            min_history_days: 15, // newly listed names must not skew breadth
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupConfig {
    pub min_members: usize,
    pub top_n: usize,
    pub heatmap_n: usize,
    pub top_stocks: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            min_members: 3,
            top_n: 10,
            heatmap_n: 25,
            top_stocks: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegimeConfig {
    pub weights: RegimeWeights,
    pub normalization: Normalization,
    pub thresholds: LabelThresholds,
    pub flow_days: usize,
    pub volatility_window: usize,
    pub flow_market: String,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            weights: RegimeWeights::default(),
            normalization: Normalization::default(),
            thresholds: LabelThresholds::default(),
            flow_days: 5,
            volatility_window: 20,
            flow_market: "KOSPI".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryConfig {
    pub signal_green: f64,
    pub signal_red: f64,
    pub turnover_avg_days: usize,
    pub sparkline_days: usize,
    pub breadth_history_days: usize,
    pub lookback_trade_dates: usize,
    pub index_ids: Vec<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            signal_green: 1.2,
            signal_red: 0.8,
            turnover_avg_days: 20,
            sparkline_days: 7,
            breadth_history_days: 30,
            lookback_trade_dates: 60,
            index_ids: vec!["KOSPI".to_string(), "KOSDAQ".to_string()],
        }
    }
}

impl EngineConfig {
    /// Check invariants that must hold before any run
    pub fn validate(&self) -> Result<()> {
        self.regime.weights.validate()?;
        self.regime.normalization.validate()?;
        self.regime.thresholds.validate()?;

        if self.groups.min_members == 0 {
            return Err(EngineError::InvalidConfig(
                "groups.min_members must be at least 1".to_string(),
            ));
        }
        if self.breadth.ma_window == 0 {
            return Err(EngineError::InvalidConfig(
                "breadth.ma_window must be at least 1".to_string(),
            ));
        }
        if self.breadth.history_window_days <= 0 {
            return Err(EngineError::InvalidConfig(
                "breadth.history_window_days must be positive".to_string(),
            ));
        }
        let windows = [
            ("breadth.min_history_days", self.breadth.min_history_days, 1),
            ("summary.turnover_avg_days", self.summary.turnover_avg_days, 1),
            ("summary.sparkline_days", self.summary.sparkline_days, 1),
            ("summary.breadth_history_days", self.summary.breadth_history_days, 1),
            ("summary.lookback_trade_dates", self.summary.lookback_trade_dates, 1),
            ("regime.flow_days", self.regime.flow_days, 1),
            // a sample deviation needs two returns
            ("regime.volatility_window", self.regime.volatility_window, 2),
        ];
        for (name, value, min) in windows {
            if value < min {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be at least {} (got {})",
                    name, min, value
                )));
            }
        }
        if self.summary.signal_red > self.summary.signal_green {
            return Err(EngineError::InvalidConfig(format!(
                "summary.signal_red ({}) exceeds summary.signal_green ({})",
                self.summary.signal_red, self.summary.signal_green
            )));
        }

        Ok(())
    }
}

/// Load configuration: defaults, then an optional TOML file, then
/// `MARKET_DAILY__SECTION__KEY` environment variables.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&EngineConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let engine_config = settings.try_deserialize::<EngineConfig>()?;
    engine_config.validate()?;

    tracing::debug!(?engine_config, "configuration loaded");
    Ok(engine_config)
}

/// Parse a TOML document on top of the defaults (no environment overrides)
pub fn config_from_toml(toml: &str) -> Result<EngineConfig> {
    let settings = config::Config::builder()
        .add_source(config::Config::try_from(&EngineConfig::default())?)
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    let engine_config = settings.try_deserialize::<EngineConfig>()?;
    engine_config.validate()?;
    Ok(engine_config)
}
