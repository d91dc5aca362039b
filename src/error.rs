use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the engine's boundaries.
///
/// The derivation components themselves never fail on data conditions: they
/// exclude rows or return `None`. Errors only come from construction-time
/// invariants, configuration and the collaborator boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Series for {instrument_id} is not strictly ascending by date at {date}")]
    UnorderedSeries {
        instrument_id: String,
        date: NaiveDate,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unrecognised group membership document: {0}")]
    Membership(String),

    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
