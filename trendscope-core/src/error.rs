//! Error types shared across the engine

use thiserror::Error;

/// Errors raised while building or loading engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid pattern '{pattern}' in {table}: {source}")]
    Pattern {
        table: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Quality weights must sum to 1.0 (got {0:.6})")]
    WeightsSum(f64),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Why a single signal was left out of scoring or aggregation.
///
/// Never fatal to a batch: the batch driver counts these and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("Signal has no timestamp")]
    MissingTimestamp,

    #[error("Engagement score is not finite")]
    NonFiniteEngagement,

    #[error("Engagement score is negative: {0}")]
    NegativeEngagement(f64),

    #[error("Sentiment score is not finite")]
    NonFiniteSentiment,

    #[error("Credibility weight outside [0,1]: {0}")]
    InvalidCredibility(f64),

    #[error("Scoring worker failed: {0}")]
    WorkerFailed(String),
}
