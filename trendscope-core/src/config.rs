//! Engine configuration
//!
//! Every tunable of the engine lives here: quality weights, retention
//! thresholds, aggregation parameters, source authorities and (optionally)
//! a replacement taxonomy. Configuration is plain data, loaded once from
//! TOML and injected into the matcher, scorer and aggregator. Nothing in the
//! engine reads process-wide mutable state.
//!
//! ## Example
//!
//! ```toml
//! [weights]
//! pain_point_clarity = 0.3
//! solution_feasibility = 0.15
//! market_timing = 0.2
//! business_relevance = 0.15
//! urgency = 0.1
//! source_credibility = 0.1
//!
//! [thresholds]
//! min_overall_quality = 0.5
//! mode = "strict"
//!
//! [authority]
//! github = 0.95
//! lobsters = 0.8
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::{ConfigError, SourceAuthority, Taxonomy, TaxonomySpec};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Weights of the six quality sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub pain_point_clarity: f64,
    pub solution_feasibility: f64,
    pub market_timing: f64,
    pub business_relevance: f64,
    pub urgency: f64,
    pub source_credibility: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            pain_point_clarity: 0.25,
            solution_feasibility: 0.20,
            market_timing: 0.20,
            business_relevance: 0.15,
            urgency: 0.10,
            source_credibility: 0.10,
        }
    }
}

impl QualityWeights {
    pub fn values(&self) -> [f64; 6] {
        [
            self.pain_point_clarity,
            self.solution_feasibility,
            self.market_timing,
            self.business_relevance,
            self.urgency,
            self.source_credibility,
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for value in self.values() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field: "quality weight",
                    value,
                });
            }
        }
        let sum: f64 = self.values().iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightsSum(sum));
        }
        Ok(())
    }
}

/// How the retention filter applies thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Only `min_overall_quality` is enforced
    #[default]
    OverallOnly,
    /// Every sub-score must also clear its own threshold
    Strict,
}

/// Retention thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_overall_quality: f64,
    pub min_business_relevance: f64,
    pub min_pain_point_clarity: f64,
    pub min_solution_feasibility: f64,
    pub min_market_timing: f64,
    pub mode: ThresholdMode,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_overall_quality: 0.4,
            min_business_relevance: 0.3,
            min_pain_point_clarity: 0.3,
            min_solution_feasibility: 0.2,
            min_market_timing: 0.3,
            mode: ThresholdMode::OverallOnly,
        }
    }
}

impl Thresholds {
    /// Only the overall bar, at the given level
    pub fn overall(min_overall_quality: f64) -> Self {
        Self {
            min_overall_quality,
            ..Self::default()
        }
    }

    pub fn strict(mut self) -> Self {
        self.mode = ThresholdMode::Strict;
        self
    }
}

/// Parameters of the trend aggregator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Below this many valid signals the low-confidence result is returned
    pub min_signals_for_trend: usize,
    /// Age at which a signal's momentum weight halves
    pub decay_half_life_hours: f64,
    /// Multiplier from mean log-engagement to the [0,10] momentum scale
    pub momentum_scale: f64,
    /// Engagement above which a signal counts as high-engagement
    pub high_engagement_threshold: f64,
    /// Two-sided level of the engagement confidence interval
    pub confidence_level: f64,
    /// Mean engagement the significance test compares against
    pub baseline_mean: f64,
    /// How strongly risk discounts opportunity, in [0,1]
    pub risk_adjustment_weight: f64,
    /// Softness of the velocity squashing
    pub velocity_scale: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_signals_for_trend: 10,
            decay_half_life_hours: 24.0,
            momentum_scale: 1.5,
            high_engagement_threshold: 50.0,
            confidence_level: 0.95,
            baseline_mean: 10.0,
            risk_adjustment_weight: 0.5,
            velocity_scale: 1.0,
        }
    }
}

impl AggregationConfig {
    pub fn with_min_signals(mut self, min: usize) -> Self {
        self.min_signals_for_trend = min;
        self
    }

    pub fn with_half_life(mut self, hours: f64) -> Self {
        self.decay_half_life_hours = hours;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay_half_life_hours > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "decay_half_life_hours",
                value: self.decay_half_life_hours,
            });
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "confidence_level",
                value: self.confidence_level,
            });
        }
        if !(0.0..=1.0).contains(&self.risk_adjustment_weight) {
            return Err(ConfigError::OutOfRange {
                field: "risk_adjustment_weight",
                value: self.risk_adjustment_weight,
            });
        }
        if !(self.velocity_scale > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "velocity_scale",
                value: self.velocity_scale,
            });
        }
        Ok(())
    }
}

/// Everything the engine needs, as loaded at process start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: QualityWeights,
    pub thresholds: Thresholds,
    pub aggregation: AggregationConfig,
    pub authority: SourceAuthority,
    /// Replacement taxonomy tables; the embedded tables are used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<TaxonomySpec>,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.aggregation.validate()?;
        self.authority.validate()
    }

    /// Compile the configured taxonomy, or the embedded one
    pub fn build_taxonomy(&self) -> Result<Arc<Taxonomy>, ConfigError> {
        let taxonomy = match &self.taxonomy {
            Some(spec) => Taxonomy::compile(spec)?,
            None => Taxonomy::embedded()?,
        };
        Ok(Arc::new(taxonomy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(QualityWeights::default().validate().is_ok());
    }

    #[test]
    fn test_bad_weights_rejected() {
        let weights = QualityWeights {
            pain_point_clarity: 0.5,
            ..QualityWeights::default()
        };
        match weights.validate() {
            Err(ConfigError::WeightsSum(sum)) => assert!((sum - 1.25).abs() < 1e-9),
            other => panic!("expected WeightsSum, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [thresholds]
            min_overall_quality = 0.55
            mode = "strict"

            [aggregation]
            min_signals_for_trend = 15

            [authority]
            lobsters = 0.8
            "#,
        )
        .unwrap();

        assert_eq!(config.thresholds.min_overall_quality, 0.55);
        assert_eq!(config.thresholds.mode, ThresholdMode::Strict);
        assert_eq!(config.thresholds.min_market_timing, 0.3);
        assert_eq!(config.aggregation.min_signals_for_trend, 15);
        assert_eq!(config.aggregation.decay_half_life_hours, 24.0);
        assert_eq!(config.authority.weight(&Source::parse("lobsters")), 0.8);
        // A table given in the file replaces the built-in one
        assert_eq!(config.authority.weight(&Source::GitHub), 0.5);
        assert_eq!(config.weights, QualityWeights::default());
    }

    #[test]
    fn test_invalid_aggregation_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [aggregation]
            confidence_level = 1.5
            "#,
        );
        assert!(matches!(result, Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_default_config_serializes() {
        let rendered = toml::to_string(&EngineConfig::default()).unwrap();
        assert!(rendered.contains("min_overall_quality"));
        let reparsed = EngineConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.weights, QualityWeights::default());
        assert_eq!(reparsed.authority, SourceAuthority::default());
    }

    #[test]
    fn test_builds_embedded_taxonomy() {
        let taxonomy = EngineConfig::default().build_taxonomy().unwrap();
        assert_eq!(taxonomy.intensity_window(), crate::DEFAULT_INTENSITY_WINDOW);
    }
}
