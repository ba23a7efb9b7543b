//! Signal data model
//!
//! - [`Signal`]: one observed post/snippet, produced upstream
//! - [`EnhancedSignal`]: a signal plus its derived quality and business scores
//! - [`TrendMetrics`]: the aggregate estimate for one topic
//!
//! All of these are value objects. An `EnhancedSignal` holds its source
//! signal behind an `Arc` and never mutates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{SkipReason, Source, DEFAULT_CREDIBILITY, NEUTRAL_SENTIMENT};

/// A raw signal as delivered by an ingestion adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Platform the signal came from
    pub source: Source,

    /// UTF-8 text, possibly empty
    #[serde(default)]
    pub content: String,

    /// When the signal was observed. Optional on the wire so a malformed
    /// record can still be carried to the batch boundary and skipped there.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Non-negative engagement (upvotes + comments, stars, ...)
    #[serde(default)]
    pub engagement_score: f64,

    /// Sentiment on the [0,1] scale, 0.5 neutral.
    /// See [`Signal::sentiment_from_compound`] for [-1,1] producers.
    #[serde(default = "neutral_sentiment")]
    pub sentiment_score: f64,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Optional credibility in [0,1]; see [`Signal::credibility`]
    #[serde(default)]
    pub credibility_weight: Option<f64>,
}

fn neutral_sentiment() -> f64 {
    NEUTRAL_SENTIMENT
}

impl Signal {
    /// Create a new signal builder
    pub fn builder(source: impl Into<Source>, content: impl Into<String>) -> SignalBuilder {
        SignalBuilder::new(source.into(), content.into())
    }

    /// Credibility weight, defaulting to 0.5 when absent
    pub fn credibility(&self) -> f64 {
        self.credibility_weight.unwrap_or(DEFAULT_CREDIBILITY)
    }

    /// Convert a compound sentiment in [-1,1] to the engine's [0,1] scale
    pub fn sentiment_from_compound(compound: f64) -> f64 {
        ((compound + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    /// Whether there is any text to analyse
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Hours between the signal and `as_of`, clamped at zero for
    /// timestamps in the future. `None` when the signal has no timestamp.
    pub fn age_hours(&self, as_of: DateTime<Utc>) -> Option<f64> {
        self.timestamp.map(|ts| {
            let age = (as_of - ts).num_milliseconds() as f64 / 3_600_000.0;
            age.max(0.0)
        })
    }

    /// Numeric fields the scorer relies on
    pub fn validate_for_scoring(&self) -> Result<(), SkipReason> {
        if !self.engagement_score.is_finite() {
            return Err(SkipReason::NonFiniteEngagement);
        }
        if self.engagement_score < 0.0 {
            return Err(SkipReason::NegativeEngagement(self.engagement_score));
        }
        if !self.sentiment_score.is_finite() {
            return Err(SkipReason::NonFiniteSentiment);
        }
        if let Some(weight) = self.credibility_weight {
            if !(0.0..=1.0).contains(&weight) {
                return Err(SkipReason::InvalidCredibility(weight));
            }
        }
        Ok(())
    }

    /// Full validation, including the timestamp aggregation needs
    pub fn validate(&self) -> Result<(), SkipReason> {
        if self.timestamp.is_none() {
            return Err(SkipReason::MissingTimestamp);
        }
        self.validate_for_scoring()
    }
}

/// Builder for signals
pub struct SignalBuilder {
    source: Source,
    content: String,
    timestamp: Option<DateTime<Utc>>,
    engagement_score: f64,
    sentiment_score: f64,
    keywords: Vec<String>,
    credibility_weight: Option<f64>,
}

impl SignalBuilder {
    pub fn new(source: Source, content: String) -> Self {
        Self {
            source,
            content,
            timestamp: Some(Utc::now()),
            engagement_score: 0.0,
            sentiment_score: NEUTRAL_SENTIMENT,
            keywords: Vec::new(),
            credibility_weight: None,
        }
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Drop the timestamp (malformed-record fixtures)
    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = None;
        self
    }

    pub fn engagement(mut self, engagement: f64) -> Self {
        self.engagement_score = engagement;
        self
    }

    pub fn sentiment(mut self, sentiment: f64) -> Self {
        self.sentiment_score = sentiment;
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn credibility(mut self, credibility: f64) -> Self {
        self.credibility_weight = Some(credibility);
        self
    }

    pub fn build(self) -> Signal {
        Signal {
            source: self.source,
            content: self.content,
            timestamp: self.timestamp,
            engagement_score: self.engagement_score,
            sentiment_score: self.sentiment_score,
            keywords: self.keywords,
            credibility_weight: self.credibility_weight,
        }
    }
}

/// Adoption-curve stage of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarketTiming {
    Early,
    #[default]
    Growing,
    Mature,
}

impl MarketTiming {
    /// How favourable the stage is for a new entrant
    pub fn favorability(self) -> f64 {
        match self {
            MarketTiming::Early => 0.9,
            MarketTiming::Growing => 0.7,
            MarketTiming::Mature => 0.3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarketTiming::Early => "early",
            MarketTiming::Growing => "growing",
            MarketTiming::Mature => "mature",
        }
    }
}

impl fmt::Display for MarketTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six quality sub-scores, each in [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub pain_point_clarity: f64,
    pub solution_feasibility: f64,
    pub market_timing: f64,
    pub business_relevance: f64,
    pub urgency: f64,
    pub source_credibility: f64,
}

impl QualityBreakdown {
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
}

/// Industry-vertical match summary for one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryContext {
    /// Total keyword hits (duplicates counted)
    pub match_count: usize,
    /// Distinct vertical keywords that matched, sorted
    pub matched_keywords: Vec<String>,
    /// Distinct matched keywords / vertical vocabulary size
    pub relevance_ratio: f64,
}

/// A signal with its derived scores. Created once by the scorer and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedSignal {
    pub signal: Arc<Signal>,

    /// Weighted composite of the sub-scores, in [0,1]
    pub quality_score: f64,
    pub quality_breakdown: QualityBreakdown,

    pub business_potential: f64,
    pub urgency_score: f64,
    pub relevance_score: f64,

    pub market_timing: MarketTiming,

    pub pain_point_indicators: Vec<String>,
    pub solution_indicators: Vec<String>,
    pub market_size_signals: Vec<String>,
    pub competition_signals: Vec<String>,

    pub technology_relevance: f64,

    /// Deduplicated, sorted
    pub semantic_keywords: Vec<String>,

    /// Vertical name -> match summary
    pub context_analysis: BTreeMap<String, IndustryContext>,

    pub confidence_level: f64,
}

impl EnhancedSignal {
    /// The floor result for a signal with nothing to analyse
    pub fn floor(signal: Arc<Signal>) -> Self {
        Self {
            signal,
            quality_score: 0.0,
            quality_breakdown: QualityBreakdown::default(),
            business_potential: 0.0,
            urgency_score: 0.0,
            relevance_score: 0.0,
            market_timing: MarketTiming::default(),
            pain_point_indicators: Vec::new(),
            solution_indicators: Vec::new(),
            market_size_signals: Vec::new(),
            competition_signals: Vec::new(),
            technology_relevance: 0.0,
            semantic_keywords: Vec::new(),
            context_analysis: BTreeMap::new(),
            confidence_level: 0.0,
        }
    }

    /// Composite desirability used for ranking
    pub fn rank_key(&self) -> f64 {
        self.quality_score * self.business_potential * self.confidence_level
    }

    pub fn source(&self) -> &Source {
        &self.signal.source
    }
}

/// Aggregate trend estimate for one topic.
///
/// Recomputed from scratch on every aggregation; carries no identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMetrics {
    /// Decay-weighted engagement, clamped to [0,10]
    pub momentum_score: f64,
    /// Recency-weighted engagement change, [0,10] with 5 meaning flat
    pub trend_velocity: f64,
    /// Source reach, high-engagement share and time span, [0,1]
    pub market_penetration: f64,
    /// Share of competition talk and saturated-market language, [0,1]
    pub competitive_intensity: f64,
    /// Novelty, technology density and timing urgency, [0,1]
    pub innovation_index: f64,
    /// Mean of the available risk factors, [0,1]
    pub risk_score: f64,
    /// Risk-adjusted blend of the above, [0,10]
    pub opportunity_score: f64,
    /// Mean per-signal quality score, [0,1]
    pub signal_quality_score: f64,
    /// [0,10]; 0 for a single source
    pub source_diversity_score: f64,
    /// Regularity of inter-signal gaps, [0,10]
    pub temporal_consistency_score: f64,
    /// Agreement of per-source engagement, [0,10]; 0 below three sources
    pub cross_validation_score: f64,
    /// Engagement-mean interval (lower, upper), engagement units, lower >= 0
    pub confidence_interval: (f64, f64),
    /// One-sided t-test against the baseline mean, [0,1]
    pub statistical_significance: f64,
    /// Signals that entered the computation
    pub sample_size: usize,
    /// Malformed signals excluded from the computation
    pub skipped_signals: usize,
    /// Too few valid signals; every score above is the neutral default
    #[serde(default)]
    pub insufficient_data: bool,
}

impl TrendMetrics {
    /// The defined result for too little data: every score zero, maximal risk
    pub fn low_confidence(sample_size: usize, skipped_signals: usize) -> Self {
        Self {
            momentum_score: 0.0,
            trend_velocity: 0.0,
            market_penetration: 0.0,
            competitive_intensity: 0.0,
            innovation_index: 0.0,
            risk_score: 1.0,
            opportunity_score: 0.0,
            signal_quality_score: 0.0,
            source_diversity_score: 0.0,
            temporal_consistency_score: 0.0,
            cross_validation_score: 0.0,
            confidence_interval: (0.0, 0.0),
            statistical_significance: 0.0,
            sample_size,
            skipped_signals,
            insufficient_data: true,
        }
    }

    pub fn is_low_confidence(&self) -> bool {
        self.insufficient_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_signal_builder_defaults() {
        let signal = Signal::builder("reddit", "manual invoicing is painful").build();

        assert_eq!(signal.source, Source::Reddit);
        assert_eq!(signal.credibility(), 0.5);
        assert_eq!(signal.sentiment_score, 0.5);
        assert!(signal.timestamp.is_some());
        assert!(signal.validate().is_ok());
    }

    #[test]
    fn test_sentiment_conversion() {
        assert_eq!(Signal::sentiment_from_compound(-1.0), 0.0);
        assert_eq!(Signal::sentiment_from_compound(0.0), 0.5);
        assert_eq!(Signal::sentiment_from_compound(1.0), 1.0);
        assert_eq!(Signal::sentiment_from_compound(3.0), 1.0);
    }

    #[test]
    fn test_validation_rejects_malformed() {
        let missing = Signal::builder("github", "x").without_timestamp().build();
        assert_eq!(missing.validate(), Err(SkipReason::MissingTimestamp));
        assert!(missing.validate_for_scoring().is_ok());

        let nan = Signal::builder("github", "x").engagement(f64::NAN).build();
        assert_eq!(nan.validate(), Err(SkipReason::NonFiniteEngagement));

        let negative = Signal::builder("github", "x").engagement(-3.0).build();
        assert_eq!(negative.validate(), Err(SkipReason::NegativeEngagement(-3.0)));

        let bad_cred = Signal::builder("github", "x").credibility(1.5).build();
        assert_eq!(bad_cred.validate(), Err(SkipReason::InvalidCredibility(1.5)));
    }

    #[test]
    fn test_age_hours_clamps_future() {
        let now = Utc::now();
        let past = Signal::builder("reddit", "x")
            .timestamp(now - Duration::hours(6))
            .build();
        let future = Signal::builder("reddit", "x")
            .timestamp(now + Duration::hours(6))
            .build();

        let age = past.age_hours(now).unwrap();
        assert!((age - 6.0).abs() < 1e-6, "expected 6h, got {}", age);
        assert_eq!(future.age_hours(now), Some(0.0));
    }

    #[test]
    fn test_signal_json_defaults() {
        let json = r#"{"source": "HN", "content": "hello"}"#;
        let signal: Signal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.source, Source::HackerNews);
        assert_eq!(signal.sentiment_score, 0.5);
        assert!(signal.timestamp.is_none());
        assert!(signal.keywords.is_empty());
    }

    #[test]
    fn test_low_confidence_metrics() {
        let metrics = TrendMetrics::low_confidence(3, 1);
        assert_eq!(metrics.risk_score, 1.0);
        assert_eq!(metrics.confidence_interval, (0.0, 0.0));
        assert_eq!(metrics.sample_size, 3);
        assert!(metrics.is_low_confidence());
    }

    #[test]
    fn test_floor_rank_key_is_zero() {
        let signal = Arc::new(Signal::builder("reddit", "").build());
        let enhanced = EnhancedSignal::floor(signal);
        assert_eq!(enhanced.rank_key(), 0.0);
        assert_eq!(enhanced.market_timing, MarketTiming::Growing);
    }
}
