//! Trend Aggregator
//!
//! Reduces one topic's signals to a [`TrendMetrics`] estimate.
//!
//! Signals fade with age: a signal's momentum weight halves every
//! `decay_half_life_hours`, so `decay(t) = 2^(-t / half_life)`. Momentum is
//! normalised by the un-decayed weights, which makes a stale batch read as
//! near-zero momentum rather than as an average of faded values.
//!
//! Too little data never produces an error. Below `min_signals_for_trend`
//! valid signals the canonical low-confidence result is returned instead.

use chrono::{DateTime, Utc};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use trendscope_core::{
    AggregationConfig, ConfigError, EngineConfig, EnhancedSignal, KeywordNovelty, MarketTiming,
    QualityWeights, Signal, SkipReason, Source, SourceAuthority, Taxonomy, TrendMetrics,
};

use crate::{stats, SignalScorer};

/// Span over which market penetration's time component saturates (one week)
const PENETRATION_SPAN_HOURS: f64 = 168.0;

/// Spans shorter than this count as temporally concentrated
const CONCENTRATION_SPAN_HOURS: f64 = 6.0;

/// Mean sentiment above which a batch is considered hype
const SENTIMENT_EXTREMITY: f64 = 0.8;

/// A validated signal with its scores
struct Observation {
    timestamp: DateTime<Utc>,
    enhanced: EnhancedSignal,
}

impl Observation {
    fn signal(&self) -> &Signal {
        &self.enhanced.signal
    }
}

/// Aggregates signals into trend metrics
#[derive(Debug, Clone)]
pub struct TrendAggregator {
    scorer: SignalScorer,
    taxonomy: Arc<Taxonomy>,
    authority: SourceAuthority,
    config: AggregationConfig,
}

impl TrendAggregator {
    /// Parameters are validated here; a zero half-life or a confidence
    /// level outside (0,1) is rejected
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        authority: SourceAuthority,
        weights: QualityWeights,
        config: AggregationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        authority.validate()?;
        Ok(Self {
            scorer: SignalScorer::new(Arc::clone(&taxonomy), weights)?,
            taxonomy,
            authority,
            config,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.build_taxonomy()?,
            config.authority.clone(),
            config.weights,
            config.aggregation,
        )
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Aggregate relative to the current time
    pub fn aggregate(&self, signals: &[Signal]) -> TrendMetrics {
        self.aggregate_at(signals, Utc::now())
    }

    /// Aggregate relative to `as_of`. Same input and `as_of`, same output.
    pub fn aggregate_at(&self, signals: &[Signal], as_of: DateTime<Utc>) -> TrendMetrics {
        let mut skipped = 0;
        let mut observations = Vec::with_capacity(signals.len());
        for signal in signals {
            match self.observe(signal) {
                Ok(observation) => observations.push(observation),
                Err(reason) => {
                    warn!("Excluding signal from {}: {}", signal.source, reason);
                    skipped += 1;
                }
            }
        }

        let n = observations.len();
        if n == 0 || n < self.config.min_signals_for_trend {
            info!(
                "Only {} valid signals (need {}), returning low-confidence metrics",
                n, self.config.min_signals_for_trend
            );
            return TrendMetrics::low_confidence(n, skipped);
        }

        observations.sort_by_key(|o| o.timestamp);

        let engagement: Vec<f64> = observations
            .iter()
            .map(|o| o.signal().engagement_score)
            .collect();

        let momentum_score = self.momentum(&observations, as_of);
        let trend_velocity = self.velocity(&engagement);
        let market_penetration = self.penetration(&observations);
        let competitive_intensity = competitive_intensity(&observations);
        let innovation_index = self.innovation(&observations);
        let (confidence_interval, statistical_significance) = self.engagement_statistics(&engagement);
        let risk_score = risk(&observations, &engagement);
        let signal_quality_score = stats::mean(
            &observations
                .iter()
                .map(|o| o.enhanced.quality_score)
                .collect::<Vec<_>>(),
        )
        .unwrap_or(0.0);

        let raw_opportunity = 0.25 * momentum_score
            + 0.20 * trend_velocity
            + 1.5 * market_penetration
            + 1.5 * innovation_index
            + 1.0 * statistical_significance
            + 1.0 * signal_quality_score;
        let risk_factor = (1.0 - risk_score * self.config.risk_adjustment_weight).clamp(0.0, 1.0);
        let opportunity_score = (raw_opportunity * risk_factor).clamp(0.0, 10.0);

        debug!(
            "Aggregated {} signals: momentum {:.2}, velocity {:.2}, risk {:.2}, opportunity {:.2}",
            n, momentum_score, trend_velocity, risk_score, opportunity_score
        );

        TrendMetrics {
            momentum_score,
            trend_velocity,
            market_penetration,
            competitive_intensity,
            innovation_index,
            risk_score,
            opportunity_score,
            signal_quality_score,
            source_diversity_score: source_diversity(&observations),
            temporal_consistency_score: temporal_consistency(&observations),
            cross_validation_score: cross_validation(&observations),
            confidence_interval,
            statistical_significance,
            sample_size: n,
            skipped_signals: skipped,
            insufficient_data: false,
        }
    }

    /// Momentum weight multiplier for a signal of the given age
    pub fn decay(&self, age_hours: f64) -> f64 {
        2f64.powf(-age_hours.max(0.0) / self.config.decay_half_life_hours)
    }

    fn observe(&self, signal: &Signal) -> Result<Observation, SkipReason> {
        signal.validate()?;
        let timestamp = signal.timestamp.ok_or(SkipReason::MissingTimestamp)?;
        let enhanced = self.scorer.score(&Arc::new(signal.clone()))?;
        Ok(Observation {
            timestamp,
            enhanced,
        })
    }

    fn base_weight(&self, signal: &Signal) -> f64 {
        let sentiment = signal.sentiment_score.clamp(0.0, 1.0);
        self.authority.weight(&signal.source) * (1.0 + 0.3 * (sentiment - 0.5))
    }

    fn momentum(&self, observations: &[Observation], as_of: DateTime<Utc>) -> f64 {
        let mut weighted = 0.0;
        let mut base_total = 0.0;
        for o in observations {
            let signal = o.signal();
            let base = self.base_weight(signal);
            let age = signal.age_hours(as_of).unwrap_or(0.0);
            weighted += self.decay(age) * base * signal.engagement_score.ln_1p();
            base_total += base;
        }
        if base_total <= 0.0 {
            return 0.0;
        }
        (weighted / base_total * self.config.momentum_scale).clamp(0.0, 10.0)
    }

    /// Engagement must be in timestamp order
    fn velocity(&self, engagement: &[f64]) -> f64 {
        if engagement.len() < 2 {
            return 0.0;
        }
        // Later differences weigh more: 1, 2, ..., k
        let (weighted, weight_total) = engagement
            .windows(2)
            .zip(1..)
            .fold((0.0, 0.0), |(sum, total), (pair, w)| {
                let w = w as f64;
                (sum + w * (pair[1] - pair[0]), total + w)
            });
        let mean = stats::mean(engagement).unwrap_or(0.0);
        let relative = (weighted / weight_total) / mean.max(1.0);
        (5.0 * (1.0 + (relative / self.config.velocity_scale).tanh())).clamp(0.0, 10.0)
    }

    fn penetration(&self, observations: &[Observation]) -> f64 {
        let n = observations.len() as f64;
        let reach = (distinct_sources(observations) as f64 / Source::KNOWN.len() as f64).min(1.0);
        let high = observations
            .iter()
            .filter(|o| o.signal().engagement_score > self.config.high_engagement_threshold)
            .count() as f64
            / n;
        let span = (span_hours(observations) / PENETRATION_SPAN_HOURS).min(1.0);
        (0.4 * reach + 0.35 * high + 0.25 * span).clamp(0.0, 1.0)
    }

    fn innovation(&self, observations: &[Observation]) -> f64 {
        let keywords: BTreeSet<String> = observations
            .iter()
            .flat_map(|o| o.signal().keywords.iter())
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let novelty = if keywords.is_empty() {
            0.5
        } else {
            let total = keywords.len() as f64;
            let mut novel = 0usize;
            let mut established = 0usize;
            for keyword in &keywords {
                match self.taxonomy.keyword_novelty(keyword) {
                    KeywordNovelty::Novel => novel += 1,
                    KeywordNovelty::Established => established += 1,
                    KeywordNovelty::Neutral => {}
                }
            }
            (0.5 + 0.5 * novel as f64 / total - 0.3 * established as f64 / total).clamp(0.0, 1.0)
        };

        let technology = fraction(observations, |e| e.technology_relevance > 0.0);
        let urgency = fraction(observations, |e| e.urgency_score > 0.0);

        (0.4 * novelty + 0.35 * technology + 0.25 * urgency).clamp(0.0, 1.0)
    }

    /// Confidence interval of mean engagement and one-sided significance
    /// against the baseline mean
    fn engagement_statistics(&self, engagement: &[f64]) -> ((f64, f64), f64) {
        let n = engagement.len();
        let mean = stats::mean(engagement).unwrap_or(0.0);
        let degenerate = ((mean, mean), 0.0);

        let sd = match stats::sample_std(engagement) {
            Some(sd) if sd > 0.0 && sd.is_finite() => sd,
            _ => return degenerate,
        };
        let dist = match StudentsT::new(0.0, 1.0, (n - 1) as f64) {
            Ok(dist) => dist,
            Err(e) => {
                warn!("Student-t unavailable for {} samples: {}", n, e);
                return degenerate;
            }
        };

        let standard_error = sd / (n as f64).sqrt();
        let critical = dist.inverse_cdf((1.0 + self.config.confidence_level) / 2.0);
        let margin = critical * standard_error;
        let interval = ((mean - margin).max(0.0), mean + margin);

        let t = (mean - self.config.baseline_mean) / standard_error;
        let significance = dist.cdf(t).clamp(0.0, 1.0);

        (interval, significance)
    }
}

fn fraction(observations: &[Observation], predicate: impl Fn(&EnhancedSignal) -> bool) -> f64 {
    if observations.is_empty() {
        return 0.0;
    }
    observations.iter().filter(|o| predicate(&o.enhanced)).count() as f64
        / observations.len() as f64
}

fn distinct_sources(observations: &[Observation]) -> usize {
    observations
        .iter()
        .map(|o| &o.signal().source)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Hours between first and last observation (input sorted by time)
fn span_hours(observations: &[Observation]) -> f64 {
    match (observations.first(), observations.last()) {
        (Some(first), Some(last)) => {
            (last.timestamp - first.timestamp).num_milliseconds() as f64 / 3_600_000.0
        }
        _ => 0.0,
    }
}

fn competitive_intensity(observations: &[Observation]) -> f64 {
    let competition = fraction(observations, |e| !e.competition_signals.is_empty());
    let mature = fraction(observations, |e| e.market_timing == MarketTiming::Mature);
    (0.7 * competition + 0.3 * mature).clamp(0.0, 1.0)
}

/// Mean of the risk factors that apply to this batch
fn risk(observations: &[Observation], engagement: &[f64]) -> f64 {
    let n = observations.len();
    let mut factors = Vec::with_capacity(4);

    if n >= 2 {
        if let Some(cv) = stats::coefficient_of_variation(engagement) {
            factors.push(cv.min(1.0));
        }
    }

    let mut per_source: BTreeMap<&Source, usize> = BTreeMap::new();
    for o in observations {
        *per_source.entry(&o.signal().source).or_default() += 1;
    }
    if let Some(max) = per_source.values().max() {
        factors.push(*max as f64 / n as f64);
    }

    if n >= 2 {
        let span = span_hours(observations);
        factors.push(if span < CONCENTRATION_SPAN_HOURS {
            1.0 - span / CONCENTRATION_SPAN_HOURS
        } else {
            0.0
        });
    }

    let sentiments: Vec<f64> = observations
        .iter()
        .map(|o| o.signal().sentiment_score.clamp(0.0, 1.0))
        .collect();
    let mean_sentiment = stats::mean(&sentiments).unwrap_or(0.5);
    factors.push(if mean_sentiment > SENTIMENT_EXTREMITY {
        (mean_sentiment - SENTIMENT_EXTREMITY) / (1.0 - SENTIMENT_EXTREMITY)
    } else {
        0.0
    });

    stats::mean(&factors).unwrap_or(1.0).clamp(0.0, 1.0)
}

fn source_diversity(observations: &[Observation]) -> f64 {
    let distinct = distinct_sources(observations);
    if distinct <= 1 {
        return 0.0;
    }
    let known = Source::KNOWN.len();
    (10.0 * (distinct - 1) as f64 / (known - 1) as f64).min(10.0)
}

fn temporal_consistency(observations: &[Observation]) -> f64 {
    let gaps: Vec<f64> = observations
        .windows(2)
        .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64 / 3_600_000.0)
        .collect();
    if gaps.len() < 2 {
        return 0.0;
    }
    match stats::coefficient_of_variation(&gaps) {
        Some(cv) => 10.0 / (1.0 + cv),
        None => 0.0,
    }
}

fn cross_validation(observations: &[Observation]) -> f64 {
    let mut per_source: BTreeMap<&Source, Vec<f64>> = BTreeMap::new();
    for o in observations {
        per_source
            .entry(&o.signal().source)
            .or_default()
            .push(o.signal().engagement_score);
    }
    if per_source.len() < 3 {
        return 0.0;
    }
    let means: Vec<f64> = per_source
        .values()
        .filter_map(|values| stats::mean(values))
        .collect();
    if means.iter().all(|m| *m == 0.0) {
        return 10.0;
    }
    match stats::coefficient_of_variation(&means) {
        Some(cv) => 10.0 / (1.0 + cv),
        None => 0.0,
    }
}
