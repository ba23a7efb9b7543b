//! Signal Scorer
//!
//! Turns one raw signal into an [`EnhancedSignal`]:
//! `Signal -> TaxonomyMatches -> QualityBreakdown -> EnhancedSignal`.
//! Every stage is a pure function, so signals can be scored concurrently
//! without sharing anything but the read-only taxonomy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use trendscope_core::{
    ConfigError, EngineConfig, EnhancedSignal, IndustryContext, MarketTiming, QualityBreakdown,
    QualityWeights, Signal, SkipReason, Taxonomy, TaxonomyMatcher, TaxonomyMatches, TermMatch,
};

use crate::stats;

/// Content length at which the length component of confidence saturates
const CONFIDENT_CONTENT_CHARS: f64 = 200.0;

/// Scores signals against a taxonomy with fixed quality weights
#[derive(Debug, Clone)]
pub struct SignalScorer {
    matcher: TaxonomyMatcher,
    weights: QualityWeights,
}

/// Result of scoring a batch sequentially
#[derive(Debug, Clone, Default)]
pub struct ScoringOutcome {
    /// Scored signals, in input order
    pub scored: Vec<EnhancedSignal>,
    pub skipped: usize,
}

impl SignalScorer {
    /// Weights that do not sum to 1 are rejected
    pub fn new(taxonomy: Arc<Taxonomy>, weights: QualityWeights) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self {
            matcher: TaxonomyMatcher::new(taxonomy),
            weights,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::new(config.build_taxonomy()?, config.weights)
    }

    pub fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    /// Score one signal. Empty content yields the floor result whatever its
    /// other fields hold; malformed numeric fields yield a [`SkipReason`].
    pub fn score(&self, signal: &Arc<Signal>) -> Result<EnhancedSignal, SkipReason> {
        if !signal.has_content() {
            return Ok(EnhancedSignal::floor(Arc::clone(signal)));
        }
        signal.validate_for_scoring()?;

        let matches = self.matcher.match_content(&signal.content);
        let credibility = signal.credibility();
        let (market_timing, timing_score) = market_timing(&matches);

        let breakdown = QualityBreakdown {
            pain_point_clarity: pain_point_clarity(&matches),
            solution_feasibility: solution_feasibility(&matches),
            market_timing: timing_score,
            business_relevance: business_relevance(&matches, credibility),
            urgency: urgency(&matches),
            source_credibility: credibility,
        };

        let quality_score = self.composite(&breakdown);
        let technology_relevance = (0.2 * matches.technology.len() as f64).min(1.0);
        let context_analysis = self.context_analysis(&matches);

        Ok(EnhancedSignal {
            quality_score,
            business_potential: business_potential(&breakdown),
            urgency_score: breakdown.urgency,
            relevance_score: relevance(signal, technology_relevance, context_analysis.len()),
            market_timing,
            pain_point_indicators: matches.pain_points.iter().map(TermMatch::tag).collect(),
            solution_indicators: matches.solution_indicators.iter().map(TermMatch::tag).collect(),
            market_size_signals: prefixed("market_size", &matches.market_size),
            competition_signals: prefixed("competition", &matches.competition),
            technology_relevance,
            semantic_keywords: semantic_keywords(signal, &matches),
            context_analysis,
            confidence_level: confidence(&breakdown, &signal.content, credibility),
            quality_breakdown: breakdown,
            signal: Arc::clone(signal),
        })
    }

    /// Score a batch on the calling thread, counting skips
    pub fn score_batch(&self, signals: &[Arc<Signal>]) -> ScoringOutcome {
        let mut outcome = ScoringOutcome::default();
        for signal in signals {
            match self.score(signal) {
                Ok(enhanced) => outcome.scored.push(enhanced),
                Err(reason) => {
                    debug!("Skipping signal from {}: {}", signal.source, reason);
                    outcome.skipped += 1;
                }
            }
        }
        outcome
    }

    fn composite(&self, breakdown: &QualityBreakdown) -> f64 {
        let total: f64 = self
            .weights
            .values()
            .iter()
            .zip(breakdown.values())
            .map(|(w, s)| w * s)
            .sum();
        total.clamp(0.0, 1.0)
    }

    fn context_analysis(&self, matches: &TaxonomyMatches) -> BTreeMap<String, IndustryContext> {
        matches
            .industries
            .iter()
            .map(|(industry, hits)| {
                let distinct: BTreeSet<&str> = hits.iter().map(|m| m.term.as_str()).collect();
                let vocabulary = self.matcher.taxonomy().industry_vocabulary(industry).max(1);
                let context = IndustryContext {
                    match_count: hits.len(),
                    relevance_ratio: (distinct.len() as f64 / vocabulary as f64).min(1.0),
                    matched_keywords: distinct.into_iter().map(str::to_string).collect(),
                };
                (industry.clone(), context)
            })
            .collect()
    }
}

fn pain_point_clarity(matches: &TaxonomyMatches) -> f64 {
    let score = 0.2 * matches.pain_points.len() as f64
        + 0.2 * matches.specific_pain as f64
        + 0.1 * matches.intense_pain_count() as f64;
    score.clamp(0.0, 1.0)
}

fn solution_feasibility(matches: &TaxonomyMatches) -> f64 {
    let score = 0.15 * matches.solution_indicators.len() as f64
        + 0.1 * matches.technical.len() as f64
        + 0.2 * matches.market_ready_count() as f64;
    score.clamp(0.0, 1.0)
}

fn market_timing(matches: &TaxonomyMatches) -> (MarketTiming, f64) {
    let stage = matches.market_timing.classify();
    let mut score = stage.favorability();
    if matches.has_urgency() {
        score += 0.1;
    }
    (stage, score.clamp(0.0, 1.0))
}

fn business_relevance(matches: &TaxonomyMatches, credibility: f64) -> f64 {
    let value = &matches.business_value;
    let mut score = 0.15 * value.enterprise.len() as f64
        + 0.2 * value.revenue.len() as f64
        + 0.1 * value.scale.len() as f64
        + 0.1 * credibility;
    if value.willingness_to_pay > 0 {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

fn urgency(matches: &TaxonomyMatches) -> f64 {
    let score = 0.3 * matches.urgent_need as f64 + 0.2 * matches.time_sensitive as f64;
    score.clamp(0.0, 1.0)
}

/// Commercial weighting, deliberately different from the quality weights
fn business_potential(breakdown: &QualityBreakdown) -> f64 {
    let score = 0.3 * breakdown.pain_point_clarity
        + 0.25 * breakdown.solution_feasibility
        + 0.25 * breakdown.market_timing
        + 0.2 * breakdown.business_relevance;
    score.clamp(0.0, 1.0)
}

fn confidence(breakdown: &QualityBreakdown, content: &str, credibility: f64) -> f64 {
    let spread = stats::population_std(&breakdown.values()).unwrap_or(0.0);
    let length = (content.chars().count() as f64 / CONFIDENT_CONTENT_CHARS).min(1.0);
    let score = 0.5 * (1.0 - spread) + 0.3 * length + 0.2 * credibility;
    score.clamp(0.0, 1.0)
}

/// Keyword coverage, technology relevance and industry breadth
fn relevance(signal: &Signal, technology_relevance: f64, industries: usize) -> f64 {
    let declared: Vec<String> = signal
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let coverage = if declared.is_empty() {
        0.0
    } else {
        let content = signal.content.to_lowercase();
        let found = declared.iter().filter(|k| content.contains(k.as_str())).count();
        found as f64 / declared.len() as f64
    };

    let breadth = (industries as f64 / 2.0).min(1.0);
    (0.5 * coverage + 0.3 * technology_relevance + 0.2 * breadth).clamp(0.0, 1.0)
}

fn prefixed(prefix: &str, hits: &[TermMatch]) -> Vec<String> {
    hits.iter()
        .map(|m| format!("{}_{}", prefix, m.term))
        .collect()
}

fn semantic_keywords(signal: &Signal, matches: &TaxonomyMatches) -> Vec<String> {
    let declared = signal
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty());

    let business = &matches.business_value;
    let matched = matches
        .pain_points
        .iter()
        .chain(&matches.solution_indicators)
        .chain(&matches.technical)
        .chain(&business.enterprise)
        .chain(&business.revenue)
        .chain(&business.scale)
        .chain(&matches.technology)
        .map(|m| m.term.clone());

    declared
        .chain(matched)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> SignalScorer {
        SignalScorer::new(
            Arc::new(Taxonomy::embedded().unwrap()),
            QualityWeights::default(),
        )
        .unwrap()
    }

    fn signal(content: &str) -> Arc<Signal> {
        Arc::new(Signal::builder("reddit", content).build())
    }

    #[test]
    fn test_empty_content_scores_floor() {
        let enhanced = scorer().score(&signal("   ")).unwrap();
        assert_eq!(enhanced.quality_score, 0.0);
        assert_eq!(enhanced.confidence_level, 0.0);
        assert!(enhanced.pain_point_indicators.is_empty());
    }

    #[test]
    fn test_invoicing_pain_signal() {
        let enhanced = scorer()
            .score(&signal("really frustrated with manual invoicing, costs $200/month"))
            .unwrap();
        let b = enhanced.quality_breakdown;

        assert_eq!(b.pain_point_clarity, 1.0);
        assert_eq!(b.solution_feasibility, 0.0);
        assert!((b.market_timing - 0.7).abs() < 1e-9);
        // revenue 0.2 + willingness to pay 0.2 + 0.1 * 0.5 credibility
        assert!((b.business_relevance - 0.45).abs() < 1e-9, "got {}", b.business_relevance);
        assert_eq!(b.urgency, 0.0);
        assert_eq!(b.source_credibility, 0.5);

        // 0.25 + 0.2 * 0.7 + 0.15 * 0.45 + 0.1 * 0.5
        assert!((enhanced.quality_score - 0.5075).abs() < 1e-9, "got {}", enhanced.quality_score);
        // 0.3 + 0.25 * 0.7 + 0.2 * 0.45
        assert!((enhanced.business_potential - 0.565).abs() < 1e-9);
        assert_eq!(enhanced.market_timing, MarketTiming::Growing);
        assert!(enhanced
            .pain_point_indicators
            .iter()
            .any(|t| t.starts_with("intense_")));
        assert!(enhanced.context_analysis.contains_key("fintech"));
        assert!(enhanced.semantic_keywords.contains(&"invoicing".to_string()));
    }

    #[test]
    fn test_quality_is_weighted_sum() {
        let s = scorer();
        let enhanced = s
            .score(&signal(
                "We need this asap: an open source API tool that just launched for enterprise billing",
            ))
            .unwrap();
        let expected: f64 = s
            .weights()
            .values()
            .iter()
            .zip(enhanced.quality_breakdown.values())
            .map(|(w, v)| w * v)
            .sum();
        assert!((enhanced.quality_score - expected.clamp(0.0, 1.0)).abs() < 1e-12);
        assert!(enhanced.urgency_score > 0.0);
        assert!(enhanced.solution_indicators.iter().any(|t| t.starts_with("market_ready_")));
    }

    #[test]
    fn test_scores_are_bounded() {
        let noisy = "really really frustrated, so broken, so tedious, costs $500/month, \
                     takes 3 hours, asap urgent deadline today, enterprise b2b billing revenue \
                     subscription pricing, would pay, free trial, just launched, api sdk";
        let enhanced = scorer().score(&signal(noisy)).unwrap();
        for value in enhanced.quality_breakdown.values() {
            assert!((0.0..=1.0).contains(&value), "sub-score out of range: {}", value);
        }
        for value in [
            enhanced.quality_score,
            enhanced.business_potential,
            enhanced.urgency_score,
            enhanced.relevance_score,
            enhanced.technology_relevance,
            enhanced.confidence_level,
        ] {
            assert!((0.0..=1.0).contains(&value), "score out of range: {}", value);
        }
    }

    #[test]
    fn test_credibility_passthrough_and_default() {
        let s = scorer();
        let default = s.score(&signal("manual work")).unwrap();
        assert_eq!(default.quality_breakdown.source_credibility, 0.5);

        let credible = Arc::new(Signal::builder("github", "manual work").credibility(0.9).build());
        let enhanced = s.score(&credible).unwrap();
        assert_eq!(enhanced.quality_breakdown.source_credibility, 0.9);
        assert!(enhanced.confidence_level > default.confidence_level);
    }

    #[test]
    fn test_keyword_coverage_feeds_relevance() {
        let s = scorer();
        let covered = Arc::new(
            Signal::builder("hn", "invoicing automation for freelancers")
                .keywords(["invoicing", "freelancers"])
                .build(),
        );
        let uncovered = Arc::new(
            Signal::builder("hn", "invoicing automation for freelancers")
                .keywords(["gardening"])
                .build(),
        );
        let a = s.score(&covered).unwrap();
        let b = s.score(&uncovered).unwrap();
        assert!(a.relevance_score > b.relevance_score);
        assert!(a.semantic_keywords.contains(&"freelancers".to_string()));
    }

    #[test]
    fn test_malformed_signal_is_skipped() {
        let s = scorer();
        let bad = Arc::new(Signal::builder("reddit", "text").engagement(f64::INFINITY).build());
        assert_eq!(s.score(&bad), Err(SkipReason::NonFiniteEngagement));

        let outcome = s.score_batch(&[bad, signal("broken tool"), signal("")]);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.scored.len(), 2);
        assert_eq!(outcome.scored[1].quality_score, 0.0);
    }

    #[test]
    fn test_empty_content_wins_over_bad_credibility() {
        let empty = Arc::new(Signal::builder("reddit", "").credibility(1.5).build());
        let enhanced = scorer().score(&empty).unwrap();
        assert_eq!(enhanced.quality_score, 0.0);

        let worded = Arc::new(Signal::builder("reddit", "broken").credibility(1.5).build());
        assert!(scorer().score(&worded).is_err());
    }

    #[test]
    fn test_new_validates_weights() {
        let weights = QualityWeights {
            pain_point_clarity: 0.9,
            ..QualityWeights::default()
        };
        assert!(matches!(
            SignalScorer::new(Arc::new(Taxonomy::embedded().unwrap()), weights),
            Err(ConfigError::WeightsSum(_))
        ));
    }

    #[test]
    fn test_from_config_validates_weights() {
        assert!(SignalScorer::from_config(&EngineConfig::default()).is_ok());

        let mut config = EngineConfig::default();
        config.weights.urgency = 0.5;
        assert!(matches!(
            SignalScorer::from_config(&config),
            Err(ConfigError::WeightsSum(_))
        ));
    }

    #[test]
    fn test_signal_is_not_mutated() {
        let original = signal("hate the clunky dashboard");
        let before = (*original).clone();
        let enhanced = scorer().score(&original).unwrap();
        assert_eq!(*enhanced.signal, before);
        assert!(Arc::ptr_eq(&enhanced.signal, &original));
    }
}
