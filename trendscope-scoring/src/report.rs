//! Report Builder
//!
//! Summarises a retained set of enhanced signals: averages, score and
//! timing distributions, industry coverage and the top-ranked signals.
//! The report carries scores and tags only, never signal content.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use trendscope_core::{EnhancedSignal, MarketTiming, Source};

use crate::{filter, stats};

/// Signals listed in `top_signals` by default
pub const DEFAULT_TOP_SIGNALS: usize = 10;

const HIGH_QUALITY: f64 = 0.8;
const MEDIUM_QUALITY: f64 = 0.6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("No signals to report on")]
    NoSignals,
}

/// Signal counts per quality band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityDistribution {
    /// quality >= 0.8
    pub high: usize,
    /// 0.6 <= quality < 0.8
    pub medium: usize,
    /// min_quality <= quality < 0.6
    pub acceptable: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimingDistribution {
    pub early: usize,
    pub growing: usize,
    pub mature: usize,
}

impl TimingDistribution {
    fn record(&mut self, timing: MarketTiming) {
        match timing {
            MarketTiming::Early => self.early += 1,
            MarketTiming::Growing => self.growing += 1,
            MarketTiming::Mature => self.mature += 1,
        }
    }
}

/// One entry of the ranked list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSignal {
    /// 1-based
    pub rank: usize,
    pub source: Source,
    pub quality_score: f64,
    pub business_potential: f64,
    pub confidence_level: f64,
    pub urgency_score: f64,
    pub market_timing: MarketTiming,
    /// quality × business potential × confidence
    pub rank_score: f64,
    pub pain_point_indicators: Vec<String>,
}

impl TopSignal {
    fn new(rank: usize, signal: &EnhancedSignal) -> Self {
        Self {
            rank,
            source: signal.source().clone(),
            quality_score: signal.quality_score,
            business_potential: signal.business_potential,
            confidence_level: signal.confidence_level,
            urgency_score: signal.urgency_score,
            market_timing: signal.market_timing,
            rank_score: signal.rank_key(),
            pain_point_indicators: signal.pain_point_indicators.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub total_signals: usize,
    pub avg_quality_score: f64,
    pub avg_business_potential: f64,
    pub avg_confidence: f64,
    pub quality_distribution: QualityDistribution,
    pub market_timing_distribution: TimingDistribution,
    /// Industry vertical -> signals mentioning it
    pub industry_distribution: BTreeMap<String, usize>,
    pub top_signals: Vec<TopSignal>,
}

/// Builds [`Report`]s for a given acceptance bar
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    min_quality: f64,
    top_n: usize,
}

impl ReportBuilder {
    pub fn new(min_quality: f64) -> Self {
        Self {
            min_quality,
            top_n: DEFAULT_TOP_SIGNALS,
        }
    }

    pub fn with_top(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn build(&self, signals: &[EnhancedSignal]) -> Result<Report, ReportError> {
        if signals.is_empty() {
            return Err(ReportError::NoSignals);
        }

        let average = |f: fn(&EnhancedSignal) -> f64| {
            stats::mean(&signals.iter().map(f).collect::<Vec<_>>()).unwrap_or(0.0)
        };

        let mut quality_distribution = QualityDistribution::default();
        let mut market_timing_distribution = TimingDistribution::default();
        let mut industry_distribution = BTreeMap::new();

        for signal in signals {
            let q = signal.quality_score;
            if q >= HIGH_QUALITY {
                quality_distribution.high += 1;
            } else if q >= MEDIUM_QUALITY {
                quality_distribution.medium += 1;
            } else if q >= self.min_quality {
                quality_distribution.acceptable += 1;
            }

            market_timing_distribution.record(signal.market_timing);

            for industry in signal.context_analysis.keys() {
                *industry_distribution.entry(industry.clone()).or_insert(0) += 1;
            }
        }

        let mut ranked = signals.to_vec();
        filter::rank(&mut ranked);
        let top_signals = ranked
            .iter()
            .take(self.top_n)
            .enumerate()
            .map(|(i, s)| TopSignal::new(i + 1, s))
            .collect();

        Ok(Report {
            total_signals: signals.len(),
            avg_quality_score: average(|s| s.quality_score),
            avg_business_potential: average(|s| s.business_potential),
            avg_confidence: average(|s| s.confidence_level),
            quality_distribution,
            market_timing_distribution,
            industry_distribution,
            top_signals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trendscope_core::{IndustryContext, Signal};

    fn enhanced(quality: f64, timing: MarketTiming) -> EnhancedSignal {
        let mut e = EnhancedSignal::floor(Arc::new(
            Signal::builder("github", "secret content").build(),
        ));
        e.quality_score = quality;
        e.business_potential = 0.5;
        e.confidence_level = 0.5;
        e.market_timing = timing;
        e
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert_eq!(ReportBuilder::new(0.4).build(&[]), Err(ReportError::NoSignals));
    }

    #[test]
    fn test_distributions() {
        let mut fintech = enhanced(0.45, MarketTiming::Early);
        fintech.context_analysis.insert(
            "fintech".to_string(),
            IndustryContext {
                match_count: 2,
                matched_keywords: vec!["billing".into(), "invoice".into()],
                relevance_ratio: 0.15,
            },
        );
        let signals = vec![
            enhanced(0.9, MarketTiming::Growing),
            enhanced(0.7, MarketTiming::Growing),
            enhanced(0.65, MarketTiming::Mature),
            fintech,
            enhanced(0.2, MarketTiming::Growing),
        ];
        let report = ReportBuilder::new(0.4).build(&signals).unwrap();

        assert_eq!(report.total_signals, 5);
        assert_eq!(
            report.quality_distribution,
            QualityDistribution {
                high: 1,
                medium: 2,
                acceptable: 1
            }
        );
        assert_eq!(report.market_timing_distribution.growing, 3);
        assert_eq!(report.market_timing_distribution.early, 1);
        assert_eq!(report.market_timing_distribution.mature, 1);
        assert_eq!(report.industry_distribution.get("fintech"), Some(&1));
        assert!((report.avg_quality_score - 0.58).abs() < 1e-9);
        assert!((report.avg_confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_top_signals_ranked_and_capped() {
        let signals: Vec<EnhancedSignal> = (0..15)
            .map(|i| enhanced(0.4 + i as f64 * 0.02, MarketTiming::Growing))
            .collect();
        let report = ReportBuilder::new(0.4).build(&signals).unwrap();

        assert_eq!(report.top_signals.len(), DEFAULT_TOP_SIGNALS);
        assert_eq!(report.top_signals[0].rank, 1);
        assert!((report.top_signals[0].quality_score - 0.68).abs() < 1e-9);
        assert!(report
            .top_signals
            .windows(2)
            .all(|w| w[0].rank_score >= w[1].rank_score));

        let short = ReportBuilder::new(0.4).with_top(3).build(&signals).unwrap();
        assert_eq!(short.top_signals.len(), 3);
    }

    #[test]
    fn test_report_json_has_no_content() {
        let report = ReportBuilder::new(0.4)
            .build(&[enhanced(0.5, MarketTiming::Early)])
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["total_signals"], 1);
        assert_eq!(json["top_signals"][0]["market_timing"], "early");
        assert_eq!(json["top_signals"][0]["source"], "github");
        assert!(json["quality_distribution"]["acceptable"].is_number());
        assert!(!json.to_string().contains("secret content"));
    }
}
