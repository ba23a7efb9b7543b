//! Retention Filter
//!
//! Keeps enhanced signals that clear the configured thresholds and ranks
//! them by composite desirability (`quality × business potential ×
//! confidence`). Ranking is a stable sort, so equal keys keep input order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use trendscope_core::{EnhancedSignal, ThresholdMode, Thresholds};

/// Retention accounting for one filter pass
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RetentionStats {
    pub input: usize,
    pub retained: usize,
    /// `retained / input`, 0 for empty input
    pub retention_rate: f64,
}

impl RetentionStats {
    pub fn new(input: usize, retained: usize) -> Self {
        let retention_rate = if input == 0 {
            0.0
        } else {
            retained as f64 / input as f64
        };
        Self {
            input,
            retained,
            retention_rate,
        }
    }
}

/// Whether one signal clears the thresholds.
///
/// A signal at the floor (`quality_score <= 0`) never passes.
pub fn passes(signal: &EnhancedSignal, thresholds: &Thresholds) -> bool {
    if signal.quality_score <= 0.0 {
        return false;
    }
    if signal.quality_score < thresholds.min_overall_quality {
        return false;
    }
    match thresholds.mode {
        ThresholdMode::OverallOnly => true,
        ThresholdMode::Strict => {
            let b = &signal.quality_breakdown;
            b.business_relevance >= thresholds.min_business_relevance
                && b.pain_point_clarity >= thresholds.min_pain_point_clarity
                && b.solution_feasibility >= thresholds.min_solution_feasibility
                && b.market_timing >= thresholds.min_market_timing
        }
    }
}

/// Sort by rank key, descending. Stable, and total over NaN.
pub fn rank(signals: &mut [EnhancedSignal]) {
    signals.sort_by(|a, b| b.rank_key().total_cmp(&a.rank_key()));
}

/// Retained signals, best first. The input is left untouched.
pub fn filter(signals: &[EnhancedSignal], thresholds: &Thresholds) -> Vec<EnhancedSignal> {
    let mut retained: Vec<EnhancedSignal> = signals
        .iter()
        .filter(|s| passes(s, thresholds))
        .cloned()
        .collect();
    rank(&mut retained);
    retained
}

/// [`filter`] plus retention accounting
pub fn filter_with_stats(
    signals: &[EnhancedSignal],
    thresholds: &Thresholds,
) -> (Vec<EnhancedSignal>, RetentionStats) {
    let retained = filter(signals, thresholds);
    let stats = RetentionStats::new(signals.len(), retained.len());
    debug!(
        "Retained {}/{} signals ({:.1}%)",
        stats.retained,
        stats.input,
        stats.retention_rate * 100.0
    );
    (retained, stats)
}
