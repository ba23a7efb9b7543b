//! Batch Pipeline
//!
//! Drives a batch through the engine:
//! 1. Score every signal on the blocking pool, at most `workers` at a time
//! 2. Barrier: wait for all results (or the deadline)
//! 3. Filter and rank the scored set
//! 4. Build the report
//!
//! Topics are aggregated independently and concurrently, one blocking task
//! per topic.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use trendscope_core::{
    ConfigError, EngineConfig, EnhancedSignal, Signal, SkipReason, Thresholds, TrendMetrics,
};
use trendscope_scoring::{
    filter_with_stats, Report, ReportBuilder, RetentionStats, SignalScorer, TrendAggregator,
};

/// Pipeline concurrency settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum scoring tasks in flight
    pub workers: usize,
    /// Stop submitting work after this long; `None` waits for everything
    pub deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            deadline: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Scoring results for one batch
#[derive(Debug, Clone, Default)]
pub struct ScoredBatch {
    /// Successfully scored signals, in input order
    pub scored: Vec<EnhancedSignal>,
    /// Malformed signals and failed workers
    pub skipped: usize,
    /// Signals not finished before the deadline
    pub unscored: usize,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Retained signals, best first
    pub retained: Vec<EnhancedSignal>,
    pub retention: RetentionStats,
    /// `None` when nothing was retained
    pub report: Option<Report>,
    pub skipped: usize,
    pub unscored: usize,
}

/// The batch driver
pub struct Pipeline {
    scorer: Arc<SignalScorer>,
    aggregator: Arc<TrendAggregator>,
    thresholds: Thresholds,
    reporter: ReportBuilder,
    config: PipelineConfig,
}

impl Pipeline {
    /// Build a pipeline from a validated engine configuration
    pub fn new(engine: &EngineConfig) -> Result<Self, ConfigError> {
        engine.validate()?;
        let taxonomy = engine.build_taxonomy()?;

        Ok(Self {
            scorer: Arc::new(SignalScorer::new(Arc::clone(&taxonomy), engine.weights)?),
            aggregator: Arc::new(TrendAggregator::new(
                taxonomy,
                engine.authority.clone(),
                engine.weights,
                engine.aggregation,
            )?),
            thresholds: engine.thresholds,
            reporter: ReportBuilder::new(engine.thresholds.min_overall_quality),
            config: PipelineConfig::default(),
        })
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Score a batch concurrently.
    ///
    /// Once the deadline passes no further results are collected; finished
    /// results are kept and the rest are counted as unscored.
    pub async fn score_batch(
        &self,
        signals: &[Arc<Signal>],
        deadline: Option<Duration>,
    ) -> ScoredBatch {
        let total = signals.len();
        let expires = deadline.map(|d| Instant::now() + d);
        let mut slots: Vec<Option<EnhancedSignal>> = (0..total).map(|_| None).collect();
        let mut skipped = 0;
        let mut finished = 0;

        let mut tasks = stream::iter(signals.iter().cloned().enumerate())
            .map(|(index, signal)| {
                let scorer = Arc::clone(&self.scorer);
                async move {
                    let source = signal.source.clone();
                    let result = tokio::task::spawn_blocking(move || scorer.score(&signal)).await;
                    (index, source, result)
                }
            })
            .buffer_unordered(self.config.workers.max(1));

        let mut timed_out = false;
        loop {
            let next = match expires {
                Some(at) if Instant::now() >= at => {
                    timed_out = true;
                    break;
                }
                Some(at) => tokio::select! {
                    biased;
                    _ = tokio::time::sleep_until(at) => {
                        timed_out = true;
                        break;
                    }
                    item = tasks.next() => item,
                },
                None => tasks.next().await,
            };

            let Some((index, source, result)) = next else {
                break;
            };
            finished += 1;

            match result {
                Ok(Ok(enhanced)) => slots[index] = Some(enhanced),
                Ok(Err(reason)) => {
                    debug!("Skipping signal {} from {}: {}", index, source, reason);
                    skipped += 1;
                }
                Err(e) => {
                    let reason = SkipReason::WorkerFailed(e.to_string());
                    error!("Skipping signal {} from {}: {}", index, source, reason);
                    skipped += 1;
                }
            }
        }

        if timed_out {
            warn!(
                "Scoring deadline reached: {}/{} signals finished",
                finished, total
            );
        }

        ScoredBatch {
            scored: slots.into_iter().flatten().collect(),
            skipped,
            unscored: total - finished,
        }
    }

    /// Score, filter, rank and report on a batch
    pub async fn run(&self, signals: Vec<Signal>) -> PipelineOutcome {
        let signals: Vec<Arc<Signal>> = signals.into_iter().map(Arc::new).collect();
        info!(
            "Scoring {} signals with {} workers",
            signals.len(),
            self.config.workers
        );

        let batch = self.score_batch(&signals, self.config.deadline).await;
        let (retained, retention) = filter_with_stats(&batch.scored, &self.thresholds);
        let report = self.reporter.build(&retained).ok();

        info!(
            "Retained {}/{} scored signals ({} skipped, {} unscored)",
            retention.retained, retention.input, batch.skipped, batch.unscored
        );

        PipelineOutcome {
            retained,
            retention,
            report,
            skipped: batch.skipped,
            unscored: batch.unscored,
        }
    }

    /// Aggregate several topics in parallel; topics never share state
    pub async fn aggregate_topics(
        &self,
        topics: BTreeMap<String, Vec<Signal>>,
        as_of: DateTime<Utc>,
    ) -> BTreeMap<String, TrendMetrics> {
        let futures: Vec<_> = topics
            .into_iter()
            .map(|(topic, signals)| {
                let aggregator = Arc::clone(&self.aggregator);
                async move {
                    let count = signals.len();
                    let result =
                        tokio::task::spawn_blocking(move || aggregator.aggregate_at(&signals, as_of))
                            .await;
                    let metrics = match result {
                        Ok(metrics) => metrics,
                        Err(e) => {
                            error!("Aggregation for topic {} failed: {}", topic, e);
                            TrendMetrics::low_confidence(0, count)
                        }
                    };
                    (topic, metrics)
                }
            })
            .collect();

        join_all(futures).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const PAIN: &str = "really frustrated with manual invoicing, costs $200/month";

    fn pipeline() -> Pipeline {
        Pipeline::new(&EngineConfig::default())
            .unwrap()
            .with_config(PipelineConfig::default().with_workers(4))
    }

    fn invoicing_batch(as_of: DateTime<Utc>) -> Vec<Signal> {
        let sources = ["reddit", "github", "hn", "twitter", "producthunt"];
        (0..20)
            .map(|i| {
                Signal::builder(sources[i % 5], PAIN)
                    .timestamp(as_of - ChronoDuration::hours(i as i64))
                    .engagement(10.0 + i as f64)
                    .build()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_invoicing_scenario() {
        let outcome = pipeline().run(invoicing_batch(Utc::now())).await;

        assert!(outcome.retained.len() > 15, "retained {}", outcome.retained.len());
        for signal in &outcome.retained {
            assert!(signal
                .pain_point_indicators
                .iter()
                .any(|t| t.starts_with("intense_")));
            assert!(matches!(
                signal.market_timing,
                trendscope_core::MarketTiming::Growing | trendscope_core::MarketTiming::Early
            ));
        }
        let report = outcome.report.unwrap();
        assert_eq!(report.total_signals, outcome.retained.len());
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.unscored, 0);
    }

    #[tokio::test]
    async fn test_scored_batch_keeps_input_order() {
        let signals: Vec<Arc<Signal>> = ["first broken thing", "", "third tedious chore"]
            .iter()
            .map(|c| Arc::new(Signal::builder("reddit", *c).build()))
            .collect();
        let batch = pipeline().score_batch(&signals, None).await;

        assert_eq!(batch.scored.len(), 3);
        assert_eq!(batch.scored[0].signal.content, "first broken thing");
        assert_eq!(batch.scored[1].quality_score, 0.0);
        assert_eq!(batch.scored[2].signal.content, "third tedious chore");
    }

    #[tokio::test]
    async fn test_malformed_signals_are_skipped() {
        let mut signals = invoicing_batch(Utc::now());
        signals.push(Signal::builder("reddit", PAIN).engagement(f64::NAN).build());
        signals.push(Signal::builder("reddit", PAIN).credibility(2.0).build());

        let outcome = pipeline().run(signals).await;
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.retention.input, 20);
    }

    #[tokio::test]
    async fn test_elapsed_deadline_returns_partial_batch() {
        let signals: Vec<Arc<Signal>> = invoicing_batch(Utc::now())
            .into_iter()
            .map(Arc::new)
            .collect();
        let batch = pipeline()
            .score_batch(&signals, Some(Duration::ZERO))
            .await;

        assert_eq!(batch.scored.len() + batch.skipped + batch.unscored, signals.len());
        assert_eq!(batch.unscored, signals.len());
    }

    #[tokio::test]
    async fn test_deadline_mid_batch_keeps_finished_results() {
        let as_of = Utc::now();
        let signals: Vec<Arc<Signal>> = (0..50_000)
            .map(|i| {
                Arc::new(
                    Signal::builder("reddit", PAIN)
                        .timestamp(as_of - ChronoDuration::minutes(i))
                        .build(),
                )
            })
            .collect();
        let pipeline = Pipeline::new(&EngineConfig::default())
            .unwrap()
            .with_config(PipelineConfig::default().with_workers(1));

        let batch = pipeline
            .score_batch(&signals, Some(Duration::from_millis(50)))
            .await;

        assert!(!batch.scored.is_empty());
        assert!(batch.unscored > 0);
        assert_eq!(batch.scored.len() + batch.skipped + batch.unscored, signals.len());
        // finished results stay in input order
        assert!(batch
            .scored
            .windows(2)
            .all(|w| w[0].signal.timestamp >= w[1].signal.timestamp));
    }

    #[tokio::test]
    async fn test_nothing_retained_has_no_report() {
        let signals = vec![Signal::builder("reddit", "the weather was pleasant").build()];
        let outcome = pipeline().run(signals).await;
        assert!(outcome.retained.is_empty());
        assert!(outcome.report.is_none());
        assert_eq!(outcome.retention.retention_rate, 0.0);
    }

    #[tokio::test]
    async fn test_aggregate_topics_independently() {
        let as_of = Utc::now();
        let mut topics = BTreeMap::new();
        topics.insert("invoicing".to_string(), invoicing_batch(as_of));
        topics.insert(
            "sparse".to_string(),
            invoicing_batch(as_of).into_iter().take(3).collect(),
        );

        let metrics = pipeline().aggregate_topics(topics, as_of).await;
        assert_eq!(metrics.len(), 2);
        assert!(metrics["sparse"].is_low_confidence());
        assert_eq!(metrics["sparse"].sample_size, 3);

        let invoicing = &metrics["invoicing"];
        assert!(!invoicing.is_low_confidence());
        assert_eq!(invoicing.sample_size, 20);
        assert!(invoicing.momentum_score > 0.0);
    }
}
