//! Signal sources
//!
//! Ingestion adapters deliver signals for a topic through [`SignalSource`].
//! How a caller picks sources for a topic is up to the caller; the engine
//! only needs the fetch.

use async_trait::async_trait;
use futures::future::join_all;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use trendscope_core::Signal;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can produce signals for a topic
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn fetch(&self, topic: &str) -> Result<Vec<Signal>, SourceError>;
}

/// Whether a signal is about the topic. An empty topic matches everything.
fn mentions(signal: &Signal, topic: &str) -> bool {
    let topic = topic.trim().to_lowercase();
    if topic.is_empty() {
        return true;
    }
    signal.content.to_lowercase().contains(&topic)
        || signal
            .keywords
            .iter()
            .any(|k| k.trim().to_lowercase() == topic)
}

/// Fixed, in-memory signals
pub struct StaticSource {
    name: String,
    signals: Vec<Signal>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, signals: Vec<Signal>) -> Self {
        Self {
            name: name.into(),
            signals,
        }
    }
}

#[async_trait]
impl SignalSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<Signal>, SourceError> {
        Ok(self
            .signals
            .iter()
            .filter(|s| mentions(s, topic))
            .cloned()
            .collect())
    }
}

/// A JSON file holding an array of signals
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
        }
    }

    /// Every signal in the file
    pub async fn load(&self) -> Result<Vec<Signal>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let signals: Vec<Signal> = serde_json::from_str(&content)?;
        debug!("Loaded {} signals from {}", signals.len(), self.name);
        Ok(signals)
    }
}

#[async_trait]
impl SignalSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<Signal>, SourceError> {
        let signals = self.load().await?;
        Ok(signals.into_iter().filter(|s| mentions(s, topic)).collect())
    }
}

/// Fetch from every source concurrently. A failing source is logged and
/// contributes nothing.
pub async fn collect_signals(sources: &[Box<dyn SignalSource>], topic: &str) -> Vec<Signal> {
    let futures: Vec<_> = sources.iter().map(|source| source.fetch(topic)).collect();
    let results = join_all(futures).await;

    let mut signals = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(fetched) => {
                debug!("Source {} returned {} signals", source.name(), fetched.len());
                signals.extend(fetched);
            }
            Err(e) => warn!("Source {} failed: {}", source.name(), e),
        }
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl SignalSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _topic: &str) -> Result<Vec<Signal>, SourceError> {
            Err(SourceError::Unavailable("rate limited".to_string()))
        }
    }

    fn fixtures() -> Vec<Signal> {
        vec![
            Signal::builder("reddit", "Invoicing is a nightmare").build(),
            Signal::builder("hn", "Show HN: a CLI for notes")
                .keywords(["notes"])
                .build(),
        ]
    }

    #[tokio::test]
    async fn test_static_source_filters_by_topic() {
        let source = StaticSource::new("fixtures", fixtures());
        assert_eq!(source.fetch("invoicing").await.unwrap().len(), 1);
        assert_eq!(source.fetch("NOTES").await.unwrap().len(), 1);
        assert_eq!(source.fetch("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_source_is_ignored() {
        let sources: Vec<Box<dyn SignalSource>> = vec![
            Box::new(StaticSource::new("fixtures", fixtures())),
            Box::new(FailingSource),
        ];
        let signals = collect_signals(&sources, "").await;
        assert_eq!(signals.len(), 2);
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let path = std::env::temp_dir().join(format!(
            "trendscope-signals-{}.json",
            std::process::id()
        ));
        let json = r#"[
            {"source": "reddit", "content": "manual invoicing again", "timestamp": "2024-06-01T12:00:00Z", "engagement_score": 12},
            {"source": "github", "content": "new terraform provider"}
        ]"#;
        std::fs::write(&path, json).unwrap();

        let source = JsonFileSource::new(&path);
        let all = source.load().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].engagement_score, 12.0);
        assert!(all[1].timestamp.is_none());
        assert_eq!(source.fetch("invoicing").await.unwrap().len(), 1);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(source.fetch("").await, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!(
            "trendscope-malformed-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{not json").unwrap();
        let result = JsonFileSource::new(&path).load().await;
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }
}
