//! Signal source registry
//!
//! Sources are a closed set of known platforms plus an explicit `Other`
//! escape hatch. Authority weights are looked up through [`SourceAuthority`];
//! anything without an entry falls back to [`DEFAULT_AUTHORITY`] instead of
//! silently reading as zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{ConfigError, DEFAULT_AUTHORITY};

/// Platform a signal was observed on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Reddit,
    GitHub,
    HackerNews,
    Twitter,
    ProductHunt,
    StackOverflow,
    News,
    /// Any source name not in the known set (kept lower-cased)
    Other(String),
}

impl Source {
    /// Every named platform. The length is the "total known sources"
    /// denominator for penetration and diversity.
    pub const KNOWN: [Source; 7] = [
        Source::Reddit,
        Source::GitHub,
        Source::HackerNews,
        Source::Twitter,
        Source::ProductHunt,
        Source::StackOverflow,
        Source::News,
    ];

    /// Parse a source name, case-insensitively, with common aliases
    pub fn parse(name: &str) -> Self {
        let normalized = name.trim().to_lowercase();
        match normalized.as_str() {
            "reddit" => Source::Reddit,
            "github" | "gh" => Source::GitHub,
            "hackernews" | "hacker_news" | "hacker-news" | "hn" => Source::HackerNews,
            "twitter" | "x" => Source::Twitter,
            "producthunt" | "product_hunt" | "product-hunt" | "ph" => Source::ProductHunt,
            "stackoverflow" | "stack_overflow" | "stack-overflow" | "so" => Source::StackOverflow,
            "news" => Source::News,
            _ => Source::Other(normalized),
        }
    }

    /// Canonical lower-case name
    pub fn as_str(&self) -> &str {
        match self {
            Source::Reddit => "reddit",
            Source::GitHub => "github",
            Source::HackerNews => "hackernews",
            Source::Twitter => "twitter",
            Source::ProductHunt => "producthunt",
            Source::StackOverflow => "stackoverflow",
            Source::News => "news",
            Source::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Source::Other(_))
    }

    /// Built-in authority for a known platform
    fn base_authority(&self) -> Option<f64> {
        match self {
            Source::GitHub => Some(0.9),
            Source::HackerNews => Some(0.85),
            Source::StackOverflow => Some(0.8),
            Source::ProductHunt => Some(0.75),
            Source::Reddit => Some(0.7),
            Source::News => Some(0.7),
            Source::Twitter => Some(0.6),
            Source::Other(_) => None,
        }
    }
}

impl From<String> for Source {
    fn from(name: String) -> Self {
        Source::parse(&name)
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Source::parse(name)
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        source.as_str().to_string()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authority weight per source, in [0,1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceAuthority {
    weights: BTreeMap<Source, f64>,
}

impl SourceAuthority {
    /// An empty table: every lookup resolves to the default authority
    pub fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    pub fn with(mut self, source: Source, weight: f64) -> Self {
        self.weights.insert(source, weight.clamp(0.0, 1.0));
        self
    }

    /// Authority for a source, or [`DEFAULT_AUTHORITY`] when it has no entry
    pub fn weight(&self, source: &Source) -> f64 {
        self.weights
            .get(source)
            .copied()
            .unwrap_or(DEFAULT_AUTHORITY)
    }

    /// Whether the table carries an explicit entry for the source
    pub fn contains(&self, source: &Source) -> bool {
        self.weights.contains_key(source)
    }

    /// Sources sorted by authority (highest first)
    pub fn by_authority(&self) -> Vec<(&Source, f64)> {
        let mut entries: Vec<_> = self.weights.iter().map(|(s, w)| (s, *w)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for weight in self.weights.values() {
            if !(0.0..=1.0).contains(weight) {
                return Err(ConfigError::OutOfRange {
                    field: "source authority",
                    value: *weight,
                });
            }
        }
        Ok(())
    }
}

impl Default for SourceAuthority {
    fn default() -> Self {
        let weights = Source::KNOWN
            .into_iter()
            .filter_map(|source| source.base_authority().map(|w| (source, w)))
            .collect();
        Self { weights }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Source::parse("HN"), Source::HackerNews);
        assert_eq!(Source::parse(" Reddit "), Source::Reddit);
        assert_eq!(Source::parse("x"), Source::Twitter);
        assert_eq!(
            Source::parse("Lobsters"),
            Source::Other("lobsters".to_string())
        );
    }

    #[test]
    fn test_unknown_source_gets_default_authority() {
        let table = SourceAuthority::default();
        assert_eq!(table.weight(&Source::Other("forum".into())), DEFAULT_AUTHORITY);
        assert!(table.weight(&Source::GitHub) > table.weight(&Source::Twitter));
    }

    #[test]
    fn test_empty_table_falls_back() {
        let table = SourceAuthority::empty();
        assert!(!table.contains(&Source::Reddit));
        assert_eq!(table.weight(&Source::Reddit), DEFAULT_AUTHORITY);
    }

    #[test]
    fn test_serde_roundtrip_as_string() {
        let json = serde_json::to_string(&Source::HackerNews).unwrap();
        assert_eq!(json, "\"hackernews\"");
        let parsed: Source = serde_json::from_str("\"hacker_news\"").unwrap();
        assert_eq!(parsed, Source::HackerNews);
    }

    #[test]
    fn test_by_authority_sorted() {
        let table = SourceAuthority::default();
        let ranked = table.by_authority();
        assert_eq!(*ranked[0].0, Source::GitHub);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
