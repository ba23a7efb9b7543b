//! Taxonomy matching
//!
//! Detects, in lower-cased content:
//! - Pain points: explicit keywords, implicit phrases, and intensity-modified
//!   keywords (a modifier like "really" near an explicit keyword)
//! - Solution indicators, including market-ready phrases
//! - Market timing vocabulary per adoption stage
//! - Business value: enterprise, revenue-potential and scale terms
//!
//! plus the auxiliary pattern sets the scorer and aggregator read (urgency,
//! willingness to pay, market size, competition, technology, industries).
//!
//! Tables are plain data ([`TaxonomySpec`]) compiled once into regexes
//! ([`Taxonomy`]). Matching is a pure function of content and tables, and
//! every occurrence counts: duplicates are not collapsed here.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::{ConfigError, MarketTiming, DEFAULT_INTENSITY_WINDOW};

const EMBEDDED_TAXONOMY: &str = include_str!("../taxonomy/default.toml");

fn default_intensity_window() -> usize {
    DEFAULT_INTENSITY_WINDOW
}

/// Raw taxonomy tables as stored in TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomySpec {
    /// Max character distance between an intensity modifier and a pain keyword
    #[serde(default = "default_intensity_window")]
    pub intensity_window: usize,
    #[serde(default)]
    pub pain_points: PainPointSpec,
    #[serde(default)]
    pub solutions: SolutionSpec,
    #[serde(default)]
    pub market_timing: TimingSpec,
    #[serde(default)]
    pub business_value: BusinessValueSpec,
    #[serde(default)]
    pub urgency: UrgencySpec,
    #[serde(default)]
    pub signals: AuxiliarySpec,
    #[serde(default)]
    pub novelty: NoveltySpec,
    /// Vertical name -> keywords
    #[serde(default)]
    pub industries: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PainPointSpec {
    pub keywords: Vec<String>,
    pub phrases: Vec<String>,
    pub specific_patterns: Vec<String>,
    pub intensity_modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionSpec {
    pub keywords: Vec<String>,
    pub market_ready: Vec<String>,
    pub technical: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSpec {
    pub early: Vec<String>,
    pub growing: Vec<String>,
    pub mature: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessValueSpec {
    pub enterprise: Vec<String>,
    pub revenue: Vec<String>,
    pub scale: Vec<String>,
    pub willingness_to_pay: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencySpec {
    pub urgent_need: Vec<String>,
    pub time_sensitive: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxiliarySpec {
    pub market_size: Vec<String>,
    pub competition: Vec<String>,
    pub technology: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltySpec {
    pub novel: Vec<String>,
    pub established: Vec<String>,
}

/// How a term was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Keyword hit
    Explicit,
    /// Phrase hit
    Implicit,
    /// Explicit pain keyword with an intensity modifier nearby
    Intense,
    /// Solution phrase signalling a shippable product
    MarketReady,
    /// Any other pattern hit
    Pattern,
}

/// A single occurrence of a taxonomy term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermMatch {
    /// The keyword for keyword tables, the matched text for patterns
    pub term: String,
    pub kind: MatchKind,
    /// Character offset of the match in the lower-cased content
    pub offset: usize,
}

impl TermMatch {
    /// Tagged representation, e.g. `intense_frustrated`
    pub fn tag(&self) -> String {
        match self.kind {
            MatchKind::Explicit => format!("explicit_{}", self.term),
            MatchKind::Implicit => format!("implicit_{}", self.term),
            MatchKind::Intense => format!("intense_{}", self.term),
            MatchKind::MarketReady => format!("market_ready_{}", self.term),
            MatchKind::Pattern => self.term.clone(),
        }
    }
}

/// Novelty class of a topic keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordNovelty {
    Novel,
    Established,
    Neutral,
}

/// One compiled table: a label per regex
#[derive(Debug, Clone)]
struct TermSet {
    terms: Vec<(String, Regex)>,
    /// Labels come from the table (keywords) or from the matched text (patterns)
    label_from_match: bool,
}

impl TermSet {
    fn keywords(table: &str, words: &[String]) -> Result<Self, ConfigError> {
        let mut terms = Vec::with_capacity(words.len());
        for word in words {
            let word = word.trim().to_lowercase();
            if word.is_empty() {
                continue;
            }
            let pattern = format!(r"\b{}\b", regex::escape(&word));
            terms.push((word, compile(table, &pattern)?));
        }
        Ok(Self {
            terms,
            label_from_match: false,
        })
    }

    fn patterns(table: &str, patterns: &[String]) -> Result<Self, ConfigError> {
        let mut terms = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            terms.push((pattern.clone(), compile(table, pattern)?));
        }
        Ok(Self {
            terms,
            label_from_match: true,
        })
    }

    fn find(&self, text: &str, kind: MatchKind) -> Vec<TermMatch> {
        let mut found = Vec::new();
        for (label, regex) in &self.terms {
            for m in regex.find_iter(text) {
                let term = if self.label_from_match {
                    m.as_str().trim().to_string()
                } else {
                    label.clone()
                };
                found.push(TermMatch {
                    term,
                    kind,
                    offset: char_offset(text, m.start()),
                });
            }
        }
        found.sort_by_key(|m| m.offset);
        found
    }

    fn count(&self, text: &str) -> usize {
        self.terms
            .iter()
            .map(|(_, regex)| regex.find_iter(text).count())
            .sum()
    }

    fn is_match(&self, text: &str) -> bool {
        self.terms.iter().any(|(_, regex)| regex.is_match(text))
    }

    fn len(&self) -> usize {
        self.terms.len()
    }
}

fn compile(table: &str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::Pattern {
            table: table.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

fn char_offset(text: &str, byte_index: usize) -> usize {
    text[..byte_index].chars().count()
}

/// Compiled, immutable taxonomy. Share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    intensity_window: usize,
    pain_keywords: TermSet,
    pain_phrases: TermSet,
    specific_pain: TermSet,
    intensity_modifiers: TermSet,
    solution_keywords: TermSet,
    market_ready: TermSet,
    technical: TermSet,
    early: TermSet,
    growing: TermSet,
    mature: TermSet,
    enterprise: TermSet,
    revenue: TermSet,
    scale: TermSet,
    willingness_to_pay: TermSet,
    urgent_need: TermSet,
    time_sensitive: TermSet,
    market_size: TermSet,
    competition: TermSet,
    technology: TermSet,
    novel: TermSet,
    established: TermSet,
    industries: BTreeMap<String, TermSet>,
}

impl Taxonomy {
    /// Compile raw tables; fails on the first invalid pattern
    pub fn compile(spec: &TaxonomySpec) -> Result<Self, ConfigError> {
        let mut industries = BTreeMap::new();
        for (name, words) in &spec.industries {
            industries.insert(name.clone(), TermSet::keywords(name, words)?);
        }

        let taxonomy = Self {
            intensity_window: spec.intensity_window,
            pain_keywords: TermSet::keywords("pain_points.keywords", &spec.pain_points.keywords)?,
            pain_phrases: TermSet::patterns("pain_points.phrases", &spec.pain_points.phrases)?,
            specific_pain: TermSet::patterns(
                "pain_points.specific_patterns",
                &spec.pain_points.specific_patterns,
            )?,
            intensity_modifiers: TermSet::keywords(
                "pain_points.intensity_modifiers",
                &spec.pain_points.intensity_modifiers,
            )?,
            solution_keywords: TermSet::keywords("solutions.keywords", &spec.solutions.keywords)?,
            market_ready: TermSet::patterns("solutions.market_ready", &spec.solutions.market_ready)?,
            technical: TermSet::keywords("solutions.technical", &spec.solutions.technical)?,
            early: TermSet::keywords("market_timing.early", &spec.market_timing.early)?,
            growing: TermSet::keywords("market_timing.growing", &spec.market_timing.growing)?,
            mature: TermSet::keywords("market_timing.mature", &spec.market_timing.mature)?,
            enterprise: TermSet::keywords("business_value.enterprise", &spec.business_value.enterprise)?,
            revenue: TermSet::keywords("business_value.revenue", &spec.business_value.revenue)?,
            scale: TermSet::keywords("business_value.scale", &spec.business_value.scale)?,
            willingness_to_pay: TermSet::patterns(
                "business_value.willingness_to_pay",
                &spec.business_value.willingness_to_pay,
            )?,
            urgent_need: TermSet::patterns("urgency.urgent_need", &spec.urgency.urgent_need)?,
            time_sensitive: TermSet::keywords("urgency.time_sensitive", &spec.urgency.time_sensitive)?,
            market_size: TermSet::patterns("signals.market_size", &spec.signals.market_size)?,
            competition: TermSet::patterns("signals.competition", &spec.signals.competition)?,
            technology: TermSet::keywords("signals.technology", &spec.signals.technology)?,
            novel: TermSet::keywords("novelty.novel", &spec.novelty.novel)?,
            established: TermSet::keywords("novelty.established", &spec.novelty.established)?,
            industries,
        };

        debug!(
            "Compiled taxonomy: {} pain keywords, {} solution keywords, {} industries",
            taxonomy.pain_keywords.len(),
            taxonomy.solution_keywords.len(),
            taxonomy.industries.len()
        );

        Ok(taxonomy)
    }

    /// The raw tables bundled with the crate
    pub fn embedded_spec() -> Result<TaxonomySpec, ConfigError> {
        Ok(toml::from_str(EMBEDDED_TAXONOMY)?)
    }

    /// Compile the bundled tables
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::compile(&Self::embedded_spec()?)
    }

    pub fn intensity_window(&self) -> usize {
        self.intensity_window
    }

    /// Vocabulary size of an industry vertical (0 if unknown)
    pub fn industry_vocabulary(&self, industry: &str) -> usize {
        self.industries.get(industry).map_or(0, TermSet::len)
    }

    /// Classify a topic keyword; novel terms win over established ones
    pub fn keyword_novelty(&self, keyword: &str) -> KeywordNovelty {
        let keyword = keyword.to_lowercase();
        if self.novel.is_match(&keyword) {
            KeywordNovelty::Novel
        } else if self.established.is_match(&keyword) {
            KeywordNovelty::Established
        } else {
            KeywordNovelty::Neutral
        }
    }
}

/// Timing vocabulary hits per stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingMatches {
    pub early: Vec<TermMatch>,
    pub growing: Vec<TermMatch>,
    pub mature: Vec<TermMatch>,
}

impl TimingMatches {
    /// Stage with the most hits; "growing" on a tie for the top or no hits
    pub fn classify(&self) -> MarketTiming {
        let counts = [
            (MarketTiming::Early, self.early.len()),
            (MarketTiming::Growing, self.growing.len()),
            (MarketTiming::Mature, self.mature.len()),
        ];
        let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
        if max == 0 {
            return MarketTiming::Growing;
        }
        let mut leaders = counts.iter().filter(|(_, c)| *c == max);
        match (leaders.next(), leaders.next()) {
            (Some((stage, _)), None) => *stage,
            _ => MarketTiming::Growing,
        }
    }

    pub fn total(&self) -> usize {
        self.early.len() + self.growing.len() + self.mature.len()
    }
}

/// Business value hits per sub-category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessMatches {
    pub enterprise: Vec<TermMatch>,
    pub revenue: Vec<TermMatch>,
    pub scale: Vec<TermMatch>,
    /// Willingness-to-pay pattern occurrences
    pub willingness_to_pay: usize,
}

/// Everything the taxonomy found in one piece of content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyMatches {
    /// Explicit, intense and implicit pain hits, in content order
    pub pain_points: Vec<TermMatch>,
    /// Keyword and market-ready hits, in content order
    pub solution_indicators: Vec<TermMatch>,
    pub market_timing: TimingMatches,
    pub business_value: BusinessMatches,
    /// Specific / actionable pain patterns ("takes 3 hours", "costs $200")
    pub specific_pain: usize,
    /// Technical-feasibility keyword hits
    pub technical: Vec<TermMatch>,
    pub urgent_need: usize,
    pub time_sensitive: usize,
    pub market_size: Vec<TermMatch>,
    pub competition: Vec<TermMatch>,
    pub technology: Vec<TermMatch>,
    /// Industry vertical -> keyword hits (only verticals with a hit)
    pub industries: BTreeMap<String, Vec<TermMatch>>,
}

impl TaxonomyMatches {
    pub fn intense_pain_count(&self) -> usize {
        self.pain_points
            .iter()
            .filter(|m| m.kind == MatchKind::Intense)
            .count()
    }

    pub fn market_ready_count(&self) -> usize {
        self.solution_indicators
            .iter()
            .filter(|m| m.kind == MatchKind::MarketReady)
            .count()
    }

    pub fn has_urgency(&self) -> bool {
        self.urgent_need > 0 || self.time_sensitive > 0
    }

    pub fn is_empty(&self) -> bool {
        self.pain_points.is_empty()
            && self.solution_indicators.is_empty()
            && self.market_timing.total() == 0
            && self.business_value.enterprise.is_empty()
            && self.business_value.revenue.is_empty()
            && self.business_value.scale.is_empty()
    }
}

/// Runs a [`Taxonomy`] over content
#[derive(Debug, Clone)]
pub struct TaxonomyMatcher {
    taxonomy: Arc<Taxonomy>,
}

impl TaxonomyMatcher {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Match every table against the content
    pub fn match_content(&self, content: &str) -> TaxonomyMatches {
        let text = content.to_lowercase();
        if text.trim().is_empty() {
            return TaxonomyMatches::default();
        }
        let tax = &self.taxonomy;

        let solution_indicators = merge(
            tax.solution_keywords.find(&text, MatchKind::Explicit),
            tax.market_ready.find(&text, MatchKind::MarketReady),
        );

        let mut industries = BTreeMap::new();
        for (name, set) in &tax.industries {
            let hits = set.find(&text, MatchKind::Explicit);
            if !hits.is_empty() {
                industries.insert(name.clone(), hits);
            }
        }

        TaxonomyMatches {
            pain_points: self.pain_points(&text),
            solution_indicators,
            market_timing: TimingMatches {
                early: tax.early.find(&text, MatchKind::Explicit),
                growing: tax.growing.find(&text, MatchKind::Explicit),
                mature: tax.mature.find(&text, MatchKind::Explicit),
            },
            business_value: BusinessMatches {
                enterprise: tax.enterprise.find(&text, MatchKind::Explicit),
                revenue: tax.revenue.find(&text, MatchKind::Explicit),
                scale: tax.scale.find(&text, MatchKind::Explicit),
                willingness_to_pay: tax.willingness_to_pay.count(&text),
            },
            specific_pain: tax.specific_pain.count(&text),
            technical: tax.technical.find(&text, MatchKind::Explicit),
            urgent_need: tax.urgent_need.count(&text),
            time_sensitive: tax.time_sensitive.count(&text),
            market_size: tax.market_size.find(&text, MatchKind::Pattern),
            competition: tax.competition.find(&text, MatchKind::Pattern),
            technology: tax.technology.find(&text, MatchKind::Explicit),
            industries,
        }
    }

    /// Explicit keyword hits are upgraded to `Intense` when an intensity
    /// modifier starts within the window of the keyword's start
    fn pain_points(&self, text: &str) -> Vec<TermMatch> {
        let window = self.taxonomy.intensity_window;
        let modifiers: Vec<usize> = self
            .taxonomy
            .intensity_modifiers
            .find(text, MatchKind::Pattern)
            .into_iter()
            .map(|m| m.offset)
            .collect();

        let explicit = self
            .taxonomy
            .pain_keywords
            .find(text, MatchKind::Explicit)
            .into_iter()
            .map(|mut hit| {
                if modifiers.iter().any(|&pos| pos.abs_diff(hit.offset) <= window) {
                    hit.kind = MatchKind::Intense;
                }
                hit
            })
            .collect();

        merge(
            explicit,
            self.taxonomy.pain_phrases.find(text, MatchKind::Implicit),
        )
    }
}

fn merge(mut first: Vec<TermMatch>, second: Vec<TermMatch>) -> Vec<TermMatch> {
    first.extend(second);
    first.sort_by_key(|m| m.offset);
    first
}
