//! Trendscope Core - Signal types, configuration and taxonomy matching
//!
//! This crate provides the foundational primitives:
//! - Raw signals observed upstream and the enhanced signals derived from them
//! - A closed source registry with authority weights
//! - Immutable engine configuration loaded from TOML
//! - The taxonomy matcher (pain points, solutions, timing, business value)

pub mod config;
pub mod error;
pub mod signals;
pub mod sources;
pub mod taxonomy;

pub use config::*;
pub use error::*;
pub use signals::*;
pub use sources::*;
pub use taxonomy::*;

/// Credibility assumed when a signal carries none
pub const DEFAULT_CREDIBILITY: f64 = 0.5;

/// Authority assumed for sources missing from the authority table
pub const DEFAULT_AUTHORITY: f64 = 0.5;

/// Neutral point on the [0,1] sentiment scale
pub const NEUTRAL_SENTIMENT: f64 = 0.5;

/// Default character window for intensity modifiers around a pain keyword
pub const DEFAULT_INTENSITY_WINDOW: usize = 50;
