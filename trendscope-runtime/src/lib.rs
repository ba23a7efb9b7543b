//! Trendscope Runtime
//!
//! Async plumbing around the scoring engine:
//! - **Pipeline**: concurrent, deadline-bounded batch scoring plus per-topic
//!   aggregation
//! - **Sources**: the seam ingestion adapters implement

pub mod pipeline;
pub mod sources;

pub use pipeline::*;
pub use sources::*;
