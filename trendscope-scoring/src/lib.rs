//! Trendscope Scoring
//!
//! The pure, synchronous half of the engine:
//! - **Scorer**: turns a raw signal into an enhanced signal
//! - **Filter**: applies retention thresholds and ranks what survives
//! - **Aggregator**: reduces a topic's signals to trend metrics
//! - **Report**: summarises a retained set
//!
//! Nothing here performs I/O or spawns work; see `trendscope-runtime` for
//! the concurrent batch driver.

pub mod aggregator;
pub mod filter;
pub mod report;
pub mod scorer;
pub mod stats;

pub use aggregator::*;
pub use filter::*;
pub use report::*;
pub use scorer::*;
