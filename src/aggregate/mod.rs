//! Grouping of resolved holdings into report buckets.
pub mod engine;
pub mod key;

pub use engine::{AggregationEngine, Bucket, Staleness};
pub use key::{AggregationKey, Dimension, UnknownDimension, UNOWNED};
