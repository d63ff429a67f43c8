// src/routing/mod.rs
//! Route discovery and selection over live venue quotes.

pub mod engine;
pub mod graph;
pub mod splitter;

pub use engine::{CandidatePath, RouteEngine};
pub use graph::{PathSegment, SegmentWeights, TokenGraph};
pub use splitter::{SplitAllocation, SplitPlan};
