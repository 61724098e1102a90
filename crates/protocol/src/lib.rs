//! Wire types for rtcswarm.
//!
//! This crate contains the serde-serializable shapes that cross the boundary
//! between an instrumented browser tab and the metrics engine, and between the
//! engine and whoever reads its aggregated stats.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with the wire**: Field names match what the in-page instrumentation emits
//! - **Stable**: Changes only when the sample schema or snapshot shape changes

pub mod sample;
pub mod snapshot;

pub use sample::*;
pub use snapshot::*;
