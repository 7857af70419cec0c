// src/graph/mod.rs

//! Chain construction and the compiled step graph.
//!
//! - [`builder`] collects declarations and runs the build passes.
//! - [`validate`] holds those passes: producer resolution, consumer checks,
//!   edge derivation and cycle detection.
//! - [`compiled`] is the immutable graph shared by every run.
//! - [`dot`] renders a compiled graph for inspection.

pub mod builder;
pub mod compiled;
pub mod dot;
pub(crate) mod validate;

pub use builder::ChainBuilder;
pub use compiled::{CompiledGraph, StepInfo};
