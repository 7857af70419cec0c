// src/lib.rs

//! Typed producer/consumer step scheduler.
//!
//! Steps declare the items they consume and produce. A [`ChainBuilder`]
//! checks those declarations (one producer per simple item, no missing
//! producers, no cycles), derives the dependency graph and compiles it
//! into a reusable [`CompiledGraph`]. Each run executes every step on a
//! worker pool as soon as its producers have finished, and returns a
//! [`ChainResult`] holding the final items.
//!
//! ```
//! use stepgraph::item::{Item, ItemId, SimpleItem};
//! use stepgraph::step::StepBuilder;
//! use stepgraph::ChainBuilder;
//!
//! struct Source(u32);
//! impl Item for Source {}
//! impl SimpleItem for Source {}
//!
//! struct Doubled(u32);
//! impl Item for Doubled {}
//! impl SimpleItem for Doubled {}
//!
//! # fn main() -> stepgraph::errors::Result<()> {
//! let mut chain = ChainBuilder::new();
//! chain
//!     .add_step(
//!         StepBuilder::new("source", |ctx| Ok(ctx.produce(Source(21))?))
//!             .produces::<Source>()
//!             .build(),
//!     )
//!     .add_step(
//!         StepBuilder::new("double", |ctx| {
//!             let source = ctx.consume::<Source>()?;
//!             ctx.produce(Doubled(source.0 * 2))?;
//!             Ok(())
//!         })
//!         .consumes::<Source>()
//!         .produces::<Doubled>()
//!         .build(),
//!     )
//!     .add_final(ItemId::simple::<Doubled>());
//!
//! let graph = chain.build()?;
//! let result = graph.execution().run()?;
//! assert_eq!(result.consume::<Doubled>()?.0, 42);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod item;
pub mod logging;
pub mod step;

pub use engine::{ChainResult, Diagnostic, Execution, Severity, StepContext};
pub use errors::{BuildProblem, Result, RunFailure, StepGraphError};
pub use graph::{ChainBuilder, CompiledGraph};
pub use item::{Item, ItemId, MultiItem, SimpleItem};
pub use step::{Constraint, ConsumeFlags, ProduceFlags, StepBuilder, StepDeclaration, StepProvider};
