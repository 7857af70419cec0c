// src/step/mod.rs

//! Step declarations.
//!
//! - [`decl`] holds the produce/consume declaration model and its merge rules.
//! - [`builder`] turns chained declarations plus a body into an immutable
//!   [`StepDeclaration`].
//! - [`provider`] lets a collaborator install a group of steps at once.

pub mod builder;
pub mod decl;
pub mod provider;

pub use builder::{StepBuilder, StepDeclaration, StepFn, StepName};
pub use decl::{Constraint, Consume, ConsumeFlags, Produce, ProduceFlags};
pub use provider::StepProvider;
