// src/engine/mod.rs

//! Execution engine.
//!
//! This module ties together:
//! - the per-run item stores ([`store`])
//! - the worker pool that runs step bodies ([`pool`])
//! - the completion signal the initiating thread waits on ([`signal`])
//! - the step-facing API ([`context`])
//! - run orchestration and outcome decision ([`execution`])
//! - the snapshot handed back to the caller ([`result`])

/// Outcome of one step body.
#[derive(Debug)]
pub enum StepOutcome {
    Completed,
    Failed(anyhow::Error),
}

pub mod context;
pub mod diagnostic;
pub mod execution;
pub mod pool;
pub mod result;
pub(crate) mod signal;
pub(crate) mod store;

pub use context::StepContext;
pub use diagnostic::{Diagnostic, Severity};
pub use execution::Execution;
pub use pool::WorkerPool;
pub use result::ChainResult;
