// src/graph/compiled.rs

//! Immutable result of chain construction.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::Execution;
use crate::item::ItemId;
use crate::step::{Consume, Produce, StepDeclaration};

/// A compiled step: declaration plus its place in the graph.
#[derive(Debug)]
pub struct StepInfo {
    pub(crate) index: usize,
    pub(crate) decl: StepDeclaration,
    /// Number of distinct steps that must finish before this one starts.
    pub(crate) dependencies: usize,
    /// Steps unblocked by this step's completion (by index).
    pub(crate) dependents: Vec<usize>,
    pub(crate) end_step: bool,
    /// Weak declarations that lost to a stronger producer. Values produced
    /// for these identities are discarded.
    pub(crate) superseded: BTreeSet<ItemId>,
}

impl StepInfo {
    pub fn name(&self) -> &str {
        self.decl.name()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies
    }

    pub fn dependents(&self) -> &[usize] {
        &self.dependents
    }

    pub fn is_start_step(&self) -> bool {
        self.dependencies == 0
    }

    pub fn is_end_step(&self) -> bool {
        self.end_step
    }

    pub fn is_superseded(&self, id: &ItemId) -> bool {
        self.superseded.contains(id)
    }

    pub(crate) fn produce_decl(&self, id: &ItemId) -> Option<&Produce> {
        self.decl.produces().get(id)
    }

    pub(crate) fn consume_decl(&self, id: &ItemId) -> Option<&Consume> {
        self.decl.consumes().get(id)
    }
}

/// Validated step graph, reusable across any number of runs.
///
/// Shared between runs as `Arc<CompiledGraph>`; nothing in it changes after
/// [`ChainBuilder::build`](crate::graph::ChainBuilder::build).
#[derive(Debug)]
pub struct CompiledGraph {
    pub(crate) steps: Vec<StepInfo>,
    pub(crate) start_steps: Vec<usize>,
    pub(crate) end_step_count: usize,
    pub(crate) initial: BTreeSet<ItemId>,
    pub(crate) finals: BTreeSet<ItemId>,
    /// Number of distinct identities produced or supplied, used to size
    /// the per-run stores.
    pub(crate) item_count: usize,
    pub(crate) config: EngineConfig,
}

impl CompiledGraph {
    /// Open a new run using the configuration the chain was built with.
    pub fn execution(self: &Arc<Self>) -> Execution {
        Execution::new(Arc::clone(self), self.config.clone())
    }

    /// Open a new run with an explicit configuration.
    pub fn execution_with(self: &Arc<Self>, config: EngineConfig) -> Execution {
        Execution::new(Arc::clone(self), config)
    }

    pub fn steps(&self) -> &[StepInfo] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&StepInfo> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn start_steps(&self) -> impl Iterator<Item = &StepInfo> {
        self.start_steps.iter().map(|&idx| &self.steps[idx])
    }

    pub fn end_step_count(&self) -> usize {
        self.end_step_count
    }

    pub fn initial_ids(&self) -> &BTreeSet<ItemId> {
        &self.initial
    }

    pub fn final_ids(&self) -> &BTreeSet<ItemId> {
        &self.finals
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn item_count(&self) -> usize {
        self.item_count
    }
}
