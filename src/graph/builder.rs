// src/graph/builder.rs

//! Chain builder: collects step declarations and compiles them.

use std::collections::BTreeSet;
use std::sync::Arc;

use petgraph::Direction;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::errors::{BuildProblem, Result, StepGraphError};
use crate::graph::compiled::{CompiledGraph, StepInfo};
use crate::graph::validate::{
    check_consumers, check_cycles, check_unique_names, derive_edges, required_steps,
    resolve_producers,
};
use crate::item::ItemId;
use crate::step::{StepDeclaration, StepProvider};

/// Accumulates steps plus initial and final items, then validates and
/// compiles them into a [`CompiledGraph`].
///
/// Problems found at any stage (including failing providers) are collected
/// and reported together by [`ChainBuilder::build`].
#[derive(Debug, Default)]
pub struct ChainBuilder {
    steps: Vec<StepDeclaration>,
    initial: BTreeSet<ItemId>,
    finals: BTreeSet<ItemId>,
    problems: Vec<BuildProblem>,
    only_required: bool,
    config: EngineConfig,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn add_step(&mut self, step: StepDeclaration) -> &mut Self {
        debug!(step = %step.name(), "step added to chain");
        self.steps.push(step);
        self
    }

    /// Let a provider install its steps.
    pub fn add_provider(&mut self, provider: &dyn StepProvider) -> &mut Self {
        if let Err(err) = provider.install(self) {
            warn!(error = %format!("{err:#}"), "step provider failed");
            self.problems.push(BuildProblem::Provider {
                message: format!("{err:#}"),
            });
        }
        self
    }

    /// Declare an item that the caller supplies before each run.
    ///
    /// No step may produce a simple initial item.
    pub fn add_initial(&mut self, id: ItemId) -> &mut Self {
        self.initial.insert(id);
        self
    }

    /// Declare an item the caller reads from the result.
    pub fn add_final(&mut self, id: ItemId) -> &mut Self {
        self.finals.insert(id);
        self
    }

    /// Keep only steps that contribute to a final item. Off by default.
    pub fn include_only_required(&mut self, enabled: bool) -> &mut Self {
        self.only_required = enabled;
        self
    }

    /// Validate the declarations and compile the graph.
    pub fn build(&self) -> Result<Arc<CompiledGraph>> {
        let steps = &self.steps;
        let mut problems = self.problems.clone();

        check_unique_names(steps, &mut problems);
        let producers = resolve_producers(steps, &self.initial, &mut problems);

        let included: BTreeSet<usize> = if self.only_required {
            required_steps(steps, &self.finals, &producers)
        } else {
            (0..steps.len()).collect()
        };

        check_consumers(
            steps,
            &included,
            &self.initial,
            &self.finals,
            &producers,
            &mut problems,
        );

        let edges = derive_edges(steps, &included, &producers);
        check_cycles(steps, &edges, &mut problems);

        if !problems.is_empty() {
            warn!(problems = problems.len(), "chain build failed");
            return Err(StepGraphError::Build(problems));
        }

        // Re-index the included steps densely.
        let order: Vec<usize> = included.iter().copied().collect();
        let position = |original: usize| order.binary_search(&original).ok();

        // Steps that directly produce a final item are waited on even if
        // other steps depend on them.
        let final_producers: BTreeSet<usize> = self
            .finals
            .iter()
            .flat_map(|id| {
                producers
                    .producers_of(id)
                    .iter()
                    .copied()
                    .filter(move |&idx| steps[idx].produces().get(id).is_some_and(|p| p.is_real()))
            })
            .filter(|idx| included.contains(idx))
            .collect();

        let mut infos = Vec::with_capacity(order.len());
        for (new_idx, &original) in order.iter().enumerate() {
            let dependents: Vec<usize> = edges
                .neighbors_directed(original, Direction::Outgoing)
                .filter_map(position)
                .collect();
            let dependencies = edges
                .neighbors_directed(original, Direction::Incoming)
                .count();
            let end_step = dependents.is_empty() || final_producers.contains(&original);

            infos.push(StepInfo {
                index: new_idx,
                decl: steps[original].clone(),
                dependencies,
                dependents,
                end_step,
                superseded: producers
                    .superseded
                    .get(&original)
                    .cloned()
                    .unwrap_or_default(),
            });
        }

        let start_steps: Vec<usize> = infos
            .iter()
            .filter(|s| s.dependencies == 0)
            .map(|s| s.index)
            .collect();
        let end_step_count = infos.iter().filter(|s| s.end_step).count();
        let item_count = producers.effective.len() + self.initial.len();

        let graph = CompiledGraph {
            steps: infos,
            start_steps,
            end_step_count,
            initial: self.initial.clone(),
            finals: self.finals.clone(),
            item_count,
            config: self.config.clone(),
        };

        info!(
            steps = graph.step_count(),
            excluded = steps.len() - graph.step_count(),
            start_steps = graph.start_steps.len(),
            end_steps = graph.end_step_count,
            "chain built"
        );

        if let Some(path) = &self.config.graph.output {
            graph.write_dot(path)?;
        }

        Ok(Arc::new(graph))
    }
}
