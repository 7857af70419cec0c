// src/engine/execution.rs

//! One run of a compiled graph.
//!
//! The run protocol:
//! 1. the caller supplies initial items through [`Execution`];
//! 2. [`Execution::run`] submits every start step to the worker pool and
//!    parks the calling thread;
//! 3. each finished step decrements the dependency counter of its
//!    dependents, submitting those that reach zero, and counts down the
//!    completion signal if it is an end step;
//! 4. once the last end step finishes, the caller wakes up, shuts the pool
//!    down and turns the collected diagnostics into a result or a failure.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::context::StepContext;
use crate::engine::diagnostic::{Diagnostic, Diagnostics};
use crate::engine::pool::WorkerPool;
use crate::engine::result::ChainResult;
use crate::engine::signal::CompletionSignal;
use crate::engine::store::ItemStores;
use crate::engine::StepOutcome;
use crate::errors::{Result, RunFailure, StepGraphError};
use crate::graph::{CompiledGraph, StepInfo};
use crate::item::{ItemId, MultiItem, SimpleItem};

/// Per-run state shared by every worker.
pub(crate) struct RunState {
    graph: Arc<CompiledGraph>,
    pub(crate) stores: ItemStores,
    pub(crate) diagnostics: Diagnostics,
    /// Unfinished dependencies per step, indexed like `graph.steps`.
    pending: Vec<AtomicUsize>,
    signal: CompletionSignal,
    executed: AtomicUsize,
    handle: Handle,
}

impl RunState {
    fn schedule(self: &Arc<Self>, idx: usize) {
        let run = Arc::clone(self);
        debug!(step = %self.graph.steps[idx].name(), "step ready; submitting to worker pool");
        // Detached: completion is tracked through the counters, not the handle.
        let _ = self.handle.spawn_blocking(move || run.execute(idx));
    }

    fn execute(self: &Arc<Self>, idx: usize) {
        let graph = Arc::clone(&self.graph);
        let step = &graph.steps[idx];
        // Releases dependents and the end-step count even if anything below panics.
        let _settle = Settle { run: self, step };

        debug!(step = %step.name(), "step started");
        let outcome = self.invoke(idx);

        match outcome {
            StepOutcome::Completed => {
                debug!(step = %step.name(), "step completed");
            }
            StepOutcome::Failed(cause) => {
                let message = describe(&cause);
                self.diagnostics
                    .push(Diagnostic::step_failure(step.name(), cause));
                warn!(step = %step.name(), error = %message, "step failed");
            }
        }
    }

    /// Run the step body, turning errors and panics into an outcome.
    fn invoke(&self, idx: usize) -> StepOutcome {
        let step = &self.graph.steps[idx];
        let ctx = StepContext::new(self, step);
        let body = step.decl.body();

        match panic::catch_unwind(AssertUnwindSafe(|| body(&ctx))) {
            Ok(Ok(())) => StepOutcome::Completed,
            Ok(Err(err)) => StepOutcome::Failed(err),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                StepOutcome::Failed(anyhow::anyhow!("step panicked: {message}"))
            }
        }
    }
}

/// Completion bookkeeping for one step, run on drop.
struct Settle<'a> {
    run: &'a Arc<RunState>,
    step: &'a StepInfo,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let run = self.run;
        run.executed.fetch_add(1, Ordering::AcqRel);

        for &dependent in &self.step.dependents {
            if run.pending[dependent].fetch_sub(1, Ordering::AcqRel) == 1 {
                run.schedule(dependent);
            }
        }

        if self.step.end_step && run.signal.count_down() {
            debug!(step = %self.step.name(), "last end step finished");
        }
    }
}

/// Render a step failure for the log. A failing `Display` impl must not
/// take the worker down with it.
fn describe(cause: &anyhow::Error) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| format!("{cause:#}")))
        .unwrap_or_else(|_| "<error message unavailable>".to_string())
}

/// A single run being prepared: initial items are supplied here before
/// [`Execution::run`] is called.
pub struct Execution {
    graph: Arc<CompiledGraph>,
    config: EngineConfig,
    stores: ItemStores,
    supplied: HashSet<ItemId>,
}

impl Execution {
    pub(crate) fn new(graph: Arc<CompiledGraph>, config: EngineConfig) -> Self {
        let stores = ItemStores::with_capacity(graph.item_count());
        Self {
            graph,
            config,
            stores,
            supplied: HashSet::new(),
        }
    }

    /// Supply the value of an initial simple item.
    pub fn produce<T: SimpleItem>(&mut self, value: T) -> Result<&mut Self> {
        self.produce_simple_id(ItemId::simple::<T>(), value)
    }

    pub fn produce_named<T: SimpleItem>(&mut self, qualifier: &str, value: T) -> Result<&mut Self> {
        self.produce_simple_id(ItemId::simple_named::<T>(qualifier), value)
    }

    /// Supply one value of an initial multi item. May be called repeatedly.
    pub fn produce_multi<T: MultiItem>(&mut self, value: T) -> Result<&mut Self> {
        self.produce_multi_id(ItemId::multi::<T>(), value)
    }

    pub fn produce_multi_named<T: MultiItem>(&mut self, qualifier: &str, value: T) -> Result<&mut Self> {
        self.produce_multi_id(ItemId::multi_named::<T>(qualifier), value)
    }

    fn produce_simple_id<T: SimpleItem>(&mut self, id: ItemId, value: T) -> Result<&mut Self> {
        self.check_initial(&id)?;
        if !self.supplied.insert(id.clone()) || !self.stores.insert_simple(id.clone(), Arc::new(value)) {
            return Err(StepGraphError::DuplicateInitial(id));
        }
        Ok(self)
    }

    fn produce_multi_id<T: MultiItem>(&mut self, id: ItemId, value: T) -> Result<&mut Self> {
        self.check_initial(&id)?;
        self.supplied.insert(id.clone());
        self.stores.push_multi(id, Arc::new(value));
        Ok(self)
    }

    fn check_initial(&self, id: &ItemId) -> Result<()> {
        if self.graph.initial_ids().contains(id) {
            Ok(())
        } else {
            Err(StepGraphError::UndeclaredItem(id.clone()))
        }
    }

    /// Run every step of the graph and block until they have all finished.
    ///
    /// This parks the calling thread; from async code, call it through
    /// `tokio::task::spawn_blocking`.
    pub fn run(self) -> Result<ChainResult> {
        let Execution {
            graph,
            config,
            stores,
            supplied,
        } = self;

        let started = Instant::now();
        info!(
            steps = graph.step_count(),
            end_steps = graph.end_step_count(),
            initial_items = supplied.len(),
            "starting run"
        );

        let pool = WorkerPool::new(&config.pool)?;
        let pending = graph
            .steps()
            .iter()
            .map(|s| AtomicUsize::new(s.dependencies))
            .collect();
        let state = Arc::new(RunState {
            graph: Arc::clone(&graph),
            stores,
            diagnostics: Diagnostics::default(),
            pending,
            signal: CompletionSignal::new(graph.end_step_count()),
            executed: AtomicUsize::new(0),
            handle: pool.handle(),
        });

        for &idx in &graph.start_steps {
            state.schedule(idx);
        }

        state.signal.wait();
        pool.shutdown();

        let elapsed = started.elapsed();
        let executed = state.executed.load(Ordering::Acquire);
        let diagnostics = state.diagnostics.snapshot();

        if let Some(failure) = RunFailure::from_diagnostics(diagnostics.clone()) {
            warn!(
                errors = failure.error_count(),
                elapsed_ms = elapsed.as_millis() as u64,
                "run failed"
            );
            return Err(StepGraphError::Run(failure));
        }

        if executed != graph.step_count() {
            return Err(StepGraphError::Scheduling {
                expected: graph.step_count(),
                executed,
            });
        }

        info!(
            steps = executed,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );

        let (simple, multi) = state.stores.freeze();
        Ok(ChainResult::new(graph, simple, multi, diagnostics, elapsed))
    }
}
