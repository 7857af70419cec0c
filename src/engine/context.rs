// src/engine/context.rs

//! Handle through which a running step reads and writes items.

use std::sync::Arc;

use tracing::debug;

use crate::engine::diagnostic::{Diagnostic, Severity};
use crate::engine::execution::RunState;
use crate::errors::{Result, StepGraphError};
use crate::graph::StepInfo;
use crate::item::{downcast_item, Item, ItemId, MultiItem, SimpleItem};

/// Per-step, per-run view of the execution.
///
/// A step may only read items it declared as real consumes and only write
/// items it declared as real produces; anything else is reported as an
/// error rather than silently accepted.
pub struct StepContext<'a> {
    run: &'a RunState,
    step: &'a StepInfo,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(run: &'a RunState, step: &'a StepInfo) -> Self {
        Self { run, step }
    }

    pub fn step_name(&self) -> &str {
        self.step.name()
    }

    /// Value of a required simple item.
    pub fn consume<T: SimpleItem>(&self) -> Result<Arc<T>> {
        self.consume_id(ItemId::simple::<T>())
    }

    pub fn consume_named<T: SimpleItem>(&self, qualifier: &str) -> Result<Arc<T>> {
        self.consume_id(ItemId::simple_named::<T>(qualifier))
    }

    /// Value of a simple item, or `None` if nothing produced it.
    pub fn consume_optional<T: SimpleItem>(&self) -> Result<Option<Arc<T>>> {
        self.lookup_simple(ItemId::simple::<T>())
    }

    pub fn consume_optional_named<T: SimpleItem>(&self, qualifier: &str) -> Result<Option<Arc<T>>> {
        self.lookup_simple(ItemId::simple_named::<T>(qualifier))
    }

    /// Snapshot of every value of a multi item produced so far.
    pub fn consume_multi<T: MultiItem>(&self) -> Result<Vec<Arc<T>>> {
        self.consume_multi_id(ItemId::multi::<T>())
    }

    pub fn consume_multi_named<T: MultiItem>(&self, qualifier: &str) -> Result<Vec<Arc<T>>> {
        self.consume_multi_id(ItemId::multi_named::<T>(qualifier))
    }

    /// Publish the value of a simple item. Each identity takes one value
    /// per run.
    pub fn produce<T: SimpleItem>(&self, value: T) -> Result<()> {
        self.produce_simple_id(ItemId::simple::<T>(), Arc::new(value))
    }

    pub fn produce_named<T: SimpleItem>(&self, qualifier: &str, value: T) -> Result<()> {
        self.produce_simple_id(ItemId::simple_named::<T>(qualifier), Arc::new(value))
    }

    /// Add a value to a multi item.
    pub fn produce_multi<T: MultiItem>(&self, value: T) -> Result<()> {
        self.produce_multi_id(ItemId::multi::<T>(), value)
    }

    pub fn produce_multi_named<T: MultiItem>(&self, qualifier: &str, value: T) -> Result<()> {
        self.produce_multi_id(ItemId::multi_named::<T>(qualifier), value)
    }

    /// Record an informational diagnostic.
    pub fn note(&self, message: impl Into<String>) {
        self.diagnostic(Severity::Info, message.into());
    }

    /// Record a warning; warnings never fail the run.
    pub fn warn(&self, message: impl Into<String>) {
        self.diagnostic(Severity::Warn, message.into());
    }

    /// Record an error. The step keeps running, but the run will fail.
    pub fn error(&self, message: impl Into<String>) {
        self.diagnostic(Severity::Error, message.into());
    }

    fn diagnostic(&self, severity: Severity, message: String) {
        self.run
            .diagnostics
            .push(Diagnostic::new(severity, message).with_step(self.step.name()));
    }

    fn consume_id<T: SimpleItem>(&self, id: ItemId) -> Result<Arc<T>> {
        match self.lookup_simple(id.clone())? {
            Some(value) => Ok(value),
            None => Err(StepGraphError::MissingValue {
                step: self.step.name().to_string(),
                item: id,
            }),
        }
    }

    fn lookup_simple<T: SimpleItem>(&self, id: ItemId) -> Result<Option<Arc<T>>> {
        self.check_consume(&id)?;
        Ok(self
            .run
            .stores
            .get_simple(&id)
            .and_then(|value| downcast_item::<T>(&value)))
    }

    fn consume_multi_id<T: MultiItem>(&self, id: ItemId) -> Result<Vec<Arc<T>>> {
        self.check_consume(&id)?;
        Ok(self
            .run
            .stores
            .snapshot_multi(&id)
            .iter()
            .filter_map(downcast_item::<T>)
            .collect())
    }

    fn produce_simple_id(&self, id: ItemId, value: Arc<dyn Item>) -> Result<()> {
        if !self.check_produce(&id)? {
            return Ok(());
        }
        if self.run.stores.insert_simple(id.clone(), value) {
            debug!(step = %self.step.name(), item = %id, "item produced");
            Ok(())
        } else {
            Err(StepGraphError::AlreadyProduced {
                step: self.step.name().to_string(),
                item: id,
            })
        }
    }

    fn produce_multi_id<T: MultiItem>(&self, id: ItemId, value: T) -> Result<()> {
        if !self.check_produce(&id)? {
            return Ok(());
        }
        debug!(step = %self.step.name(), item = %id, "multi item value produced");
        self.run.stores.push_multi(id, Arc::new(value));
        Ok(())
    }

    fn check_consume(&self, id: &ItemId) -> Result<()> {
        match self.step.consume_decl(id) {
            Some(decl) if decl.is_real() => Ok(()),
            _ => Err(StepGraphError::UndeclaredConsume {
                step: self.step.name().to_string(),
                item: id.clone(),
            }),
        }
    }

    /// `Ok(false)` means the declaration was superseded and the value must
    /// be dropped.
    fn check_produce(&self, id: &ItemId) -> Result<bool> {
        match self.step.produce_decl(id) {
            Some(decl) if decl.is_real() => {
                if self.step.is_superseded(id) {
                    debug!(
                        step = %self.step.name(),
                        item = %id,
                        "weak producer superseded; discarding value"
                    );
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
            _ => Err(StepGraphError::UndeclaredProduce {
                step: self.step.name().to_string(),
                item: id.clone(),
            }),
        }
    }
}
