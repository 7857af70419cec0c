// src/engine/result.rs

//! Snapshot of a finished run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::diagnostic::Diagnostic;
use crate::errors::{Result, StepGraphError};
use crate::graph::CompiledGraph;
use crate::item::{downcast_item, Item, ItemId, MultiItem, SimpleItem};

/// Items, diagnostics and timing of a successful run.
///
/// Only items declared final on the chain can be looked up.
pub struct ChainResult {
    graph: Arc<CompiledGraph>,
    simple: HashMap<ItemId, Arc<dyn Item>>,
    multi: HashMap<ItemId, Vec<Arc<dyn Item>>>,
    diagnostics: Vec<Diagnostic>,
    duration: Duration,
}

impl fmt::Debug for ChainResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainResult")
            .field("simple", &self.simple.keys().collect::<Vec<_>>())
            .field("multi", &self.multi.keys().collect::<Vec<_>>())
            .field("diagnostics", &self.diagnostics)
            .field("duration", &self.duration)
            .finish()
    }
}

impl ChainResult {
    pub(crate) fn new(
        graph: Arc<CompiledGraph>,
        simple: HashMap<ItemId, Arc<dyn Item>>,
        multi: HashMap<ItemId, Vec<Arc<dyn Item>>>,
        diagnostics: Vec<Diagnostic>,
        duration: Duration,
    ) -> Self {
        Self {
            graph,
            simple,
            multi,
            diagnostics,
            duration,
        }
    }

    /// Value of a final simple item.
    pub fn consume<T: SimpleItem>(&self) -> Result<Arc<T>> {
        let id = ItemId::simple::<T>();
        self.lookup_simple(&id)?
            .ok_or(StepGraphError::NoValue(id))
    }

    pub fn consume_named<T: SimpleItem>(&self, qualifier: &str) -> Result<Arc<T>> {
        let id = ItemId::simple_named::<T>(qualifier);
        self.lookup_simple(&id)?
            .ok_or(StepGraphError::NoValue(id))
    }

    /// Value of a final simple item, or `None` if nothing produced it.
    pub fn consume_optional<T: SimpleItem>(&self) -> Result<Option<Arc<T>>> {
        self.lookup_simple(&ItemId::simple::<T>())
    }

    /// Values of a final multi item; empty if nothing was produced.
    pub fn consume_multi<T: MultiItem>(&self) -> Result<Vec<Arc<T>>> {
        self.lookup_multi(&ItemId::multi::<T>())
    }

    pub fn consume_multi_named<T: MultiItem>(&self, qualifier: &str) -> Result<Vec<Arc<T>>> {
        self.lookup_multi(&ItemId::multi_named::<T>(qualifier))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Wall-clock time from run start to the last step finishing.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Best-effort release of resources held by produced items.
    ///
    /// Every stored value is closed once; failures are logged and do not
    /// stop the remaining values from being closed.
    pub fn close_all(&self) {
        let multi_values = self
            .multi
            .iter()
            .flat_map(|(id, values)| values.iter().map(move |v| (id, v)));

        for (id, value) in self.simple.iter().chain(multi_values) {
            match value.close() {
                Ok(()) => debug!(item = %id, "closed item"),
                Err(err) => warn!(item = %id, error = %format!("{err:#}"), "failed to close item"),
            }
        }
    }

    fn check_final(&self, id: &ItemId) -> Result<()> {
        if self.graph.final_ids().contains(id) {
            Ok(())
        } else {
            Err(StepGraphError::UndeclaredItem(id.clone()))
        }
    }

    fn lookup_simple<T: SimpleItem>(&self, id: &ItemId) -> Result<Option<Arc<T>>> {
        self.check_final(id)?;
        Ok(self.simple.get(id).and_then(downcast_item::<T>))
    }

    fn lookup_multi<T: MultiItem>(&self, id: &ItemId) -> Result<Vec<Arc<T>>> {
        self.check_final(id)?;
        Ok(self
            .multi
            .get(id)
            .map(|values| values.iter().filter_map(downcast_item::<T>).collect())
            .unwrap_or_default())
    }
}
