// src/step/builder.rs

//! Step declarations and the builder that produces them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::StepContext;
use crate::item::{ItemId, MultiItem, SimpleItem};
use crate::step::decl::{Constraint, Consume, ConsumeFlags, Produce, ProduceFlags};

/// Executable body of a step.
///
/// Bodies are synchronous and may block; they run on a worker thread of the
/// execution's pool. Returning `Err` records an error diagnostic for the
/// step without stopping independent steps.
pub type StepFn = Arc<dyn Fn(&StepContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Canonical step name type.
pub type StepName = String;

/// Accumulates produce/consume declarations for a single step.
///
/// ```
/// use stepgraph::item::{Item, SimpleItem};
/// use stepgraph::step::StepBuilder;
///
/// struct Greeting(String);
/// impl Item for Greeting {}
/// impl SimpleItem for Greeting {}
///
/// let step = StepBuilder::new("greet", |ctx| {
///     ctx.produce(Greeting("hello".into()))?;
///     Ok(())
/// })
/// .produces::<Greeting>()
/// .build();
///
/// assert_eq!(step.name(), "greet");
/// ```
pub struct StepBuilder {
    name: StepName,
    body: StepFn,
    produces: BTreeMap<ItemId, Produce>,
    consumes: BTreeMap<ItemId, Consume>,
}

impl StepBuilder {
    pub fn new<F>(name: impl Into<StepName>, body: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
            produces: BTreeMap::new(),
            consumes: BTreeMap::new(),
        }
    }

    /// Declare a real, required dependency on a simple item.
    pub fn consumes<T: SimpleItem>(self) -> Self {
        self.consumes_id(ItemId::simple::<T>(), Constraint::Real, ConsumeFlags::NONE)
    }

    /// Declare a real dependency on a simple item that may have no producer.
    pub fn consumes_optional<T: SimpleItem>(self) -> Self {
        self.consumes_id(ItemId::simple::<T>(), Constraint::Real, ConsumeFlags::OPTIONAL)
    }

    /// Declare a real dependency on every value of a multi item.
    pub fn consumes_multi<T: MultiItem>(self) -> Self {
        self.consumes_id(ItemId::multi::<T>(), Constraint::Real, ConsumeFlags::NONE)
    }

    /// Run after every producer of `id`, without reading it.
    pub fn after(self, id: ItemId) -> Self {
        self.consumes_id(id, Constraint::OrderOnly, ConsumeFlags::NONE)
    }

    /// General form of a consume declaration.
    pub fn consumes_id(mut self, id: ItemId, constraint: Constraint, flags: ConsumeFlags) -> Self {
        let decl = Consume::new(constraint, flags);
        self.consumes
            .entry(id)
            .and_modify(|existing| *existing = existing.combine(decl))
            .or_insert(decl);
        self
    }

    /// Declare that this step produces a simple item.
    pub fn produces<T: SimpleItem>(self) -> Self {
        self.produces_id(ItemId::simple::<T>(), Constraint::Real, ProduceFlags::NONE)
    }

    /// Declare a default value for a simple item that another step may override.
    pub fn produces_weak<T: SimpleItem>(self) -> Self {
        self.produces_id(ItemId::simple::<T>(), Constraint::Real, ProduceFlags::WEAK)
    }

    /// Declare that this step contributes values to a multi item.
    pub fn produces_multi<T: MultiItem>(self) -> Self {
        self.produces_id(ItemId::multi::<T>(), Constraint::Real, ProduceFlags::NONE)
    }

    /// Run before every consumer of `id`, without producing it.
    pub fn before(self, id: ItemId) -> Self {
        self.produces_id(id, Constraint::OrderOnly, ProduceFlags::NONE)
    }

    /// General form of a produce declaration.
    pub fn produces_id(mut self, id: ItemId, constraint: Constraint, flags: ProduceFlags) -> Self {
        let decl = Produce::new(constraint, flags);
        self.produces
            .entry(id)
            .and_modify(|existing| *existing = existing.combine(decl))
            .or_insert(decl);
        self
    }

    /// Freeze the declarations into an immutable [`StepDeclaration`].
    pub fn build(self) -> StepDeclaration {
        StepDeclaration {
            inner: Arc::new(DeclInner {
                name: self.name,
                body: self.body,
                produces: self.produces,
                consumes: self.consumes,
            }),
        }
    }
}

struct DeclInner {
    name: StepName,
    body: StepFn,
    produces: BTreeMap<ItemId, Produce>,
    consumes: BTreeMap<ItemId, Consume>,
}

/// Immutable, cheaply clonable description of one step.
#[derive(Clone)]
pub struct StepDeclaration {
    inner: Arc<DeclInner>,
}

impl StepDeclaration {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn body(&self) -> &StepFn {
        &self.inner.body
    }

    pub fn produces(&self) -> &BTreeMap<ItemId, Produce> {
        &self.inner.produces
    }

    pub fn consumes(&self) -> &BTreeMap<ItemId, Consume> {
        &self.inner.consumes
    }
}

impl fmt::Debug for StepDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDeclaration")
            .field("name", &self.inner.name)
            .field("produces", &self.inner.produces)
            .field("consumes", &self.inner.consumes)
            .finish_non_exhaustive()
    }
}
