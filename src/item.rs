// src/item.rs

//! Item identities and the traits that item types implement.
//!
//! An item is a typed value that flows from the step producing it to the
//! steps consuming it. Every item type is either:
//! - a [`SimpleItem`]: at most one value per run, or
//! - a [`MultiItem`]: any number of values per run, collected into a list.
//!
//! An [`ItemId`] names one such slot: the item type plus an optional
//! qualifier, so that the same type can be used for several independent
//! values (e.g. `Path` qualified as `"input"` and `"output"`).

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Whether an item type holds one value or a collection per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Simple,
    Multi,
}

/// Type-erasure helper implemented for every `Send + Sync` type.
///
/// Item values live in the stores as `Arc<dyn Item>` and are recovered as
/// their concrete type through this trait.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Base trait of every item type.
pub trait Item: AsAny {
    /// Release external resources held by this value.
    ///
    /// Called by [`ChainResult::close_all`](crate::engine::ChainResult::close_all).
    /// Failures are logged, never propagated.
    fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// An item type with at most one value per run.
pub trait SimpleItem: Item {}

/// An item type whose values accumulate into a list.
///
/// If `SORTED` is `true`, values are kept ordered by [`MultiItem::sort_cmp`]
/// regardless of which producer finished first. Equal values keep their
/// insertion order.
pub trait MultiItem: Item {
    const SORTED: bool = false;

    fn sort_cmp(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }
}

/// Identity of an item slot: type plus optional qualifier.
#[derive(Clone)]
pub struct ItemId {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<Arc<str>>,
    kind: ItemKind,
}

impl ItemId {
    /// Unqualified identity of a simple item type.
    pub fn simple<T: SimpleItem>() -> Self {
        Self::new::<T>(ItemKind::Simple, None)
    }

    /// Qualified identity of a simple item type.
    pub fn simple_named<T: SimpleItem>(qualifier: impl AsRef<str>) -> Self {
        Self::new::<T>(ItemKind::Simple, Some(Arc::from(qualifier.as_ref())))
    }

    /// Unqualified identity of a multi item type.
    pub fn multi<T: MultiItem>() -> Self {
        Self::new::<T>(ItemKind::Multi, None)
    }

    /// Qualified identity of a multi item type.
    pub fn multi_named<T: MultiItem>(qualifier: impl AsRef<str>) -> Self {
        Self::new::<T>(ItemKind::Multi, Some(Arc::from(qualifier.as_ref())))
    }

    fn new<T: Item>(kind: ItemKind, qualifier: Option<Arc<str>>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: short_type_name(std::any::type_name::<T>()),
            qualifier,
            kind,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_multi(&self) -> bool {
        self.kind == ItemKind::Multi
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

/// Strip the module path, keeping generic arguments readable.
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

impl PartialEq for ItemId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for ItemId {}

impl Hash for ItemId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by display name so that reports and graph dumps are stable.
impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name
            .cmp(other.type_name)
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| self.type_id.cmp(&other.type_id))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}({})", self.type_name, q),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({self})")
    }
}

/// Recover a concrete value from the store representation.
pub(crate) fn downcast_item<T: Item>(value: &Arc<dyn Item>) -> Option<Arc<T>> {
    Arc::clone(value).into_any_arc().downcast::<T>().ok()
}

/// Borrowing variant of [`downcast_item`].
///
/// Dereferences to `dyn Item` first so the call dispatches through the item's
/// vtable rather than resolving `as_any` on the `Arc` itself.
pub(crate) fn downcast_item_ref<T: Item>(value: &Arc<dyn Item>) -> Option<&T> {
    let item: &dyn Item = &**value;
    item.as_any().downcast_ref::<T>()
}
