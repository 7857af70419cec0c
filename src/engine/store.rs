// src/engine/store.rs

//! Shared item stores for a single run.
//!
//! - Simple items live in a concurrent map and are written with an atomic
//!   insert-if-absent, so a second value for the same identity is detected
//!   instead of overwriting the first.
//! - Multi items live behind one lock per identity. Sorted item types are
//!   inserted at their position; others are appended.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use crate::item::{downcast_item_ref, Item, ItemId, MultiItem};

type MultiList = Arc<Mutex<Vec<Arc<dyn Item>>>>;

pub(crate) struct ItemStores {
    simple: DashMap<ItemId, Arc<dyn Item>>,
    multi: DashMap<ItemId, MultiList>,
}

impl ItemStores {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            simple: DashMap::with_capacity(capacity),
            multi: DashMap::with_capacity(capacity),
        }
    }

    /// Insert a simple value; returns `false` if the identity already had one.
    pub(crate) fn insert_simple(&self, id: ItemId, value: Arc<dyn Item>) -> bool {
        match self.simple.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub(crate) fn get_simple(&self, id: &ItemId) -> Option<Arc<dyn Item>> {
        self.simple.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Add a value to a multi item, keeping sorted types ordered.
    pub(crate) fn push_multi<T: MultiItem>(&self, id: ItemId, value: Arc<T>) {
        // Clone the list handle out so the map shard is not held while the
        // per-identity lock is taken.
        let list = Arc::clone(self.multi.entry(id).or_default().value());
        let mut values = list.lock();

        if T::SORTED {
            let pos = values.partition_point(|existing| match downcast_item_ref::<T>(existing) {
                Some(existing) => existing.sort_cmp(&value) != std::cmp::Ordering::Greater,
                None => true,
            });
            values.insert(pos, value);
        } else {
            values.push(value);
        }
    }

    /// Copy of the current values of a multi item (empty if none).
    pub(crate) fn snapshot_multi(&self, id: &ItemId) -> Vec<Arc<dyn Item>> {
        let list = match self.multi.get(id) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Vec::new(),
        };
        let values = list.lock();
        values.clone()
    }

    /// Frozen copies of both stores.
    pub(crate) fn freeze(
        &self,
    ) -> (
        HashMap<ItemId, Arc<dyn Item>>,
        HashMap<ItemId, Vec<Arc<dyn Item>>>,
    ) {
        let simple = self
            .simple
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        let multi = self
            .multi
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().lock().clone()))
            .collect();
        (simple, multi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[derive(Debug)]
    struct Score(u32, &'static str);

    impl Item for Score {}

    impl MultiItem for Score {
        const SORTED: bool = true;

        fn sort_cmp(&self, other: &Self) -> Ordering {
            self.0.cmp(&other.0)
        }
    }

    #[derive(Debug)]
    struct Flag;

    impl Item for Flag {}
    impl crate::item::SimpleItem for Flag {}

    fn labels(stores: &ItemStores) -> Vec<&'static str> {
        stores
            .snapshot_multi(&ItemId::multi::<Score>())
            .iter()
            .filter_map(|v| downcast_item_ref::<Score>(v).map(|s| s.1))
            .collect()
    }

    #[test]
    fn sorted_insert_keeps_equal_values_in_arrival_order() {
        let stores = ItemStores::with_capacity(1);
        let id = ItemId::multi::<Score>();
        for score in [Score(3, "c"), Score(1, "a"), Score(3, "d"), Score(2, "b"), Score(1, "a2")] {
            stores.push_multi(id.clone(), Arc::new(score));
        }

        assert_eq!(labels(&stores), vec!["a", "a2", "b", "c", "d"]);
    }

    #[test]
    fn second_simple_value_is_refused() {
        let stores = ItemStores::with_capacity(1);
        let id = ItemId::simple::<Flag>();

        assert!(stores.insert_simple(id.clone(), Arc::new(Flag)));
        assert!(!stores.insert_simple(id.clone(), Arc::new(Flag)));
        assert!(stores.get_simple(&id).is_some());
    }

    #[test]
    fn unknown_multi_item_snapshots_empty() {
        let stores = ItemStores::with_capacity(0);
        assert!(stores.snapshot_multi(&ItemId::multi::<Score>()).is_empty());
        let (simple, multi) = stores.freeze();
        assert!(simple.is_empty() && multi.is_empty());
    }
}
