//! CategoryCache - last known state per category
//!
//! Written by operator `update_*` commands, read when a snapshot is
//! requested. No invalidation: a slot keeps its value until overwritten.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::CacheCategory;
use serde_json::Value;

/// Shared last-known-state store
#[derive(Debug, Default)]
pub struct CategoryCache {
    slots: Mutex<BTreeMap<CacheCategory, Value>>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a slot, returning the previous value
    pub fn update(&self, category: CacheCategory, payload: Value) -> Option<Value> {
        self.slots().insert(category, payload)
    }

    pub fn get(&self, category: CacheCategory) -> Option<Value> {
        self.slots().get(&category).cloned()
    }

    /// Every slot in emission order, `None` for slots never written
    pub fn snapshot(&self) -> Vec<(CacheCategory, Option<Value>)> {
        let slots = self.slots();
        CacheCategory::ALL
            .iter()
            .map(|category| (*category, slots.get(category).cloned()))
            .collect()
    }

    fn slots(&self) -> MutexGuard<'_, BTreeMap<CacheCategory, Value>> {
        // A poisoned lock still holds a usable map
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
