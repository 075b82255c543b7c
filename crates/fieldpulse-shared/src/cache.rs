//! Derived-metric cache.
//!
//! Entries are tagged with the date they were computed for, so a cached
//! figure never outlives the "today" it was anchored on. Recording a visit
//! drops the assignment entry and every node above its delegate.
//!
//! Every invalidation bumps a generation counter. Readers capture it before
//! reading the store and hand it back on `put_*`; a value computed across an
//! invalidation is discarded rather than cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use tracing::debug;

use crate::model::{AssignmentId, DelegateId};
use crate::rollup::NodeRollup;
use crate::visit_activity::VisitActivity;

struct Entry<T> {
    computed_for: NaiveDate,
    value: Arc<T>,
}

#[derive(Default)]
pub struct MetricsCache {
    nodes: RwLock<HashMap<DelegateId, Entry<NodeRollup>>>,
    assignments: RwLock<HashMap<AssignmentId, Entry<VisitActivity>>>,
    generation: AtomicU64,
}

fn lookup<K: std::hash::Hash + Eq, T>(
    map: &RwLock<HashMap<K, Entry<T>>>,
    key: &K,
    today: NaiveDate,
) -> Option<Arc<T>> {
    let guard = map.read().ok()?;
    guard
        .get(key)
        .filter(|e| e.computed_for == today)
        .map(|e| Arc::clone(&e.value))
}

fn store<K: std::hash::Hash + Eq, T>(
    map: &RwLock<HashMap<K, Entry<T>>>,
    current: &AtomicU64,
    generation: u64,
    key: K,
    today: NaiveDate,
    value: Arc<T>,
) {
    // Poisoned: leave it empty.
    if let Ok(mut guard) = map.write() {
        // Checked under the write lock: an invalidation that bumps after this
        // point still has to wait for the lock before it removes.
        if current.load(Ordering::SeqCst) != generation {
            debug!(generation, "stale value not cached");
            return;
        }
        guard.insert(
            key,
            Entry {
                computed_for: today,
                value,
            },
        );
    }
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture before reading the store; pass to `put_node`/`put_assignment`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn node(&self, id: DelegateId, today: NaiveDate) -> Option<Arc<NodeRollup>> {
        lookup(&self.nodes, &id, today)
    }

    pub fn put_node(&self, id: DelegateId, today: NaiveDate, generation: u64, rollup: Arc<NodeRollup>) {
        store(&self.nodes, &self.generation, generation, id, today, rollup);
    }

    pub fn assignment(&self, id: AssignmentId, today: NaiveDate) -> Option<Arc<VisitActivity>> {
        lookup(&self.assignments, &id, today)
    }

    pub fn put_assignment(
        &self,
        id: AssignmentId,
        today: NaiveDate,
        generation: u64,
        activity: Arc<VisitActivity>,
    ) {
        store(&self.assignments, &self.generation, generation, id, today, activity);
    }

    /// Drop the assignment's entry and the entries of `nodes` (its delegate and every ancestor).
    pub fn invalidate(&self, assignment: AssignmentId, nodes: &[DelegateId]) {
        // Bump before removing so no put can land after the removal.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.assignments.write() {
            guard.remove(&assignment);
        }
        if let Ok(mut guard) = self.nodes.write() {
            for id in nodes {
                guard.remove(id);
            }
        }
        debug!(assignment, nodes = nodes.len(), "cache invalidated");
    }

    pub fn cached_nodes(&self) -> usize {
        self.nodes.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn cached_assignments(&self) -> usize {
        self.assignments.read().map(|g| g.len()).unwrap_or(0)
    }
}
