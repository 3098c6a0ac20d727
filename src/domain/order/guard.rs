use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::model::OrderKey;

// ============================================================================
// Duplicate-Submission Guard
// ============================================================================
//
// Per-order state for discontinue attempts:
// - absent:       no attempt in flight, a new one may start
// - Pending:      command handed to the store, outcome not yet observed
// - Acknowledged: store accepted it, held until a refresh shows the order
//                 active again
//
// Failure removes the entry so the provider can retry by hand. Entries are
// keyed by variant and uuid; a drug order and a test order may share a uuid.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Pending,
    Acknowledged,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionGuard {
    entries: Arc<Mutex<HashMap<OrderKey, GuardState>>>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for a new attempt. Returns false if one is already held.
    pub async fn try_engage(&self, key: &OrderKey) -> bool {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return false;
        }
        entries.insert(key.clone(), GuardState::Pending);
        true
    }

    pub async fn acknowledge(&self, key: &OrderKey) {
        let mut entries = self.entries.lock().await;
        if let Some(state) = entries.get_mut(key) {
            *state = GuardState::Acknowledged;
        }
    }

    pub async fn release(&self, key: &OrderKey) {
        self.entries.lock().await.remove(key);
    }

    pub async fn state(&self, key: &OrderKey) -> Option<GuardState> {
        self.entries.lock().await.get(key).copied()
    }

    /// Drop acknowledged entries for which `active_again` holds.
    /// Pending entries survive; their outcome is still on its way.
    pub async fn clear_acknowledged<F>(&self, mut active_again: F) -> usize
    where
        F: FnMut(&OrderKey) -> bool,
    {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, state| *state == GuardState::Pending || !active_again(key));
        before - entries.len()
    }
}
