//! In-memory storage backend.
//!
//! Thread-safe reference implementation of [`SubscriptionStore`] plus the
//! authoring-side writes. Candidates are returned in primary-key order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use crate::error::{NotifyResult, ValidationError};
use crate::event::EventTypeId;
use crate::scope::PipelineType;
use crate::storage::traits::{StorageError, SubscriptionStore};
use crate::subscription::{Subscription, SubscriptionId, ViewId};

type CandidateKey = (PipelineType, EventTypeId);

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn key_of(sub: &Subscription) -> CandidateKey {
    (sub.pipeline_type, sub.event_type)
}

#[derive(Debug, Default)]
struct SubscriptionState {
    by_id: BTreeMap<SubscriptionId, Subscription>,
    by_key: HashMap<CandidateKey, BTreeSet<SubscriptionId>>,
}

impl SubscriptionState {
    fn index(&mut self, sub: &Subscription) {
        self.by_key.entry(key_of(sub)).or_default().insert(sub.id);
    }

    fn unindex(&mut self, sub: &Subscription) {
        let key = key_of(sub);
        if let Some(ids) = self.by_key.get_mut(&key) {
            ids.remove(&sub.id);
            if ids.is_empty() {
                self.by_key.remove(&key);
            }
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let old = self.by_id.remove(&id)?;
        self.unindex(&old);
        Some(old)
    }
}

/// Thread-safe in-memory subscription store.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    state: RwLock<SubscriptionState>,
}

impl InMemorySubscriptionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new subscription.
    ///
    /// # Errors
    /// - `EmptyScope`: the subscription binds no scope field
    /// - `DuplicateKey`: the id already exists
    pub fn insert(&self, sub: Subscription) -> NotifyResult<()> {
        if sub.scope.is_unbound() {
            return Err(ValidationError::EmptyScope.into());
        }
        let mut state = self.state.write().map_err(|_| lock_err("subscription.insert"))?;
        if state.by_id.contains_key(&sub.id) {
            return Err(StorageError::DuplicateKey(sub.id.to_string()).into());
        }
        state.index(&sub);
        state.by_id.insert(sub.id, sub);
        Ok(())
    }

    /// Insert every subscription, stopping at the first failure.
    ///
    /// Returns the number inserted.
    ///
    /// # Errors
    /// The first error from [`Self::insert`]; earlier subscriptions stay stored.
    pub fn insert_all(&self, subs: impl IntoIterator<Item = Subscription>) -> NotifyResult<usize> {
        let mut count = 0;
        for sub in subs {
            self.insert(sub)?;
            count += 1;
        }
        Ok(count)
    }

    /// Replace an existing subscription, moving it between candidate keys if needed.
    ///
    /// # Errors
    /// - `EmptyScope`: the subscription binds no scope field
    /// - `SubscriptionNotFound`: no subscription has this id
    /// - `BackendError`: the store lock is poisoned
    pub fn update(&self, sub: Subscription) -> NotifyResult<()> {
        if sub.scope.is_unbound() {
            return Err(ValidationError::EmptyScope.into());
        }
        let mut state = self.state.write().map_err(|_| lock_err("subscription.update"))?;
        if state.remove(sub.id).is_none() {
            return Err(StorageError::SubscriptionNotFound(sub.id).into());
        }
        state.index(&sub);
        state.by_id.insert(sub.id, sub);
        Ok(())
    }

    /// Delete a subscription by id, returning it.
    ///
    /// # Errors
    /// `SubscriptionNotFound` for an unknown id, `BackendError` on a poisoned lock.
    pub fn delete(&self, id: SubscriptionId) -> Result<Subscription, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("subscription.delete"))?;
        state.remove(id).ok_or(StorageError::SubscriptionNotFound(id))
    }

    /// Get a subscription by id.
    ///
    /// # Errors
    /// `BackendError` if the store lock is poisoned.
    pub fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("subscription.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    /// All subscriptions authored in one view.
    ///
    /// # Errors
    /// `BackendError` if the store lock is poisoned.
    pub fn find_by_view_id(&self, view_id: ViewId) -> Result<Vec<Subscription>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("subscription.find_by_view_id"))?;
        Ok(state
            .by_id
            .values()
            .filter(|s| s.view_id == view_id)
            .cloned()
            .collect())
    }

    /// Delete every subscription of a view, returning how many were removed.
    ///
    /// # Errors
    /// `BackendError` if the store lock is poisoned.
    pub fn delete_by_view_id(&self, view_id: ViewId) -> Result<usize, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("subscription.delete_by_view_id"))?;
        let ids: Vec<SubscriptionId> = state
            .by_id
            .values()
            .filter(|s| s.view_id == view_id)
            .map(|s| s.id)
            .collect();
        for id in &ids {
            state.remove(*id);
        }
        Ok(ids.len())
    }

    /// Subscriptions whose channel configuration references `config_id` of kind `dest`.
    ///
    /// Subscriptions with undecodable configuration are skipped.
    ///
    /// # Errors
    /// `BackendError` if the store lock is poisoned.
    pub fn find_by_channel(&self, config_id: u64, dest: &str) -> Result<Vec<Subscription>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("subscription.find_by_channel"))?;
        Ok(state
            .by_id
            .values()
            .filter(|s| s.references_channel(config_id, dest))
            .cloned()
            .collect())
    }

    /// Number of stored subscriptions.
    ///
    /// # Errors
    /// `BackendError` if the store lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("subscription.len"))?;
        Ok(state.by_id.len())
    }

    /// True when the store holds no subscription.
    ///
    /// # Errors
    /// `BackendError` if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.len().map(|n| n == 0)
    }
}

impl SubscriptionStore for InMemorySubscriptionStore {
    fn list_subscriptions(
        &self,
        pipeline_type: PipelineType,
        event_type: EventTypeId,
    ) -> Result<Vec<Subscription>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("subscription.list"))?;
        let Some(ids) = state.by_key.get(&(pipeline_type, event_type)) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect())
    }
}
