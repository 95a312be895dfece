use {
    crate::entity_lock::EntityLock,
    parking_lot::RwLock,
    std::{collections::HashMap, hash::Hash, sync::Arc},
};

#[cfg(test)]
mod tests;

/// Maps entity IDs to their locks.
///
/// The registry is append-only: a lock is created the first time its ID is resolved and
/// lives as long as the registry. Memory therefore grows with the number of distinct IDs
/// ever seen.
pub(crate) struct Registry<K> {
    locks: RwLock<HashMap<K, Arc<EntityLock>>>,
}

impl<K> Default for Registry<K> {
    fn default() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }
}

impl<K> Registry<K>
where
    K: Hash + Eq + Clone,
{
    /// Returns the lock of `id`, creating it if necessary.
    ///
    /// Concurrent callers resolving the same unseen ID all receive the same lock.
    pub(crate) fn resolve(&self, id: &K) -> Arc<EntityLock> {
        if let Some(lock) = self.locks.read().get(id) {
            return lock.clone();
        }
        self.resolve_slow(id)
    }

    #[cold]
    fn resolve_slow(&self, id: &K) -> Arc<EntityLock> {
        // Another thread might have inserted the lock between dropping the read guard and
        // taking the write guard. `entry` re-checks under the write guard.
        let mut locks = self.locks.write();
        locks.entry(id.clone()).or_default().clone()
    }

    /// Returns the lock of `id` without creating it.
    pub(crate) fn get(&self, id: &K) -> Option<Arc<EntityLock>> {
        self.locks.read().get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.locks.read().len()
    }
}
