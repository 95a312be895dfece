use std::fmt::Debug;

/// Errors returned by [`EntityLocker`](crate::EntityLocker).
#[derive(Debug, thiserror::Error)]
pub enum Error<K>
where
    K: Debug,
{
    /// Acquiring `entity` while holding `held` contradicts the lock order discovered so
    /// far and could take part in a circular wait.
    ///
    /// Nothing was acquired. `expected_order` lists every tracked ID sorted by its
    /// discovered order; acquiring nested entities in that order avoids the fault.
    #[error("deadlock detected, expected entities lock order: {expected_order:?}")]
    PotentialDeadlock {
        entity: K,
        held: K,
        expected_order: Vec<K>,
    },
    /// A release was requested while the current thread holds no entity.
    #[error("release called while the current thread holds no entity")]
    NothingHeld,
}

pub type Result<T, K> = std::result::Result<T, Error<K>>;
