use {
    crate::entity_lock::EntityLock,
    std::{cell::RefCell, sync::Arc},
    thread_local::ThreadLocal,
};


/// An entity held by a thread.
pub(crate) struct Held<K> {
    pub(crate) id: K,
    pub(crate) lock: Arc<EntityLock>,
}

/// The hold stacks of all threads, most recently acquired entity last.
///
/// Every method operates on the stack of the calling thread only, so no stack is ever
/// read or written by another thread and none of them needs a lock. Each locker has its
/// own set of stacks.
///
/// A stack persists after it has been emptied. When a thread exits, its stack is handed
/// to the next thread that re-uses its slot. That thread inherits whatever the exited
/// thread did not release, just like it inherits the lock ownership of its
/// [execution unit](crate::execution_unit::execution_unit_id).
pub(crate) struct HoldStacks<K>
where
    K: Send,
{
    stacks: ThreadLocal<RefCell<Vec<Held<K>>>>,
}

impl<K> Default for HoldStacks<K>
where
    K: Send,
{
    fn default() -> Self {
        Self {
            stacks: ThreadLocal::new(),
        }
    }
}

impl<K> HoldStacks<K>
where
    K: Send,
{
    #[inline]
    fn with_current<T>(&self, f: impl FnOnce(&mut Vec<Held<K>>) -> T) -> T {
        f(&mut self.stacks.get_or_default().borrow_mut())
    }

    pub(crate) fn push(&self, id: K, lock: Arc<EntityLock>) {
        self.with_current(|stack| stack.push(Held { id, lock }))
    }

    pub(crate) fn pop(&self) -> Option<Held<K>> {
        self.with_current(|stack| stack.pop())
    }

    pub(crate) fn top(&self) -> Option<K>
    where
        K: Clone,
    {
        self.with_current(|stack| stack.last().map(|held| held.id.clone()))
    }

    pub(crate) fn depth(&self) -> usize {
        self.with_current(|stack| stack.len())
    }

    /// Returns the IDs held by the calling thread, oldest first.
    pub(crate) fn held_ids(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.with_current(|stack| stack.iter().map(|held| held.id.clone()).collect())
    }
}
