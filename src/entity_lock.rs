use {
    crate::execution_unit::execution_unit_id,
    parking_lot::{
        RawMutex,
        lock_api::{RawMutex as RawMutexTrait, RawMutexTimed},
    },
    std::{
        fmt::{Debug, Formatter},
        sync::atomic::{AtomicUsize, Ordering::Relaxed},
        time::{Duration, Instant},
    },
};


/// The mutex guarding a single entity ID.
///
/// An `EntityLock` is not re-entrant by itself. Callers check
/// [`is_locked_by_current_thread`](Self::is_locked_by_current_thread) first and skip the
/// acquisition entirely when it returns `true`. There is no hold count: one successful
/// `lock` is undone by one `unlock`.
pub(crate) struct EntityLock {
    // We enforce the following invariant:
    // if owner != 0, then raw_mutex is locked and the execution unit with the id owner
    // locked it.
    raw_mutex: RawMutex,
    // Mutations of this field are protected by the raw_mutex.
    owner: AtomicUsize,
}

impl Default for EntityLock {
    fn default() -> Self {
        Self {
            raw_mutex: RawMutex::INIT,
            owner: AtomicUsize::new(0),
        }
    }
}

impl EntityLock {
    #[inline]
    pub(crate) fn is_locked(&self) -> bool {
        self.raw_mutex.is_locked()
    }

    /// Returns whether the current thread is holding the lock.
    ///
    /// A relaxed load suffices: only the current execution unit ever stores its own ID
    /// into `owner`, so the comparison can only succeed if this thread wrote it.
    #[inline]
    pub(crate) fn is_locked_by_current_thread(&self) -> bool {
        self.owner.load(Relaxed) == execution_unit_id()
    }

    /// Blocks until the current thread owns the lock.
    ///
    /// The current thread must not already own the lock, otherwise it deadlocks on
    /// itself.
    #[inline]
    pub(crate) fn lock(&self) {
        debug_assert!(!self.is_locked_by_current_thread());
        self.raw_mutex.lock();
        self.mark_owned();
    }

    /// Attempts to acquire the lock until the timeout has expired.
    #[inline]
    pub(crate) fn try_lock_for(&self, duration: Duration) -> bool {
        debug_assert!(!self.is_locked_by_current_thread());
        let locked = self.raw_mutex.try_lock_for(duration);
        if locked {
            self.mark_owned();
        }
        locked
    }

    /// Attempts to acquire the lock until the deadline is reached.
    #[inline]
    pub(crate) fn try_lock_until(&self, instant: Instant) -> bool {
        debug_assert!(!self.is_locked_by_current_thread());
        let locked = self.raw_mutex.try_lock_until(instant);
        if locked {
            self.mark_owned();
        }
        locked
    }

    #[inline]
    fn mark_owned(&self) {
        // The mutex has just been locked by this execution unit, so we are allowed to
        // mutate this field and setting it to our ID upholds the invariant.
        self.owner.store(execution_unit_id(), Relaxed);
    }

    /// Releases the lock.
    ///
    /// # Panic
    ///
    /// Panics if the current thread does not own the lock.
    #[inline]
    pub(crate) fn unlock(&self) {
        assert!(
            self.is_locked_by_current_thread(),
            "entity lock is not held by the current thread",
        );
        self.owner.store(0, Relaxed);
        // SAFETY: - We've just checked that owner is the ID of the current execution
        //           unit.
        //         - By the invariant, this means that the current execution unit is
        //           holding the mutex.
        unsafe {
            self.raw_mutex.unlock();
        }
    }

    #[inline]
    pub(crate) fn addr(&self) -> *const u8 {
        let addr: *const Self = self;
        addr.cast()
    }
}

impl Debug for EntityLock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityLock")
            .field("id", &self.addr())
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}
