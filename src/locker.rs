use {
    crate::{
        entity::Entity,
        error::{Error, Result},
        hold_stack::HoldStacks,
        order::OrderTable,
        registry::Registry,
    },
    debug_fn::debug_fn,
    run_on_drop::on_drop,
    static_assertions::assert_impl_all,
    std::{
        fmt::{Debug, Formatter},
        hash::Hash,
        time::{Duration, Instant},
    },
    tracing::{error, trace},
};


/// Grants each entity ID to at most one thread at a time.
///
/// Entities are locked with [`acquire`](Self::acquire) and friends and unlocked with
/// [`release`](Self::release), which always releases the entity the current thread
/// acquired most recently. Acquisitions and releases must therefore nest like a stack.
///
/// Acquiring an entity that the current thread already holds does nothing. In particular
/// it is not counted: a single `release` fully releases the entity no matter how many
/// redundant acquisitions preceded it.
///
/// # Deadlock detection
///
/// A locker created with [`with_deadlock_detection`](Self::with_deadlock_detection)
/// learns a lock order from nested acquisitions. Whenever a thread acquires an entity
/// while holding another one, both are assigned an order number the first time they
/// meet, and an acquisition that goes against the learned order fails with
/// [`Error::PotentialDeadlock`] instead of blocking.
///
/// Only the most recently acquired entity is compared with the new one. Since order
/// numbers are handed out in the order nested pairs are first seen, unrelated pairs can
/// produce a false positive.
///
/// # Memory
///
/// Locks and order numbers are never removed. The memory used by a locker grows with the
/// number of distinct IDs it has seen.
///
/// # Example
///
/// ```
/// use entity_locker::{Entity, EntityLocker};
///
/// struct User(u32);
///
/// impl Entity for User {
///     type Id = u32;
///
///     fn id(&self) -> &u32 {
///         &self.0
///     }
/// }
///
/// let locker = EntityLocker::new();
/// let user = User(1);
/// locker.acquire(&user).unwrap();
/// // Redundant acquisitions are no-ops.
/// locker.acquire(&user).unwrap();
/// assert!(locker.is_held_by_current_thread(&user));
/// locker.release();
/// assert!(!locker.is_held_by_current_thread(&user));
/// ```
pub struct EntityLocker<K>
where
    K: Send,
{
    registry: Registry<K>,
    stacks: HoldStacks<K>,
    orders: Option<OrderTable<K>>,
}

assert_impl_all!(EntityLocker<u64>: Send, Sync);
assert_impl_all!(EntityLocker<String>: Send, Sync);

#[derive(Copy, Clone)]
enum Wait {
    Block,
    For(Duration),
    Until(Instant),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Acquired {
    AlreadyHeld,
    Locked,
    TimedOut,
}

impl<K> Default for EntityLocker<K>
where
    K: Send,
{
    fn default() -> Self {
        Self {
            registry: Default::default(),
            stacks: Default::default(),
            orders: None,
        }
    }
}

impl<K> EntityLocker<K>
where
    K: Send,
{
    /// Creates a locker without deadlock detection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a locker that rejects acquisitions contradicting the learned lock order.
    ///
    /// # Example
    ///
    /// ```
    /// use entity_locker::{Entity, EntityLocker, Error};
    ///
    /// struct Node(&'static str);
    ///
    /// impl Entity for Node {
    ///     type Id = &'static str;
    ///
    ///     fn id(&self) -> &&'static str {
    ///         &self.0
    ///     }
    /// }
    ///
    /// let locker = EntityLocker::with_deadlock_detection();
    /// let (a, b) = (Node("a"), Node("b"));
    ///
    /// locker.acquire(&a).unwrap();
    /// locker.acquire(&b).unwrap();
    /// locker.release();
    /// locker.release();
    ///
    /// locker.acquire(&b).unwrap();
    /// let err = locker.acquire(&a).unwrap_err();
    /// assert!(matches!(err, Error::PotentialDeadlock { .. }));
    /// assert_eq!(locker.expected_order(), ["a", "b"]);
    /// locker.release();
    /// ```
    pub fn with_deadlock_detection() -> Self {
        Self {
            orders: Some(OrderTable::default()),
            ..Self::default()
        }
    }

    pub fn is_deadlock_detection_enabled(&self) -> bool {
        self.orders.is_some()
    }

    /// Returns the number of entities the current thread holds.
    pub fn held_count(&self) -> usize {
        self.stacks.depth()
    }
}

impl<K> EntityLocker<K>
where
    K: Hash + Eq + Clone + Debug + Send,
{
    /// Blocks until the current thread holds `entity`.
    ///
    /// Returns immediately if the current thread already holds it. In that case nothing
    /// needs to be released for this call.
    ///
    /// # Errors
    ///
    /// With deadlock detection enabled, returns [`Error::PotentialDeadlock`] if acquiring
    /// `entity` while holding the most recently acquired entity contradicts the learned
    /// lock order. Nothing is acquired in that case. The check also applies when the
    /// current thread already holds `entity` further down its stack.
    pub fn acquire<E>(&self, entity: &E) -> Result<(), K>
    where
        E: Entity<Id = K> + ?Sized,
    {
        self.acquire_id(entity.id(), Wait::Block).map(drop)
    }

    /// Attempts to acquire `entity` until the timeout has expired.
    ///
    /// Returns `Ok(true)` without waiting if the current thread already holds `entity`,
    /// and `Ok(false)` if the timeout expired. Nothing needs to be released after
    /// `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Same as [`acquire`](Self::acquire).
    ///
    /// # Example
    ///
    /// ```
    /// use std::{thread, time::Duration};
    /// use entity_locker::{Entity, EntityLocker};
    ///
    /// struct Doc(u8);
    ///
    /// impl Entity for Doc {
    ///     type Id = u8;
    ///
    ///     fn id(&self) -> &u8 {
    ///         &self.0
    ///     }
    /// }
    ///
    /// let locker = EntityLocker::new();
    /// let doc = Doc(3);
    /// locker.acquire(&doc).unwrap();
    /// thread::scope(|s| {
    ///     s.spawn(|| {
    ///         let acquired = locker.try_acquire(&doc, Duration::from_millis(50)).unwrap();
    ///         assert!(!acquired);
    ///     });
    /// });
    /// locker.release();
    /// ```
    pub fn try_acquire<E>(&self, entity: &E, timeout: Duration) -> Result<bool, K>
    where
        E: Entity<Id = K> + ?Sized,
    {
        self.acquire_id(entity.id(), Wait::For(timeout))
            .map(|acquired| acquired != Acquired::TimedOut)
    }

    /// Attempts to acquire `entity` until the deadline is reached.
    ///
    /// Behaves like [`try_acquire`](Self::try_acquire).
    pub fn try_acquire_until<E>(&self, entity: &E, deadline: Instant) -> Result<bool, K>
    where
        E: Entity<Id = K> + ?Sized,
    {
        self.acquire_id(entity.id(), Wait::Until(deadline))
            .map(|acquired| acquired != Acquired::TimedOut)
    }

    /// Releases the entity the current thread acquired most recently.
    ///
    /// # Panic
    ///
    /// Panics if the current thread holds no entity. Use
    /// [`try_release`](Self::try_release) to handle this case.
    pub fn release(&self) {
        if let Err(e) = self.try_release() {
            panic!("{e}");
        }
    }

    /// Releases the entity the current thread acquired most recently and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingHeld`] if the current thread holds no entity.
    pub fn try_release(&self) -> Result<K, K> {
        let held = self.stacks.pop().ok_or(Error::NothingHeld)?;
        held.lock.unlock();
        trace!(id = ?held.id, "released");
        Ok(held.id)
    }

    /// Runs `f` while holding `entity`.
    ///
    /// The entity is released when `f` returns or unwinds, unless the current thread
    /// already held it before this call. `f` must leave the entities it acquires
    /// released.
    ///
    /// # Errors
    ///
    /// Same as [`acquire`](Self::acquire). `f` is not run in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use entity_locker::{Entity, EntityLocker};
    ///
    /// struct Row(i64);
    ///
    /// impl Entity for Row {
    ///     type Id = i64;
    ///
    ///     fn id(&self) -> &i64 {
    ///         &self.0
    ///     }
    /// }
    ///
    /// let locker = EntityLocker::new();
    /// let row = Row(-1);
    /// let n = locker
    ///     .with_lock(&row, || {
    ///         assert!(locker.is_held_by_current_thread(&row));
    ///         5
    ///     })
    ///     .unwrap();
    /// assert_eq!(n, 5);
    /// assert_eq!(locker.held_count(), 0);
    /// ```
    pub fn with_lock<E, T>(&self, entity: &E, f: impl FnOnce() -> T) -> Result<T, K>
    where
        E: Entity<Id = K> + ?Sized,
    {
        let acquired = self.acquire_id(entity.id(), Wait::Block)?;
        let _release = on_drop(|| {
            if acquired == Acquired::Locked {
                self.release();
            }
        });
        Ok(f())
    }

    /// Returns whether the current thread holds `entity`.
    pub fn is_held_by_current_thread<E>(&self, entity: &E) -> bool
    where
        E: Entity<Id = K> + ?Sized,
    {
        self.registry
            .get(entity.id())
            .is_some_and(|lock| lock.is_locked_by_current_thread())
    }

    /// Returns the IDs held by the current thread, least recently acquired first.
    pub fn held_ids(&self) -> Vec<K> {
        self.stacks.held_ids()
    }

    /// Returns every ID that has a lock order, sorted by that order.
    ///
    /// This is empty if deadlock detection is disabled.
    pub fn expected_order(&self) -> Vec<K> {
        self.orders
            .as_ref()
            .map(|orders| orders.expected_order())
            .unwrap_or_default()
    }

    fn acquire_id(&self, id: &K, wait: Wait) -> Result<Acquired, K> {
        let lock = self.registry.resolve(id);
        // Redundant acquisitions are checked too. Re-acquiring the top entity assigns it
        // an order and re-acquiring a buried one is reported like any other inversion.
        self.check_order(id)?;
        if lock.is_locked_by_current_thread() {
            trace!(?id, "already held");
            return Ok(Acquired::AlreadyHeld);
        }
        let locked = match wait {
            Wait::Block => {
                lock.lock();
                true
            }
            Wait::For(duration) => lock.try_lock_for(duration),
            Wait::Until(instant) => lock.try_lock_until(instant),
        };
        if !locked {
            trace!(?id, "timed out");
            return Ok(Acquired::TimedOut);
        }
        trace!(?id, "acquired");
        self.stacks.push(id.clone(), lock);
        Ok(Acquired::Locked)
    }

    /// Runs before the entity lock is touched so that no entity lock is ever taken while
    /// the order table is locked.
    fn check_order(&self, id: &K) -> Result<(), K> {
        let Some(orders) = &self.orders else {
            return Ok(());
        };
        let Some(held) = self.stacks.top() else {
            return Ok(());
        };
        if let Err(expected_order) = orders.check(&held, id) {
            error!(
                entity = ?id,
                ?held,
                "deadlock detected, expected entities lock order: {expected_order:?}"
            );
            return Err(Error::PotentialDeadlock {
                entity: id.clone(),
                held,
                expected_order,
            });
        }
        Ok(())
    }
}

impl<K> Debug for EntityLocker<K>
where
    K: Hash + Eq + Clone + Debug + Send,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityLocker")
            .field("entities", &self.registry.len())
            .field(
                "expected_order",
                &debug_fn(|fmt| match &self.orders {
                    Some(orders) => Debug::fmt(&orders.expected_order(), fmt),
                    None => fmt.write_str("<disabled>"),
                }),
            )
            .finish_non_exhaustive()
    }
}
