use {
    parking_lot::Mutex,
    std::{collections::HashMap, fmt::Debug, hash::Hash},
    tracing::debug,
};

#[cfg(test)]
mod tests;

/// The lock order discovered from nested acquisitions.
///
/// An ID receives an order number the first time it takes part in a nested acquisition,
/// either as the entity already held or as the entity being acquired. Numbers come from a
/// single counter starting at 1 and never change once assigned.
///
/// The table is not a topological order of all lock pairs. Two unrelated pairs can end
/// up interleaved such that a later nesting that shares no cycle with either of them is
/// still reported as an inversion.
pub(crate) struct OrderTable<K> {
    inner: Mutex<Inner<K>>,
}

struct Inner<K> {
    orders: HashMap<K, u64>,
    last: u64,
}

impl<K> Default for OrderTable<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                orders: HashMap::new(),
                last: 0,
            }),
        }
    }
}

impl<K> Inner<K>
where
    K: Hash + Eq + Clone + Debug,
{
    fn assign(&mut self, id: &K) -> u64 {
        if let Some(&order) = self.orders.get(id) {
            return order;
        }
        self.last += 1;
        let order = self.last;
        debug!(?id, order, "assigned lock order");
        self.orders.insert(id.clone(), order);
        order
    }

    fn sorted(&self) -> Vec<K> {
        let mut entries: Vec<_> = self.orders.iter().collect();
        entries.sort_unstable_by_key(|(_, order)| **order);
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

impl<K> OrderTable<K>
where
    K: Hash + Eq + Clone + Debug,
{
    /// Checks that acquiring `cur` while holding `held` agrees with the discovered order.
    ///
    /// Assigns an order to `held` and then to `cur` if they have none yet. On an
    /// inversion, returns all tracked IDs sorted by order.
    pub(crate) fn check(&self, held: &K, cur: &K) -> Result<(), Vec<K>> {
        let mut inner = self.inner.lock();
        let held_order = inner.assign(held);
        let cur_order = inner.assign(cur);
        if cur_order < held_order {
            return Err(inner.sorted());
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn order_of(&self, id: &K) -> Option<u64> {
        self.inner.lock().orders.get(id).copied()
    }

    /// Returns all tracked IDs sorted by order.
    pub(crate) fn expected_order(&self) -> Vec<K> {
        self.inner.lock().sorted()
    }
}
