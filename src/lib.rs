//! This crate provides [`EntityLocker`], which serializes access to entities by their
//! ID.
//!
//! # Motivation
//!
//! Entities such as database rows or accounts are often represented by many short-lived
//! objects. Two objects with the same ID stand for the same entity and must not be
//! modified concurrently, while objects with different IDs can be modified in parallel.
//! Storing a mutex in each object does not work since the objects do not share it.
//!
//! An [`EntityLocker`] keeps one lock per ID instead. Locks are created the first time
//! an ID is seen:
//!
//! ```
//! use std::thread;
//! use entity_locker::{Entity, EntityLocker};
//!
//! struct Account {
//!     number: u64,
//! }
//!
//! impl Entity for Account {
//!     type Id = u64;
//!
//!     fn id(&self) -> &u64 {
//!         &self.number
//!     }
//! }
//!
//! let locker = EntityLocker::new();
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             // A fresh object, but the same entity.
//!             let account = Account { number: 7 };
//!             locker.acquire(&account).unwrap();
//!             // Only one thread at a time gets here.
//!             locker.release();
//!         });
//!     }
//! });
//! ```
//!
//! # Releasing
//!
//! [`EntityLocker::release`] takes no arguments. It releases the entity the current
//! thread acquired most recently, so nested acquisitions must be released in reverse
//! order. Acquiring an entity that is already held by the current thread is a no-op and
//! must not be paired with a release.
//!
//! # Deadlocks
//!
//! Two threads that acquire the same two entities in opposite order can deadlock.
//! [`EntityLocker::with_deadlock_detection`] creates a locker that learns an order from
//! nested acquisitions and returns [`Error::PotentialDeadlock`] for acquisitions that go
//! against it. The detection is a heuristic and can report acquisitions that could not
//! actually deadlock.

pub use {
    entity::Entity,
    error::{Error, Result},
    locker::EntityLocker,
};

mod entity;
mod entity_lock;
mod error;
mod execution_unit;
mod hold_stack;
mod locker;
mod order;
mod registry;
#[cfg(test)]
mod tests;
