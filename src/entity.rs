/// An object that can be locked through an [`EntityLocker`](crate::EntityLocker).
///
/// Two entities with equal IDs share a single lock, whether or not they are the same
/// object. The ID must therefore stay the same for as long as the entity is used with a
/// locker.
///
/// # Example
///
/// ```
/// use entity_locker::Entity;
///
/// struct Account {
///     number: u64,
///     balance: i64,
/// }
///
/// impl Entity for Account {
///     type Id = u64;
///
///     fn id(&self) -> &u64 {
///         &self.number
///     }
/// }
/// ```
pub trait Entity {
    /// The identity of the entity.
    type Id;

    /// Returns the identity of the entity.
    fn id(&self) -> &Self::Id;
}

impl<E> Entity for &E
where
    E: Entity + ?Sized,
{
    type Id = E::Id;

    #[inline]
    fn id(&self) -> &Self::Id {
        (**self).id()
    }
}
