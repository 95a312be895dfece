
/// Returns the ID of the current execution unit.
///
/// The returned ID is never 0, so 0 is used as the "not owned" marker of an
/// [`EntityLock`](crate::entity_lock::EntityLock).
///
/// At any time, an execution unit is either active or inactive. It is active if there is
/// a thread such that this function returns the ID of the execution unit and inactive
/// otherwise.
///
/// If there are two threads such that this function returns the same ID in both threads,
/// then the termination of one of the threads happens before the start of the other
/// thread.
///
/// # Informal explanation
///
/// An execution unit is morally a single thread except that it might span across multiple
/// threads that are connected by a happens-before relationship.
///
/// The owner record of an entity lock holds this ID. If a thread terminates while still
/// holding entities, a later thread that re-uses its thread-local storage inherits the
/// ownership and can release them. That is the same situation as a single thread that
/// never released, so no special case is needed.
#[inline(always)]
pub(crate) fn execution_unit_id() -> usize {
    thread_local!(static EXECUTION_UNIT_ID: u8 = const { 0 });
    EXECUTION_UNIT_ID.with(|id| {
        let id: *const u8 = id;
        id as usize
    })
}
