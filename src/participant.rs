use tracing::instrument;

use crate::coordinator::{ReadGuard, WriteGuard, WriterPriorityCoordinator};
use crate::err::{Error, NoParticipantIdAvailableError};
use crate::sync::{Arc, Ordering};
use crate::types::ParticipantId;

/// Reserve the lowest participant id which no live handle holds.
///
/// This is identity bookkeeping for the handles below and runs before a participant takes part
/// in any protocol, so it is free to use a compare-exchange.
fn reserve_participant_id<T>(
    coordinator: &WriterPriorityCoordinator<T>,
) -> Result<ParticipantId, NoParticipantIdAvailableError> {
    for (id, slot) in coordinator.participant_slots.iter().enumerate() {
        let cas_result: Result<bool, bool> =
            slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
        if cas_result.is_ok() {
            return Ok(id);
        }
    }
    Err(NoParticipantIdAvailableError {
        participants: coordinator.participants(),
    })
}

fn free_participant_id<T>(coordinator: &WriterPriorityCoordinator<T>, id: ParticipantId) {
    coordinator.participant_slots[id].store(false, Ordering::Release);
}

/// A participant of a borrowed [WriterPriorityCoordinator] holding a reserved id. The id is
/// freed for the next handle when this one is dropped.
#[derive(Debug)]
pub struct Participant<'a, T> {
    coordinator: &'a WriterPriorityCoordinator<T>,
    id: ParticipantId,
}

impl<'a, T> Participant<'a, T> {
    /// Reserve the lowest free id of `coordinator`.
    pub fn reserve(coordinator: &'a WriterPriorityCoordinator<T>) -> Result<Self, Error> {
        let id: ParticipantId = reserve_participant_id(coordinator)?;
        Ok(Self { coordinator, id })
    }

    /// The id reserved for this handle.
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Enter as a reader until the returned guard is dropped.
    ///
    /// The guard borrows this handle mutably, so the handle cannot be dropped, freeing its id
    /// for someone else, or used to enter a second time while the guard is alive.
    ///
    /// ```compile_fail
    /// use bakery_rw::{Participant, WriterPriorityCoordinator};
    ///
    /// let coordinator = WriterPriorityCoordinator::new(2, 0u32).unwrap();
    /// let mut participant = Participant::reserve(&coordinator).unwrap();
    /// let guard = participant.read();
    /// drop(participant);
    /// assert_eq!(*guard, 0);
    /// ```
    #[instrument(skip(self), fields(id = self.id))]
    pub fn read(&mut self) -> ReadGuard<'_, T> {
        // SAFETY: `id` is reserved for this handle and `&mut self` keeps it from being used
        // again until the guard is dropped
        unsafe { self.coordinator.read(self.id) }
    }

    /// Enter as a writer until the returned guard is dropped.
    ///
    /// ```compile_fail
    /// use bakery_rw::{Participant, WriterPriorityCoordinator};
    ///
    /// let coordinator = WriterPriorityCoordinator::new(2, 0u32).unwrap();
    /// let mut participant = Participant::reserve(&coordinator).unwrap();
    /// let mut first = participant.write();
    /// let mut second = participant.write();
    /// *first += 1;
    /// *second += 1;
    /// ```
    #[instrument(skip(self), fields(id = self.id))]
    pub fn write(&mut self) -> WriteGuard<'_, T> {
        // SAFETY: as in `read`
        unsafe { self.coordinator.write(self.id) }
    }
}

impl<T> Drop for Participant<'_, T> {
    fn drop(&mut self) {
        free_participant_id(self.coordinator, self.id);
    }
}

/// A participant of a shared [WriterPriorityCoordinator] holding a reserved id, for threads
/// which cannot borrow the coordinator. The id is freed when this handle is dropped.
#[derive(Debug)]
pub struct ArcParticipant<T> {
    coordinator: Arc<WriterPriorityCoordinator<T>>,
    id: ParticipantId,
}

impl<T> ArcParticipant<T> {
    /// Reserve the lowest free id of `coordinator`.
    pub fn reserve(coordinator: Arc<WriterPriorityCoordinator<T>>) -> Result<Self, Error> {
        let id: ParticipantId = reserve_participant_id(&*coordinator)?;
        Ok(Self { coordinator, id })
    }

    /// The id reserved for this handle.
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// The coordinator this handle takes part in.
    pub fn coordinator(&self) -> &WriterPriorityCoordinator<T> {
        &*self.coordinator
    }

    /// Enter as a reader until the returned guard is dropped. See [Participant::read].
    #[instrument(skip(self), fields(id = self.id))]
    pub fn read(&mut self) -> ReadGuard<'_, T> {
        // SAFETY: `id` is reserved for this handle and `&mut self` keeps it from being used
        // again until the guard is dropped
        unsafe { self.coordinator.read(self.id) }
    }

    /// Enter as a writer until the returned guard is dropped. See [Participant::write].
    #[instrument(skip(self), fields(id = self.id))]
    pub fn write(&mut self) -> WriteGuard<'_, T> {
        // SAFETY: as in `read`
        unsafe { self.coordinator.write(self.id) }
    }
}

impl<T> Drop for ArcParticipant<T> {
    fn drop(&mut self) {
        free_participant_id(&*self.coordinator, self.id);
    }
}
