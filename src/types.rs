use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::sync::{AtomicBool, AtomicUsize};

/// An identifier for a participant of a [crate::TicketLock], [crate::CountingSemaphore] or
/// [crate::WriterPriorityCoordinator].
///
/// Participant ids are assigned from 0 up to, but excluding, the participant count the
/// primitive was constructed with. Two live participants must never share an id.
pub type ParticipantId = usize;

/// A bakery ticket. 0 means the participant is not requesting the lock; any other value orders
/// the participant against everyone else who is.
///
/// Tickets are assumed never to overflow during a run.
pub(crate) type Ticket = usize;

/// The ticket held by a participant which is not interested in the lock.
pub(crate) const NO_TICKET: Ticket = 0;

/// Allocate one independently addressable flag per participant.
pub(crate) fn flag_slots(participants: usize) -> Box<[AtomicBool]> {
    (0..participants)
        .map(|_| AtomicBool::new(false))
        .collect::<Vec<AtomicBool>>()
        .into_boxed_slice()
}

/// Allocate one independently addressable number per participant, all starting at `initial`.
pub(crate) fn number_slots(participants: usize, initial: usize) -> Box<[AtomicUsize]> {
    (0..participants)
        .map(|_| AtomicUsize::new(initial))
        .collect::<Vec<AtomicUsize>>()
        .into_boxed_slice()
}
