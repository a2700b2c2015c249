use alloc::boxed::Box;

use tracing::{instrument, trace};

use crate::err::{check_participants, Error};
use crate::idle::IdleStrategy;
use crate::sync::{AtomicBool, AtomicUsize, Ordering};
use crate::types::{flag_slots, number_slots, ParticipantId, Ticket, NO_TICKET};

/// Lamport's bakery lock: mutual exclusion among a fixed set of participants, built only from
/// shared per-participant slots and busy-waiting.
///
/// Every participant draws a ticket one higher than the highest ticket currently held, then
/// waits for every participant holding a smaller ticket to finish. Equal tickets are ordered by
/// participant id, lower first.
///
/// The slots are only ever read and written with sequentially consistent loads and stores. The
/// algorithm relies on a participant's write to its own `choosing` flag becoming visible before
/// it reads everybody else's tickets, so weaker orderings are not enough.
///
/// The lock is not re-entrant: a participant which calls [TicketLock::acquire] twice without
/// releasing in between waits on itself forever.
#[derive(Debug)]
pub struct TicketLock {
    /// `choosing[i]` is true while participant `i` is computing its ticket.
    choosing: Box<[AtomicBool]>,

    /// `tickets[i]` is participant `i`'s current ticket, or [NO_TICKET] if it is not
    /// requesting the lock.
    tickets: Box<[AtomicUsize]>,

    /// What to do between two polls of another participant's slots.
    idle: IdleStrategy,
}

impl TicketLock {
    /// Construct a lock for `participants` participants with ids `0..participants`.
    pub fn new(participants: usize) -> Result<Self, Error> {
        Self::with_idle(participants, IdleStrategy::default())
    }

    /// Construct a lock which pauses according to `idle` between polls.
    pub fn with_idle(participants: usize, idle: IdleStrategy) -> Result<Self, Error> {
        let participants: usize = check_participants(participants)?;
        Ok(Self {
            choosing: flag_slots(participants),
            tickets: number_slots(participants, NO_TICKET),
            idle,
        })
    }

    /// The number of participants this lock was sized for.
    pub fn participants(&self) -> usize {
        self.tickets.len()
    }

    /// Block until participant `id` holds the lock.
    ///
    /// `id` must be below [TicketLock::participants] and must not be in use by any other live
    /// participant. An out-of-range id panics; a shared id breaks mutual exclusion.
    #[instrument(skip(self))]
    pub fn acquire(&self, id: ParticipantId) {
        let ticket: Ticket = self.draw_ticket(id);
        trace!("participant {id} drew ticket {ticket}");

        for other in 0..self.participants() {
            if other == id {
                continue;
            }
            // `other` may be about to publish a smaller ticket than ours
            while self.choosing[other].load(Ordering::SeqCst) {
                self.idle.idle();
            }
            loop {
                let other_ticket: Ticket = self.tickets[other].load(Ordering::SeqCst);
                if !goes_first(other_ticket, other, ticket, id) {
                    break;
                }
                self.idle.idle();
            }
        }
        trace!("participant {id} holds the lock with ticket {ticket}");
    }

    /// Let the next waiting participant in. Only the participant which holds the lock may
    /// release it.
    #[instrument(skip(self))]
    pub fn release(&self, id: ParticipantId) {
        self.tickets[id].store(NO_TICKET, Ordering::SeqCst);
    }

    /// Acquire the lock and release it again when the returned guard is dropped.
    pub fn lock(&self, id: ParticipantId) -> TicketLockGuard<'_> {
        self.acquire(id);
        TicketLockGuard { lock: self, id }
    }

    /// Announce that participant `id` is choosing, publish `1 + max(tickets)` as its ticket,
    /// and stop choosing.
    fn draw_ticket(&self, id: ParticipantId) -> Ticket {
        self.choosing[id].store(true, Ordering::SeqCst);

        let highest: Ticket = self
            .tickets
            .iter()
            .map(|ticket| ticket.load(Ordering::SeqCst))
            .max()
            .unwrap_or(NO_TICKET);
        let ticket: Ticket = highest + 1;
        self.tickets[id].store(ticket, Ordering::SeqCst);

        self.choosing[id].store(false, Ordering::SeqCst);
        ticket
    }
}

/// Whether participant `other`, holding `other_ticket`, must be served before participant `id`
/// holding `ticket`.
fn goes_first(
    other_ticket: Ticket,
    other: ParticipantId,
    ticket: Ticket,
    id: ParticipantId,
) -> bool {
    other_ticket != NO_TICKET && (other_ticket, other) < (ticket, id)
}

/// Holds a [TicketLock] on behalf of one participant until dropped.
#[derive(Debug)]
pub struct TicketLockGuard<'a> {
    lock: &'a TicketLock,
    id: ParticipantId,
}

impl TicketLockGuard<'_> {
    /// The participant holding the lock.
    pub fn id(&self) -> ParticipantId {
        self.id
    }
}

impl Drop for TicketLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(self.id);
    }
}
