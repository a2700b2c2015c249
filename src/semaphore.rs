use tracing::{instrument, trace};

use crate::bakery::TicketLock;
use crate::err::Error;
use crate::idle::IdleStrategy;
use crate::sync::{AtomicUsize, Ordering};
use crate::types::ParticipantId;

/// A counting semaphore whose count is protected by a [TicketLock].
///
/// [CountingSemaphore::wait] never holds the lock while it waits for the count to become
/// positive: it takes the lock, looks, and either decrements and leaves or gives the lock back
/// and idles before looking again.
#[derive(Debug)]
pub struct CountingSemaphore {
    /// Only read and written while `guard` is held, except by [CountingSemaphore::available].
    count: AtomicUsize,
    guard: TicketLock,
    idle: IdleStrategy,
}

impl CountingSemaphore {
    /// Construct a semaphore holding `initial` permits, usable by `participants` participants.
    pub fn new(initial: isize, participants: usize) -> Result<Self, Error> {
        Self::with_idle(initial, participants, IdleStrategy::default())
    }

    /// Construct a semaphore which pauses according to `idle` between polls, both inside its
    /// lock and while waiting for a permit.
    pub fn with_idle(
        initial: isize,
        participants: usize,
        idle: IdleStrategy,
    ) -> Result<Self, Error> {
        let initial: usize =
            usize::try_from(initial).map_err(|_| Error::NegativeInitialCount(initial))?;
        Ok(Self {
            count: AtomicUsize::new(initial),
            guard: TicketLock::with_idle(participants, idle)?,
            idle,
        })
    }

    /// The number of participants this semaphore was sized for.
    pub fn participants(&self) -> usize {
        self.guard.participants()
    }

    /// Block until a permit is available, then take it.
    #[instrument(skip(self))]
    pub fn wait(&self, id: ParticipantId) {
        while !self.try_wait(id) {
            self.idle.idle();
        }
    }

    /// Take a permit if one is available right now. Returns whether a permit was taken.
    pub fn try_wait(&self, id: ParticipantId) -> bool {
        let _guard = self.guard.lock(id);
        let count: usize = self.count.load(Ordering::SeqCst);
        if count == 0 {
            return false;
        }
        self.count.store(count - 1, Ordering::SeqCst);
        trace!("participant {id} took a permit, {} left", count - 1);
        true
    }

    /// Return a permit. Never waits for the count, only for the internal lock.
    #[instrument(skip(self))]
    pub fn signal(&self, id: ParticipantId) {
        let _guard = self.guard.lock(id);
        let count: usize = self.count.load(Ordering::SeqCst);
        self.count.store(count + 1, Ordering::SeqCst);
        trace!("participant {id} returned a permit, {} available", count + 1);
    }

    /// A snapshot of the number of available permits. It may already be stale when it returns.
    pub fn available(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[cfg(all(test, feature = "std", not(feature = "shuttle"), not(loom)))]
mod tests {
    use crate::err::Error;
    use crate::semaphore::CountingSemaphore;
    use crate::sync::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;
    use test_log::test;

    #[test]
    fn test_construction_is_validated() {
        assert_eq!(
            CountingSemaphore::new(-1, 2).unwrap_err(),
            Error::NegativeInitialCount(-1)
        );
        assert_eq!(
            CountingSemaphore::new(1, 0).unwrap_err(),
            Error::InvalidParticipantCount(0)
        );
        let semaphore: CountingSemaphore = CountingSemaphore::new(0, 2).unwrap();
        assert_eq!(semaphore.available(), 0);
        assert_eq!(semaphore.participants(), 2);
    }

    #[test]
    fn test_count_tracks_net_signals() {
        let semaphore: CountingSemaphore = CountingSemaphore::new(2, 1).unwrap();
        for _ in 0..3 {
            semaphore.signal(0);
        }
        semaphore.wait(0);
        assert_eq!(semaphore.available(), 4);
    }

    #[test]
    fn test_try_wait_does_not_go_below_zero() {
        let semaphore: CountingSemaphore = CountingSemaphore::new(1, 1).unwrap();
        assert!(semaphore.try_wait(0));
        assert!(!semaphore.try_wait(0));
        assert_eq!(semaphore.available(), 0);
    }

    #[test]
    fn test_second_wait_returns_only_after_signal() {
        let semaphore: CountingSemaphore = CountingSemaphore::new(1, 2).unwrap();
        let second_returned: AtomicBool = AtomicBool::new(false);

        semaphore.wait(0);
        thread::scope(|scope| {
            scope.spawn(|| {
                semaphore.wait(1);
                second_returned.store(true, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!second_returned.load(Ordering::SeqCst));
            semaphore.signal(0);
        });

        assert!(second_returned.load(Ordering::SeqCst));
        assert_eq!(semaphore.available(), 0);
    }
}
