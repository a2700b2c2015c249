use alloc::boxed::Box;
use core::fmt::{Debug, Display, Formatter};

use displaydoc::Display;
use tracing::{error, instrument};

use crate::err::Error;
use crate::idle::IdleStrategy;
use crate::semaphore::CountingSemaphore;
use crate::sync::{AtomicUsize, Ordering};
use crate::types::ParticipantId;

/// Which side of the readers-writers protocol a participant is on.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role {
    /// Shares the value with other readers.
    Reader,
    /// Needs the value to itself.
    Writer,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Role::Reader => write!(f, "reader"),
            Role::Writer => write!(f, "writer"),
        }
    }
}

/// An observed state which contradicts the readers-writers guarantees.
#[derive(Debug, Display, Clone, Copy, Eq, PartialEq)]
pub enum Violation {
    /// Reader {participant} entered while {active_writers} writer(s) were inside.
    ReaderOverlapsWriter {
        /// The reader which entered.
        participant: ParticipantId,
        /// Writers inside at that moment.
        active_writers: usize,
    },

    /** Writer {participant} entered its critical section alongside {active_writers} writer(s),
        itself included, and {active_readers} reader(s).
    */
    WriterNotExclusive {
        /// The writer which entered.
        participant: ParticipantId,
        /// Writers inside at that moment.
        active_writers: usize,
        /// Readers inside at that moment.
        active_readers: usize,
    },

    /// Participant {participant} left a {role} critical section it never entered.
    UnmatchedExit {
        /// The participant which left.
        participant: ParticipantId,
        /// The side the participant claimed to be leaving.
        role: Role,
    },
}

/// Receives every [Violation] a [Validator] detects.
///
/// Observers are called from whichever participant detected the violation, after the
/// validator's own guard has been released.
pub trait Observer: Send + Sync {
    /// Called once per detected violation.
    fn on_violation(&self, violation: &Violation);
}

impl<F> Observer for F
where
    F: Fn(&Violation) + Send + Sync,
{
    fn on_violation(&self, violation: &Violation) {
        self(violation)
    }
}

/// Running totals kept by a [Validator].
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Totals {
    /// Read critical sections entered.
    pub reads: usize,
    /// Write critical sections entered.
    pub writes: usize,
    /// The most readers ever inside their critical sections at once.
    pub peak_readers: usize,
    /// The most writers ever inside their critical sections at once. Anything above 1 is a bug.
    pub peak_writers: usize,
    /// Violations reported so far.
    pub violations: usize,
}

/// Counts the readers and writers inside their critical sections and checks the
/// readers-writers invariant every time somebody enters.
///
/// The validator only observes. It reports a violation instead of preventing it and never
/// changes what the coordinator does.
pub struct Validator {
    /// Protects every counter below. The counters are atomics only so that
    /// [Validator::totals] can take a snapshot without a participant id.
    guard: CountingSemaphore,
    active_readers: AtomicUsize,
    active_writers: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    peak_readers: AtomicUsize,
    peak_writers: AtomicUsize,
    violations: AtomicUsize,
    pub(crate) observer: Option<Box<dyn Observer>>,
}

impl Debug for Validator {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Validator")
            .field("active_readers", &self.active_readers)
            .field("active_writers", &self.active_writers)
            .field("totals", &self.totals())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Validator {
    /// Construct a validator which only logs violations.
    pub fn new(participants: usize) -> Result<Self, Error> {
        Self::with_idle(participants, IdleStrategy::default())
    }

    /// Construct a validator whose own guard pauses according to `idle` between polls.
    pub fn with_idle(participants: usize, idle: IdleStrategy) -> Result<Self, Error> {
        Ok(Self {
            guard: CountingSemaphore::with_idle(1, participants, idle)?,
            active_readers: AtomicUsize::new(0),
            active_writers: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            peak_readers: AtomicUsize::new(0),
            peak_writers: AtomicUsize::new(0),
            violations: AtomicUsize::new(0),
            observer: None,
        })
    }

    /// Also hand every violation to `observer`.
    pub fn observed_by<O>(mut self, observer: O) -> Self
    where
        O: Observer + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Record that reader `id` is now inside its critical section.
    #[instrument(skip(self))]
    pub fn on_read_enter(&self, id: ParticipantId) {
        self.guard.wait(id);
        let active_readers: usize = increment(&self.active_readers);
        increment(&self.reads);
        raise_peak(&self.peak_readers, active_readers);

        let active_writers: usize = self.active_writers.load(Ordering::SeqCst);
        let violation: Option<Violation> = (active_writers != 0).then(|| {
            Violation::ReaderOverlapsWriter {
                participant: id,
                active_writers,
            }
        });
        self.count_violation(violation);
        self.guard.signal(id);

        self.report(violation);
    }

    /// Record that reader `id` has left its critical section.
    #[instrument(skip(self))]
    pub fn on_read_exit(&self, id: ParticipantId) {
        self.guard.wait(id);
        let violation: Option<Violation> =
            decrement(&self.active_readers).map(|_| Violation::UnmatchedExit {
                participant: id,
                role: Role::Reader,
            });
        self.count_violation(violation);
        self.guard.signal(id);

        self.report(violation);
    }

    /// Record that writer `id` is now inside its critical section.
    #[instrument(skip(self))]
    pub fn on_write_enter(&self, id: ParticipantId) {
        self.guard.wait(id);
        let active_writers: usize = increment(&self.active_writers);
        increment(&self.writes);
        raise_peak(&self.peak_writers, active_writers);

        let active_readers: usize = self.active_readers.load(Ordering::SeqCst);
        let violation: Option<Violation> = (active_writers != 1 || active_readers != 0).then(|| {
            Violation::WriterNotExclusive {
                participant: id,
                active_writers,
                active_readers,
            }
        });
        self.count_violation(violation);
        self.guard.signal(id);

        self.report(violation);
    }

    /// Record that writer `id` has left its critical section.
    #[instrument(skip(self))]
    pub fn on_write_exit(&self, id: ParticipantId) {
        self.guard.wait(id);
        let violation: Option<Violation> =
            decrement(&self.active_writers).map(|_| Violation::UnmatchedExit {
                participant: id,
                role: Role::Writer,
            });
        self.count_violation(violation);
        self.guard.signal(id);

        self.report(violation);
    }

    /// The readers currently inside their critical sections.
    pub fn active_readers(&self) -> usize {
        self.active_readers.load(Ordering::SeqCst)
    }

    /// The writers currently inside their critical sections.
    pub fn active_writers(&self) -> usize {
        self.active_writers.load(Ordering::SeqCst)
    }

    /// A snapshot of the running totals. Counters are read one by one without the guard, so the
    /// snapshot is only exact once every participant is done.
    pub fn totals(&self) -> Totals {
        Totals {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            peak_readers: self.peak_readers.load(Ordering::SeqCst),
            peak_writers: self.peak_writers.load(Ordering::SeqCst),
            violations: self.violations.load(Ordering::SeqCst),
        }
    }

    /// Must be called with the guard held.
    fn count_violation(&self, violation: Option<Violation>) {
        if violation.is_some() {
            increment(&self.violations);
        }
    }

    fn report(&self, violation: Option<Violation>) {
        if let Some(violation) = violation {
            error!("{violation}");
            if let Some(observer) = &self.observer {
                observer.on_violation(&violation);
            }
        }
    }
}

// The helpers below are only called with the validator's guard held, so a plain load followed by
// a plain store cannot lose an update.

fn increment(counter: &AtomicUsize) -> usize {
    let value: usize = counter.load(Ordering::SeqCst) + 1;
    counter.store(value, Ordering::SeqCst);
    value
}

/// Decrement `counter`, or leave it at zero and return `Some(())` if there was nothing to
/// decrement.
fn decrement(counter: &AtomicUsize) -> Option<()> {
    match counter.load(Ordering::SeqCst) {
        0 => Some(()),
        value => {
            counter.store(value - 1, Ordering::SeqCst);
            None
        }
    }
}

fn raise_peak(peak: &AtomicUsize, value: usize) {
    if value > peak.load(Ordering::SeqCst) {
        peak.store(value, Ordering::SeqCst);
    }
}

#[cfg(all(test, feature = "std", not(feature = "shuttle"), not(loom)))]
mod tests {
    use crate::validator::{Role, Totals, Validator, Violation};
    use std::sync::{Arc, Mutex};
    use test_log::test;

    fn recording_validator(participants: usize) -> (Validator, Arc<Mutex<Vec<Violation>>>) {
        let seen: Arc<Mutex<Vec<Violation>>> = Arc::new(Mutex::new(Vec::new()));
        let sink: Arc<Mutex<Vec<Violation>>> = seen.clone();
        let validator: Validator = Validator::new(participants)
            .unwrap()
            .observed_by(move |violation: &Violation| sink.lock().unwrap().push(*violation));
        (validator, seen)
    }

    #[test]
    fn test_concurrent_readers_are_fine() {
        let (validator, seen) = recording_validator(3);
        validator.on_read_enter(0);
        validator.on_read_enter(1);
        validator.on_read_enter(2);
        assert_eq!(validator.active_readers(), 3);
        validator.on_read_exit(1);
        validator.on_read_exit(0);
        validator.on_read_exit(2);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(
            validator.totals(),
            Totals { reads: 3, writes: 0, peak_readers: 3, peak_writers: 0, violations: 0 }
        );
    }

    #[test]
    fn test_reader_alongside_writer_is_reported() {
        let (validator, seen) = recording_validator(2);
        validator.on_write_enter(0);
        validator.on_read_enter(1);

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[Violation::ReaderOverlapsWriter { participant: 1, active_writers: 1 }]
        );
        assert_eq!(validator.totals().violations, 1);
    }

    #[test]
    fn test_second_writer_is_reported() {
        let (validator, seen) = recording_validator(3);
        validator.on_read_enter(2);
        validator.on_read_exit(2);
        validator.on_write_enter(0);
        validator.on_write_enter(1);

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[Violation::WriterNotExclusive {
                participant: 1,
                active_writers: 2,
                active_readers: 0,
            }]
        );
        assert_eq!(validator.totals().peak_writers, 2);
    }

    #[test]
    fn test_unmatched_exit_is_reported_and_does_not_underflow() {
        let (validator, seen) = recording_validator(1);
        validator.on_write_exit(0);
        validator.on_read_exit(0);

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[
                Violation::UnmatchedExit { participant: 0, role: Role::Writer },
                Violation::UnmatchedExit { participant: 0, role: Role::Reader },
            ]
        );
        assert_eq!(validator.active_readers(), 0);
        assert_eq!(validator.active_writers(), 0);
    }

    #[test]
    fn test_violations_display_their_doc_comments() {
        let violation: Violation = Violation::UnmatchedExit { participant: 4, role: Role::Writer };
        assert_eq!(
            violation.to_string(),
            "Participant 4 left a writer critical section it never entered."
        );

        let violation: Violation =
            Violation::ReaderOverlapsWriter { participant: 2, active_writers: 1 };
        assert_eq!(violation.to_string(), "Reader 2 entered while 1 writer(s) were inside.");
    }
}
