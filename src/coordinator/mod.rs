use alloc::boxed::Box;
use core::cell::UnsafeCell;
use core::fmt::{Debug, Formatter};

use tracing::{instrument, trace, warn};

use crate::err::{check_participants, Error};
use crate::idle::IdleStrategy;
use crate::semaphore::CountingSemaphore;
use crate::sync::{AtomicBool, AtomicUsize, Ordering};
use crate::types::{flag_slots, ParticipantId};
use crate::validator::{Observer, Validator};

pub use guard::{ReadGuard, WriteGuard};

mod guard;

/// Readers-writers coordination with priority for writers, built from four
/// [CountingSemaphore]s and owning the value it protects.
///
/// Any number of readers may be inside their critical sections together; a writer is always
/// alone. As soon as one writer has started [WriterPriorityCoordinator::enter_write], readers
/// which have not yet made it through [WriterPriorityCoordinator::enter_read] are held at the
/// reader gate until the last queued writer has left, even if they arrived first.
///
/// Every participant needs an id in `0..participants`, either assigned by the caller or
/// reserved through [crate::Participant] / [crate::ArcParticipant]. Every enter must be
/// followed by the matching exit: there is no timeout, and a reader which never leaves wedges
/// all writers, while a writer which never leaves wedges everyone.
pub struct WriterPriorityCoordinator<T> {
    /// Held by the active writer, or on behalf of all active readers by the first of them.
    resource: CountingSemaphore,
    /// Closed by the first waiting writer and reopened by the last one to leave.
    reader_gate: CountingSemaphore,
    read_count_guard: CountingSemaphore,
    write_count_guard: CountingSemaphore,

    /// Readers past the reader gate. Only touched while `read_count_guard` is held.
    read_count: AtomicUsize,
    /// Writers that have started entering and not yet left. Only touched while
    /// `write_count_guard` is held.
    write_count: AtomicUsize,

    validator: Option<Validator>,

    /// Indicates whether a particular [ParticipantId] is currently reserved by a handle.
    pub(crate) participant_slots: Box<[AtomicBool]>,

    value: UnsafeCell<T>,
}

// SAFETY: readers only get `&T` while no writer is inside, and a writer only gets `&mut T` while
// nobody else is inside, so sharing the coordinator is as safe as sharing a `RwLock<T>`.
unsafe impl<T: Send + Sync> Sync for WriterPriorityCoordinator<T> {}

impl<T> Debug for WriterPriorityCoordinator<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WriterPriorityCoordinator")
            .field("participants", &self.participants())
            .field("readers_in_flight", &self.readers_in_flight())
            .field("writers_in_flight", &self.writers_in_flight())
            .field("reader_gate_closed", &self.is_reader_gate_closed())
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl<T> WriterPriorityCoordinator<T> {
    /// Construct a coordinator for `participants` participants protecting `value`, without a
    /// validator. See [CoordinatorBuilder] for the other options.
    pub fn new(participants: usize, value: T) -> Result<Self, Error> {
        CoordinatorBuilder::new(participants).build(value)
    }

    /// The number of participants this coordinator was sized for.
    pub fn participants(&self) -> usize {
        self.resource.participants()
    }

    /// Block until reader `id` may read.
    ///
    /// # Safety
    ///
    /// `id` must be below [WriterPriorityCoordinator::participants] and must not be used by any
    /// other live participant, including one holding a [crate::Participant] or
    /// [crate::ArcParticipant]. Every call must be followed by exactly one
    /// [WriterPriorityCoordinator::exit_read] with the same id.
    #[instrument(skip(self))]
    pub unsafe fn enter_read(&self, id: ParticipantId) {
        self.reader_gate.wait(id);
        self.read_count_guard.wait(id);

        let readers: usize = self.read_count.load(Ordering::SeqCst) + 1;
        self.read_count.store(readers, Ordering::SeqCst);
        if readers == 1 {
            trace!("reader {id} is the first reader, locking writers out");
            self.resource.wait(id);
        }

        self.read_count_guard.signal(id);
        self.reader_gate.signal(id);

        if let Some(validator) = &self.validator {
            validator.on_read_enter(id);
        }
    }

    /// Leave the read critical section entered by [WriterPriorityCoordinator::enter_read].
    ///
    /// # Safety
    ///
    /// The caller must be reader `id`, currently inside a read critical section it entered with
    /// [WriterPriorityCoordinator::enter_read].
    #[instrument(skip(self))]
    pub unsafe fn exit_read(&self, id: ParticipantId) {
        if let Some(validator) = &self.validator {
            validator.on_read_exit(id);
        }

        self.read_count_guard.wait(id);
        match self.read_count.load(Ordering::SeqCst) {
            0 => warn!("reader {id} left without entering, ignoring"),
            readers => {
                self.read_count.store(readers - 1, Ordering::SeqCst);
                if readers == 1 {
                    trace!("reader {id} is the last reader, letting writers in");
                    self.resource.signal(id);
                }
            }
        }
        self.read_count_guard.signal(id);
    }

    /// Close the reader gate if nobody has yet, then block until writer `id` is alone.
    ///
    /// # Safety
    ///
    /// Same as [WriterPriorityCoordinator::enter_read], with
    /// [WriterPriorityCoordinator::exit_write] as the matching exit.
    #[instrument(skip(self))]
    pub unsafe fn enter_write(&self, id: ParticipantId) {
        self.write_count_guard.wait(id);
        let writers: usize = self.write_count.load(Ordering::SeqCst) + 1;
        self.write_count.store(writers, Ordering::SeqCst);
        if writers == 1 {
            trace!("writer {id} is the first writer, closing the reader gate");
            self.reader_gate.wait(id);
        }
        self.write_count_guard.signal(id);

        self.resource.wait(id);

        if let Some(validator) = &self.validator {
            validator.on_write_enter(id);
        }
    }

    /// Leave the write critical section entered by [WriterPriorityCoordinator::enter_write],
    /// reopening the reader gate if no other writer is queued.
    ///
    /// `resource` is released while `write_count_guard` is held, so that an exit without a
    /// matching enter is caught before it can hand out a second permit.
    ///
    /// # Safety
    ///
    /// The caller must be writer `id`, currently inside the write critical section it entered
    /// with [WriterPriorityCoordinator::enter_write].
    #[instrument(skip(self))]
    pub unsafe fn exit_write(&self, id: ParticipantId) {
        if let Some(validator) = &self.validator {
            validator.on_write_exit(id);
        }

        self.write_count_guard.wait(id);
        match self.write_count.load(Ordering::SeqCst) {
            0 => warn!("writer {id} left without entering, ignoring"),
            writers => {
                self.resource.signal(id);
                self.write_count.store(writers - 1, Ordering::SeqCst);
                if writers == 1 {
                    trace!("writer {id} is the last writer, reopening the reader gate");
                    self.reader_gate.signal(id);
                }
            }
        }
        self.write_count_guard.signal(id);
    }

    /// Enter as reader `id` and stay inside until the returned guard is dropped.
    ///
    /// [crate::Participant::read] and [crate::ArcParticipant::read] are the safe way in.
    ///
    /// # Safety
    ///
    /// Same as [WriterPriorityCoordinator::enter_read]: no other live participant may use `id`
    /// until the guard is dropped.
    pub unsafe fn read(&self, id: ParticipantId) -> ReadGuard<'_, T> {
        self.enter_read(id);
        ReadGuard::new(self, id)
    }

    /// Enter as writer `id` and stay inside until the returned guard is dropped.
    ///
    /// [crate::Participant::write] and [crate::ArcParticipant::write] are the safe way in.
    ///
    /// # Safety
    ///
    /// Same as [WriterPriorityCoordinator::enter_write]: no other live participant may use `id`
    /// until the guard is dropped.
    pub unsafe fn write(&self, id: ParticipantId) -> WriteGuard<'_, T> {
        self.enter_write(id);
        WriteGuard::new(self, id)
    }

    /// Read the protected value without a guard.
    ///
    /// # Safety
    ///
    /// The caller must currently be inside a read or write critical section entered with the
    /// raw enter/exit operations, and must drop the reference before leaving it.
    pub unsafe fn value_unchecked(&self) -> &T {
        &*self.value.get()
    }

    /// Mutate the protected value without a guard.
    ///
    /// # Safety
    ///
    /// The caller must currently be inside a write critical section entered with
    /// [WriterPriorityCoordinator::enter_write], and must drop the reference before calling
    /// [WriterPriorityCoordinator::exit_write].
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn value_mut_unchecked(&self) -> &mut T {
        &mut *self.value.get()
    }

    /// Direct access to the value. Nobody else can be inside while `self` is borrowed mutably.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Take the value back once no participant needs the coordinator any more.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Readers past the reader gate, including one that is still waiting to lock writers out.
    /// A snapshot for diagnostics.
    pub fn readers_in_flight(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Writers which have started entering and not yet left. A snapshot for diagnostics.
    pub fn writers_in_flight(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Whether the reader gate is currently taken, normally because a writer is waiting or
    /// writing. A reader passing through the gate also takes it for a moment.
    pub fn is_reader_gate_closed(&self) -> bool {
        self.reader_gate.available() == 0
    }

    /// The validator attached at construction, if any.
    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }
}

/// Configures and constructs a [WriterPriorityCoordinator].
pub struct CoordinatorBuilder {
    participants: usize,
    idle: IdleStrategy,
    validate: bool,
    observer: Option<Box<dyn Observer>>,
}

impl CoordinatorBuilder {
    /// Start configuring a coordinator for `participants` participants, spinning with the
    /// default [IdleStrategy] and without a validator.
    pub fn new(participants: usize) -> Self {
        Self {
            participants,
            idle: IdleStrategy::default(),
            validate: false,
            observer: None,
        }
    }

    /// What every lock and semaphore of the coordinator does between polls.
    pub fn idle(mut self, idle: IdleStrategy) -> Self {
        self.idle = idle;
        self
    }

    /// Attach a [Validator] to the coordinator.
    pub fn validate(mut self) -> Self {
        self.validate = true;
        self
    }

    /// Attach a [Validator] which reports its violations to `observer`.
    pub fn observed_by<O>(mut self, observer: O) -> Self
    where
        O: Observer + 'static,
    {
        self.validate = true;
        self.observer = Some(Box::new(observer));
        self
    }

    /// Construct the coordinator around `value`. Fails if the participant count is zero.
    pub fn build<T>(self, value: T) -> Result<WriterPriorityCoordinator<T>, Error> {
        let participants: usize = check_participants(self.participants)?;
        let semaphore = || CountingSemaphore::with_idle(1, participants, self.idle);

        let validator: Option<Validator> = if self.validate {
            let mut validator: Validator = Validator::with_idle(participants, self.idle)?;
            validator.observer = self.observer;
            Some(validator)
        } else {
            None
        };

        Ok(WriterPriorityCoordinator {
            resource: semaphore()?,
            reader_gate: semaphore()?,
            read_count_guard: semaphore()?,
            write_count_guard: semaphore()?,
            read_count: AtomicUsize::new(0),
            write_count: AtomicUsize::new(0),
            validator,
            participant_slots: flag_slots(participants),
            value: UnsafeCell::new(value),
        })
    }
}

impl Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CoordinatorBuilder")
            .field("participants", &self.participants)
            .field("idle", &self.idle)
            .field("validate", &self.validate)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
