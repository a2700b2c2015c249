use core::ops::{Deref, DerefMut};

use crate::coordinator::WriterPriorityCoordinator;
use crate::types::ParticipantId;

/// Shared access to the value of a [WriterPriorityCoordinator]. Leaves the read critical
/// section when dropped.
#[derive(Debug)]
pub struct ReadGuard<'a, T> {
    coordinator: &'a WriterPriorityCoordinator<T>,
    id: ParticipantId,
}

impl<'a, T> ReadGuard<'a, T> {
    /// Only constructed right after a successful `enter_read` by `id`.
    pub(super) fn new(coordinator: &'a WriterPriorityCoordinator<T>, id: ParticipantId) -> Self {
        Self { coordinator, id }
    }

    /// The reader holding this guard.
    pub fn id(&self) -> ParticipantId {
        self.id
    }
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while its participant is inside a read critical section
        unsafe { self.coordinator.value_unchecked() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `id` entered the read critical section when this guard was made and has not
        // left it since
        unsafe { self.coordinator.exit_read(self.id) };
    }
}

/// Exclusive access to the value of a [WriterPriorityCoordinator]. Leaves the write critical
/// section when dropped.
#[derive(Debug)]
pub struct WriteGuard<'a, T> {
    coordinator: &'a WriterPriorityCoordinator<T>,
    id: ParticipantId,
}

impl<'a, T> WriteGuard<'a, T> {
    /// Only constructed right after a successful `enter_write` by `id`.
    pub(super) fn new(coordinator: &'a WriterPriorityCoordinator<T>, id: ParticipantId) -> Self {
        Self { coordinator, id }
    }

    /// The writer holding this guard.
    pub fn id(&self) -> ParticipantId {
        self.id
    }
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while its participant is alone in a write critical section
        unsafe { self.coordinator.value_unchecked() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, and `&mut self` keeps the shared reference from `deref` from
        // outliving this one
        unsafe { self.coordinator.value_mut_unchecked() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `id` entered the write critical section when this guard was made and has not
        // left it since
        unsafe { self.coordinator.exit_write(self.id) };
    }
}
