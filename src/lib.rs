//! Mutual exclusion and readers-writers coordination built from plain shared memory and
//! busy-waiting, without any platform lock, semaphore or condition variable.
//!
//! The crate stacks three primitives on top of each other:
//!
//! - [TicketLock], Lamport's bakery lock for a fixed set of participants,
//! - [CountingSemaphore], whose count is protected by a [TicketLock],
//! - [WriterPriorityCoordinator], a readers-writers coordinator made of four semaphores which
//!   holds new readers back as soon as a writer shows up.
//!
//! A [Validator] can be attached to a coordinator to count the participants inside their
//! critical sections and report any [Violation] of the readers-writers guarantees.
//!
//! Every participant identifies itself with a [ParticipantId] in `0..participants`. Ids are
//! reserved through [Participant] and [ArcParticipant], which is the safe way to take part.
//! Handing out ids by hand goes through the `unsafe` raw operations of
//! [WriterPriorityCoordinator], because two participants sharing an id can both get inside.
//!
//! ```
//! use bakery_rw::{CoordinatorBuilder, Participant, WriterPriorityCoordinator};
//!
//! let coordinator: WriterPriorityCoordinator<u64> = CoordinatorBuilder::new(2)
//!     .validate()
//!     .build(0)
//!     .unwrap();
//!
//! std::thread::scope(|scope| {
//!     let mut writer = Participant::reserve(&coordinator).unwrap();
//!     let mut reader = Participant::reserve(&coordinator).unwrap();
//!     scope.spawn(move || *writer.write() += 1);
//!     scope.spawn(move || {
//!         let value: u64 = *reader.read();
//!         assert!(value <= 1);
//!     });
//! });
//! assert_eq!(coordinator.validator().unwrap().totals().violations, 0);
//! ```
//!
//! ```compile_fail
//! use bakery_rw::WriterPriorityCoordinator;
//!
//! let coordinator = WriterPriorityCoordinator::new(2, 0u64).unwrap();
//! // a caller-chosen id needs an `unsafe` block
//! *coordinator.write(0) += 1;
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub use crate::bakery::{TicketLock, TicketLockGuard};
pub use crate::coordinator::{
    CoordinatorBuilder, ReadGuard, WriteGuard, WriterPriorityCoordinator,
};
pub use crate::err::Error;
pub use crate::idle::IdleStrategy;
pub use crate::participant::{ArcParticipant, Participant};
pub use crate::semaphore::CountingSemaphore;
pub use crate::types::ParticipantId;
pub use crate::validator::{Observer, Role, Totals, Validator, Violation};

mod bakery;
mod coordinator;
/// The crate's [Error] type.
pub mod err;
mod idle;
mod participant;
mod semaphore;
mod sync;
mod types;
mod validator;
