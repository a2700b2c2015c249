#![allow(dead_code)]

use bakery_rw::{
    ArcParticipant, CoordinatorBuilder, CountingSemaphore, TicketLock, Totals,
    WriterPriorityCoordinator,
};
use tracing::debug;

cfg_if::cfg_if! {
    if #[cfg(loom)] {
        pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};
        pub(crate) use loom::sync::Arc;
        pub(crate) use loom::thread;
    } else if #[cfg(feature = "shuttle")] {
        pub(crate) use shuttle::sync::atomic::{AtomicUsize, Ordering};
        pub(crate) use shuttle::sync::Arc;
        pub(crate) use shuttle::thread;
    } else if #[cfg(feature = "std")] {
        pub(crate) use std::sync::atomic::{AtomicUsize, Ordering};
        pub(crate) use std::sync::Arc;
        pub(crate) use std::thread;
    }
}

/// Every participant increments a shared counter `increments` times under the lock, with a
/// separate load and store so that any overlap of two critical sections loses an update.
pub(crate) fn ticket_lock_counter(participants: usize, increments: usize) {
    let lock: Arc<TicketLock> = Arc::new(TicketLock::new(participants).unwrap());
    let counter: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

    let join_handles: Vec<thread::JoinHandle<()>> = (0..participants)
        .map(|id| {
            let lock: Arc<TicketLock> = lock.clone();
            let counter: Arc<AtomicUsize> = counter.clone();
            thread::spawn(move || {
                for _ in 0..increments {
                    let _guard = lock.lock(id);
                    let seen: usize = counter.load(Ordering::Relaxed);
                    counter.store(seen + 1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    join_handles
        .into_iter()
        .for_each(|join_handle| join_handle.join().expect("A thread panicked"));
    assert_eq!(counter.load(Ordering::SeqCst), participants * increments);
}

/// Two participants wait on a semaphore holding a single permit, and a third signals once.
/// Both waits must return, and the semaphore must end up empty.
pub(crate) fn semaphore_two_waiters_one_signal() {
    let semaphore: Arc<CountingSemaphore> = Arc::new(CountingSemaphore::new(1, 3).unwrap());
    let returned: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

    let join_handles: Vec<thread::JoinHandle<()>> = (0..2)
        .map(|id| {
            let semaphore: Arc<CountingSemaphore> = semaphore.clone();
            let returned: Arc<AtomicUsize> = returned.clone();
            thread::spawn(move || {
                semaphore.wait(id);
                returned.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    semaphore.signal(2);
    join_handles
        .into_iter()
        .for_each(|join_handle| join_handle.join().expect("A thread panicked"));

    assert_eq!(returned.load(Ordering::SeqCst), 2);
    assert_eq!(semaphore.available(), 0);
}

/// `readers` readers and `writers` writers each go through `iterations` full enter/exit cycles
/// on a validated coordinator. Writers increment the protected value.
pub(crate) fn readers_and_writers_workload(
    readers: usize,
    writers: usize,
    iterations: usize,
) -> Totals {
    let coordinator: Arc<WriterPriorityCoordinator<usize>> = Arc::new(
        CoordinatorBuilder::new(readers + writers)
            .validate()
            .build(0)
            .unwrap(),
    );

    let join_handles: Vec<thread::JoinHandle<()>> = (0..readers + writers)
        .map(|i| {
            let mut participant: ArcParticipant<usize> =
                ArcParticipant::reserve(coordinator.clone()).unwrap();
            let is_writer: bool = i >= readers;
            thread::spawn(move || {
                for _ in 0..iterations {
                    if is_writer {
                        *participant.write() += 1;
                    } else {
                        let value: usize = *participant.read();
                        assert!(value <= writers * iterations);
                    }
                }
            })
        })
        .collect();

    join_handles
        .into_iter()
        .for_each(|join_handle| join_handle.join().expect("A thread panicked"));

    let totals: Totals = coordinator.validator().unwrap().totals();
    debug!("totals after {readers} readers and {writers} writers finished: {totals:?}");

    let mut last: ArcParticipant<usize> = ArcParticipant::reserve(coordinator.clone()).unwrap();
    assert_eq!(*last.read(), writers * iterations);
    drop(last);
    assert_eq!(coordinator.readers_in_flight(), 0);
    assert_eq!(coordinator.writers_in_flight(), 0);
    assert_eq!(totals.violations, 0);
    assert!(totals.peak_writers <= 1);
    totals
}
