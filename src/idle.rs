#[cfg(feature = "std")]
use core::time::Duration;

use crate::sync::spin_hint;
#[cfg(feature = "std")]
use crate::sync::yield_now;

/// What a participant does between two polls of a busy-wait loop.
///
/// The choice never affects correctness, only how much CPU a blocked participant burns and how
/// quickly it notices that it may proceed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IdleStrategy {
    /// Issue a single spin-loop hint.
    Spin,
    /// Issue the given number of spin-loop hints.
    SpinFor(u32),
    /// Hand the rest of the time slice back to the scheduler.
    #[cfg(feature = "std")]
    Yield,
    /// Put the thread to sleep for the given duration.
    #[cfg(feature = "std")]
    Sleep(Duration),
}

impl IdleStrategy {
    /// Pause once, as configured.
    #[inline]
    pub fn idle(&self) {
        match *self {
            IdleStrategy::Spin => spin_hint(),
            IdleStrategy::SpinFor(spins) => {
                for _ in 0..spins {
                    spin_hint();
                }
            }
            #[cfg(feature = "std")]
            IdleStrategy::Yield => yield_now(),
            #[cfg(feature = "std")]
            IdleStrategy::Sleep(duration) => sleep(duration),
        }
    }
}

#[cfg(all(feature = "std", any(loom, feature = "shuttle")))]
fn sleep(_duration: Duration) {
    // real sleeps are invisible to the model checkers
    yield_now();
}

#[cfg(all(feature = "std", not(loom), not(feature = "shuttle")))]
fn sleep(duration: Duration) {
    std::thread::sleep(duration);
}

impl Default for IdleStrategy {
    /// Yield when a scheduler is available, otherwise spin.
    #[cfg(feature = "std")]
    fn default() -> Self {
        IdleStrategy::Yield
    }

    #[cfg(not(feature = "std"))]
    fn default() -> Self {
        IdleStrategy::Spin
    }
}

#[cfg(all(test, feature = "std", not(feature = "shuttle"), not(loom)))]
mod tests {
    use crate::idle::IdleStrategy;
    use core::time::Duration;
    use std::time::Instant;
    use test_log::test;

    #[test]
    fn test_default_yields_with_std() {
        assert_eq!(IdleStrategy::default(), IdleStrategy::Yield);
    }

    #[test]
    fn test_every_strategy_returns() {
        IdleStrategy::Spin.idle();
        IdleStrategy::SpinFor(200).idle();
        IdleStrategy::Yield.idle();

        let start: Instant = Instant::now();
        IdleStrategy::Sleep(Duration::from_millis(5)).idle();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
