//! A module which decides which synchronization primitives to use throughout the rest of the crate
//! depending on features and configuration options.
//!
//! Only atomics and [Arc] come from here. Nothing in this crate takes a platform lock, so the
//! model checkers only need to see the atomic slots and the points where a spin loop idles.

cfg_if::cfg_if! {
    if #[cfg(loom)] {
        pub(crate) use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
        pub(crate) use loom::sync::Arc;

        /// Under loom, every idle point must yield or the model never makes progress.
        pub(crate) fn spin_hint() {
            loom::thread::yield_now();
        }

        pub(crate) fn yield_now() {
            loom::thread::yield_now();
        }
    } else if #[cfg(feature = "shuttle")] {
        pub(crate) use shuttle::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
        pub(crate) use shuttle::sync::Arc;

        pub(crate) fn spin_hint() {
            shuttle::thread::yield_now();
        }

        pub(crate) fn yield_now() {
            shuttle::thread::yield_now();
        }
    } else if #[cfg(feature = "std")] {
        pub(crate) use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
        pub(crate) use std::sync::Arc;

        pub(crate) fn spin_hint() {
            core::hint::spin_loop();
        }

        pub(crate) fn yield_now() {
            std::thread::yield_now();
        }
    } else {
        pub(crate) use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
        pub(crate) use alloc::sync::Arc;

        pub(crate) fn spin_hint() {
            core::hint::spin_loop();
        }
    }
}
