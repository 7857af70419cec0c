// src/engine/signal.rs

//! Completion signal for the thread that started a run.
//!
//! The initiating thread parks until the number of outstanding end steps
//! reaches zero. The worker that completes the last end step unparks it.
//! `park` may return spuriously, so the counter is re-checked after every
//! wake-up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, Thread};

#[derive(Debug)]
pub(crate) struct CompletionSignal {
    remaining: AtomicUsize,
    waiter: Thread,
}

impl CompletionSignal {
    /// Create a signal owned by the current thread.
    pub(crate) fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            waiter: thread::current(),
        }
    }

    /// Record one finished end step. Returns `true` if it was the last one.
    pub(crate) fn count_down(&self) -> bool {
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "completion signal counted below zero");
        if previous == 1 {
            self.waiter.unpark();
            true
        } else {
            false
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Block the creating thread until the count reaches zero.
    pub(crate) fn wait(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.waiter.id(),
            "completion signal waited on from a foreign thread"
        );
        while self.remaining() != 0 {
            thread::park();
        }
    }
}
