//! Reload rendezvous between `_wait` and `_notify`.
//!
//! A bootstrap page long-polls `_wait` after starting the program; a file
//! watcher (or anything else) hits `_notify` when sources change. Each
//! notification releases exactly one blocked poll, oldest first. A
//! notification with nobody waiting is dropped rather than remembered.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// FIFO queue of blocked waiters.
#[derive(Debug, Default)]
pub struct ReloadSignal {
    waiters: Mutex<VecDeque<oneshot::Sender<()>>>,
}

impl ReloadSignal {
    /// Create a signal with no waiters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until a later [`notify`](Self::notify) picks this waiter.
    ///
    /// Dropping the future (the client went away) withdraws the waiter.
    pub async fn wait(&self) {
        let (tx, rx) = oneshot::channel();
        {
            let mut waiters = self.waiters.lock();
            waiters.retain(|tx| !tx.is_closed());
            waiters.push_back(tx);
        }
        // The sender is only dropped unsent when the signal itself goes away.
        let _ = rx.await;
    }

    /// Wake the oldest live waiter.
    ///
    /// Returns `true` if one was woken. Never blocks.
    pub fn notify(&self) -> bool {
        let mut waiters = self.waiters.lock();
        while let Some(tx) = waiters.pop_front() {
            if tx.send(()).is_ok() {
                return true;
            }
        }
        false
    }

    /// Number of live waiters. Abandoned entries are pruned first.
    pub fn pending(&self) -> usize {
        let mut waiters = self.waiters.lock();
        waiters.retain(|tx| !tx.is_closed());
        waiters.len()
    }
}
