//! Debounce scheduler
//!
//! Holds at most one pending invocation. Scheduling again aborts the pending
//! task and restarts the inactivity window; nothing is ever queued. Dropping
//! the scheduler cancels whatever is pending.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Default input inactivity window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(350);

/// Identifies one scheduled invocation
pub type Ticket = u64;

pub struct DebounceScheduler {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    ticket: Ticket,
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl DebounceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            ticket: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the configured delay, replacing any pending invocation
    pub fn schedule<F>(&mut self, task: F) -> Ticket
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_after(self.delay, task)
    }

    /// Run `task` after `delay`, replacing any pending invocation
    pub fn schedule_after<F>(&mut self, delay: Duration, task: F) -> Ticket
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_ticketed(delay, |_| task)
    }

    /// Like [`schedule`](Self::schedule), but the task learns its own ticket
    /// so it can report back for [`acknowledge`](Self::acknowledge)
    pub fn schedule_with<M, F>(&mut self, make: M) -> Ticket
    where
        M: FnOnce(Ticket) -> F,
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule_ticketed(self.delay, make)
    }

    fn schedule_ticketed<M, F>(&mut self, delay: Duration, make: M) -> Ticket
    where
        M: FnOnce(Ticket) -> F,
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.ticket += 1;
        let task = make(self.ticket);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
        self.ticket
    }

    /// Abort the pending invocation. Returns true if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Acknowledge that the invocation for `ticket` fired.
    ///
    /// Returns false when a newer schedule or a cancel has superseded it, in
    /// which case the caller must ignore the firing.
    pub fn acknowledge(&mut self, ticket: Ticket) -> bool {
        if ticket == self.ticket && self.pending.is_some() {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
