//! Per-channel run slot plus bounded FIFO of waiting requests.
//!
//! `DispatchQueue` is the state machine behind a channel:
//! `Idle -> Busy -> Busy+Queued(n)`. It is plain data; callers hold it behind
//! a mutex so that checking the run slot and enqueueing happen in one
//! critical section.

use std::collections::VecDeque;

/// Observable state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Busy,
    /// Busy with `n > 0` requests waiting.
    Queued(usize),
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Idle => write!(f, "idle"),
            ChannelState::Busy => write!(f, "busy"),
            ChannelState::Queued(n) => write!(f, "busy (+{n} queued)"),
        }
    }
}

/// Result of admitting a request into the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<T> {
    /// The channel was idle; the caller owns the run slot and must service
    /// `T` now.
    RunNow(T),
    /// The request waits at 1-based `position`. `evicted` is the oldest
    /// waiting request when the queue was already full.
    Queued { position: usize, evicted: Option<T> },
}

#[derive(Debug)]
pub struct DispatchQueue<T> {
    running: bool,
    pending: VecDeque<T>,
    max_pending: usize,
}

impl<T> DispatchQueue<T> {
    /// A bound below 1 is raised to 1.
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            running: false,
            pending: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    pub fn admit(&mut self, item: T) -> Admission<T> {
        if !self.running {
            self.running = true;
            return Admission::RunNow(item);
        }

        let evicted = if self.pending.len() >= self.max_pending {
            self.pending.pop_front()
        } else {
            None
        };
        self.pending.push_back(item);

        Admission::Queued {
            position: self.pending.len(),
            evicted,
        }
    }

    /// Finish the in-flight request.
    ///
    /// Returns the next request to service, in which case the run slot stays
    /// taken. Returns `None` and leaves the channel idle otherwise; calling
    /// this on an idle channel changes nothing.
    pub fn complete(&mut self) -> Option<T> {
        if !self.running {
            return None;
        }
        match self.pending.pop_front() {
            Some(next) => Some(next),
            None => {
                self.running = false;
                None
            }
        }
    }

    /// Take every waiting request, leaving the in-flight one untouched.
    pub fn drain(&mut self) -> Vec<T> {
        self.pending.drain(..).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.pending.iter()
    }

    pub fn state(&self) -> ChannelState {
        match (self.running, self.pending.len()) {
            (false, _) => ChannelState::Idle,
            (true, 0) => ChannelState::Busy,
            (true, n) => ChannelState::Queued(n),
        }
    }
}
