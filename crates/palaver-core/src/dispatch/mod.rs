//! Request admission and per-channel serialization.
//!
//! - `admission` -- allow-list and per-user rate limiter
//! - `queue` -- run slot plus bounded drop-oldest FIFO per channel
//! - `dispatcher` -- `Dispatcher`, which ties both to the channel registry

pub mod admission;
pub mod dispatcher;
pub mod queue;

pub use admission::{AccessList, RateLimiter, DENIAL_MESSAGE};
pub use dispatcher::{DispatchOutcome, Dispatcher, PendingRequest, Ticket};
pub use queue::{Admission, ChannelState, DispatchQueue};
