//! Synchronization primitives for single-threaded async programming.

pub mod error;
pub mod event;
pub mod mailbox;
pub mod queue;
pub mod value;
mod waiter;
