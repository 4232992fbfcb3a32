//! Containers that never hand out references to their content, so they can be mutated through a shared reference.

mod buffer;
mod registry;
mod utils;

pub use buffer::Buffer;
pub use registry::{Registry, Ticket};
