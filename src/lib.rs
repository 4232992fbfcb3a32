mod sealed;
pub mod sync;
pub mod task;

pub mod prelude {
    pub use crate::sync::error::{
        GetError, InvalidArgument, PutError, SetError, TryGetError, TryPutError,
    };
    pub use crate::sync::event::Event;
    pub use crate::sync::mailbox::Mailbox;
    pub use crate::sync::queue::{Order, Queue, QueueState};
    pub use crate::sync::value::Value;
    pub use crate::task::{self as local_task, Task};
}
