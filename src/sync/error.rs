use std::{fmt, io};

/// Rejected construction parameter.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum InvalidArgument {
    ZeroCapacity,
    UnknownOrder(String),
}

/// Error of [`Queue::get`](crate::sync::queue::Queue::get).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GetError {
    Closed,
}

/// Error of [`Queue::get_nowait`](crate::sync::queue::Queue::get_nowait).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TryGetError {
    WouldBlock,
    Closed,
}

/// Error of [`Queue::put`](crate::sync::queue::Queue::put). Hands the rejected item back.
#[derive(PartialEq, Eq)]
pub enum PutError<T> {
    Closed(T),
}

/// Error of [`Queue::put_nowait`](crate::sync::queue::Queue::put_nowait). Hands the rejected item back.
#[derive(PartialEq, Eq)]
pub enum TryPutError<T> {
    WouldBlock(T),
    Closed(T),
}

/// Error of [`Value::set`](crate::sync::value::Value::set). Hands the rejected value back.
#[derive(PartialEq, Eq)]
pub enum SetError<T> {
    Reentrant(T),
}

impl<T> PutError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PutError::Closed(item) => item,
        }
    }
}

impl<T> TryPutError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryPutError::WouldBlock(item) | TryPutError::Closed(item) => item,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TryPutError::Closed(_))
    }
}

impl TryGetError {
    pub fn is_closed(&self) -> bool {
        matches!(self, TryGetError::Closed)
    }
}

impl From<GetError> for TryGetError {
    fn from(err: GetError) -> Self {
        match err {
            GetError::Closed => TryGetError::Closed,
        }
    }
}

impl<T> From<PutError<T>> for TryPutError<T> {
    fn from(err: PutError<T>) -> Self {
        match err {
            PutError::Closed(item) => TryPutError::Closed(item),
        }
    }
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidArgument::ZeroCapacity => {
                f.write_str("capacity must be either a positive integer or unbounded")
            }
            InvalidArgument::UnknownOrder(name) => write!(
                f,
                "order must be one of 'lifo', 'fifo' or 'small-first' (was {name:?})"
            ),
        }
    }
}

impl std::error::Error for InvalidArgument {}

impl From<InvalidArgument> for io::Error {
    fn from(err: InvalidArgument) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, err)
    }
}

impl fmt::Display for GetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GetError::Closed => f.write_str("queue is closed"),
        }
    }
}

impl std::error::Error for GetError {}

impl From<GetError> for io::Error {
    fn from(err: GetError) -> Self {
        io::Error::new(io::ErrorKind::BrokenPipe, err)
    }
}

impl fmt::Display for TryGetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryGetError::WouldBlock => f.write_str("queue is empty"),
            TryGetError::Closed => f.write_str("queue is closed"),
        }
    }
}

impl std::error::Error for TryGetError {}

impl From<TryGetError> for io::Error {
    fn from(err: TryGetError) -> Self {
        let kind = match err {
            TryGetError::WouldBlock => io::ErrorKind::WouldBlock,
            TryGetError::Closed => io::ErrorKind::BrokenPipe,
        };
        io::Error::new(kind, err)
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Closed(_) => f.write_str("PutError::Closed(..)"),
        }
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Closed(_) => f.write_str("queue is closed"),
        }
    }
}

impl<T> std::error::Error for PutError<T> {}

impl<T> From<PutError<T>> for io::Error {
    fn from(err: PutError<T>) -> Self {
        let source = format!("{err}");
        match err {
            PutError::Closed(_) => io::Error::new(io::ErrorKind::BrokenPipe, source),
        }
    }
}

impl<T> fmt::Debug for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPutError::WouldBlock(_) => f.write_str("TryPutError::WouldBlock(..)"),
            TryPutError::Closed(_) => f.write_str("TryPutError::Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPutError::WouldBlock(_) => f.write_str("queue is full"),
            TryPutError::Closed(_) => f.write_str("queue is closed"),
        }
    }
}

impl<T> std::error::Error for TryPutError<T> {}

impl<T> From<TryPutError<T>> for io::Error {
    fn from(err: TryPutError<T>) -> Self {
        let source = format!("{err}");
        match err {
            TryPutError::WouldBlock(_) => io::Error::new(io::ErrorKind::WouldBlock, source),
            TryPutError::Closed(_) => io::Error::new(io::ErrorKind::BrokenPipe, source),
        }
    }
}

impl<T> fmt::Debug for SetError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetError::Reentrant(_) => f.write_str("SetError::Reentrant(..)"),
        }
    }
}

impl<T> fmt::Display for SetError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetError::Reentrant(_) => f.write_str("cannot change value while notifying changes"),
        }
    }
}

impl<T> std::error::Error for SetError<T> {}
