use crate::sync::error::InvalidArgument;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Order in which a [`Queue`](super::Queue) hands out its buffered items.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Order {
    /// First in, first out.
    Fifo,
    /// Last in, first out.
    Lifo,
    /// Smallest item first. Equal items come out in an unspecified order.
    SmallFirst,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Fifo => "fifo",
            Order::Lifo => "lifo",
            Order::SmallFirst => "small-first",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Order {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Order::Fifo),
            "lifo" => Ok(Order::Lifo),
            "small-first" => Ok(Order::SmallFirst),
            other => Err(InvalidArgument::UnknownOrder(other.to_owned())),
        }
    }
}

/// Buffering discipline of a queue.
///
/// The queue only checks `len()` against its capacity and never calls `pop()` on an
/// empty discipline.
pub trait Discipline<T> {
    fn push(&mut self, item: T);
    fn pop(&mut self) -> Option<T>;
    fn len(&self) -> usize;
    fn kind(&self) -> Order;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Fifo<T>(VecDeque<T>);

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

impl<T> Discipline<T> for Fifo<T> {
    fn push(&mut self, item: T) {
        self.0.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop_front()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn kind(&self) -> Order {
        Order::Fifo
    }
}

pub struct Lifo<T>(Vec<T>);

impl<T> Default for Lifo<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Discipline<T> for Lifo<T> {
    fn push(&mut self, item: T) {
        self.0.push(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn kind(&self) -> Order {
        Order::Lifo
    }
}

pub struct SmallFirst<T>(BinaryHeap<Reverse<T>>);

impl<T: Ord> Default for SmallFirst<T> {
    fn default() -> Self {
        Self(BinaryHeap::new())
    }
}

impl<T: Ord> Discipline<T> for SmallFirst<T> {
    fn push(&mut self, item: T) {
        self.0.push(Reverse(item));
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop().map(|Reverse(item)| item)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn kind(&self) -> Order {
        Order::SmallFirst
    }
}
