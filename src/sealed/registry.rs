use super::utils::SealedCell;
use std::collections::VecDeque;
use std::fmt;

/// Stable position of an entry in a [`Registry`]. Tickets grow monotonically and are never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Ticket(u64);

struct Slots<E> {
    next: u64,
    slots: VecDeque<(Ticket, Option<E>)>,
}

impl<E> Slots<E> {
    fn trim(&mut self) {
        while matches!(self.slots.front(), Some((_, None))) {
            self.slots.pop_front();
        }
        while matches!(self.slots.back(), Some((_, None))) {
            self.slots.pop_back();
        }
    }
}

/// Ordered list of pending waiters.
///
/// Entries are appended at the back and consumed from the front. A cancelled entry is
/// tombstoned in place, so tickets held by other waiters stay valid while the list is
/// consumed or appended to from re-entrant calls. Tombstones at either end are trimmed
/// eagerly, so the registry is empty exactly when it holds no live entry.
pub struct Registry<E>(SealedCell<Slots<E>>);

impl<E> Registry<E> {
    pub fn new() -> Self {
        Self(SealedCell::new(Slots {
            next: 0,
            slots: VecDeque::new(),
        }))
    }

    pub fn push(&self, entry: E) -> Ticket {
        // SAFETY: `with()` is never invoked recursively
        unsafe {
            self.0.with(|inner| {
                let ticket = Ticket(inner.next);
                inner.next += 1;
                inner.slots.push_back((ticket, Some(entry)));
                ticket
            })
        }
    }

    /// Invalidates the entry in place and hands it back, or returns `None` if it has
    /// already been consumed.
    pub fn tombstone(&self, ticket: Ticket) -> Option<E> {
        // SAFETY: `with()` is never invoked recursively
        unsafe {
            self.0.with(|inner| {
                let index = inner.slots.binary_search_by_key(&ticket, |(t, _)| *t).ok()?;
                let entry = inner.slots[index].1.take();
                inner.trim();
                entry
            })
        }
    }

    /// Removes and returns the oldest live entry, discarding tombstones on the way.
    pub fn pop_live(&self) -> Option<E> {
        // SAFETY: `with()` is never invoked recursively
        unsafe {
            self.0.with(|inner| {
                let entry = inner.slots.pop_front().and_then(|(_, entry)| entry);
                inner.trim();
                entry
            })
        }
    }

    /// Like [`Registry::pop_live`], but ignores entries registered at or after `end`.
    pub fn pop_live_before(&self, end: Ticket) -> Option<E> {
        // SAFETY: `with()` is never invoked recursively
        unsafe {
            self.0.with(|inner| {
                if inner.slots.front().is_some_and(|(ticket, _)| *ticket < end) {
                    let entry = inner.slots.pop_front().and_then(|(_, entry)| entry);
                    inner.trim();
                    entry
                } else {
                    None
                }
            })
        }
    }

    /// Ticket that the next pushed entry will receive.
    pub fn end(&self) -> Ticket {
        // SAFETY: `with()` is never invoked recursively
        unsafe { self.0.with(|inner| Ticket(inner.next)) }
    }

    /// Number of slots between the oldest and the newest live entry, tombstones included.
    pub fn len(&self) -> usize {
        // SAFETY: `with()` is never invoked recursively
        unsafe { self.0.with(|inner| inner.slots.len()) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("len", &self.len()).finish()
    }
}
