use super::{Queue, State};
use crate::sync::error::{GetError, PutError};
use crate::sync::waiter::Wait;
use futures::Stream;
use futures::stream::FusedStream;
use std::fmt;
use std::future::Future;
use std::mem;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

enum GetStage<'a, T> {
    Start,
    Waiting(Wait<'a, Result<T, GetError>>),
    Done,
}

/// Future returned by [`Queue::get`].
#[must_use = "futures do nothing unless polled"]
pub struct Get<'a, T> {
    state: &'a State<T>,
    stage: GetStage<'a, T>,
}

impl<'a, T> Get<'a, T> {
    pub(super) fn new(state: &'a State<T>) -> Self {
        Self {
            state,
            stage: GetStage::Start,
        }
    }
}

impl<T> Future for Get<'_, T> {
    type Output = Result<T, GetError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let state = this.state;
        loop {
            match mem::replace(&mut this.stage, GetStage::Done) {
                GetStage::Start => match state.fast_get() {
                    ControlFlow::Break(output) => return Poll::Ready(output),
                    ControlFlow::Continue(()) => {
                        this.stage = GetStage::Waiting(Wait::on(&state.consumers));
                    }
                },
                GetStage::Waiting(mut wait) => match Pin::new(&mut wait).poll(cx) {
                    Poll::Ready(output) => return Poll::Ready(output),
                    Poll::Pending => {
                        this.stage = GetStage::Waiting(wait);
                        return Poll::Pending;
                    }
                },
                GetStage::Done => panic!("`Get` polled after completion"),
            }
        }
    }
}

impl<T> Drop for Get<'_, T> {
    fn drop(&mut self) {
        if let GetStage::Waiting(wait) = &mut self.stage {
            if let Some(Ok(item)) = wait.abandon() {
                self.state.restore(item);
            }
        }
    }
}

impl<T> fmt::Debug for Get<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Get").finish()
    }
}

enum PutStage<'a, T> {
    Start(T),
    Waiting(Wait<'a, Result<(), PutError<T>>, T>),
    Done,
}

/// Future returned by [`Queue::put`].
#[must_use = "futures do nothing unless polled"]
pub struct Put<'a, T> {
    state: &'a State<T>,
    stage: PutStage<'a, T>,
}

impl<'a, T> Put<'a, T> {
    pub(super) fn new(state: &'a State<T>, item: T) -> Self {
        Self {
            state,
            stage: PutStage::Start(item),
        }
    }
}

// The item is moved around but never pinned.
impl<T> Unpin for Put<'_, T> {}

impl<T> Future for Put<'_, T> {
    type Output = Result<(), PutError<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let state = this.state;
        loop {
            match mem::replace(&mut this.stage, PutStage::Done) {
                PutStage::Start(item) => match state.fast_put(item) {
                    ControlFlow::Break(output) => return Poll::Ready(output),
                    ControlFlow::Continue(item) => {
                        this.stage = PutStage::Waiting(Wait::new(&state.producers, item));
                    }
                },
                PutStage::Waiting(mut wait) => match Pin::new(&mut wait).poll(cx) {
                    Poll::Ready(output) => return Poll::Ready(output),
                    Poll::Pending => {
                        this.stage = PutStage::Waiting(wait);
                        return Poll::Pending;
                    }
                },
                PutStage::Done => panic!("`Put` polled after completion"),
            }
        }
    }
}

impl<T> fmt::Debug for Put<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Put").finish()
    }
}

/// Stream returned by [`Queue::stream`]. Ends at the first [`GetError::Closed`] and stays ended.
#[must_use = "streams do nothing unless polled"]
pub struct Items<'a, T> {
    queue: &'a Queue<T>,
    pending: Option<Get<'a, T>>,
    terminated: bool,
}

impl<'a, T> Items<'a, T> {
    pub(super) fn new(queue: &'a Queue<T>) -> Self {
        Self {
            queue,
            pending: None,
            terminated: false,
        }
    }
}

impl<T> Stream for Items<'_, T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }
        let queue = this.queue;
        let get = this.pending.get_or_insert_with(|| queue.get());
        let output = ready!(Pin::new(get).poll(cx));
        this.pending = None;
        match output {
            Ok(item) => Poll::Ready(Some(item)),
            Err(GetError::Closed) => {
                log::trace!("queue stream terminated");
                this.terminated = true;
                Poll::Ready(None)
            }
        }
    }
}

impl<T> FusedStream for Items<'_, T> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<T> fmt::Debug for Items<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Items")
            .field("terminated", &self.terminated)
            .finish()
    }
}
