use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use super::error::BodyError;

/// Demand driven channel between the connection loop and a request body.
///
/// The connection decodes body chunks from its read buffer only while the
/// reader side signals demand, which is what stops socket reads when the
/// handler does not consume.
#[derive(Debug, Default)]
struct Shared {
    queue: VecDeque<Bytes>,
    done: bool,
    failed: Option<std::io::Error>,
    /// Reader side dropped, pending chunks can be discarded.
    closed: bool,
    /// Reader side requested a chunk.
    want: bool,
    read_waker: Option<Waker>,
    conn_waker: Option<Waker>,
}

/// Connection side of the body channel.
#[derive(Debug, Default)]
pub(crate) struct SendHandle {
    shared: Option<Arc<Mutex<Shared>>>,
}

impl SendHandle {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { shared: None }
    }

    /// Create a fresh reader handle, detaching any previous one.
    pub(crate) fn attach(&mut self) -> IoHandle {
        let shared = Arc::new(Mutex::new(Shared::default()));
        self.shared = Some(shared.clone());
        IoHandle { shared }
    }

    /// Returns `true` if a live reader is still interested in chunks.
    pub(crate) fn is_attached(&self) -> bool {
        match &self.shared {
            Some(shared) => !shared.lock().unwrap().closed,
            None => false,
        }
    }

    /// Whether the reader currently demands a chunk.
    ///
    /// Registers the connection waker so a later demand reschedules the
    /// connection task.
    pub(crate) fn wants(&mut self, cx: &mut Context) -> bool {
        let Some(shared) = &self.shared else {
            return false;
        };
        let mut shared = shared.lock().unwrap();
        if shared.closed {
            return false;
        }
        shared.conn_waker = Some(cx.waker().clone());
        shared.want
    }

    /// Deliver a decoded chunk to the reader.
    pub(crate) fn push(&mut self, data: Bytes) {
        if let Some(shared) = &self.shared {
            let mut shared = shared.lock().unwrap();
            if shared.closed {
                return;
            }
            shared.want = false;
            shared.queue.push_back(data);
            if let Some(waker) = shared.read_waker.take() {
                waker.wake();
            }
        }
    }

    /// Signal end of body and detach.
    pub(crate) fn finish(&mut self) {
        if let Some(shared) = self.shared.take() {
            let mut shared = shared.lock().unwrap();
            shared.done = true;
            if let Some(waker) = shared.read_waker.take() {
                waker.wake();
            }
        }
    }

    /// Fail the body and detach.
    pub(crate) fn fail(&mut self, err: std::io::Error) {
        if let Some(shared) = self.shared.take() {
            let mut shared = shared.lock().unwrap();
            shared.failed = Some(err);
            if let Some(waker) = shared.read_waker.take() {
                waker.wake();
            }
        }
    }
}

/// Reader side of the body channel, owned by [`Incoming`].
///
/// [`Incoming`]: super::Incoming
#[derive(Debug)]
pub(crate) struct IoHandle {
    shared: Arc<Mutex<Shared>>,
}

impl IoHandle {
    pub(crate) fn poll_read(&mut self, cx: &mut Context) -> Poll<Option<Result<Bytes, BodyError>>> {
        let mut shared = self.shared.lock().unwrap();
        if let Some(data) = shared.queue.pop_front() {
            return Poll::Ready(Some(Ok(data)));
        }
        if let Some(err) = shared.failed.take() {
            return Poll::Ready(Some(Err(BodyError::Io(err))));
        }
        if shared.done {
            return Poll::Ready(None);
        }
        shared.want = true;
        shared.read_waker = Some(cx.waker().clone());
        if let Some(waker) = shared.conn_waker.take() {
            waker.wake();
        }
        Poll::Pending
    }
}

impl Drop for IoHandle {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().unwrap();
        shared.closed = true;
        shared.queue.clear();
        if let Some(waker) = shared.conn_waker.take() {
            waker.wake();
        }
    }
}
