use bytes::Bytes;
use std::task::{Context, Poll};

use super::Collect;
use super::error::BodyError;
use super::handle::IoHandle;

/// The request message body.
///
/// The body is finite, non restartable and consumed at most once: it is
/// owned by value and reading moves the bytes out. Dropping it releases
/// every pending chunk and lets the connection discard the remainder.
#[derive(Debug, Default)]
pub struct Incoming {
    repr: Repr,
}

/// Body can be standalone bytes or hold a handle to the connection.
#[derive(Debug)]
enum Repr {
    Bytes(Bytes),
    Handle(BodyHandle),
}

#[derive(Debug)]
struct BodyHandle {
    handle: IoHandle,
    size_hint: Option<u64>,
}

impl Default for Repr {
    #[inline]
    fn default() -> Self {
        Repr::Bytes(Bytes::new())
    }
}

// ===== Constructor =====

impl Incoming {
    /// Create an exact size body.
    #[inline]
    pub fn new(bytes: impl Into<Bytes>) -> Incoming {
        Self {
            repr: Repr::Bytes(bytes.into()),
        }
    }

    /// Create an empty body.
    #[inline]
    pub const fn empty() -> Incoming {
        Self {
            repr: Repr::Bytes(Bytes::new()),
        }
    }

    #[inline]
    pub(crate) fn from_handle(handle: IoHandle, size_hint: Option<u64>) -> Self {
        Self {
            repr: Repr::Handle(BodyHandle { handle, size_hint }),
        }
    }
}

// ===== Ref =====

impl Incoming {
    /// Returns the bounds on the remaining length of the message body.
    ///
    /// The first element is the lower bound, the second the upper bound,
    /// [`None`] meaning the length is unknown upfront (chunked bodies).
    pub fn size_hint(&self) -> (u64, Option<u64>) {
        match &self.repr {
            Repr::Bytes(b) => (b.len() as u64, Some(b.len() as u64)),
            Repr::Handle(handle) => (0, handle.size_hint),
        }
    }
}

// ===== Read =====

impl Incoming {
    /// Read the next chunk.
    #[inline]
    pub fn read(&mut self) -> impl Future<Output = Option<Result<Bytes, BodyError>>> {
        std::future::poll_fn(|cx| self.poll_read(cx))
    }

    /// Buffer the whole body.
    #[inline]
    pub fn collect(self) -> Collect {
        Collect::new(self)
    }

    /// Tries to read the next chunk.
    pub fn poll_read(&mut self, cx: &mut Context) -> Poll<Option<Result<Bytes, BodyError>>> {
        match &mut self.repr {
            Repr::Bytes(b) => Poll::Ready(if b.is_empty() {
                None
            } else {
                Some(Ok(std::mem::take(b)))
            }),
            Repr::Handle(handle) => handle.handle.poll_read(cx),
        }
    }
}
