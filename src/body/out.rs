use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use super::error::BodyError;
use super::file::FileRegion;
use super::sse::SseEvent;
use super::{Body, Frame};
use crate::BoxError;
use crate::log::emit;

type BoxStream<T> = Pin<Box<dyn Stream<Item = Result<T, BoxError>> + Send>>;

/// The response message body.
///
/// The engine derives the wire framing from the variant: buffered bytes
/// carry a `Content-Length`, streams are chunked, server-sent events are
/// chunked with a forced `Content-Type`, file regions are streamed with
/// their region size.
#[derive(Debug)]
pub struct OutBody {
    repr: Repr,
}

enum Repr {
    Empty,
    Full(Option<Bytes>),
    Stream { stream: BoxStream<Bytes>, done: bool },
    File(FileRegion),
    Sse { stream: BoxStream<SseEvent>, done: bool },
}

impl OutBody {
    /// Create an empty body.
    #[inline]
    pub const fn empty() -> OutBody {
        Self { repr: Repr::Empty }
    }

    /// Create a single chunk body with a known length.
    #[inline]
    pub fn full(data: impl Into<Bytes>) -> OutBody {
        let data = data.into();
        Self {
            repr: match data.is_empty() {
                true => Repr::Empty,
                false => Repr::Full(Some(data)),
            },
        }
    }

    /// Create a streamed body of unknown length, emitted chunked.
    pub fn stream<S>(stream: S) -> OutBody
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self {
            repr: Repr::Stream {
                stream: Box::pin(stream),
                done: false,
            },
        }
    }

    /// Create a body streaming a region of a file.
    #[inline]
    pub fn file(region: FileRegion) -> OutBody {
        Self {
            repr: Repr::File(region),
        }
    }

    /// Create a server-sent event body.
    ///
    /// The engine forces `Content-Type: text/event-stream;charset=utf-8`
    /// and chunked framing on the response. A failing event stream closes
    /// only the event stream, the response terminates normally.
    pub fn sse<S>(events: S) -> OutBody
    where
        S: Stream<Item = Result<SseEvent, BoxError>> + Send + 'static,
    {
        Self {
            repr: Repr::Sse {
                stream: Box::pin(events),
                done: false,
            },
        }
    }

    /// Returns `true` for the server-sent event variant.
    pub(crate) fn is_sse(&self) -> bool {
        matches!(self.repr, Repr::Sse { .. })
    }
}

impl Default for OutBody {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl Body for OutBody {
    type Data = Bytes;

    type Error = BodyError;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().repr {
            Repr::Empty => Poll::Ready(None),
            Repr::Full(data) => Poll::Ready(data.take().map(|data| Ok(Frame::data(data)))),
            Repr::Stream { stream, done } => {
                if *done {
                    return Poll::Ready(None);
                }
                match ready!(stream.as_mut().poll_next(cx)) {
                    Some(Ok(data)) => Poll::Ready(Some(Ok(Frame::data(data)))),
                    Some(Err(err)) => {
                        *done = true;
                        Poll::Ready(Some(Err(BodyError::Stream(err))))
                    }
                    None => {
                        *done = true;
                        Poll::Ready(None)
                    }
                }
            }
            Repr::File(region) => region.poll_data(cx),
            Repr::Sse { stream, done } => {
                if *done {
                    return Poll::Ready(None);
                }
                match ready!(stream.as_mut().poll_next(cx)) {
                    Some(Ok(event)) => Poll::Ready(Some(Ok(Frame::data(event.encode())))),
                    Some(Err(err)) => {
                        // an event stream failure ends the stream, the
                        // response still terminates normally
                        emit!(warn, "sse stream error: {err}");
                        *done = true;
                        Poll::Ready(None)
                    }
                    None => {
                        *done = true;
                        Poll::Ready(None)
                    }
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.repr {
            Repr::Empty => true,
            Repr::Full(data) => data.is_none(),
            Repr::Stream { done, .. } | Repr::Sse { done, .. } => *done,
            Repr::File(region) => region.is_end_stream(),
        }
    }

    fn size_hint(&self) -> (u64, Option<u64>) {
        match &self.repr {
            Repr::Empty => (0, Some(0)),
            Repr::Full(data) => {
                let len = data.as_ref().map(|d| d.len() as u64).unwrap_or(0);
                (len, Some(len))
            }
            Repr::Stream { .. } | Repr::Sse { .. } => (0, None),
            Repr::File(region) => region.size_hint(),
        }
    }
}

impl From<Bytes> for OutBody {
    #[inline]
    fn from(value: Bytes) -> Self {
        Self::full(value)
    }
}

impl From<&'static str> for OutBody {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::full(Bytes::from_static(value.as_bytes()))
    }
}

impl From<String> for OutBody {
    #[inline]
    fn from(value: String) -> Self {
        Self::full(Bytes::from(value.into_bytes()))
    }
}

impl From<Vec<u8>> for OutBody {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self::full(Bytes::from(value))
    }
}

impl From<FileRegion> for OutBody {
    #[inline]
    fn from(value: FileRegion) -> Self {
        Self::file(value)
    }
}

impl std::fmt::Debug for Repr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Repr::Empty => f.write_str("Empty"),
            Repr::Full(data) => f.debug_tuple("Full").field(data).finish(),
            Repr::Stream { done, .. } => f.debug_struct("Stream").field("done", done).finish(),
            Repr::File(region) => f.debug_tuple("File").field(region).finish(),
            Repr::Sse { done, .. } => f.debug_struct("Sse").field("done", done).finish(),
        }
    }
}
