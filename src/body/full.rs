use bytes::Bytes;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::{Body, Frame};

/// Single chunk [`Body`].
#[derive(Debug, Clone, Default)]
pub struct Full {
    data: Option<Bytes>,
}

impl Full {
    /// Create a body from a single chunk.
    #[inline]
    pub fn new(data: impl Into<Bytes>) -> Full {
        let data = data.into();
        Self {
            data: (!data.is_empty()).then_some(data),
        }
    }

    /// Create an empty body.
    #[inline]
    pub const fn empty() -> Full {
        Self { data: None }
    }
}

impl Body for Full {
    type Data = Bytes;

    type Error = Infallible;

    fn poll_data(
        self: Pin<&mut Self>,
        _: &mut Context,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().data.take().map(|data| Ok(Frame::data(data))))
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.data.is_none()
    }

    fn size_hint(&self) -> (u64, Option<u64>) {
        let len = self.data.as_ref().map(|d| d.len() as u64).unwrap_or(0);
        (len, Some(len))
    }
}

impl From<Bytes> for Full {
    #[inline]
    fn from(value: Bytes) -> Self {
        Self::new(value)
    }
}

impl From<&'static str> for Full {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::new(Bytes::from_static(value.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Context;

    #[test]
    fn single_frame_then_end() {
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);

        let mut body = Full::from("abc");
        assert_eq!(body.size_hint(), (3, Some(3)));
        assert!(!body.is_end_stream());

        let frame = match Pin::new(&mut body).poll_data(&mut cx) {
            Poll::Ready(Some(Ok(frame))) => frame,
            other => panic!("expected data frame, got {other:?}"),
        };
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"abc"));

        assert!(body.is_end_stream());
        assert!(matches!(Pin::new(&mut body).poll_data(&mut cx), Poll::Ready(None)));
    }

    #[test]
    fn empty_is_end_stream() {
        let body = Full::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint(), (0, Some(0)));
    }
}
