use bytes::{Bytes, BytesMut};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use super::Incoming;
use super::error::BodyError;

/// Future buffering a whole [`Incoming`] body, returned by
/// [`Incoming::collect`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Collect {
    body: Incoming,
    buffer: BytesMut,
}

impl Collect {
    pub(crate) fn new(body: Incoming) -> Collect {
        Self {
            body,
            buffer: BytesMut::new(),
        }
    }
}

impl Future for Collect {
    type Output = Result<Bytes, BodyError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();
        loop {
            match ready!(me.body.poll_read(cx)) {
                Some(Ok(chunk)) => {
                    if me.buffer.is_empty() && chunk.len() >= me.buffer.capacity() {
                        // common single chunk case, no copy
                        if me.body.size_hint() == (0, Some(0)) {
                            return Poll::Ready(Ok(chunk));
                        }
                    }
                    me.buffer.extend_from_slice(&chunk);
                }
                Some(Err(err)) => return Poll::Ready(Err(err)),
                None => {
                    return Poll::Ready(Ok(std::mem::take(&mut me.buffer).freeze()));
                }
            }
        }
    }
}
