//! HTTP Message Bodies.
//!
//! Bodies are lazy, demand driven byte streams. A producer only emits a
//! chunk when the downstream requests one, and dropping a consumer
//! releases every pending chunk.
//!
//! ## Core
//!
//! - [`Body`] the trait that represents a message body
//! - [`Frame`] a single frame of a message body
//!
//! ## Implementations
//!
//! - [`Incoming`] the request body, streamed or buffered
//! - [`OutBody`] the response body: buffered bytes, a byte stream, a file
//!   region, a server-sent event stream, or empty
mod frame;
mod full;

// === HTTP framing ===
mod chunked;
mod coder;

// === IO ===
pub(crate) mod handle;
mod incoming;
mod collect;

// === response bodies ===
mod out;
mod file;
mod sse;
mod asset;

pub mod error;

pub use frame::Frame;
pub use full::Full;
pub use incoming::Incoming;
pub use collect::Collect;
pub use out::OutBody;
pub use file::FileRegion;
pub use sse::{SseEvent, SseEventBuilder};
pub use asset::Asset;

pub(crate) use chunked::ChunkedDecoder;
pub(crate) use coder::BodyCoder;

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Buf;

#[allow(clippy::type_complexity)]
pub trait Body {
    type Data: Buf;

    type Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>>;

    fn is_end_stream(&self) -> bool;

    fn size_hint(&self) -> (u64, Option<u64>);
}

/// HTTP message body framing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Codec {
    Chunked,
    ContentLength(u64),
}
