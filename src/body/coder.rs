// rfc-editor.org/rfc/rfc9112.html#name-message-body-length
use bytes::BytesMut;
use std::task::Poll;

use super::chunked::{ChunkedDecoder, write_chunk, write_last_chunk};
use super::error::BodyError;
use super::handle::SendHandle;
use super::{Codec, Incoming};
use crate::headers::HeaderMap;
use crate::headers::standard::{CONTENT_LENGTH, TRANSFER_ENCODING};

/// Message body framing, decoding inbound chunks and encoding outbound
/// ones.
///
/// The framing mode is chosen per [RFC9112]: a `Content-Length` without
/// chunked `Transfer-Encoding` is a fixed length body, a chunked
/// `Transfer-Encoding` is a chunked body, neither is an empty request
/// body.
///
/// [RFC9112]: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
#[derive(Debug)]
pub(crate) struct BodyCoder {
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    Chunked(ChunkedDecoder),
    ContentLength(u64),
}

impl BodyCoder {
    pub(crate) fn empty() -> Self {
        Self {
            kind: Kind::ContentLength(0),
        }
    }

    pub(crate) fn chunked() -> Self {
        Self {
            kind: Kind::Chunked(ChunkedDecoder::new()),
        }
    }

    pub(crate) fn fixed(len: u64) -> Self {
        Self {
            kind: Kind::ContentLength(len),
        }
    }

    /// Choose the framing for a request from its headers.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self, BodyError> {
        let mut content_lengths = headers.get_all(CONTENT_LENGTH);
        let mut transfer_encodings = headers.get_all(TRANSFER_ENCODING).peekable();

        let kind = match (content_lengths.next(), transfer_encodings.peek().is_some()) {
            (None, false) => Kind::ContentLength(0),
            (None, true) => {
                let chunked = transfer_encodings.all(|value| {
                    value
                        .as_bytes()
                        .split(|&b| b == b',')
                        .all(|coding| coding.trim_ascii().eq_ignore_ascii_case(b"chunked"))
                });
                if !chunked {
                    return Err(BodyError::UnknownCodings);
                }
                Kind::Chunked(ChunkedDecoder::new())
            }
            (Some(length), false) => {
                if content_lengths.next().is_some() {
                    return Err(BodyError::InvalidContentLength);
                }
                let length = length
                    .to_str()
                    .and_then(|s| s.parse::<u64>().ok())
                    .ok_or(BodyError::InvalidContentLength)?;
                Kind::ContentLength(length)
            }
            (Some(_), true) => return Err(BodyError::InvalidCodings),
        };
        Ok(Self { kind })
    }

    /// Whether more payload bytes are expected.
    pub(crate) fn has_remaining(&self) -> bool {
        match &self.kind {
            Kind::Chunked(decoder) => !decoder.is_eof(),
            Kind::ContentLength(len) => *len != 0,
        }
    }

    pub(crate) fn size_hint(&self) -> Option<u64> {
        match &self.kind {
            Kind::Chunked(_) => None,
            Kind::ContentLength(len) => Some(*len),
        }
    }

    pub(crate) const fn coding(&self) -> Codec {
        match self.kind {
            Kind::Chunked(_) => Codec::Chunked,
            Kind::ContentLength(len) => Codec::ContentLength(len),
        }
    }

    /// Build the request body handed to the service.
    ///
    /// A body already complete in `buffer` is detached from the
    /// connection, anything else reads through the shared handle.
    pub(crate) fn build_body(
        &mut self,
        buffer: &mut BytesMut,
        shared: &mut SendHandle,
    ) -> Incoming {
        match &mut self.kind {
            Kind::ContentLength(0) => Incoming::empty(),
            Kind::ContentLength(len) => {
                if buffer.len() as u64 >= *len {
                    let body = buffer.split_to(*len as usize);
                    *len = 0;
                    Incoming::new(body.freeze())
                } else {
                    let hint = Some(*len);
                    Incoming::from_handle(shared.attach(), hint)
                }
            }
            Kind::Chunked(_) => Incoming::from_handle(shared.attach(), None),
        }
    }

    /// Decode the next piece of request body from the read buffer.
    ///
    /// Returns `Pending` when more IO is required, `None` at end of body.
    pub(crate) fn decode(
        &mut self,
        buffer: &mut BytesMut,
    ) -> Poll<Option<Result<BytesMut, BodyError>>> {
        match &mut self.kind {
            Kind::Chunked(decoder) => decoder.decode(buffer),
            Kind::ContentLength(0) => Poll::Ready(None),
            Kind::ContentLength(remaining) => {
                if buffer.is_empty() {
                    return Poll::Pending;
                }
                let take = (*remaining).min(buffer.len() as u64);
                *remaining -= take;
                Poll::Ready(Some(Ok(buffer.split_to(take as usize))))
            }
        }
    }

    /// Encode an outbound body chunk into the write buffer.
    pub(crate) fn encode(&mut self, data: &[u8], out: &mut BytesMut) -> Result<(), BodyError> {
        match &mut self.kind {
            Kind::Chunked(_) => {
                write_chunk(out, data);
                Ok(())
            }
            Kind::ContentLength(remaining) => match remaining.checked_sub(data.len() as u64) {
                Some(rem) => {
                    *remaining = rem;
                    out.extend_from_slice(data);
                    Ok(())
                }
                None => Err(BodyError::InvalidSizeHint),
            },
        }
    }

    /// Terminate the outbound body.
    ///
    /// Chunked bodies get their terminal chunk, trailer fields included
    /// when negotiated.
    pub(crate) fn finish(
        &mut self,
        out: &mut BytesMut,
        trailers: Option<&HeaderMap>,
    ) -> Result<(), BodyError> {
        match &mut self.kind {
            Kind::Chunked(_) => {
                write_last_chunk(out, trailers);
                Ok(())
            }
            Kind::ContentLength(0) => Ok(()),
            Kind::ContentLength(_) => Err(BodyError::InvalidSizeHint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderValue;
    use crate::headers::standard::{CONTENT_LENGTH, TRANSFER_ENCODING};

    #[test]
    fn framing_choice() {
        let mut headers = HeaderMap::new();
        assert_eq!(BodyCoder::from_headers(&headers).unwrap().coding(), Codec::ContentLength(0));

        headers.append(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(
            BodyCoder::from_headers(&headers).unwrap().coding(),
            Codec::ContentLength(42)
        );

        let mut headers = HeaderMap::new();
        headers.append(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert_eq!(BodyCoder::from_headers(&headers).unwrap().coding(), Codec::Chunked);
    }

    #[test]
    fn conflicting_framing_rejected() {
        let mut headers = HeaderMap::new();
        headers.append(CONTENT_LENGTH, HeaderValue::from_static("1"));
        headers.append(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert!(matches!(
            BodyCoder::from_headers(&headers),
            Err(BodyError::InvalidCodings)
        ));

        let mut headers = HeaderMap::new();
        headers.append(CONTENT_LENGTH, HeaderValue::from_static("1"));
        headers.append(CONTENT_LENGTH, HeaderValue::from_static("2"));
        assert!(matches!(
            BodyCoder::from_headers(&headers),
            Err(BodyError::InvalidContentLength)
        ));

        let mut headers = HeaderMap::new();
        headers.append(TRANSFER_ENCODING, HeaderValue::from_static("gzip"));
        assert!(matches!(
            BodyCoder::from_headers(&headers),
            Err(BodyError::UnknownCodings)
        ));
    }

    #[test]
    fn fixed_length_overflow_rejected() {
        let mut coder = BodyCoder::fixed(3);
        let mut out = BytesMut::new();
        coder.encode(b"ab", &mut out).unwrap();
        assert!(matches!(coder.encode(b"cd", &mut out), Err(BodyError::InvalidSizeHint)));
    }
}
