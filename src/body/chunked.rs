use bytes::{Buf, BytesMut};
use std::task::Poll;

use super::error::BodyError;
use crate::headers::HeaderMap;

const MAX_CHUNK_SIZE: u64 = u64::MAX >> 1;

/// Incremental decoder for chunked transfer coding.
///
/// Works on chunk reads: given an unknown amount of buffered bytes, each
/// call consumes as much framing as available and returns `Pending` when
/// more IO is required.
#[derive(Clone, Debug)]
pub(crate) struct ChunkedDecoder {
    state: State,
}

#[derive(Clone, Debug)]
enum State {
    /// Expecting a `<hex-size>[;ext]CRLF` line.
    Size,
    /// Streaming the current chunk, `remaining` payload bytes plus the
    /// closing CRLF.
    Chunk { remaining: u64 },
    /// Consuming trailer lines after the zero size chunk.
    Trailers,
    Eof,
}

impl ChunkedDecoder {
    pub(crate) fn new() -> Self {
        Self { state: State::Size }
    }

    pub(crate) fn is_eof(&self) -> bool {
        matches!(self.state, State::Eof)
    }

    /// Decode the next piece of chunk payload.
    ///
    /// Returns `None` when the terminal chunk and its trailer section have
    /// been consumed.
    pub(crate) fn decode(
        &mut self,
        buffer: &mut BytesMut,
    ) -> Poll<Option<Result<BytesMut, BodyError>>> {
        loop {
            match &mut self.state {
                State::Size => {
                    let Some(line_end) = find_lf(buffer) else {
                        return Poll::Pending;
                    };
                    let digits_len = buffer
                        .iter()
                        .position(|b| !b.is_ascii_hexdigit())
                        .unwrap_or(buffer.len());
                    if digits_len == 0 || digits_len > 16 {
                        return Poll::Ready(Some(Err(BodyError::InvalidChunked)));
                    }
                    // SAFETY: hex digits are ASCII
                    let digits = unsafe { str::from_utf8_unchecked(&buffer[..digits_len]) };
                    let Ok(size) = u64::from_str_radix(digits, 16) else {
                        return Poll::Ready(Some(Err(BodyError::InvalidChunked)));
                    };
                    if size > MAX_CHUNK_SIZE {
                        return Poll::Ready(Some(Err(BodyError::ChunkTooLarge)));
                    }
                    // past the digits only a chunk extension or CRLF may follow
                    match buffer[digits_len] {
                        b'\r' | b'\n' | b';' => {}
                        _ => return Poll::Ready(Some(Err(BodyError::InvalidChunked))),
                    }
                    buffer.advance(line_end + 1);
                    self.state = match size {
                        0 => State::Trailers,
                        _ => State::Chunk { remaining: size },
                    };
                }
                State::Chunk { remaining } => {
                    if buffer.is_empty() {
                        return Poll::Pending;
                    }
                    let len = buffer.len() as u64;
                    if len <= *remaining {
                        *remaining -= len;
                        return Poll::Ready(Some(Ok(buffer.split())));
                    }
                    // the buffer holds the end of this chunk, require the
                    // closing CRLF before handing the last piece out
                    let rem = *remaining as usize;
                    if buffer.len() < rem + 2 {
                        return Poll::Pending;
                    }
                    if &buffer[rem..rem + 2] != b"\r\n" {
                        return Poll::Ready(Some(Err(BodyError::InvalidChunked)));
                    }
                    self.state = State::Size;
                    let chunk = buffer.split_to(rem);
                    buffer.advance(2);
                    if chunk.is_empty() {
                        continue;
                    }
                    return Poll::Ready(Some(Ok(chunk)));
                }
                State::Trailers => {
                    let Some(line_end) = find_lf(buffer) else {
                        return Poll::Pending;
                    };
                    let line_len = match buffer[..line_end].last() {
                        Some(b'\r') => line_end - 1,
                        _ => line_end,
                    };
                    let empty = line_len == 0;
                    buffer.advance(line_end + 1);
                    if empty {
                        self.state = State::Eof;
                        return Poll::Ready(None);
                    }
                    // trailer fields of the request body are consumed and
                    // discarded
                }
                State::Eof => return Poll::Ready(None),
            }
        }
    }
}

fn find_lf(buffer: &BytesMut) -> Option<usize> {
    buffer.iter().position(|&b| b == b'\n')
}

// ===== Encoding =====

/// Append a `<hex-size>\r\n` chunk header.
pub(crate) fn write_chunk_header(out: &mut BytesMut, size: usize) {
    let mut digits = [0u8; 16];
    let mut at = digits.len();
    let mut v = size;
    loop {
        at -= 1;
        digits[at] = b"0123456789abcdef"[v & 0xf];
        v >>= 4;
        if v == 0 {
            break;
        }
    }
    out.extend_from_slice(&digits[at..]);
    out.extend_from_slice(b"\r\n");
}

/// Append a full data chunk.
pub(crate) fn write_chunk(out: &mut BytesMut, data: &[u8]) {
    if data.is_empty() {
        // an empty data chunk would terminate the body
        return;
    }
    write_chunk_header(out, data.len());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

/// Append the terminal chunk, with trailer fields when negotiated.
pub(crate) fn write_last_chunk(out: &mut BytesMut, trailers: Option<&HeaderMap>) {
    out.extend_from_slice(b"0\r\n");
    if let Some(trailers) = trailers {
        for (name, value) in trailers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderValue;

    fn decode_all(decoder: &mut ChunkedDecoder, buffer: &mut BytesMut) -> Vec<u8> {
        let mut out = Vec::new();
        while let Poll::Ready(Some(chunk)) = decoder.decode(buffer) {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[test]
    fn decode_simple() {
        let mut buffer = BytesMut::from(&b"3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert_eq!(decode_all(&mut decoder, &mut buffer), b"abcde");
        assert!(decoder.is_eof());
        assert!(buffer.is_empty());
    }

    #[test]
    fn decode_incremental() {
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::from(&b"4\r\nab"[..]);
        assert_eq!(&decode_all(&mut decoder, &mut buffer)[..], b"ab");
        assert!(decoder.decode(&mut buffer).is_pending());

        buffer.extend_from_slice(b"cd\r\n0\r\n\r\n");
        assert_eq!(&decode_all(&mut decoder, &mut buffer)[..], b"cd");
        assert!(decoder.is_eof());
    }

    #[test]
    fn decode_with_extension_and_trailers() {
        let mut buffer =
            BytesMut::from(&b"5;ext=1\r\nhello\r\n0\r\nX-Sum: 5\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert_eq!(decode_all(&mut decoder, &mut buffer), b"hello");
        assert!(decoder.is_eof());
        assert!(buffer.is_empty());
    }

    #[test]
    fn decode_rejects_bad_delimiter() {
        let mut buffer = BytesMut::from(&b"3\r\nabcXY"[..]);
        let mut decoder = ChunkedDecoder::new();
        buffer.extend_from_slice(b"\r\n");
        let first = decoder.decode(&mut buffer);
        assert!(matches!(first, Poll::Ready(Some(Err(BodyError::InvalidChunked)))));
    }

    #[test]
    fn encode_chunks() {
        let mut out = BytesMut::new();
        write_chunk(&mut out, b"abc");
        write_chunk(&mut out, b"de");
        write_chunk(&mut out, b"f");
        write_last_chunk(&mut out, None);
        assert_eq!(&out[..], b"3\r\nabc\r\n2\r\nde\r\n1\r\nf\r\n0\r\n\r\n");
    }

    #[test]
    fn encode_trailers() {
        let mut trailers = HeaderMap::new();
        trailers.append("X-Sum", HeaderValue::from_static("6"));
        let mut out = BytesMut::new();
        write_last_chunk(&mut out, Some(&trailers));
        assert_eq!(&out[..], b"0\r\nX-Sum: 6\r\n\r\n");
    }

    #[test]
    fn hex_sizes() {
        let mut out = BytesMut::new();
        write_chunk_header(&mut out, 255);
        assert_eq!(&out[..], b"ff\r\n");
        out.clear();
        write_chunk_header(&mut out, 16);
        assert_eq!(&out[..], b"10\r\n");
    }
}
