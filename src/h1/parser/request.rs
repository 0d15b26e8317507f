use bytes::{Buf, BytesMut};

use super::error::ParseError;
use super::matches;
use crate::common::{ByteStr, ParseResult};
use crate::http::{Method, Version};

macro_rules! err {
    ($variant:ident) => {
        ParseResult::Err(ParseError::$variant)
    };
}

const VERSION_SIZE: usize = b"HTTP/1.1".len();

/// Decoded request line.
#[derive(Debug)]
pub struct Reqline {
    pub method: Method,
    pub target: ByteStr,
    pub version: Version,
}

/// Parse a request line (`GET /path HTTP/1.1\r\n`) off the buffer.
///
/// Consumes the line on success, leaves the buffer untouched on
/// [`ParseResult::Pending`].
pub fn parse_reqline(bytes: &mut BytesMut) -> ParseResult<Reqline, ParseError> {
    // delimiter first: the whole line must be buffered
    let Some(lf) = bytes.iter().position(|&b| b == b'\n') else {
        return ParseResult::Pending;
    };
    let line_len = match lf.checked_sub(1) {
        Some(before) if bytes[before] == b'\r' => before,
        // tolerate a bare LF delimiter
        _ => lf,
    };

    let mut line = bytes.split_to(lf + 1);
    line.truncate(line_len);

    // ===== method =====

    let Some(sp) = line.iter().position(|&b| b == b' ') else {
        return err!(InvalidSeparator);
    };
    if line[..sp].iter().any(|&b| !matches::is_token(b)) {
        return err!(InvalidSeparator);
    }
    let Some(method) = Method::from_bytes(&line[..sp]) else {
        return err!(UnknownMethod);
    };
    line.advance(sp + 1);

    // ===== version =====

    let Some((rest, version)) = line.split_last_chunk::<VERSION_SIZE>() else {
        return err!(InvalidSeparator);
    };
    let Some(version) = Version::from_bytes(version) else {
        return err!(UnsupportedVersion);
    };
    let Some(&b' ') = rest.last() else {
        return err!(InvalidSeparator);
    };
    line.truncate(line_len - sp - 1 - VERSION_SIZE - 1);

    // ===== target =====

    if line.is_empty() || line.iter().any(|&b| !matches::is_target(b)) {
        return err!(InvalidTarget);
    }
    // SAFETY: target charset is ASCII
    let target = unsafe { ByteStr::from_utf8_unchecked(line.freeze()) };

    ParseResult::Ok(Reqline {
        method,
        target,
        version,
    })
}
