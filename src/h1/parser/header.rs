use bytes::{Buf, BytesMut};

use super::error::ParseError;
use super::matches;
use crate::common::ParseResult;

/// A raw header field, bytes still owned by the read buffer.
#[derive(Debug)]
pub struct HeaderField {
    pub name: BytesMut,
    pub value: BytesMut,
}

/// Parse one header field line off the buffer.
///
/// Returns `Ok(None)` on the empty line terminating the field section.
/// Consumes the line on success, leaves the buffer untouched on
/// [`ParseResult::Pending`].
pub fn parse_header(bytes: &mut BytesMut) -> ParseResult<Option<HeaderField>, ParseError> {
    let Some(lf) = bytes.iter().position(|&b| b == b'\n') else {
        return ParseResult::Pending;
    };
    let line_len = match lf.checked_sub(1) {
        Some(before) if bytes[before] == b'\r' => before,
        // tolerate a bare LF delimiter
        _ => lf,
    };

    if line_len == 0 {
        bytes.advance(lf + 1);
        return ParseResult::Ok(None);
    }

    let mut line = bytes.split_to(lf + 1);
    line.truncate(line_len);

    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return ParseResult::Err(ParseError::InvalidHeaderName);
    };
    if colon == 0 || line[..colon].iter().any(|&b| !matches::is_token(b)) {
        return ParseResult::Err(ParseError::InvalidHeaderName);
    }

    let mut value = line.split_off(colon + 1);
    let name = {
        line.truncate(colon);
        line
    };

    // trim optional whitespace around the value
    while let [b' ' | b'\t', ..] = &value[..] {
        value.advance(1);
    }
    while let [.., b' ' | b'\t'] = &value[..] {
        value.truncate(value.len() - 1);
    }

    if value.iter().any(|&b| !matches::is_field_value(b)) {
        return ParseResult::Err(ParseError::InvalidHeaderValue);
    }

    ParseResult::Ok(Some(HeaderField { name, value }))
}
