//! WebSocket frame codec ([RFC6455 Section 5]).
//!
//! [RFC6455 Section 5]: <https://www.rfc-editor.org/rfc/rfc6455.html#section-5>
use bytes::{Buf, Bytes, BytesMut};

use super::error::WsError;
use super::mask;

/// Close payload capacity minus the 2 byte code.
pub(crate) const MAX_CLOSE_REASON: usize = 123;
const MAX_CONTROL_PAYLOAD: usize = 125;

// ===== OpCode =====

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl OpCode {
    pub(crate) fn try_from_byte(byte: u8) -> Option<OpCode> {
        use OpCode::*;
        match byte {
            0x0 => Some(Continuation),
            0x1 => Some(Text),
            0x2 => Some(Binary),
            0x8 => Some(Close),
            0x9 => Some(Ping),
            0xA => Some(Pong),
            _ => None,
        }
    }

    /// Close, ping and pong frames.
    pub fn is_control(&self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

// ===== Frame =====

/// A single WebSocket frame.
///
/// The payload is reference counted; cloning a frame shares it.
#[derive(Debug, Clone)]
pub struct Frame {
    fin: bool,
    opcode: OpCode,
    payload: Bytes,
}

impl Frame {
    /// Create a frame.
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Frame {
        Self {
            fin,
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a final TEXT frame.
    #[inline]
    pub fn text(payload: impl Into<Bytes>) -> Frame {
        Self::new(true, OpCode::Text, payload)
    }

    /// Create a final BINARY frame.
    #[inline]
    pub fn binary(payload: impl Into<Bytes>) -> Frame {
        Self::new(true, OpCode::Binary, payload)
    }

    /// Create a PING frame.
    #[inline]
    pub fn ping(payload: impl Into<Bytes>) -> Frame {
        Self::new(true, OpCode::Ping, payload)
    }

    /// Create a PONG frame.
    #[inline]
    pub fn pong(payload: impl Into<Bytes>) -> Frame {
        Self::new(true, OpCode::Pong, payload)
    }

    /// Create a CLOSE frame with `code (2B big-endian) || reason (UTF-8)`,
    /// the reason truncated to fit the control payload.
    pub fn close(code: u16, reason: &str) -> Frame {
        let mut reason_len = reason.len().min(MAX_CLOSE_REASON);
        // truncate on a character boundary
        while !reason.is_char_boundary(reason_len) {
            reason_len -= 1;
        }
        let mut payload = BytesMut::with_capacity(2 + reason_len);
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(&reason.as_bytes()[..reason_len]);
        Self::new(true, OpCode::Close, payload.freeze())
    }

    /// Returns the FIN flag.
    #[inline]
    pub fn fin(&self) -> bool {
        self.fin
    }

    /// Returns the opcode.
    #[inline]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Returns the payload.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consumes self into the payload.
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Decode a CLOSE payload into `(code, reason)`.
    pub fn close_code(&self) -> Result<Option<(u16, String)>, WsError> {
        match self.payload.len() {
            0 => Ok(None),
            1 => Err(WsError::InvalidClose),
            _ => {
                let code = u16::from_be_bytes([self.payload[0], self.payload[1]]);
                let reason = std::str::from_utf8(&self.payload[2..])
                    .map_err(|_| WsError::InvalidClose)?;
                Ok(Some((code, reason.to_owned())))
            }
        }
    }
}

// ===== Parse =====

/// Parse one client frame off the buffer, unmasking the payload.
///
/// Returns `None` when the buffer does not hold a complete frame yet.
pub(crate) fn parse(buf: &mut BytesMut, max_size: usize) -> Result<Option<Frame>, WsError> {
    const MASK_SIZE: usize = 4;

    let Some(headline) = buf.get(..2) else {
        return Ok(None);
    };

    let fin = headline[0] & 0b1000_0000 != 0;
    let rsv = headline[0] & 0b0111_0000;
    let opcode_byte = headline[0] & 0b0000_1111;
    let masked = headline[1] & 0b1000_0000 != 0;
    let length_code = headline[1] & 0b0111_1111;

    if rsv != 0 {
        return Err(WsError::ReservedBits);
    }
    let Some(opcode) = OpCode::try_from_byte(opcode_byte) else {
        return Err(WsError::UnknownOpCode);
    };
    // frames from clients must be masked
    if !masked {
        return Err(WsError::Unmasked);
    }
    if opcode.is_control() {
        if !fin {
            return Err(WsError::ControlFragmented);
        }
        if length_code as usize > MAX_CONTROL_PAYLOAD {
            return Err(WsError::ControlTooLarge);
        }
    }

    let extra_len_size = match length_code {
        126 => 2,
        127 => 8,
        _ => 0,
    };
    let header_size = 2 + extra_len_size + MASK_SIZE;
    let Some(mut header) = buf.get(2..header_size) else {
        return Ok(None);
    };

    let payload_len = match extra_len_size {
        0 => usize::from(length_code),
        2 => header.get_u16() as usize,
        _ => {
            let len = header.get_u64();
            usize::try_from(len).map_err(|_| WsError::FrameTooLarge)?
        }
    };
    let mask_key = header.get_u32().to_be_bytes();

    if payload_len > max_size {
        return Err(WsError::FrameTooLarge);
    }
    if buf.len() < header_size + payload_len {
        buf.reserve(header_size + payload_len - buf.len());
        return Ok(None);
    }

    buf.advance(header_size);
    let mut payload = buf.split_to(payload_len);
    mask::unmask(&mut payload, mask_key);

    Ok(Some(Frame::new(fin, opcode, payload.freeze())))
}

// ===== Encode =====

/// Encode a server frame (unmasked) into the buffer.
pub(crate) fn encode(frame: &Frame, out: &mut BytesMut) {
    let len = frame.payload.len();
    out.reserve(10 + len);
    out.extend_from_slice(&[(frame.fin as u8) << 7 | frame.opcode as u8]);
    match len {
        _ if len < 126 => {
            out.extend_from_slice(&[len as u8]);
        }
        _ if len < 65536 => {
            out.extend_from_slice(&[126]);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            out.extend_from_slice(&[127]);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    out.extend_from_slice(&frame.payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_payload(payload: &[u8], key: [u8; 4]) -> Vec<u8> {
        payload
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ key[i & 3])
            .collect()
    }

    /// Build a masked client frame by hand.
    fn client_frame(fin: bool, opcode: u8, payload: &[u8]) -> Vec<u8> {
        let key = [0x11, 0x22, 0x33, 0x44];
        let mut out = vec![(fin as u8) << 7 | opcode];
        match payload.len() {
            len if len < 126 => out.push(0x80 | len as u8),
            len if len < 65536 => {
                out.push(0x80 | 126);
                out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            len => {
                out.push(0x80 | 127);
                out.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }
        out.extend_from_slice(&key);
        out.extend_from_slice(&mask_payload(payload, key));
        out
    }

    #[test]
    fn parse_text_frame() {
        let mut buf = BytesMut::from(&client_frame(true, 0x1, b"ping")[..]);
        let frame = parse(&mut buf, 1 << 20).unwrap().unwrap();
        assert!(frame.fin());
        assert_eq!(frame.opcode(), OpCode::Text);
        assert_eq!(&frame.payload()[..], b"ping");
        assert!(buf.is_empty());
    }

    #[test]
    fn parse_incomplete() {
        let full = client_frame(true, 0x2, &[7u8; 300]);
        let mut buf = BytesMut::from(&full[..10]);
        assert!(parse(&mut buf, 1 << 20).unwrap().is_none());
        buf.extend_from_slice(&full[10..]);
        let frame = parse(&mut buf, 1 << 20).unwrap().unwrap();
        assert_eq!(frame.opcode(), OpCode::Binary);
        assert_eq!(frame.payload().len(), 300);
    }

    #[test]
    fn parse_rejects_unmasked() {
        let mut raw = client_frame(true, 0x1, b"x");
        raw[1] &= 0x7f; // clear the mask bit
        let mut buf = BytesMut::from(&raw[..]);
        assert!(matches!(parse(&mut buf, 1 << 20), Err(WsError::Unmasked)));
    }

    #[test]
    fn parse_rejects_oversized_control() {
        let raw = client_frame(true, 0x9, &[0u8; 126]);
        let mut buf = BytesMut::from(&raw[..]);
        assert!(matches!(parse(&mut buf, 1 << 20), Err(WsError::ControlTooLarge)));
    }

    #[test]
    fn parse_rejects_fragmented_control() {
        let raw = client_frame(false, 0x8, b"");
        let mut buf = BytesMut::from(&raw[..]);
        assert!(matches!(parse(&mut buf, 1 << 20), Err(WsError::ControlFragmented)));
    }

    #[test]
    fn close_reason_truncated() {
        let reason = "x".repeat(200);
        let frame = Frame::close(1000, &reason);
        assert_eq!(frame.payload().len(), 125);
        let (code, reason) = frame.close_code().unwrap().unwrap();
        assert_eq!(code, 1000);
        assert_eq!(reason.len(), 123);
    }

    #[test]
    fn encode_parse_header_shapes() {
        for len in [0usize, 125, 126, 65535, 65536] {
            let mut out = BytesMut::new();
            encode(&Frame::binary(vec![0u8; len]), &mut out);
            let expected_header = match len {
                _ if len < 126 => 2,
                _ if len < 65536 => 4,
                _ => 10,
            };
            assert_eq!(out.len(), expected_header + len, "payload {len}");
        }
    }
}
