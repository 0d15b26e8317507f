//! WebSocket errors.

/// WebSocket protocol or session error.
#[derive(Debug)]
pub enum WsError {
    /// Transport failure.
    Io(std::io::Error),
    /// The peer went away without a close frame.
    UnexpectedEof,
    /// A frame arrived with reserved bits set.
    ReservedBits,
    /// A frame arrived with an unknown opcode.
    UnknownOpCode,
    /// A client frame arrived unmasked.
    Unmasked,
    /// A control frame arrived fragmented.
    ControlFragmented,
    /// A control frame payload exceeds 125 bytes.
    ControlTooLarge,
    /// A frame payload exceeds the supported size.
    FrameTooLarge,
    /// A TEXT message carried invalid UTF-8.
    InvalidUtf8,
    /// A close frame carried a malformed payload.
    InvalidClose,
    /// A continuation arrived without an open message, or a new data
    /// frame interrupted an open one.
    FragmentState,
    /// A second subscription was attempted on an exclusive view.
    AlreadySubscribed,
    /// The session is gone, the frame cannot be delivered.
    ChannelClosed,
}

impl std::error::Error for WsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for WsError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::UnexpectedEof => f.write_str("unexpected eof"),
            Self::ReservedBits => f.write_str("reserved bits not zero"),
            Self::UnknownOpCode => f.write_str("unknown opcode"),
            Self::Unmasked => f.write_str("client frame is unmasked"),
            Self::ControlFragmented => f.write_str("control frame cannot be fragmented"),
            Self::ControlTooLarge => f.write_str("control frame too large"),
            Self::FrameTooLarge => f.write_str("frame too large"),
            Self::InvalidUtf8 => f.write_str("invalid utf-8 in text message"),
            Self::InvalidClose => f.write_str("invalid close payload"),
            Self::FragmentState => f.write_str("invalid fragmentation sequence"),
            Self::AlreadySubscribed => f.write_str("inbound view already subscribed"),
            Self::ChannelClosed => f.write_str("websocket session closed"),
        }
    }
}

impl From<std::io::Error> for WsError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
