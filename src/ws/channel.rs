//! User facing views over an open WebSocket.
//!
//! [`Inbound`] exposes mutually exclusive subscriptions to raw frames or
//! assembled messages; [`Outbound`] accepts either a frame writer or a
//! message writer, not both. The exclusivity is deterministic: a second
//! claim fails with [`WsError::AlreadySubscribed`].
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use super::error::WsError;
use super::frame::{Frame, OpCode};

/// Kind of a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Binary,
}

/// A complete data message: a TEXT or BINARY frame followed by its
/// continuations.
///
/// Consumption is exclusive by construction: the message moves into
/// exactly one of [`into_frames`], [`into_bytes`] or [`into_text`].
///
/// [`into_frames`]: Message::into_frames
/// [`into_bytes`]: Message::into_bytes
/// [`into_text`]: Message::into_text
#[derive(Debug, Clone)]
pub struct Message {
    kind: MessageKind,
    frames: Vec<Frame>,
}

impl Message {
    /// Create a single frame TEXT message.
    pub fn text(text: impl Into<String>) -> Message {
        Self {
            kind: MessageKind::Text,
            frames: vec![Frame::text(Bytes::from(text.into().into_bytes()))],
        }
    }

    /// Create a single frame BINARY message.
    pub fn binary(payload: impl Into<Bytes>) -> Message {
        Self {
            kind: MessageKind::Binary,
            frames: vec![Frame::binary(payload)],
        }
    }

    pub(crate) fn from_frames(kind: MessageKind, frames: Vec<Frame>) -> Message {
        Self { kind, frames }
    }

    /// Returns the message kind.
    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Total payload size across frames.
    pub fn len(&self) -> usize {
        self.frames.iter().map(|f| f.payload().len()).sum()
    }

    /// Returns `true` for an empty payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume as the underlying frame sequence.
    #[inline]
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Consume as contiguous payload bytes.
    pub fn into_bytes(self) -> Bytes {
        match self.frames.len() {
            1 => self.frames.into_iter().next().unwrap().into_payload(),
            _ => {
                let mut out = BytesMut::with_capacity(self.len());
                for frame in self.frames {
                    out.extend_from_slice(frame.payload());
                }
                out.freeze()
            }
        }
    }

    /// Consume as decoded text.
    ///
    /// Inbound TEXT messages were already validated on receive; this
    /// re-checks so locally constructed messages cannot lie.
    pub fn into_text(self) -> Result<String, WsError> {
        if self.kind != MessageKind::Text {
            return Err(WsError::InvalidUtf8);
        }
        let bytes = self.into_bytes();
        match String::from_utf8(Vec::from(bytes)) {
            Ok(text) => Ok(text),
            Err(_) => Err(WsError::InvalidUtf8),
        }
    }
}

// ===== Inbound =====

/// Event delivered by the session loop.
#[derive(Debug)]
pub(crate) enum InboundEvent {
    /// A validated data or control frame.
    Frame(Frame),
    /// The peer sent CLOSE.
    Closed(Option<(u16, String)>),
}

/// Inbound side of an open WebSocket.
#[derive(Debug)]
pub struct Inbound {
    rx: mpsc::Receiver<InboundEvent>,
    claimed: bool,
}

impl Inbound {
    pub(crate) fn new(rx: mpsc::Receiver<InboundEvent>) -> Inbound {
        Self { rx, claimed: false }
    }

    fn claim(&mut self) -> Result<(), WsError> {
        match std::mem::replace(&mut self.claimed, true) {
            false => Ok(()),
            true => Err(WsError::AlreadySubscribed),
        }
    }

    /// Subscribe to raw frames, controls included.
    pub fn frames(&mut self) -> Result<Frames<'_>, WsError> {
        self.claim()?;
        Ok(Frames { rx: &mut self.rx })
    }

    /// Subscribe to assembled data messages.
    pub fn messages(&mut self) -> Result<Messages<'_>, WsError> {
        self.claim()?;
        Ok(Messages {
            rx: &mut self.rx,
            filter: None,
        })
    }

    /// Subscribe to TEXT messages only.
    pub fn text_messages(&mut self) -> Result<Messages<'_>, WsError> {
        self.claim()?;
        Ok(Messages {
            rx: &mut self.rx,
            filter: Some(MessageKind::Text),
        })
    }

    /// Subscribe to BINARY messages only.
    pub fn binary_messages(&mut self) -> Result<Messages<'_>, WsError> {
        self.claim()?;
        Ok(Messages {
            rx: &mut self.rx,
            filter: Some(MessageKind::Binary),
        })
    }
}

/// Raw frame subscription.
#[derive(Debug)]
pub struct Frames<'a> {
    rx: &'a mut mpsc::Receiver<InboundEvent>,
}

impl Frames<'_> {
    /// Next frame, `None` once the peer closed or the session ended.
    pub async fn next(&mut self) -> Option<Frame> {
        match self.rx.recv().await? {
            InboundEvent::Frame(frame) => Some(frame),
            InboundEvent::Closed(_) => None,
        }
    }
}

/// Assembled message subscription.
#[derive(Debug)]
pub struct Messages<'a> {
    rx: &'a mut mpsc::Receiver<InboundEvent>,
    filter: Option<MessageKind>,
}

impl Messages<'_> {
    /// Next message, `None` once the peer closed or the session ended.
    ///
    /// Frames of a fragmented message are buffered until FIN; control
    /// frames in between are skipped.
    pub async fn next(&mut self) -> Option<Message> {
        let mut pending: Option<(MessageKind, Vec<Frame>)> = None;
        loop {
            let frame = match self.rx.recv().await? {
                InboundEvent::Frame(frame) => frame,
                InboundEvent::Closed(_) => return None,
            };
            let fin = frame.fin();
            match frame.opcode() {
                OpCode::Text if pending.is_none() => {
                    pending = Some((MessageKind::Text, vec![frame]));
                }
                OpCode::Binary if pending.is_none() => {
                    pending = Some((MessageKind::Binary, vec![frame]));
                }
                OpCode::Continuation => match &mut pending {
                    Some((_, frames)) => frames.push(frame),
                    None => continue,
                },
                // the session already enforces fragmentation rules;
                // anything else here is a control frame
                _ => continue,
            }
            if fin {
                let (kind, frames) = pending.take().unwrap();
                if self.filter.is_none_or(|want| want == kind) {
                    return Some(Message::from_frames(kind, frames));
                }
            }
        }
    }
}

// ===== Outbound =====

/// Command sent to the session loop.
#[derive(Debug)]
pub(crate) enum Outgoing {
    Frame(Frame),
    Message(Message),
    Close(u16, String),
}

/// Outbound side of an open WebSocket.
#[derive(Debug)]
pub struct Outbound {
    tx: mpsc::Sender<Outgoing>,
    claimed: bool,
}

impl Outbound {
    pub(crate) fn new(tx: mpsc::Sender<Outgoing>) -> Outbound {
        Self { tx, claimed: false }
    }

    fn claim(&mut self) -> Result<(), WsError> {
        match std::mem::replace(&mut self.claimed, true) {
            false => Ok(()),
            true => Err(WsError::AlreadySubscribed),
        }
    }

    /// Claim the outbound side as a raw frame writer.
    pub fn frames(&mut self) -> Result<FrameSink, WsError> {
        self.claim()?;
        Ok(FrameSink {
            tx: self.tx.clone(),
        })
    }

    /// Claim the outbound side as a message writer.
    pub fn messages(&mut self) -> Result<MessageSink, WsError> {
        self.claim()?;
        Ok(MessageSink {
            tx: self.tx.clone(),
        })
    }
}

/// Raw frame writer.
///
/// Payloads larger than the configured maximum frame size are split into
/// continuation frames by the session.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::Sender<Outgoing>,
}

impl FrameSink {
    /// Queue one frame.
    pub async fn send(&self, frame: Frame) -> Result<(), WsError> {
        if frame.opcode().is_control() && frame.payload().len() > 125 {
            return Err(WsError::ControlTooLarge);
        }
        self.tx
            .send(Outgoing::Frame(frame))
            .await
            .map_err(|_| WsError::ChannelClosed)
    }
}

/// Message writer.
#[derive(Debug, Clone)]
pub struct MessageSink {
    tx: mpsc::Sender<Outgoing>,
}

impl MessageSink {
    /// Queue one message.
    pub async fn send(&self, message: Message) -> Result<(), WsError> {
        self.tx
            .send(Outgoing::Message(message))
            .await
            .map_err(|_| WsError::ChannelClosed)
    }
}

/// Close initiator, clonable, second call is a no-op.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    tx: mpsc::Sender<Outgoing>,
    once: Arc<AtomicBool>,
}

impl CloseHandle {
    pub(crate) fn new(tx: mpsc::Sender<Outgoing>) -> CloseHandle {
        Self {
            tx,
            once: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the close dance with the given code and reason.
    pub async fn close(&self, code: u16, reason: &str) {
        if self.once.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(Outgoing::Close(code, reason.to_owned())).await;
    }
}

// ===== WebSocket =====

/// An open WebSocket handed to the upgrade handler.
#[derive(Debug)]
pub struct WebSocket {
    inbound: Inbound,
    outbound: Outbound,
    close: CloseHandle,
    subprotocol: Option<String>,
}

impl WebSocket {
    pub(crate) fn new(
        inbound: Inbound,
        outbound: Outbound,
        close: CloseHandle,
        subprotocol: Option<String>,
    ) -> WebSocket {
        Self {
            inbound,
            outbound,
            close,
            subprotocol,
        }
    }

    /// The negotiated subprotocol.
    #[inline]
    pub fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }

    /// Inbound side.
    #[inline]
    pub fn inbound(&mut self) -> &mut Inbound {
        &mut self.inbound
    }

    /// Outbound side.
    #[inline]
    pub fn outbound(&mut self) -> &mut Outbound {
        &mut self.outbound
    }

    /// Split into both sides for concurrent use.
    #[inline]
    pub fn split(&mut self) -> (&mut Inbound, &mut Outbound) {
        (&mut self.inbound, &mut self.outbound)
    }

    /// Close initiator.
    #[inline]
    pub fn closer(&self) -> CloseHandle {
        self.close.clone()
    }

    /// Start the close dance.
    #[inline]
    pub async fn close(&self, code: u16, reason: &str) {
        self.close.close(code, reason).await
    }
}
