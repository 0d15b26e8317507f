//! Session loop driving an upgraded connection.
//!
//! Everything touching the socket runs here, on the connection task. The
//! upgrade handler runs in its own task and talks to this loop through
//! the inbound/outbound channels.
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use super::WsHandlerFn;
use super::channel::{CloseHandle, Inbound, InboundEvent, Outbound, Outgoing, WebSocket};
use super::error::WsError;
use super::frame::{self, Frame, OpCode};
use super::utf8::Utf8Validator;
use crate::log::emit;

/// How long the peer gets to answer our CLOSE before the TCP connection
/// is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);
const CHANNEL_CAPACITY: usize = 32;
/// Hard cap on a single inbound frame payload.
const MAX_INBOUND_FRAME: usize = 64 << 20;

/// Drive an upgraded connection until the close dance completes.
///
/// `read_buf` may already hold bytes the peer sent right after the
/// handshake.
pub(crate) async fn run<IO>(
    io: &mut IO,
    read_buf: &mut BytesMut,
    handler: WsHandlerFn,
    subprotocol: Option<String>,
    max_frame_size: usize,
) -> Result<(), WsError>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    let (in_tx, in_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (out_tx, mut out_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let closer = CloseHandle::new(out_tx.clone());
    let socket = WebSocket::new(
        Inbound::new(in_rx),
        Outbound::new(out_tx),
        closer,
        subprotocol,
    );
    // the handler runs off-loop; the channels post back onto this task
    tokio::spawn(handler(socket));

    let mut session = Session {
        fragment: None,
        validator: Utf8Validator::new(),
        last_out_fin: true,
        close_sent: false,
        outbound_open: true,
        max_frame_size,
    };

    session.drive(io, read_buf, &in_tx, &mut out_rx).await
}

struct Session {
    /// Kind of the open fragmented message, if any.
    fragment: Option<OpCode>,
    validator: Utf8Validator,
    last_out_fin: bool,
    close_sent: bool,
    outbound_open: bool,
    max_frame_size: usize,
}

impl Session {
    async fn drive<IO>(
        &mut self,
        io: &mut IO,
        read_buf: &mut BytesMut,
        in_tx: &mpsc::Sender<InboundEvent>,
        out_rx: &mut mpsc::Receiver<Outgoing>,
    ) -> Result<(), WsError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            if self.close_sent {
                // close dance tail: wait for the peer CLOSE, bounded
                let read = tokio::time::timeout(CLOSE_TIMEOUT, read_frame(io, read_buf));
                match read.await {
                    Ok(Ok(frame)) => match frame.opcode() {
                        OpCode::Close => {
                            let _ = in_tx.try_send(InboundEvent::Closed(
                                frame.close_code().unwrap_or(None),
                            ));
                            return Ok(());
                        }
                        OpCode::Ping => {
                            write_frame(io, &Frame::pong(frame.into_payload())).await?;
                        }
                        _ => {}
                    },
                    Ok(Err(WsError::UnexpectedEof)) => return Ok(()),
                    Ok(Err(err)) => return Err(err),
                    Err(_) => {
                        emit!(debug, "peer close timed out");
                        return Ok(());
                    }
                }
                continue;
            }

            tokio::select! {
                frame = read_frame(io, read_buf) => {
                    let frame = frame?;
                    if !self.on_frame(io, in_tx, frame).await? {
                        return Ok(());
                    }
                }
                out = out_rx.recv(), if self.outbound_open => {
                    self.on_outgoing(io, out).await?;
                }
            }
        }
    }

    /// Apply inbound frame policy. Returns `false` when the connection is
    /// done.
    async fn on_frame<IO>(
        &mut self,
        io: &mut IO,
        in_tx: &mpsc::Sender<InboundEvent>,
        frame: Frame,
    ) -> Result<bool, WsError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        match frame.opcode() {
            OpCode::Ping => {
                // auto-answer, the ping itself is not surfaced
                write_frame(io, &Frame::pong(frame.into_payload())).await?;
                return Ok(true);
            }
            OpCode::Pong => {
                // unsolicited pongs surface as inbound events, no reply
                let _ = in_tx.send(InboundEvent::Frame(frame)).await;
                return Ok(true);
            }
            OpCode::Close => {
                let code = frame.close_code()?;
                let echo = match &code {
                    Some((code, _)) => Frame::close(*code, ""),
                    None => Frame::new(true, OpCode::Close, Bytes::new()),
                };
                write_frame(io, &echo).await?;
                let _ = in_tx.send(InboundEvent::Closed(code)).await;
                return Ok(false);
            }
            OpCode::Text | OpCode::Binary => {
                if self.fragment.is_some() {
                    return Err(WsError::FragmentState);
                }
                if frame.opcode() == OpCode::Text {
                    self.validator = Utf8Validator::new();
                    self.validate_text(&frame)?;
                }
                if !frame.fin() {
                    self.fragment = Some(frame.opcode());
                }
            }
            OpCode::Continuation => {
                let Some(kind) = self.fragment else {
                    return Err(WsError::FragmentState);
                };
                if kind == OpCode::Text {
                    self.validate_text(&frame)?;
                }
                if frame.fin() {
                    self.fragment = None;
                }
            }
        }
        let _ = in_tx.send(InboundEvent::Frame(frame)).await;
        Ok(true)
    }

    fn validate_text(&mut self, frame: &Frame) -> Result<(), WsError> {
        if self.validator.push(frame.payload()).is_err() {
            return Err(WsError::InvalidUtf8);
        }
        if frame.fin() && self.validator.finish().is_err() {
            return Err(WsError::InvalidUtf8);
        }
        Ok(())
    }

    async fn on_outgoing<IO>(&mut self, io: &mut IO, out: Option<Outgoing>) -> Result<(), WsError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        match out {
            Some(Outgoing::Frame(frame)) => self.write_data(io, frame).await,
            Some(Outgoing::Message(message)) => {
                for frame in message.into_frames() {
                    self.write_data(io, frame).await?;
                }
                Ok(())
            }
            Some(Outgoing::Close(code, reason)) => {
                self.finish_fragment(io).await?;
                write_frame(io, &Frame::close(code, &reason)).await?;
                self.close_sent = true;
                Ok(())
            }
            None => {
                // the handler dropped its sinks: finish any open
                // fragmented message, then start the close dance
                self.outbound_open = false;
                self.finish_fragment(io).await?;
                write_frame(io, &Frame::close(1000, "")).await?;
                self.close_sent = true;
                Ok(())
            }
        }
    }

    /// Emit a final empty CONTINUATION when the last produced frame was
    /// non-final.
    async fn finish_fragment<IO>(&mut self, io: &mut IO) -> Result<(), WsError>
    where
        IO: AsyncWrite + Unpin,
    {
        if !self.last_out_fin {
            write_frame(io, &Frame::new(true, OpCode::Continuation, Bytes::new())).await?;
            self.last_out_fin = true;
        }
        Ok(())
    }

    /// Write a data frame, splitting oversized payloads into
    /// continuations.
    async fn write_data<IO>(&mut self, io: &mut IO, frame: Frame) -> Result<(), WsError>
    where
        IO: AsyncWrite + Unpin,
    {
        if frame.opcode().is_control() {
            if frame.payload().len() > 125 {
                return Err(WsError::ControlTooLarge);
            }
            return write_frame(io, &frame).await;
        }

        if frame.payload().len() <= self.max_frame_size {
            self.last_out_fin = frame.fin();
            return write_frame(io, &frame).await;
        }

        let fin = frame.fin();
        let opcode = frame.opcode();
        let payload = frame.into_payload();
        let mut at = 0;
        while at < payload.len() {
            let end = (at + self.max_frame_size).min(payload.len());
            let part = Frame::new(
                end == payload.len() && fin,
                if at == 0 { opcode } else { OpCode::Continuation },
                payload.slice(at..end),
            );
            self.last_out_fin = part.fin();
            write_frame(io, &part).await?;
            at = end;
        }
        Ok(())
    }
}

/// Read one frame, resuming an incomplete parse from the buffer.
async fn read_frame<IO>(io: &mut IO, buf: &mut BytesMut) -> Result<Frame, WsError>
where
    IO: AsyncRead + Unpin,
{
    loop {
        if let Some(frame) = frame::parse(buf, MAX_INBOUND_FRAME)? {
            return Ok(frame);
        }
        if io.read_buf(buf).await? == 0 {
            emit!(warn, "peer closed without close frame");
            return Err(WsError::UnexpectedEof);
        }
    }
}

async fn write_frame<IO>(io: &mut IO, frame: &Frame) -> Result<(), WsError>
where
    IO: AsyncWrite + Unpin,
{
    let mut out = BytesMut::with_capacity(10 + frame.payload().len());
    frame::encode(frame, &mut out);
    io.write_all(&out).await?;
    io.flush().await?;
    Ok(())
}
