// src/transport/wire.rs

//! Wire framing (§6): a length-prefixed binary frame around a structural YAML
//! body, the same "framed codec over a raw stream" shape the rest of this
//! codebase uses for its internal protocols.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// The frame kinds exchanged over the wire (§4, §6). `Opcode` carries the
/// command/event name as a plain string so new opcodes the scheduler doesn't
/// recognize still decode cleanly (and are discarded by the dispatcher, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Connect = 0,
    Disconnect = 1,
    /// A STATUS frame (§4.6): carries a status string in `Frame::status`
    /// ("READY", "FULL", or any other Agent-reported value). Only a `READY`
    /// status carries a body, the telemetry record parsed by `handle_status`.
    Status = 2,
    Command = 3,
    Event = 4,
    SendError = 5,
}

impl FrameType {
    fn from_u8(tag: u8) -> io::Result<Self> {
        match tag {
            0 => Ok(FrameType::Connect),
            1 => Ok(FrameType::Disconnect),
            2 => Ok(FrameType::Status),
            3 => Ok(FrameType::Command),
            4 => Ok(FrameType::Event),
            5 => Ok(FrameType::SendError),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown frame type tag {other}"),
            )),
        }
    }
}

/// One decoded protocol frame. `role` is only meaningful on `Connect`;
/// `status` is only meaningful on `Status`; `opcode` is only meaningful on
/// `Command`/`Event`/`SendError`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: FrameType,
    pub role: String,
    pub status: String,
    pub opcode: String,
    pub sender_uuid: String,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn connect(role: impl Into<String>, sender_uuid: impl Into<String>) -> Self {
        Self {
            frame_type: FrameType::Connect,
            role: role.into(),
            status: String::new(),
            opcode: String::new(),
            sender_uuid: sender_uuid.into(),
            body: Vec::new(),
        }
    }

    /// A STATUS frame (§4.6). `status` is e.g. `"READY"` or `"FULL"`; `body`
    /// carries the YAML telemetry record and is only inspected when
    /// `status == "READY"`.
    pub fn status(
        status: impl Into<String>,
        sender_uuid: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            frame_type: FrameType::Status,
            role: String::new(),
            status: status.into(),
            opcode: String::new(),
            sender_uuid: sender_uuid.into(),
            body,
        }
    }

    pub fn command(opcode: impl Into<String>, sender_uuid: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            frame_type: FrameType::Command,
            role: String::new(),
            status: String::new(),
            opcode: opcode.into(),
            sender_uuid: sender_uuid.into(),
            body,
        }
    }

    pub fn event(opcode: impl Into<String>, sender_uuid: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            frame_type: FrameType::Event,
            role: String::new(),
            status: String::new(),
            opcode: opcode.into(),
            sender_uuid: sender_uuid.into(),
            body,
        }
    }

    pub fn send_error(opcode: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            frame_type: FrameType::SendError,
            role: String::new(),
            status: String::new(),
            opcode: opcode.into(),
            sender_uuid: String::new(),
            body,
        }
    }
}

const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// A `tokio_util::codec` implementation framing each `Frame` as:
/// `[u32 total_len][u8 type][u16 role_len][role][u16 status_len][status]
///  [u16 opcode_len][opcode][u16 sender_len][sender][body..]`.
#[derive(Debug, Default)]
pub struct WireCodec;

impl Decoder for WireCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Frame>> {
        if src.len() < 4 {
            return Ok(None);
        }
        let total_len = u32::from_be_bytes(src[..4].try_into().unwrap()) as usize;
        if total_len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {total_len} bytes exceeds the {MAX_FRAME_LEN} byte limit"),
            ));
        }
        if src.len() < 4 + total_len {
            src.reserve(4 + total_len - src.len());
            return Ok(None);
        }

        src.advance(4);
        let mut payload = src.split_to(total_len);

        let frame_type = FrameType::from_u8(payload.get_u8())?;
        let role = read_short_string(&mut payload)?;
        let status = read_short_string(&mut payload)?;
        let opcode = read_short_string(&mut payload)?;
        let sender_uuid = read_short_string(&mut payload)?;
        let body = payload.to_vec();

        Ok(Some(Frame {
            frame_type,
            role,
            status,
            opcode,
            sender_uuid,
            body,
        }))
    }
}

impl Encoder<Frame> for WireCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> io::Result<()> {
        let mut payload = BytesMut::new();
        payload.put_u8(frame.frame_type as u8);
        write_short_string(&mut payload, &frame.role)?;
        write_short_string(&mut payload, &frame.status)?;
        write_short_string(&mut payload, &frame.opcode)?;
        write_short_string(&mut payload, &frame.sender_uuid)?;
        payload.extend_from_slice(&frame.body);

        if payload.len() > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("encoded frame of {} bytes exceeds the limit", payload.len()),
            ));
        }

        dst.put_u32(payload.len() as u32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

fn read_short_string(buf: &mut BytesMut) -> io::Result<String> {
    if buf.len() < 2 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated frame"));
    }
    let len = buf.get_u16() as usize;
    if buf.len() < len {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated frame"));
    }
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

fn write_short_string(buf: &mut BytesMut, s: &str) -> io::Result<()> {
    if s.len() > u16::MAX as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "string field exceeds 65535 bytes",
        ));
    }
    buf.put_u16(s.len() as u16);
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}
