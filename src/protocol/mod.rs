//! Frame streaming wire format
//!
//! Every message starts with an 8-byte header holding the message id and payload length, both
//! little-endian `u32`. Payload layouts:
//!
//! | message          | payload                                   |
//! |------------------|-------------------------------------------|
//! | capture request  | width, height, fourcc                     |
//! | stream start     | width, height, fourcc                     |
//! | stream stop      | (empty)                                   |
//! | frame fragment   | serial, length, then `length` frame bytes |

use std::fmt;
use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::format::FourCC;

pub mod fragment;
pub use fragment::{FragmentReader, FragmentWriter};

pub const DEFAULT_PORT: u16 = 4321;

/// Frame bytes carried per fragment
pub const FRAGMENT_SIZE: usize = 1024;

/// Largest fragment body a reader accepts
pub const MAX_FRAGMENT_SIZE: usize = 64 * FRAGMENT_SIZE;

/// Upper bound on command payloads, frame fragments are not affected
const MAX_COMMAND_PAYLOAD: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageId {
    CaptureRequest = 0x1001,
    StreamStart = 0x2001,
    StreamStop = 0x2002,
    FrameFragment = 0x3001,
}

impl MessageId {
    /// Smallest payload a message with this id may declare
    pub fn min_payload(self) -> u32 {
        match self {
            MessageId::CaptureRequest | MessageId::StreamStart => FrameRequest::SIZE as u32,
            MessageId::StreamStop => 0,
            MessageId::FrameFragment => FragmentHeader::SIZE as u32,
        }
    }
}

impl TryFrom<u32> for MessageId {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self> {
        match id {
            0x1001 => Ok(MessageId::CaptureRequest),
            0x2001 => Ok(MessageId::StreamStart),
            0x2002 => Ok(MessageId::StreamStop),
            0x3001 => Ok(MessageId::FrameFragment),
            _ => Err(Error::invalid(format!("unknown message id {id:#x}"))),
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageId::CaptureRequest => "capture request",
            MessageId::StreamStart => "stream start",
            MessageId::StreamStop => "stream stop",
            MessageId::FrameFragment => "frame fragment",
        };
        f.write_str(name)
    }
}

/// Fixed message prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw id, kept as read so unknown ids can be reported
    pub id: u32,
    pub length: u32,
}

impl Header {
    pub const SIZE: usize = 8;

    pub fn new(id: MessageId, length: u32) -> Self {
        Header {
            id: id as u32,
            length,
        }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf[..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4..].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        Header {
            id: le_u32(&buf[..4]),
            length: le_u32(&buf[4..]),
        }
    }

    /// Reads a header, `None` when the peer closed the stream at a message boundary
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut buf = [0; Self::SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Some(Header::decode(&buf)))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    /// Checks the id is known and the declared payload is large enough for it
    pub fn message(&self) -> Result<MessageId> {
        let id = MessageId::try_from(self.id)?;
        if self.length < id.min_payload() {
            return Err(Error::invalid(format!(
                "{id} declares {} payload bytes, needs at least {}",
                self.length,
                id.min_payload()
            )));
        }
        Ok(id)
    }
}

/// Frame geometry a client asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
}

impl FrameRequest {
    pub const SIZE: usize = 12;

    pub fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        FrameRequest {
            width,
            height,
            fourcc,
        }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf[..4].copy_from_slice(&self.width.to_le_bytes());
        buf[4..8].copy_from_slice(&self.height.to_le_bytes());
        buf[8..].copy_from_slice(&u32::from(self.fourcc).to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        FrameRequest {
            width: le_u32(&buf[..4]),
            height: le_u32(&buf[4..8]),
            fourcc: FourCC::from(le_u32(&buf[8..])),
        }
    }
}

impl fmt::Display for FrameRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.fourcc)
    }
}

/// Prefix of every frame fragment payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub serial: u32,
    pub length: u32,
}

impl FragmentHeader {
    pub const SIZE: usize = 8;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf[..4].copy_from_slice(&self.serial.to_le_bytes());
        buf[4..].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        FragmentHeader {
            serial: le_u32(&buf[..4]),
            length: le_u32(&buf[4..]),
        }
    }
}

/// Client to server messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Capture(FrameRequest),
    StreamStart(FrameRequest),
    StreamStop,
}

impl Command {
    pub fn id(&self) -> MessageId {
        match self {
            Command::Capture(_) => MessageId::CaptureRequest,
            Command::StreamStart(_) => MessageId::StreamStart,
            Command::StreamStop => MessageId::StreamStop,
        }
    }

    /// Writes header and payload in one go
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(Header::SIZE + FrameRequest::SIZE);
        match self {
            Command::Capture(request) | Command::StreamStart(request) => {
                buf.extend_from_slice(&Header::new(self.id(), FrameRequest::SIZE as u32).encode());
                buf.extend_from_slice(&request.encode());
            }
            Command::StreamStop => buf.extend_from_slice(&Header::new(self.id(), 0).encode()),
        }
        writer.write_all(&buf)?;
        writer.flush()
    }

    /// Reads the payload that follows `header`, consuming all declared bytes
    pub fn read_payload<R: Read>(header: &Header, reader: &mut R) -> Result<Self> {
        let id = header.message()?;
        if id == MessageId::FrameFragment {
            return Err(Error::invalid("frame fragment sent to the server"));
        }
        if header.length > MAX_COMMAND_PAYLOAD {
            return Err(Error::invalid(format!(
                "{id} declares an oversized payload of {} bytes",
                header.length
            )));
        }

        let mut payload = vec![0; header.length as usize];
        reader.read_exact(&mut payload)?;

        let request = || {
            let mut buf = [0; FrameRequest::SIZE];
            buf.copy_from_slice(&payload[..FrameRequest::SIZE]);
            FrameRequest::decode(&buf)
        };
        Ok(match id {
            MessageId::CaptureRequest => Command::Capture(request()),
            MessageId::StreamStart => Command::StreamStart(request()),
            _ => Command::StreamStop,
        })
    }

    /// Reads one command, `None` on a clean end of stream
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        match Header::read_from(reader)? {
            Some(header) => Command::read_payload(&header, reader).map(Some),
            None => Ok(None),
        }
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}
