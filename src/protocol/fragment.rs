//! Frame transfer as a train of fixed-size fragments
//!
//! The protocol has no end-of-frame marker. A reader treats the stream going idle for longer
//! than its timeout, or the peer closing it, as the end of the frame.

use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::{FragmentHeader, Header, MessageId, FRAGMENT_SIZE, MAX_FRAGMENT_SIZE};
use crate::error::{Error, Result};
use crate::poll::{self, Interest};

/// Splits frames into fragments, waiting for the socket before each one
#[derive(Debug, Clone, Copy)]
pub struct FragmentWriter {
    fragment_size: usize,
    timeout: Duration,
}

impl Default for FragmentWriter {
    fn default() -> Self {
        FragmentWriter {
            fragment_size: FRAGMENT_SIZE,
            timeout: Duration::from_millis(300),
        }
    }
}

impl FragmentWriter {
    /// The fragment size is clamped to `1..=MAX_FRAGMENT_SIZE`
    pub fn new(fragment_size: usize, timeout: Duration) -> Self {
        FragmentWriter {
            fragment_size: fragment_size.clamp(1, MAX_FRAGMENT_SIZE),
            timeout,
        }
    }

    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// Sends `data`, returning the number of fragments written
    ///
    /// A socket that stays unwritable for longer than the timeout aborts the transfer.
    pub fn write<S: Write + AsRawFd>(&self, stream: &mut S, data: &[u8]) -> Result<u32> {
        let capacity = Header::SIZE + FragmentHeader::SIZE + self.fragment_size;
        let mut message = Vec::with_capacity(capacity);
        let mut serial = 0u32;

        for chunk in data.chunks(self.fragment_size) {
            if !poll::wait(stream.as_raw_fd(), Interest::WRITABLE, Some(self.timeout))? {
                return Err(Error::Timeout("fragment write"));
            }

            let fragment = FragmentHeader {
                serial,
                length: chunk.len() as u32,
            };
            message.clear();
            message.extend_from_slice(
                &Header::new(
                    MessageId::FrameFragment,
                    (FragmentHeader::SIZE + chunk.len()) as u32,
                )
                .encode(),
            );
            message.extend_from_slice(&fragment.encode());
            message.extend_from_slice(chunk);
            stream.write_all(&message)?;

            trace!("tx fragment {} length {}", fragment.serial, fragment.length);
            serial += 1;
        }
        stream.flush()?;

        debug!("tx frame of {} bytes in {serial} fragments", data.len());
        Ok(serial)
    }
}

/// Reassembles fragments until the stream goes idle
#[derive(Debug, Clone, Copy)]
pub struct FragmentReader {
    idle_timeout: Duration,
}

impl Default for FragmentReader {
    fn default() -> Self {
        FragmentReader {
            idle_timeout: Duration::from_secs(2),
        }
    }
}

impl FragmentReader {
    pub fn new(idle_timeout: Duration) -> Self {
        FragmentReader { idle_timeout }
    }

    /// Appends every fragment received to `frame`, returning the number of bytes added
    ///
    /// Ends successfully when no new fragment starts within the idle timeout, or when the peer
    /// closes the stream between fragments. A fragment whose body does not arrive in time is a
    /// [`Error::Timeout`].
    pub fn read<S: Read + AsRawFd>(&self, stream: &mut S, frame: &mut Vec<u8>) -> Result<usize> {
        let start = frame.len();
        let mut expected = 0u32;

        loop {
            if !poll::wait(stream.as_raw_fd(), Interest::READABLE, Some(self.idle_timeout))? {
                break;
            }
            let header = match Header::read_from(stream)? {
                Some(header) => header,
                None => break,
            };
            if header.message()? != MessageId::FrameFragment {
                return Err(Error::invalid(format!(
                    "expected a frame fragment, got message {:#x}",
                    header.id
                )));
            }

            let mut raw = [0; FragmentHeader::SIZE];
            stream.read_exact(&mut raw)?;
            let fragment = FragmentHeader::decode(&raw);
            if fragment.length as usize > MAX_FRAGMENT_SIZE {
                return Err(Error::invalid(format!(
                    "fragment {} of {} bytes exceeds the {MAX_FRAGMENT_SIZE} byte limit",
                    fragment.serial, fragment.length
                )));
            }
            if header.length as usize != FragmentHeader::SIZE + fragment.length as usize {
                return Err(Error::invalid(format!(
                    "fragment {} carries {} bytes in a {} byte message",
                    fragment.serial, fragment.length, header.length
                )));
            }
            if fragment.serial != expected {
                warn!(
                    "fragment serial {} out of order, expected {expected}",
                    fragment.serial
                );
            }
            expected = fragment.serial.wrapping_add(1);

            if !poll::wait(stream.as_raw_fd(), Interest::READABLE, Some(self.idle_timeout))? {
                return Err(Error::Timeout("fragment read"));
            }
            let offset = frame.len();
            frame.resize(offset + fragment.length as usize, 0);
            stream.read_exact(&mut frame[offset..])?;

            trace!("rx fragment {} length {}", fragment.serial, fragment.length);
        }

        let received = frame.len() - start;
        debug!("rx frame of {received} bytes in {expected} fragments");
        Ok(received)
    }
}
