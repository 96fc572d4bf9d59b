//! In-memory device driving the session and server tests

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use std::{io, time::Duration};

use crate::buffer::{self, Metadata, Type};
use crate::capability::{Capabilities, Flags};
use crate::device::{Dequeued, Device, PlaneLayout, QueueRequest};
use crate::format::{Format, FourCC, PlaneFormat};
use crate::memory::Memory;
use crate::poll::Interest;

#[derive(Debug, Default)]
pub struct Counters {
    pub set_format: usize,
    pub request_buffers: Vec<u32>,
    pub maps: usize,
    pub queued: Vec<u32>,
    pub dequeued: Vec<u32>,
    pub stream_on: usize,
    pub stream_off: usize,
}

/// Resource releases in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Unmap,
    Close,
}

#[derive(Debug)]
struct State {
    format: Format,
    allocated: u32,
    streaming: bool,
    pending: VecDeque<u32>,
    sequence: u32,
    fail_map_at: Option<usize>,
    fail_capabilities: bool,
    fail_next_dequeue: bool,
    newest_first: bool,
    fail_stream_off: bool,
    releases: Vec<Release>,
    counters: Counters,
}

/// Cloning shares the state, so a test can keep a handle after moving the device into a session
#[derive(Clone)]
pub struct FakeDevice {
    caps: Capabilities,
    state: Arc<Mutex<State>>,
}

impl FakeDevice {
    pub fn camera() -> Self {
        FakeDevice::new(
            "fake-csi",
            "fake-camera",
            Flags::VIDEO_CAPTURE | Flags::STREAMING,
            Format::new(0, 0, FourCC::SBGGR8),
        )
    }

    pub fn params() -> Self {
        let mut format = Format::new(0, 0, FourCC::S6IP);
        format.planes.push(PlaneFormat {
            stride: 0,
            size: 64,
        });
        FakeDevice::new(
            "fake-isp",
            "fake-isp-params",
            Flags::META_OUTPUT | Flags::STREAMING,
            format,
        )
    }

    fn new(driver: &str, card: &str, flags: Flags, format: Format) -> Self {
        FakeDevice {
            caps: Capabilities {
                driver: driver.to_string(),
                card: card.to_string(),
                bus: "platform:fake".to_string(),
                version: (6, 1, 0),
                flags,
            },
            state: Arc::new(Mutex::new(State {
                format,
                allocated: 0,
                streaming: false,
                pending: VecDeque::new(),
                sequence: 0,
                fail_map_at: None,
                fail_capabilities: false,
                fail_next_dequeue: false,
                newest_first: false,
                fail_stream_off: false,
                releases: Vec::new(),
                counters: Counters::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn fail_map_at(&self, nth: usize) {
        self.lock().fail_map_at = Some(nth);
    }

    /// Capability queries fail with EIO
    pub fn fail_capabilities(&self) {
        self.lock().fail_capabilities = true;
    }

    /// The next dequeue fails with EIO
    pub fn fail_next_dequeue(&self) {
        self.lock().fail_next_dequeue = true;
    }

    /// The next dequeue returns the most recently queued buffer
    pub fn complete_newest_first(&self) {
        self.lock().newest_first = true;
    }

    /// Stream off fails with EIO
    pub fn fail_stream_off(&self) {
        self.lock().fail_stream_off = true;
    }

    pub fn releases(&self) -> Vec<Release> {
        self.lock().releases.clone()
    }

    pub fn counters<R>(&self, f: impl FnOnce(&Counters) -> R) -> R {
        f(&self.lock().counters)
    }

    pub fn allocated(&self) -> u32 {
        self.lock().allocated
    }

    pub fn streaming(&self) -> bool {
        self.lock().streaming
    }
}

/// A session's copy going away stands for closing the node
impl Drop for FakeDevice {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.releases.push(Release::Close);
        }
    }
}

/// Mapped buffer that records when it is unmapped
pub struct FakeRegion {
    bytes: Vec<u8>,
    state: Arc<Mutex<State>>,
}

impl Deref for FakeRegion {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for FakeRegion {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for FakeRegion {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.releases.push(Release::Unmap);
        }
    }
}

impl Device for FakeDevice {
    type Region = FakeRegion;

    fn capabilities(&self) -> io::Result<Capabilities> {
        if self.lock().fail_capabilities {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        Ok(self.caps.clone())
    }

    fn buffer_capabilities(&self, _typ: Type, memory: Memory) -> io::Result<buffer::Capabilities> {
        Ok(match memory {
            Memory::Mmap => buffer::Capabilities::SUPPORTS_MMAP,
            Memory::UserPtr => buffer::Capabilities::SUPPORTS_USERPTR,
        })
    }

    fn format(&self, _typ: Type) -> io::Result<Format> {
        Ok(self.lock().format.clone())
    }

    fn set_format(&self, _typ: Type, fmt: &Format) -> io::Result<Format> {
        let mut state = self.lock();
        state.counters.set_format += 1;
        let mut negotiated = Format::new(fmt.width, fmt.height, fmt.fourcc);
        negotiated.planes.push(PlaneFormat {
            stride: fmt.width,
            size: fmt.width * fmt.height * 2,
        });
        state.format = negotiated.clone();
        Ok(negotiated)
    }

    fn request_buffers(&self, _typ: Type, _memory: Memory, count: u32) -> io::Result<u32> {
        let mut state = self.lock();
        if count > 0 && state.allocated > 0 {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        state.counters.request_buffers.push(count);
        state.allocated = count;
        Ok(count)
    }

    fn query_buffer(&self, _typ: Type, index: u32) -> io::Result<Vec<PlaneLayout>> {
        let state = self.lock();
        if index >= state.allocated {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        let length = state.format.planes.first().map_or(0, |p| p.size);
        Ok(vec![PlaneLayout {
            offset: index * length,
            length,
        }])
    }

    fn map(&self, plane: &PlaneLayout) -> io::Result<FakeRegion> {
        let mut state = self.lock();
        if state.fail_map_at == Some(state.counters.maps) {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }
        state.counters.maps += 1;
        // every byte of buffer N reads N + 1
        let index = if plane.length == 0 {
            0
        } else {
            plane.offset / plane.length
        };
        Ok(FakeRegion {
            bytes: vec![index as u8 + 1; plane.length as usize],
            state: Arc::clone(&self.state),
        })
    }

    fn queue(&self, request: &QueueRequest) -> io::Result<()> {
        let mut state = self.lock();
        if request.index >= state.allocated || state.pending.contains(&request.index) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        state.counters.queued.push(request.index);
        state.pending.push_back(request.index);
        Ok(())
    }

    fn dequeue(&self, _typ: Type, _memory: Memory, planes: usize) -> io::Result<Option<Dequeued>> {
        let mut state = self.lock();
        if !state.streaming {
            return Ok(None);
        }
        if state.fail_next_dequeue {
            state.fail_next_dequeue = false;
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        let next = if state.newest_first {
            state.newest_first = false;
            state.pending.pop_back()
        } else {
            state.pending.pop_front()
        };
        let index = match next {
            Some(index) => index,
            None => return Ok(None),
        };
        state.counters.dequeued.push(index);
        state.sequence += 1;
        let length = state.format.planes.first().map_or(0, |p| p.size);
        Ok(Some(Dequeued {
            index,
            bytesused: vec![length; planes.max(1)],
            meta: Metadata {
                sequence: state.sequence,
                ..Metadata::default()
            },
        }))
    }

    fn stream_on(&self, _typ: Type) -> io::Result<()> {
        let mut state = self.lock();
        state.counters.stream_on += 1;
        state.streaming = true;
        Ok(())
    }

    fn stream_off(&self, _typ: Type) -> io::Result<()> {
        let mut state = self.lock();
        state.counters.stream_off += 1;
        if state.fail_stream_off {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        state.streaming = false;
        state.pending.clear();
        Ok(())
    }

    fn poll(&self, _interest: Interest, _timeout: Option<Duration>) -> io::Result<bool> {
        let state = self.lock();
        Ok(state.streaming && !state.pending.is_empty())
    }
}
