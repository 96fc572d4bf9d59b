//! Device handles and the operations a session needs from them

use std::ops::{Deref, DerefMut};
use std::{fmt, io, time::Duration};

use crate::buffer::{self, Metadata, Type};
use crate::capability::Capabilities;
use crate::format::Format;
use crate::memory::Memory;
use crate::poll::Interest;

pub mod v4l2;
pub use self::v4l2::V4l2Device;

#[cfg(test)]
pub(crate) mod fake;

/// Location of one plane inside the driver's buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub offset: u32,
    pub length: u32,
}

/// Plane description handed to the driver on enqueue
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneBinding {
    pub length: u32,
    pub bytesused: u32,
    /// Address of the user memory, zero for mapped buffers
    pub userptr: usize,
}

#[derive(Debug, Clone)]
pub struct QueueRequest {
    pub typ: Type,
    pub memory: Memory,
    pub index: u32,
    pub planes: Vec<PlaneBinding>,
}

/// Buffer handed back by the driver
#[derive(Debug, Clone)]
pub struct Dequeued {
    pub index: u32,
    /// Payload size per plane
    pub bytesused: Vec<u32>,
    pub meta: Metadata,
}

/// Kernel buffer queue operations a session drives
///
/// All calls are synchronous. `dequeue` returns `Ok(None)` when nothing is ready yet, the
/// remaining calls report driver failures as `io::Error`.
pub trait Device {
    /// Mapped plane memory
    type Region: Deref<Target = [u8]> + DerefMut;

    fn capabilities(&self) -> io::Result<Capabilities>;

    /// Memory models supported by the queue of type `typ`
    ///
    /// Probing with an unsupported memory model fails.
    fn buffer_capabilities(&self, typ: Type, memory: Memory) -> io::Result<buffer::Capabilities>;

    fn format(&self, typ: Type) -> io::Result<Format>;

    /// Tries then applies `fmt`, returning what the driver settled on
    fn set_format(&self, typ: Type, fmt: &Format) -> io::Result<Format>;

    /// Allocates `count` buffers and returns how many the driver granted, zero frees them
    fn request_buffers(&self, typ: Type, memory: Memory, count: u32) -> io::Result<u32>;

    /// Offsets and lengths of the planes of buffer `index`
    fn query_buffer(&self, typ: Type, index: u32) -> io::Result<Vec<PlaneLayout>>;

    fn map(&self, plane: &PlaneLayout) -> io::Result<Self::Region>;

    fn queue(&self, request: &QueueRequest) -> io::Result<()>;

    fn dequeue(&self, typ: Type, memory: Memory, planes: usize) -> io::Result<Option<Dequeued>>;

    fn stream_on(&self, typ: Type) -> io::Result<()>;

    fn stream_off(&self, typ: Type) -> io::Result<()>;

    /// Waits for the queue to become ready, `Ok(false)` on timeout
    fn poll(&self, interest: Interest, timeout: Option<Duration>) -> io::Result<bool>;
}

/// Picks a device by the names it reports
///
/// Unset fields match anything.
///
/// # Example
///
/// ```
/// use rawcap::device::Selector;
/// let params = Selector::driver("sun6i-isp").with_card("sun6i-isp-params");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub driver: Option<String>,
    pub card: Option<String>,
}

impl Selector {
    pub fn any() -> Self {
        Selector::default()
    }

    pub fn driver<S: Into<String>>(driver: S) -> Self {
        Selector {
            driver: Some(driver.into()),
            card: None,
        }
    }

    pub fn with_card<S: Into<String>>(mut self, card: S) -> Self {
        self.card = Some(card.into());
        self
    }

    pub fn matches(&self, caps: &Capabilities) -> bool {
        self.driver.as_deref().map_or(true, |d| d == caps.driver)
            && self.card.as_deref().map_or(true, |c| c == caps.card)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.driver, &self.card) {
            (None, None) => write!(f, "any"),
            (Some(d), None) => write!(f, "driver {}", d),
            (None, Some(c)) => write!(f, "card {}", c),
            (Some(d), Some(c)) => write!(f, "driver {} card {}", d, c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Flags;

    fn caps(driver: &str, card: &str) -> Capabilities {
        Capabilities {
            driver: driver.to_string(),
            card: card.to_string(),
            bus: String::new(),
            version: (0, 0, 0),
            flags: Flags::empty(),
        }
    }

    #[test]
    fn test_selector_matching() {
        let isp = caps("sun6i-isp", "sun6i-isp-params");
        assert!(Selector::any().matches(&isp));
        assert!(Selector::driver("sun6i-isp").matches(&isp));
        assert!(!Selector::driver("sun6i-isp").with_card("sun6i-isp-capture").matches(&isp));
        assert_eq!(Selector::any().to_string(), "any");
    }
}
