use std::fmt;

use bitflags::bitflags;

use crate::timestamp::Timestamp;
use crate::v4l_sys::*;

/// Buffer type
///
/// Specific types of devices require buffers of corresponding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Type {
    VideoCapture = v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE,
    VideoOutput = v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_OUTPUT,
    VideoCaptureMplane = v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_CAPTURE_MPLANE,
    VideoOutputMplane = v4l2_buf_type_V4L2_BUF_TYPE_VIDEO_OUTPUT_MPLANE,
    MetaCapture = v4l2_buf_type_V4L2_BUF_TYPE_META_CAPTURE,
    MetaOutput = v4l2_buf_type_V4L2_BUF_TYPE_META_OUTPUT,
}

impl Type {
    /// Multi-planar types describe their planes through a separate array
    pub fn is_mplane(self) -> bool {
        matches!(self, Type::VideoCaptureMplane | Type::VideoOutputMplane)
    }

    pub fn is_meta(self) -> bool {
        matches!(self, Type::MetaCapture | Type::MetaOutput)
    }

    pub fn is_output(self) -> bool {
        matches!(
            self,
            Type::VideoOutput | Type::VideoOutputMplane | Type::MetaOutput
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::VideoCapture => "video capture",
            Type::VideoOutput => "video output",
            Type::VideoCaptureMplane => "video capture (multi-planar)",
            Type::VideoOutputMplane => "video output (multi-planar)",
            Type::MetaCapture => "metadata capture",
            Type::MetaOutput => "metadata output",
        };
        write!(f, "{}", name)
    }
}

bitflags! {
    /// Per-buffer state flags reported by the driver
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Buffer is mapped
        const MAPPED                = 0x00000001;
        /// Buffer is queued for processing
        const QUEUED                = 0x00000002;
        /// Buffer is ready
        const DONE                  = 0x00000004;
        /// Buffer is ready, but the data contained within is corrupted
        const ERROR                 = 0x00000040;
        /// Buffer is prepared for queuing
        const PREPARED              = 0x00000400;
        const TIMESTAMP_MONOTONIC   = 0x00002000;
        const TIMESTAMP_COPY        = 0x00004000;
        const TSTAMP_SRC_SOE        = 0x00010000;
        const LAST                  = 0x00100000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Flags {
        Flags::from_bits_truncate(flags)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Memory models a queue supports, as reported by VIDIOC_REQBUFS
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const SUPPORTS_MMAP                 = 0x00000001;
        const SUPPORTS_USERPTR              = 0x00000002;
        const SUPPORTS_DMABUF               = 0x00000004;
        const SUPPORTS_REQUESTS             = 0x00000008;
        const SUPPORTS_ORPHANED_BUFS        = 0x00000010;
        const SUPPORTS_M2M_HOLD_CAPTURE_BUF = 0x00000020;
        const SUPPORTS_MMAP_CACHE_HINTS     = 0x00000040;
    }
}

/// Buffer metadata, mostly used not to convey frame data but to describe it
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Sequence number, counting the frames
    pub sequence: u32,
    /// Time of capture (usually set by the driver)
    pub timestamp: Timestamp,
    /// Buffer flags
    pub flags: Flags,
}

impl From<&v4l2_buffer> for Metadata {
    fn from(buf: &v4l2_buffer) -> Self {
        Metadata {
            sequence: buf.sequence,
            timestamp: buf.timestamp.into(),
            flags: buf.flags.into(),
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sequence {} timestamp {} flags {}",
            self.sequence, self.timestamp, self.flags
        )
    }
}
