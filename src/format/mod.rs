use std::{fmt, mem};

use crate::v4l_sys::*;

const MAX_PLANES: usize = VIDEO_MAX_PLANES as usize;

pub mod fourcc;
pub use fourcc::FourCC;

pub mod pixel;
pub use pixel::PixelFormat;

/// Which way data flows between the process and the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frames flow from the sensor into mapped buffers
    Capture,
    /// ISP parameter blocks flow from user memory into the device
    ParamsOutput,
}

impl Direction {
    /// Buffers kept in flight ahead of the one being dequeued
    pub fn lead(self) -> u32 {
        match self {
            Direction::Capture => 2,
            Direction::ParamsOutput => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Capture => write!(f, "capture"),
            Direction::ParamsOutput => write!(f, "params output"),
        }
    }
}

/// Format requested by the caller, applied at setup time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
    pub direction: Direction,
}

impl FormatSpec {
    /// # Example
    ///
    /// ```
    /// use rawcap::format::{FormatSpec, FourCC};
    /// let spec = FormatSpec::capture(1280, 720, FourCC::NV12);
    /// ```
    pub const fn capture(width: u32, height: u32, fourcc: FourCC) -> Self {
        FormatSpec {
            width,
            height,
            fourcc,
            direction: Direction::Capture,
        }
    }

    /// Parameter channels take their geometry from the driver, only the data format is checked
    pub const fn params(dataformat: FourCC) -> Self {
        FormatSpec {
            width: 0,
            height: 0,
            fourcc: dataformat,
            direction: Direction::ParamsOutput,
        }
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {} ({})", self.width, self.height, self.fourcc, self.direction)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Layout of a single memory plane
pub struct PlaneFormat {
    /// bytes per line
    pub stride: u32,
    /// maximum number of bytes required to store the plane
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Format as negotiated with the driver
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// one entry per memory plane
    pub planes: Vec<PlaneFormat>,
}

impl Format {
    pub fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            planes: Vec::new(),
        }
    }

    /// Total number of bytes across all planes
    pub fn size(&self) -> usize {
        self.planes.iter().map(|p| p.size as usize).sum()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width          : {}", self.width)?;
        writeln!(f, "height         : {}", self.height)?;
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        for (i, plane) in self.planes.iter().enumerate() {
            writeln!(f, "plane {}        : stride {} size {}", i, plane.stride, plane.size)?;
        }
        Ok(())
    }
}

impl From<v4l2_pix_format> for Format {
    fn from(fmt: v4l2_pix_format) -> Self {
        Self {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.pixelformat),
            planes: vec![PlaneFormat {
                stride: fmt.bytesperline,
                size: fmt.sizeimage,
            }],
        }
    }
}

impl From<&Format> for v4l2_pix_format {
    fn from(format: &Format) -> Self {
        let plane = format.planes.first().copied().unwrap_or_default();
        Self {
            width: format.width,
            height: format.height,
            pixelformat: format.fourcc.into(),
            field: v4l2_field_V4L2_FIELD_NONE,
            bytesperline: plane.stride,
            sizeimage: plane.size,
            ..unsafe { mem::zeroed() }
        }
    }
}

impl From<v4l2_pix_format_mplane> for Format {
    fn from(fmt: v4l2_pix_format_mplane) -> Self {
        let count = (fmt.num_planes as usize).min(MAX_PLANES);
        let plane_fmt = fmt.plane_fmt;
        Self {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.pixelformat),
            planes: plane_fmt[..count]
                .iter()
                .map(|p| PlaneFormat {
                    stride: p.bytesperline,
                    size: p.sizeimage,
                })
                .collect(),
        }
    }
}

impl From<&Format> for v4l2_pix_format_mplane {
    fn from(format: &Format) -> Self {
        let mut fmt: v4l2_pix_format_mplane = unsafe { mem::zeroed() };
        fmt.width = format.width;
        fmt.height = format.height;
        fmt.pixelformat = format.fourcc.into();
        fmt.field = v4l2_field_V4L2_FIELD_NONE;

        let mut plane_fmt = fmt.plane_fmt;
        for (dst, src) in plane_fmt.iter_mut().zip(format.planes.iter()) {
            dst.bytesperline = src.stride;
            dst.sizeimage = src.size;
        }
        fmt.plane_fmt = plane_fmt;
        fmt.num_planes = format.planes.len().min(MAX_PLANES) as u8;
        fmt
    }
}

impl From<v4l2_meta_format> for Format {
    fn from(fmt: v4l2_meta_format) -> Self {
        Self {
            width: 0,
            height: 0,
            fourcc: FourCC::from(fmt.dataformat),
            planes: vec![PlaneFormat {
                stride: 0,
                size: fmt.buffersize,
            }],
        }
    }
}
