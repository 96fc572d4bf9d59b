use std::{fmt, str};

use crate::error::{self, Error};
use crate::format::FourCC;

/// Raw layouts the converter knows how to turn into BGRA pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit Bayer, BGGR ordering
    Bggr8,
    /// 8-bit Bayer, GBRG ordering
    Gbrg8,
    /// 8-bit Bayer, GRBG ordering
    Grbg8,
    /// 8-bit Bayer, RGGB ordering
    Rggb8,
    /// 10-bit Bayer in 16-bit little-endian containers, BGGR ordering
    Bggr10,
    /// Luma plane followed by interleaved U/V at quarter resolution
    Nv12,
    /// Luma plane followed by interleaved V/U at quarter resolution
    Nv21,
    /// Packed 4:2:2, Y0 U Y1 V
    Yuyv,
    /// Packed 4:2:2, U Y0 V Y1
    Uyvy,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 9] = [
        PixelFormat::Bggr8,
        PixelFormat::Gbrg8,
        PixelFormat::Grbg8,
        PixelFormat::Rggb8,
        PixelFormat::Bggr10,
        PixelFormat::Nv12,
        PixelFormat::Nv21,
        PixelFormat::Yuyv,
        PixelFormat::Uyvy,
    ];

    pub fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Bggr8 => FourCC::SBGGR8,
            PixelFormat::Gbrg8 => FourCC::SGBRG8,
            PixelFormat::Grbg8 => FourCC::SGRBG8,
            PixelFormat::Rggb8 => FourCC::SRGGB8,
            PixelFormat::Bggr10 => FourCC::SBGGR10,
            PixelFormat::Nv12 => FourCC::NV12,
            PixelFormat::Nv21 => FourCC::NV21,
            PixelFormat::Yuyv => FourCC::YUYV,
            PixelFormat::Uyvy => FourCC::UYVY,
        }
    }

    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        PixelFormat::ALL.into_iter().find(|f| f.fourcc() == fourcc)
    }

    /// Minimum number of raw bytes a `width` x `height` frame occupies
    ///
    /// Fails with `InvalidInput` when the size does not fit in memory.
    pub fn frame_size(self, width: u32, height: u32) -> error::Result<usize> {
        let (w, h) = (width as usize, height as usize);
        let size = match self {
            PixelFormat::Bggr8 | PixelFormat::Gbrg8 | PixelFormat::Grbg8 | PixelFormat::Rggb8 => {
                w.checked_mul(h)
            }
            PixelFormat::Bggr10 | PixelFormat::Yuyv | PixelFormat::Uyvy => {
                w.checked_mul(h).and_then(|n| n.checked_mul(2))
            }
            PixelFormat::Nv12 | PixelFormat::Nv21 => w
                .checked_mul(h)
                .zip(w.checked_mul(h.div_ceil(2)))
                .and_then(|(luma, chroma)| luma.checked_add(chroma)),
        };
        size.ok_or_else(|| Error::invalid(format!("{width}x{height} {self} frame is too large")))
    }

    /// Whether the layout stores chroma per pixel pair
    pub fn needs_even_width(self) -> bool {
        matches!(
            self,
            PixelFormat::Nv12 | PixelFormat::Nv21 | PixelFormat::Yuyv | PixelFormat::Uyvy
        )
    }
}

impl TryFrom<FourCC> for PixelFormat {
    type Error = Error;

    fn try_from(fourcc: FourCC) -> Result<Self, Self::Error> {
        PixelFormat::from_fourcc(fourcc).ok_or(Error::Unsupported(fourcc))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fourcc())
    }
}

/// Accepts the bit depth shorthands `8` and `10` (BGGR), lowercase names such as `nv12`, or a
/// raw four character code.
impl str::FromStr for PixelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.to_ascii_lowercase().as_str() {
            "8" | "bggr8" => PixelFormat::Bggr8,
            "gbrg8" => PixelFormat::Gbrg8,
            "grbg8" => PixelFormat::Grbg8,
            "rggb8" => PixelFormat::Rggb8,
            "10" | "bggr10" => PixelFormat::Bggr10,
            "nv12" => PixelFormat::Nv12,
            "nv21" => PixelFormat::Nv21,
            "yuyv" => PixelFormat::Yuyv,
            "uyvy" => PixelFormat::Uyvy,
            _ => PixelFormat::try_from(s.parse::<FourCC>()?)?,
        };
        Ok(format)
    }
}
