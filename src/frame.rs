use std::io;
use std::ops::Deref;
use std::path::Path;

use crate::buffer::Metadata;
use crate::convert;
use crate::error::{Error, Result};
use crate::format::FourCC;
use crate::io::Slot;

/// Raw sensor bytes copied out of a device buffer
///
/// The copy detaches the frame from the session, so the buffer it came from can go back to the
/// driver while the frame is converted or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub fourcc: FourCC,
    /// Driver bookkeeping, absent for frames received over the network
    pub meta: Option<Metadata>,
}

impl RawFrame {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32, fourcc: FourCC) -> Self {
        RawFrame {
            bytes,
            width,
            height,
            fourcc,
            meta: None,
        }
    }

    /// Copies the valid payload of every plane of `slot`, in plane order
    pub fn from_slot<R>(slot: &Slot<R>, width: u32, height: u32, fourcc: FourCC) -> Self
    where
        R: Deref<Target = [u8]>,
    {
        let mut bytes = Vec::with_capacity(slot.payload_len());
        for plane in slot.planes() {
            bytes.extend_from_slice(plane.payload());
        }
        RawFrame {
            bytes,
            width,
            height,
            fourcc,
            meta: Some(*slot.meta()),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Demosaics or color converts the frame
    pub fn convert(self) -> Result<RgbFrame> {
        convert::convert(&self.bytes, self.width, self.height, self.fourcc)
    }
}

/// Converted frame, one `0xAARRGGBB` word per pixel
///
/// In memory each word is laid out little-endian, so the bytes read B, G, R, A.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub pixels: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

impl RgbFrame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Pixels as B, G, R, A bytes
    pub fn to_bgra_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    /// Pixels as R, G, B, A bytes, the order image encoders expect
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                let [b, g, r, a] = p.to_le_bytes();
                [r, g, b, a]
            })
            .collect()
    }

    /// Encodes the frame as an RGBA PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = image::RgbaImage::from_raw(self.width, self.height, self.to_rgba_bytes())
            .ok_or_else(|| {
                Error::invalid(format!(
                    "{} pixels do not fill a {}x{} image",
                    self.pixels.len(),
                    self.width,
                    self.height
                ))
            })?;
        image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| Error::Io(io::Error::other(e)))
    }
}

/// Splits a packed pixel into its B, G, R, A channels
pub fn channels(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}
