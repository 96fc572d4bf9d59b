//! Raw sensor layouts to packed BGRA
//!
//! Every converter writes one `u32` per pixel holding `0xAARRGGBB`, which reads B, G, R, A in
//! memory on little-endian hosts. Alpha is always opaque.

mod bayer;
mod yuv;

use crate::error::{Error, Result};
use crate::format::{FourCC, PixelFormat};
use crate::frame::RgbFrame;

/// Packs one opaque pixel
#[inline]
pub(crate) fn pack(r: u8, g: u8, b: u8) -> u32 {
    0xff00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Converts a raw frame tagged with `fourcc`
///
/// Buffers longer than the frame needs are accepted, drivers pad their images.
///
/// # Example
///
/// ```
/// use rawcap::convert::convert;
/// use rawcap::format::FourCC;
///
/// let rgb = convert(&[128; 16], 4, 4, FourCC::SBGGR8)?;
/// assert_eq!(rgb.pixel(1, 1), Some(0xff80_8080));
/// # Ok::<(), rawcap::Error>(())
/// ```
pub fn convert(raw: &[u8], width: u32, height: u32, fourcc: FourCC) -> Result<RgbFrame> {
    let format = PixelFormat::try_from(fourcc)?;
    let mut pixels = Vec::new();
    convert_into(raw, width, height, format, &mut pixels)?;
    Ok(RgbFrame {
        pixels,
        width,
        height,
    })
}

/// Converts into `out`, reusing its allocation
pub fn convert_into(
    raw: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    out: &mut Vec<u32>,
) -> Result<()> {
    validate(raw, width, height, format)?;

    out.clear();
    out.resize(width as usize * height as usize, 0);
    let (w, h) = (width as usize, height as usize);
    match format {
        PixelFormat::Bggr8 => bayer::bayer8(raw, w, h, bayer::Order::Bggr, out),
        PixelFormat::Gbrg8 => bayer::bayer8(raw, w, h, bayer::Order::Gbrg, out),
        PixelFormat::Grbg8 => bayer::bayer8(raw, w, h, bayer::Order::Grbg, out),
        PixelFormat::Rggb8 => bayer::bayer8(raw, w, h, bayer::Order::Rggb, out),
        PixelFormat::Bggr10 => bayer::bayer10(raw, w, h, out),
        PixelFormat::Nv12 => yuv::semi_planar(raw, w, h, yuv::Chroma::Uv, out),
        PixelFormat::Nv21 => yuv::semi_planar(raw, w, h, yuv::Chroma::Vu, out),
        PixelFormat::Yuyv => yuv::packed(raw, w, h, yuv::Packing::YUYV, out),
        PixelFormat::Uyvy => yuv::packed(raw, w, h, yuv::Packing::UYVY, out),
    }
    Ok(())
}

fn validate(raw: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid(format!(
            "cannot convert an empty {width}x{height} frame"
        )));
    }
    if format.needs_even_width() && width % 2 != 0 {
        return Err(Error::invalid(format!(
            "{format} needs an even width, got {width}"
        )));
    }
    if bayer::needs_neighbours(format) && (width < 2 || height < 2) {
        return Err(Error::invalid(format!(
            "{format} demosaicing needs at least 2x2 samples, got {width}x{height}"
        )));
    }

    let needed = format.frame_size(width, height)?;
    if raw.len() < needed {
        return Err(Error::invalid(format!(
            "{width}x{height} {format} needs {needed} bytes, got {}",
            raw.len()
        )));
    }
    Ok(())
}
