use super::pack;

/// Order of the interleaved chroma pair in a semi-planar frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Chroma {
    Uv,
    Vu,
}

/// Byte offsets of Y0, Y1, U and V inside one packed 4:2:2 macropixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Packing {
    y0: usize,
    y1: usize,
    u: usize,
    v: usize,
}

impl Packing {
    pub const YUYV: Packing = Packing {
        y0: 0,
        y1: 2,
        u: 1,
        v: 3,
    };
    pub const UYVY: Packing = Packing {
        y0: 1,
        y1: 3,
        u: 0,
        v: 2,
    };
}

/// BT.601 analog matrix, clamped and truncated
#[inline]
fn to_pixel(y: u8, u: u8, v: u8) -> u32 {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = y + 1.13983 * v;
    let g = y - 0.39466 * u - 0.58060 * v;
    let b = y + 2.03211 * u;
    pack(
        r.clamp(0.0, 255.0) as u8,
        g.clamp(0.0, 255.0) as u8,
        b.clamp(0.0, 255.0) as u8,
    )
}

/// Luma plane followed by one interleaved chroma pair per 2x2 block
pub(super) fn semi_planar(raw: &[u8], w: usize, h: usize, order: Chroma, out: &mut [u32]) {
    let (luma, chroma) = raw.split_at(w * h);
    for y in 0..h {
        let row = &chroma[(y / 2) * w..];
        for x in 0..w {
            let pair = &row[x & !1..];
            let (u, v) = match order {
                Chroma::Uv => (pair[0], pair[1]),
                Chroma::Vu => (pair[1], pair[0]),
            };
            out[y * w + x] = to_pixel(luma[y * w + x], u, v);
        }
    }
}

/// Two pixels per four bytes sharing one chroma pair
pub(super) fn packed(raw: &[u8], w: usize, h: usize, packing: Packing, out: &mut [u32]) {
    for (macropixel, pixels) in raw
        .chunks_exact(4)
        .zip(out.chunks_exact_mut(2))
        .take(w * h / 2)
    {
        let (u, v) = (macropixel[packing.u], macropixel[packing.v]);
        pixels[0] = to_pixel(macropixel[packing.y0], u, v);
        pixels[1] = to_pixel(macropixel[packing.y1], u, v);
    }
}
