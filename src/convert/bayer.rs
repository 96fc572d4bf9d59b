use crate::format::PixelFormat;

use super::pack;

/// Color filter layout of the top-left 2x2 block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Order {
    Bggr,
    Gbrg,
    Grbg,
    Rggb,
}

impl Order {
    /// Whether the top-left sample is green
    fn starts_green(self) -> bool {
        matches!(self, Order::Gbrg | Order::Grbg)
    }

    /// Whether red sits where blue does in BGGR/GBRG
    fn swaps_red_blue(self) -> bool {
        matches!(self, Order::Grbg | Order::Rggb)
    }
}

pub(super) fn needs_neighbours(format: PixelFormat) -> bool {
    matches!(
        format,
        PixelFormat::Bggr8 | PixelFormat::Gbrg8 | PixelFormat::Grbg8 | PixelFormat::Rggb8
    )
}

/// Mirrors an index that would fall outside `0..len`
#[inline]
fn before(i: usize) -> usize {
    if i == 0 {
        1
    } else {
        i - 1
    }
}

#[inline]
fn after(i: usize, len: usize) -> usize {
    if i == len - 1 {
        i - 1
    } else {
        i + 1
    }
}

/// Bilinear demosaic of 8-bit samples
///
/// Requires `w >= 2` and `h >= 2`.
pub(super) fn bayer8(raw: &[u8], w: usize, h: usize, order: Order, out: &mut [u32]) {
    let at = |x: usize, y: usize| raw[y * w + x] as u32;

    for y in 0..h {
        let (up, down) = (before(y), after(y, h));
        for x in 0..w {
            let (left, right) = (before(x), after(x, w));

            let native = at(x, y);
            let horizontal = (at(left, y) + at(right, y)) / 2;
            let vertical = (at(x, up) + at(x, down)) / 2;
            let diagonal =
                (at(left, up) + at(right, up) + at(left, down) + at(right, down)) / 4;

            let green_site = ((x + y) & 1 == 1) != order.starts_green();
            let odd_row = y & 1 == 1;
            let (r, g, b) = if green_site {
                if odd_row {
                    (horizontal, native, vertical)
                } else {
                    (vertical, native, horizontal)
                }
            } else {
                let g = (vertical + horizontal) / 2;
                if odd_row {
                    (native, g, diagonal)
                } else {
                    (diagonal, g, native)
                }
            };

            let (r, b) = if order.swaps_red_blue() { (b, r) } else { (r, b) };
            out[y * w + x] = pack(r as u8, g as u8, b as u8);
        }
    }
}

/// 10-bit BGGR samples held in little-endian 16-bit words
///
/// Missing channels are copied from the nearest preceding sample of that color. Within two
/// samples of the border nothing is interpolated and missing channels stay zero.
pub(super) fn bayer10(raw: &[u8], w: usize, h: usize, out: &mut [u32]) {
    let at = |x: usize, y: usize| {
        let i = (y * w + x) * 2;
        let v = u16::from_le_bytes([raw[i], raw[i + 1]]) as u32;
        (v * 255 / 1023).min(255) as u8
    };

    for y in 0..h {
        for x in 0..w {
            let edge = x < 2 || x + 1 >= w || y < 2 || y + 1 >= h;
            let (x_odd, y_odd) = (x & 1 == 1, y & 1 == 1);

            let r = if x_odd && y_odd {
                at(x, y)
            } else if edge {
                0
            } else {
                at((x - 2) | 1, (y - 2) | 1)
            };
            let g = if x_odd != y_odd {
                at(x, y)
            } else if edge {
                0
            } else {
                at(x - 1, y)
            };
            let b = if !x_odd && !y_odd {
                at(x, y)
            } else if edge {
                0
            } else {
                at(x & !1, y & !1)
            };

            out[y * w + x] = pack(r, g, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::channels;

    const ORDERS: [Order; 4] = [Order::Bggr, Order::Gbrg, Order::Grbg, Order::Rggb];

    fn demosaic(raw: &[u8], w: usize, h: usize, order: Order) -> Vec<u32> {
        let mut out = vec![0; w * h];
        bayer8(raw, w, h, order, &mut out);
        out
    }

    #[test]
    fn test_flat_field_stays_gray() {
        for order in ORDERS {
            for value in [0u8, 1, 77, 128, 255] {
                let out = demosaic(&[value; 6 * 4], 6, 4, order);
                assert!(
                    out.iter().all(|&p| channels(p) == [value, value, value, 255]),
                    "{order:?} {value}"
                );
            }
        }
    }

    #[test]
    fn test_native_sites_keep_their_sample() {
        // BGGR: B at (0, 0), R at (1, 1)
        #[rustfmt::skip]
        let raw = [
            10, 50, 10, 50,
            50, 90, 50, 90,
            10, 50, 10, 50,
            50, 90, 50, 90,
        ];
        let out = demosaic(&raw, 4, 4, Order::Bggr);
        assert_eq!(channels(out[0]), [10, 50, 90, 255]);
        assert_eq!(channels(out[5]), [10, 50, 90, 255]);

        let out = demosaic(&raw, 4, 4, Order::Rggb);
        assert_eq!(channels(out[0]), [90, 50, 10, 255]);
        assert_eq!(channels(out[5]), [90, 50, 10, 255]);
    }

    #[test]
    fn test_green_first_orders() {
        // GBRG: G at (0, 0), B at (1, 0), R at (0, 1)
        #[rustfmt::skip]
        let raw = [
            50, 10, 50, 10,
            90, 50, 90, 50,
            50, 10, 50, 10,
            90, 50, 90, 50,
        ];
        let out = demosaic(&raw, 4, 4, Order::Gbrg);
        assert!(out.iter().all(|&p| channels(p) == [10, 50, 90, 255]));

        let out = demosaic(&raw, 4, 4, Order::Grbg);
        assert!(out.iter().all(|&p| channels(p) == [90, 50, 10, 255]));
    }

    #[test]
    fn test_ten_bit_zero_frame_is_black() {
        let (w, h) = (8, 6);
        let mut out = vec![0; w * h];
        bayer10(&vec![0; w * h * 2], w, h, &mut out);
        assert!(out.iter().all(|&p| p == 0xff00_0000));
    }

    #[test]
    fn test_ten_bit_scaling_saturates() {
        let mut out = vec![0; 4];
        let mut raw = Vec::new();
        for v in [1023u16, 512, 0xffff, 4] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        bayer10(&raw, 2, 2, &mut out);
        // (0, 0) blue, (1, 0) and (0, 1) green, (1, 1) red
        assert_eq!(channels(out[0])[0], 255);
        assert_eq!(channels(out[1])[1], 127);
        assert_eq!(channels(out[2])[1], 255);
        assert_eq!(channels(out[3])[2], 0);
    }

    #[test]
    fn test_ten_bit_border_is_not_interpolated() {
        let (w, h) = (8, 8);
        let raw: Vec<u8> = std::iter::repeat(1023u16.to_le_bytes())
            .take(w * h)
            .flatten()
            .collect();
        let mut out = vec![0; w * h];
        bayer10(&raw, w, h, &mut out);

        for y in 0..h {
            for x in 0..w {
                let [b, g, r, a] = channels(out[y * w + x]);
                assert_eq!(a, 255);
                let edge = x < 2 || x >= w - 1 || y < 2 || y >= h - 1;
                let (x_odd, y_odd) = (x % 2 == 1, y % 2 == 1);
                let expect = |native: bool| if native || !edge { 255 } else { 0 };
                assert_eq!(r, expect(x_odd && y_odd), "red at ({x}, {y})");
                assert_eq!(g, expect(x_odd != y_odd), "green at ({x}, {y})");
                assert_eq!(b, expect(!x_odd && !y_odd), "blue at ({x}, {y})");
            }
        }
    }
}
