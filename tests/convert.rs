use rawcap::convert::convert;
use rawcap::{ErrorKind, FourCC, PixelFormat};

fn bgra(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

#[test]
fn flat_bayer_frames_are_gray() {
    for fourcc in [FourCC::SBGGR8, FourCC::SGBRG8, FourCC::SGRBG8, FourCC::SRGGB8] {
        let rgb = convert(&[93; 16 * 8], 16, 8, fourcc).unwrap();
        assert_eq!(rgb.pixels.len(), 16 * 8);
        assert!(rgb.pixels.iter().all(|&p| bgra(p) == [93, 93, 93, 255]));
    }
}

#[test]
fn ten_bit_black_keeps_alpha() {
    let rgb = convert(&[0; 10 * 6 * 2], 10, 6, FourCC::SBGGR10).unwrap();
    assert!(rgb.pixels.iter().all(|&p| p == 0xff00_0000));
}

#[test]
fn every_format_converts_a_padded_buffer() {
    for format in PixelFormat::ALL {
        let raw = vec![128; format.frame_size(8, 6).unwrap() + 64];
        let rgb = convert(&raw, 8, 6, format.fourcc()).unwrap();
        assert_eq!((rgb.width, rgb.height), (8, 6));
        assert!(rgb.pixels.iter().all(|&p| bgra(p)[3] == 255), "{format}");
    }
}

#[test]
fn neutral_yuv_is_gray() {
    for fourcc in [FourCC::NV12, FourCC::NV21] {
        let raw = vec![128; 4 * 4 + 4 * 2];
        let rgb = convert(&raw, 4, 4, fourcc).unwrap();
        assert!(rgb.pixels.iter().all(|&p| bgra(p) == [128, 128, 128, 255]));
    }
    for fourcc in [FourCC::YUYV, FourCC::UYVY] {
        let rgb = convert(&[128; 4 * 2 * 2], 4, 2, fourcc).unwrap();
        assert!(rgb.pixels.iter().all(|&p| bgra(p) == [128, 128, 128, 255]));
    }
}

#[test]
fn bad_inputs_are_reported() {
    let short = convert(&[0; 15], 4, 4, FourCC::SBGGR8).unwrap_err();
    assert_eq!(short.kind(), ErrorKind::InvalidInput);

    let unknown = convert(&[0; 64], 4, 4, FourCC::new(b"H264")).unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::Unsupported);
}
