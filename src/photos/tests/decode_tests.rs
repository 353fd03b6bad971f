use super::fixtures::{gif_bytes, jpeg_bytes, png_bytes};
use crate::photos::DecodeError;
use crate::photos::decode::decode_image;

#[test]
fn test_decode_jpeg() {
    let decoded = decode_image(&jpeg_bytes(64, 48)).unwrap();
    assert_eq!(decoded.format, "jpeg");
    assert_eq!(decoded.dimensions(), (64, 48));
}

#[test]
fn test_decode_png() {
    let decoded = decode_image(&png_bytes(30, 20)).unwrap();
    assert_eq!(decoded.format, "png");
    assert_eq!(decoded.dimensions(), (30, 20));
}

#[test]
fn test_decode_gif() {
    let decoded = decode_image(&gif_bytes(16, 16)).unwrap();
    assert_eq!(decoded.format, "gif");
    assert_eq!(decoded.dimensions(), (16, 16));
}

#[test]
fn test_decode_empty_input() {
    assert!(matches!(decode_image(&[]), Err(DecodeError::Empty)));
}

#[test]
fn test_decode_unknown_format() {
    let result = decode_image(b"definitely not an image, just some text");
    assert!(matches!(result, Err(DecodeError::UnknownFormat)));
}

#[test]
fn test_decode_truncated_png() {
    let bytes = png_bytes(64, 64);
    let truncated = &bytes[..bytes.len() / 2];

    assert!(matches!(
        decode_image(truncated),
        Err(DecodeError::ImageError(_))
    ));
}

#[test]
fn test_decode_corrupt_header() {
    // Valid PNG signature followed by garbage
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0xAB; 64]);

    assert!(decode_image(&bytes).is_err());
}
