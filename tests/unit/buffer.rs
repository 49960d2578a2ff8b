use super::*;

fn rgb(size: Size, px: [u8; 3]) -> PixelBuffer {
    PixelBuffer::filled(size, PixelFormat::Rgb8, &px).unwrap()
}

#[test]
fn from_raw_rejects_wrong_length() {
    let err = PixelBuffer::from_raw(Size::new(2, 2), PixelFormat::Bgra8, vec![0; 15]).unwrap_err();
    assert!(!err.is_fatal());
}

#[test]
fn flip_vertical_swaps_rows_odd_height() {
    let size = Size::new(1, 3);
    let mut b = PixelBuffer::from_raw(size, PixelFormat::Gray8, vec![1, 2, 3]).unwrap();
    b.flip_vertical();
    assert_eq!(b.data(), &[3, 2, 1]);
    b.flip_vertical();
    assert_eq!(b.data(), &[1, 2, 3]);
}

#[test]
fn flip_vertical_swaps_rows_even_height() {
    let size = Size::new(2, 2);
    let mut b = PixelBuffer::from_raw(size, PixelFormat::Gray8, vec![1, 2, 3, 4]).unwrap();
    b.flip_vertical();
    assert_eq!(b.data(), &[3, 4, 1, 2]);
}

#[test]
fn rgb_bgra_conversion_swaps_channels_and_sets_alpha() {
    let src = rgb(Size::new(2, 1), [10, 20, 30]);
    let mut bgra = PixelBuffer::empty(PixelFormat::Bgra8);
    src.convert_into(&mut bgra, ColorConversion::RgbToBgra).unwrap();
    assert_eq!(bgra.format(), PixelFormat::Bgra8);
    assert_eq!(bgra.pixel(1, 0), &[30, 20, 10, 255]);

    let mut back = PixelBuffer::empty(PixelFormat::Rgb8);
    bgra.convert_into(&mut back, ColorConversion::BgraToRgb).unwrap();
    assert_eq!(back, src);
}

#[test]
fn conversion_rejects_wrong_input_format() {
    let src = rgb(Size::new(1, 1), [0, 0, 0]);
    let mut dst = PixelBuffer::empty(PixelFormat::Rgb8);
    assert!(src.convert_into(&mut dst, ColorConversion::BgraToRgb).is_err());
}

#[test]
fn gray_conversion_uses_luma_weights() {
    let src = rgb(Size::new(3, 1), [255, 255, 255]);
    let mut gray = PixelBuffer::empty(PixelFormat::Gray8);
    src.convert_into(&mut gray, ColorConversion::RgbToGray).unwrap();
    assert_eq!(gray.data(), &[255, 255, 255]);
}

#[test]
fn resize_of_constant_image_stays_constant() {
    let src = rgb(Size::new(8, 6), [0, 0, 255]);
    let mut dst = PixelBuffer::empty(PixelFormat::Rgb8);
    src.resize_into(&mut dst, Size::new(4, 3)).unwrap();
    assert_eq!(dst.size(), Size::new(4, 3));
    assert!(dst.data().chunks_exact(3).all(|p| p == [0, 0, 255]));
}

#[test]
fn resize_to_same_size_copies() {
    let src = rgb(Size::new(3, 2), [1, 2, 3]);
    let mut dst = PixelBuffer::empty(PixelFormat::Rgb8);
    src.resize_into(&mut dst, src.size()).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn ensure_keeps_allocation_when_length_matches() {
    let mut b = PixelBuffer::new(Size::new(4, 4), PixelFormat::Bgra8);
    let ptr = b.data().as_ptr();
    b.ensure(Size::new(8, 2), PixelFormat::Bgra8);
    assert_eq!(b.data().as_ptr(), ptr);
    assert_eq!(b.size(), Size::new(8, 2));
}
