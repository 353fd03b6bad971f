use super::fixtures::gradient_image;
use crate::photos::render::render;
use crate::photos::{Orientation, ProcessingError, ResizeMode};
use image::DynamicImage;

#[test]
fn test_fill_is_exact() {
    let image = gradient_image(400, 300);
    let thumbnail = render(&image, 250, 250, ResizeMode::Fill, Orientation::Identity).unwrap();

    assert_eq!((thumbnail.width(), thumbnail.height()), (250, 250));
}

#[test]
fn test_fit_keeps_aspect_and_upscales() {
    let image = gradient_image(400, 300);
    let thumbnail = render(&image, 740, 555, ResizeMode::Fit, Orientation::Identity).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (740, 555));

    let portrait = gradient_image(300, 400);
    let thumbnail = render(&portrait, 740, 555, ResizeMode::Fit, Orientation::Identity).unwrap();
    assert_eq!(thumbnail.height(), 555);
    assert!(thumbnail.width() < 740);
}

#[test]
fn test_fit_never_crops() {
    let image = gradient_image(1000, 100);
    let thumbnail = render(&image, 250, 250, ResizeMode::Fit, Orientation::Identity).unwrap();

    assert_eq!(thumbnail.width(), 250);
    assert_eq!(thumbnail.height(), 25);
}

#[test]
fn test_rotation_after_resize() {
    let image = gradient_image(400, 300);

    let upright = render(&image, 250, 250, ResizeMode::Fill, Orientation::Identity).unwrap();
    let rotated = render(&image, 250, 250, ResizeMode::Fill, Orientation::Rotate270).unwrap();

    assert_eq!(rotated.as_bytes(), upright.rotate90().as_bytes());
    assert_ne!(rotated.as_bytes(), upright.as_bytes());
}

#[test]
fn test_orientation_codes_rotate_upright() {
    let image = gradient_image(400, 300);
    let upright = render(&image, 200, 100, ResizeMode::Fill, Orientation::from_code(1)).unwrap();

    let half_turn = render(&image, 200, 100, ResizeMode::Fill, Orientation::from_code(3)).unwrap();
    assert_eq!(half_turn.as_bytes(), upright.rotate180().as_bytes());

    let clockwise = render(&image, 200, 100, ResizeMode::Fill, Orientation::from_code(6)).unwrap();
    assert_eq!(clockwise.as_bytes(), upright.rotate90().as_bytes());

    let counter_clockwise =
        render(&image, 200, 100, ResizeMode::Fill, Orientation::from_code(8)).unwrap();
    assert_eq!(
        counter_clockwise.as_bytes(),
        upright.rotate270().as_bytes()
    );
    assert_ne!(counter_clockwise.as_bytes(), clockwise.as_bytes());
}

#[test]
fn test_quarter_turn_swaps_fit_box() {
    let image = gradient_image(400, 300);
    let thumbnail = render(&image, 740, 555, ResizeMode::Fit, Orientation::Rotate90).unwrap();

    assert_eq!((thumbnail.width(), thumbnail.height()), (555, 740));
}

#[test]
fn test_unsupported_orientation_renders_identity() {
    let image = gradient_image(200, 100);

    let upright = render(&image, 100, 100, ResizeMode::Fill, Orientation::Identity).unwrap();
    let mirrored = render(&image, 100, 100, ResizeMode::Fill, Orientation::Unsupported(2)).unwrap();

    assert_eq!(mirrored.as_bytes(), upright.as_bytes());
}

#[test]
fn test_zero_target_is_render_error() {
    let image = gradient_image(40, 30);
    let result = render(&image, 0, 250, ResizeMode::Fill, Orientation::Identity);

    assert!(matches!(
        result,
        Err(ProcessingError::Render {
            width: 0,
            height: 250,
            ..
        })
    ));
}

#[test]
fn test_zero_source_is_render_error() {
    let image = DynamicImage::new_rgb8(0, 0);
    let result = render(&image, 250, 250, ResizeMode::Fit, Orientation::Identity);

    assert!(matches!(result, Err(ProcessingError::Render { .. })));
}
