use super::error::ProcessingError;
use super::exif::Orientation;
use super::types::ResizeMode;
use image::{DynamicImage, imageops::FilterType};
use tracing::trace;

/// Resample `image` into a `width` x `height` box, then rotate the result
/// upright according to `orientation`.
///
/// Rotation happens after resizing. For square boxes this is exact; for a
/// non-square `Fit` box a quarter-turn swaps the result's aspect relative to
/// the box.
pub fn render(
    image: &DynamicImage,
    width: u32,
    height: u32,
    mode: ResizeMode,
    orientation: Orientation,
) -> Result<DynamicImage, ProcessingError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ProcessingError::Render {
            width,
            height,
            reason: "source image has no pixels".to_string(),
        });
    }
    if width == 0 || height == 0 {
        return Err(ProcessingError::Render {
            width,
            height,
            reason: "target box has no area".to_string(),
        });
    }

    let resized = match mode {
        ResizeMode::Fill => image.resize_to_fill(width, height, FilterType::Lanczos3),
        ResizeMode::Fit => image.resize(width, height, FilterType::Lanczos3),
    };

    trace!(
        "Resized {}x{} to {}x{} ({})",
        image.width(),
        image.height(),
        resized.width(),
        resized.height(),
        mode
    );

    Ok(orientation.apply(resized))
}
