use super::error::DecodeError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Short format tag, e.g. "jpeg" or "png".
    pub format: String,
}

impl DecodedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Decode raw upload bytes, guessing the format from the content rather
/// than the filename.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format().ok_or(DecodeError::UnknownFormat)?;
    let image = reader.decode()?;

    debug!(
        "Decoded {:?} image: {}x{}",
        format,
        image.width(),
        image.height()
    );

    Ok(DecodedImage {
        image,
        format: format_tag(format).to_string(),
    })
}

pub fn format_tag(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        other => other.extensions_str().first().copied().unwrap_or("octet-stream"),
    }
}
