use chrono::NaiveDateTime;
use image::DynamicImage;
use rexif::{ExifData, ExifTag, TagValue};
use tracing::{debug, trace, warn};

/// EXIF capture timestamp layout, e.g. "2005:07:30 07:22:46".
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Rotation needed to display a stored image upright, from the EXIF
/// orientation tag. Angles are counter-clockwise, as the tag defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Code 1.
    #[default]
    Identity,
    /// Code 3.
    Rotate180,
    /// Code 6.
    Rotate270,
    /// Code 8.
    Rotate90,
    /// Any other code, including the mirrored ones. Rendered as identity.
    Unsupported(u32),
}

impl Orientation {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Identity,
            3 => Self::Rotate180,
            6 => Self::Rotate270,
            8 => Self::Rotate90,
            other => Self::Unsupported(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Identity => 1,
            Self::Rotate180 => 3,
            Self::Rotate270 => 6,
            Self::Rotate90 => 8,
            Self::Unsupported(code) => *code,
        }
    }

    /// Counter-clockwise correction angle in degrees.
    pub fn angle_degrees(&self) -> u32 {
        match self {
            Self::Identity | Self::Unsupported(_) => 0,
            Self::Rotate180 => 180,
            Self::Rotate270 => 270,
            Self::Rotate90 => 90,
        }
    }

    /// Rotate `image` so it displays upright. The image crate's rotations
    /// are clockwise, so the counter-clockwise angles map across.
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::Identity => image,
            Self::Unsupported(code) => {
                debug!("Ignoring unsupported EXIF orientation {}", code);
                image
            }
            Self::Rotate180 => image.rotate180(),
            Self::Rotate270 => image.rotate90(),
            Self::Rotate90 => image.rotate270(),
        }
    }
}

/// What the pipeline needs from a photo's EXIF block. The default value is
/// what a photo without EXIF gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExifInfo {
    pub orientation: Orientation,
    pub taken: Option<NaiveDateTime>,
}

/// Read orientation and capture time from raw upload bytes. Missing or
/// unparseable EXIF is routine and yields `ExifInfo::default()`.
pub fn read_exif(bytes: &[u8]) -> ExifInfo {
    let (result, warnings) = rexif::parse_buffer_quiet(bytes);
    for warning in &warnings {
        trace!("EXIF warning: {}", warning);
    }

    match result {
        Ok(exif) => ExifInfo {
            orientation: extract_orientation(&exif),
            taken: extract_taken(&exif),
        },
        Err(e) => {
            trace!("No EXIF data: {}", e);
            ExifInfo::default()
        }
    }
}

fn extract_orientation(exif: &ExifData) -> Orientation {
    exif.entries
        .iter()
        .find(|entry| entry.tag == ExifTag::Orientation)
        .and_then(|entry| tag_value_to_u32(&entry.value))
        .map(Orientation::from_code)
        .unwrap_or_default()
}

fn extract_taken(exif: &ExifData) -> Option<NaiveDateTime> {
    let entry = exif
        .entries
        .iter()
        .find(|entry| entry.tag == ExifTag::DateTimeOriginal)?;

    let raw = match &entry.value {
        TagValue::Ascii(text) => text.trim_end_matches('\0').trim().to_string(),
        _ => entry.value_more_readable.trim().to_string(),
    };

    parse_exif_datetime(&raw)
}

pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(raw, EXIF_DATETIME_FORMAT) {
        Ok(taken) => Some(taken),
        Err(e) => {
            warn!("Failed to parse time: {}: {}", raw, e);
            None
        }
    }
}

fn tag_value_to_u32(value: &TagValue) -> Option<u32> {
    match value {
        TagValue::U16(values) => values.first().copied().map(u32::from),
        TagValue::U8(values) => values.first().copied().map(u32::from),
        TagValue::U32(values) => values.first().copied(),
        TagValue::I16(values) => values.first().and_then(|v| u32::try_from(*v).ok()),
        TagValue::I32(values) => values.first().and_then(|v| u32::try_from(*v).ok()),
        _ => None,
    }
}
