// Normalizes the three image origins into one decoded form

use crate::error::{MoodLensError, Result};
use crate::models::Frame;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;

/// Component order of a raw frame buffer. Capture backends differ; BGR
/// buffers must be reordered before classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelOrder {
    Rgb,
    Bgr,
}

/// A classifiable image from one of three origins: uploaded bytes, an
/// in-memory camera frame, or a filesystem path.
#[derive(Clone, Debug)]
pub enum ImageInput {
    Bytes { name: String, data: Vec<u8> },
    Frame { frame: Frame, order: PixelOrder },
    Path(PathBuf),
}

impl ImageInput {
    /// Decodes the input into an image the classifier can consume
    pub fn decode(&self) -> Result<DynamicImage> {
        match self {
            ImageInput::Bytes { data, .. } => Ok(image::load_from_memory(data)?),
            ImageInput::Frame { frame, order } => frame_to_image(frame, *order),
            ImageInput::Path(path) => Ok(image::open(path)?),
        }
    }

    /// The byte payload persisted alongside a record: the original bytes for
    /// uploads and paths, a JPEG encoding for camera frames.
    pub fn stored_bytes(&self) -> Result<Vec<u8>> {
        match self {
            ImageInput::Bytes { data, .. } => Ok(data.clone()),
            ImageInput::Path(path) => Ok(std::fs::read(path)?),
            ImageInput::Frame { frame, order } => {
                let image = frame_to_image(frame, *order)?;
                let mut buffer = Cursor::new(Vec::new());
                image.write_to(&mut buffer, ImageFormat::Jpeg)?;
                Ok(buffer.into_inner())
            }
        }
    }

    /// Name derived from the origin, if it has one. Camera frames have none;
    /// the pipeline synthesizes one for them.
    pub fn display_name(&self) -> Option<String> {
        match self {
            ImageInput::Bytes { name, .. } => Some(name.clone()),
            ImageInput::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            ImageInput::Frame { .. } => None,
        }
    }
}

/// Builds an image from a raw frame buffer, swapping channels when the
/// buffer is BGR
fn frame_to_image(frame: &Frame, order: PixelOrder) -> Result<DynamicImage> {
    let mut data = frame.data.clone();
    if order == PixelOrder::Bgr {
        for pixel in data.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
    }

    let buffer = RgbImage::from_raw(frame.width, frame.height, data).ok_or_else(|| {
        MoodLensError::FrameProcessing(format!(
            "Frame buffer does not match {}x{} dimensions",
            frame.width, frame.height
        ))
    })?;
    Ok(DynamicImage::ImageRgb8(buffer))
}
