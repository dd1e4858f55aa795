use super::OutputSink;
use crate::error::CompositeError;
use image::{GrayImage, ImageBuffer, ImageFormat, PixelWithColorType};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Writes images to a file, format chosen by extension.
///
/// The image is fully encoded in memory first, so a failed encode never
/// leaves a truncated file behind.
pub struct FileSink {
    path: PathBuf,
    format: ImageFormat,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CompositeError> {
        let path = path.as_ref().to_path_buf();
        let format = ImageFormat::from_path(&path).map_err(|_| {
            CompositeError::InvalidConfig(format!(
                "cannot infer an image format from {}",
                path.display()
            ))
        })?;
        if !format.writing_enabled() {
            return Err(CompositeError::InvalidConfig(format!(
                "writing {:?} images is not supported",
                format
            )));
        }

        Ok(Self { path, format })
    }

    /// Save a single-channel mask alongside the composite
    pub fn write_mask(&mut self, mask: &GrayImage) -> Result<(), CompositeError> {
        self.write(mask)
    }

    fn write<P>(&self, image: &ImageBuffer<P, Vec<u8>>) -> Result<(), CompositeError>
    where
        P: PixelWithColorType<Subpixel = u8>,
    {
        let mut encoded = Cursor::new(Vec::new());
        image.write_to(&mut encoded, self.format)?;

        std::fs::write(&self.path, encoded.into_inner()).map_err(|source| CompositeError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(
            "Wrote {}x{} image to {}",
            image.width(),
            image.height(),
            self.path.display()
        );
        Ok(())
    }
}

impl OutputSink for FileSink {
    fn write_frame(&mut self, frame: &image::RgbImage) -> Result<(), CompositeError> {
        self.write(frame)
    }
}
