mod file;

pub use file::FileSink;

use crate::error::CompositeError;
use image::RgbImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a finished frame to the output
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), CompositeError>;
}
