use crate::error::CompositeError;
use anyhow::Result;
use image::{GrayImage, RgbImage};

/// Foreground probabilities: 0.0 = background, 1.0 = foreground
/// Dimensions match the input frame dimensions, row-major
pub type Probabilities = Vec<f32>;

/// Trait for segmentation backends
/// Allows swapping between different models (MediaPipe selfie, MODNet, etc.)
pub trait SegmentationModel {
    /// Run the model on a frame
    ///
    /// # Returns
    /// * Probabilities in 0.0-1.0, one per frame pixel, row-major
    fn segment(&mut self, frame: &RgbImage) -> Result<Probabilities>;

    /// Get the model's input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}

/// Produces a foreground mask for an image.
///
/// The returned mask always has the dimensions of `image`, 255 meaning
/// foreground and 0 background.
pub trait MaskEstimator {
    fn estimate(&mut self, image: &RgbImage) -> Result<GrayImage, CompositeError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
