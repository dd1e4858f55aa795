use super::types::{MaskEstimator, SegmentationModel};
use crate::error::{ensure_non_empty, CompositeError};
use image::{GrayImage, Luma, RgbImage};

/// Probability above which a pixel counts as foreground.
///
/// Kept high so background never bleeds into the subject; the refiner
/// softens the resulting hard edge afterwards.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Mask estimation backed by a segmentation model
pub struct SegmentationEstimator {
    model: Box<dyn SegmentationModel>,
    threshold: f32,
}

impl SegmentationEstimator {
    pub fn new(model: Box<dyn SegmentationModel>) -> Self {
        Self {
            model,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Result<Self, CompositeError> {
        if !(0.0..1.0).contains(&threshold) {
            return Err(CompositeError::InvalidConfig(format!(
                "segmentation threshold must be in [0, 1), got {threshold}"
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }
}

impl MaskEstimator for SegmentationEstimator {
    fn estimate(&mut self, image: &RgbImage) -> Result<GrayImage, CompositeError> {
        let _span = tracing::debug_span!("segmentation_mask").entered();
        ensure_non_empty("foreground", image.dimensions())?;

        let (width, height) = image.dimensions();
        tracing::debug!(
            "Segmenting {}x{} frame (model input {:?})",
            width,
            height,
            self.model.input_size()
        );

        let probabilities = self
            .model
            .segment(image)
            .map_err(|e| CompositeError::Processing(format!("segmentation failed: {e:#}")))?;

        if probabilities.len() != width as usize * height as usize {
            return Err(CompositeError::Processing(format!(
                "model returned {} probabilities for a {}x{} frame",
                probabilities.len(),
                width,
                height
            )));
        }

        Ok(binarize(&probabilities, width, height, self.threshold))
    }

    fn name(&self) -> &'static str {
        "segmentation"
    }
}

/// Threshold probabilities into a 0/255 mask. NaN counts as background.
pub fn binarize(probabilities: &[f32], width: u32, height: u32, threshold: f32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let p = probabilities[(y as usize) * (width as usize) + x as usize];
        Luma([if p > threshold { 255 } else { 0 }])
    })
}
