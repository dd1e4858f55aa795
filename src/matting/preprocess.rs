use anyhow::{bail, Result};
use image::{imageops, ImageBuffer, Luma, RgbImage};
use ndarray::Array4;

/// Memory layout of the model input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// [1, 3, height, width]
    Nchw,
    /// [1, height, width, 3]
    Nhwc,
}

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    layout: TensorLayout,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, layout: TensorLayout) -> Self {
        Self {
            target_width,
            target_height,
            layout,
        }
    }

    /// Preprocess an RGB image into a normalized tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Lay out as NCHW or NHWC
    pub fn preprocess(&self, image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        if image.width() == 0 || image.height() == 0 {
            bail!("Cannot preprocess an empty frame");
        }

        // Resize if needed
        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            image.clone()
        };

        let (width, height) = resized.dimensions();
        let (w, h) = (width as usize, height as usize);
        let mut tensor = match self.layout {
            TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, h, w)),
            TensorLayout::Nhwc => Array4::<f32>::zeros((1, h, w, 3)),
        };

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                match self.layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                }
            }
        }

        Ok(tensor)
    }

    /// Work out (width, height) of a single-channel model output.
    ///
    /// Accepts [1, 1, H, W], [1, H, W, 1], [1, H, W] and [H, W].
    pub fn output_dims(shape: &[i64]) -> Result<(u32, u32)> {
        let (height, width) = match *shape {
            [1, 1, h, w] => (h, w),
            [1, h, w, 1] => (h, w),
            [1, h, w] => (h, w),
            [h, w] => (h, w),
            _ => bail!("Unsupported segmentation output shape {:?}", shape),
        };
        if height <= 0 || width <= 0 {
            bail!("Segmentation output has empty shape {:?}", shape);
        }
        Ok((width as u32, height as u32))
    }

    /// Resize model-resolution probabilities back to frame dimensions
    ///
    /// Resampling happens in f32 so values near the cutoff are not
    /// quantised; results are clamped to [0, 1].
    pub fn postprocess(
        probabilities: &[f32],
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Result<Vec<f32>> {
        let _span = tracing::debug_span!("postprocess").entered();

        let expected = source_width as usize * source_height as usize;
        if probabilities.len() != expected {
            bail!(
                "Expected {} probabilities for {}x{}, got {}",
                expected,
                source_width,
                source_height,
                probabilities.len()
            );
        }

        if source_width == target_width && source_height == target_height {
            return Ok(probabilities.iter().map(|p| p.clamp(0.0, 1.0)).collect());
        }

        let map: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_raw(source_width, source_height, probabilities.to_vec())
                .ok_or_else(|| anyhow::anyhow!("Probability buffer does not match its shape"))?;

        let resized = imageops::resize(
            &map,
            target_width,
            target_height,
            imageops::FilterType::Lanczos3,
        );

        Ok(resized.pixels().map(|p| p[0].clamp(0.0, 1.0)).collect())
    }
}
