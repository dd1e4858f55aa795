use super::preprocess::{Preprocessor, TensorLayout};
use super::types::{Probabilities, SegmentationModel};
use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use std::path::Path;

/// Person segmentation through ONNX Runtime
///
/// Works with single-output selfie segmentation models that emit one
/// foreground probability per pixel (MediaPipe selfie segmenter exports,
/// MODNet and similar).
pub struct OnnxSegmenter {
    session: Session,
    preprocessor: Preprocessor,
    width: u32,
    height: u32,
}

impl OnnxSegmenter {
    /// Load a model using the landscape selfie segmenter input
    ///
    /// # Default Configuration
    /// - Input size: 256x144
    /// - Layout: NHWC, RGB in [0, 1]
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_input(model_path, 256, 144, TensorLayout::Nhwc)
    }

    pub fn with_input<P: AsRef<Path>>(
        model_path: P,
        width: u32,
        height: u32,
        layout: TensorLayout,
    ) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Segmentation model loaded successfully");
        tracing::debug!("Model input {}x{} ({:?})", width, height, layout);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height, layout),
            width,
            height,
        })
    }
}

impl SegmentationModel for OnnxSegmenter {
    fn segment(&mut self, frame: &RgbImage) -> Result<Probabilities> {
        let _span = tracing::debug_span!("onnx_segment").entered();

        let input_tensor = self.preprocessor.preprocess(frame)?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(&input_tensor)?])
            .context("Failed to run inference")?;
        drop(_infer_span);

        // First output is the foreground probability map
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Segmentation output is not an f32 tensor")?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        let (map_width, map_height) = Preprocessor::output_dims(&dims)?;

        let (frame_width, frame_height) = frame.dimensions();
        Preprocessor::postprocess(data, map_width, map_height, frame_width, frame_height)
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
