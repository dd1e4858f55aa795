pub mod alpha;
mod chroma_key;
#[cfg(feature = "segmentation")]
mod onnx;
#[cfg_attr(not(feature = "segmentation"), allow(dead_code))]
mod preprocess;
mod refine;
#[cfg_attr(not(feature = "segmentation"), allow(dead_code))]
mod segmentation;
pub mod types;

pub use chroma_key::{ChromaKeyConfig, ChromaKeyEstimator, MAX_SENSITIVITY};
#[cfg(feature = "segmentation")]
pub use onnx::OnnxSegmenter;
pub use refine::{MaskRefiner, RefineConfig};
pub use segmentation::{SegmentationEstimator, DEFAULT_THRESHOLD};
pub use types::{MaskEstimator, SegmentationModel};

use anyhow::Result;
#[cfg(not(feature = "segmentation"))]
use anyhow::bail;

/// Create the default model-backed estimator (ONNX selfie segmentation)
#[cfg(feature = "segmentation")]
pub fn create_segmentation_estimator(
    model_path: &str,
    threshold: f32,
) -> Result<Box<dyn MaskEstimator>> {
    let model = OnnxSegmenter::new(model_path)?;
    let estimator = SegmentationEstimator::new(Box::new(model)).with_threshold(threshold)?;
    Ok(Box::new(estimator))
}

#[cfg(not(feature = "segmentation"))]
pub fn create_segmentation_estimator(
    model_path: &str,
    _threshold: f32,
) -> Result<Box<dyn MaskEstimator>> {
    bail!(
        "Cannot load {}: built without the `segmentation` feature",
        model_path
    )
}
