use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the matting and compositing pipeline.
///
/// Every stage validates its inputs before touching an output buffer, so a
/// returned error always means nothing was written.
#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("Failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image")]
    Encode(#[from] image::ImageError),

    #[error("Capture device error: {0}")]
    Device(String),

    #[error("Dimension error: {0}")]
    Dimension(String),

    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The user backed out of an interactive capture. Not a failure.
    #[error("Cancelled by user")]
    Cancelled,
}

impl CompositeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Reject images with a zero dimension.
pub fn ensure_non_empty(what: &str, (width, height): (u32, u32)) -> Result<(), CompositeError> {
    if width == 0 || height == 0 {
        return Err(CompositeError::Dimension(format!(
            "{what} has zero dimension ({width}x{height})"
        )));
    }
    Ok(())
}
