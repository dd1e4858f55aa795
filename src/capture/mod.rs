mod interactive;
#[cfg(feature = "webcam")]
mod webcam;

pub use interactive::{ControlInput, InteractiveCapture, LineControl, Shot, Signal};
#[cfg(feature = "webcam")]
pub use webcam::WebcamCapture;

use crate::error::CompositeError;
use anyhow::Result;
use image::RgbImage;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame
    fn capture_frame(&mut self) -> Result<RgbImage>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}

/// Open the camera at `device_index`
#[cfg(feature = "webcam")]
pub fn open_camera(device_index: u32) -> Result<Box<dyn CaptureSource>, CompositeError> {
    let camera = WebcamCapture::new(device_index)
        .map_err(|e| CompositeError::Device(format!("camera {device_index}: {e:#}")))?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "webcam"))]
pub fn open_camera(device_index: u32) -> Result<Box<dyn CaptureSource>, CompositeError> {
    Err(CompositeError::Device(format!(
        "cannot open camera {device_index}: built without the `webcam` feature"
    )))
}

impl<C: CaptureSource + ?Sized> CaptureSource for Box<C> {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        (**self).capture_frame()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "webcam"))]
    #[test]
    fn camera_without_backend_is_a_device_error() {
        let err = open_camera(0).err().unwrap();
        assert!(matches!(err, CompositeError::Device(msg) if msg.contains("camera 0")));
    }
}
