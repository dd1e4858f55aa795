use crate::error::CompositeError;
use crate::filters::gaussian_blur;
use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};

/// Shape of the morphological structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuringElement {
    /// (2r+1) x (2r+1) square
    Square,
    /// Disc of radius r
    Disk,
}

impl StructuringElement {
    fn norm(self) -> Norm {
        match self {
            Self::Square => Norm::LInf,
            Self::Disk => Norm::L2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineConfig {
    pub element: StructuringElement,
    /// Radius of the structuring element; 1 gives a 3x3 element, 2 a 5x5 one
    pub radius: u8,
    /// Odd Gaussian kernel size used for edge smoothing
    pub blur_kernel: u32,
}

impl RefineConfig {
    /// 5x5 disc, 7x7 blur. Suits model masks with ragged hair edges.
    pub fn segmentation() -> Self {
        Self {
            element: StructuringElement::Disk,
            radius: 2,
            blur_kernel: 7,
        }
    }

    /// 3x3 square, 5x5 blur. Keying masks are already sharp.
    pub fn chroma_key() -> Self {
        Self {
            element: StructuringElement::Square,
            radius: 1,
            blur_kernel: 5,
        }
    }

    pub fn validate(self) -> Result<Self, CompositeError> {
        if self.radius == 0 {
            return Err(CompositeError::InvalidConfig(
                "structuring element radius must be positive".to_string(),
            ));
        }
        if self.blur_kernel < 3 || self.blur_kernel % 2 == 0 {
            return Err(CompositeError::InvalidConfig(format!(
                "blur kernel must be odd and at least 3, got {}",
                self.blur_kernel
            )));
        }
        Ok(self)
    }
}

/// Cleans a raw 0/255 mask and softens its edge.
///
/// Closing runs before opening so thin protrusions get reconnected before
/// speckle removal can erode them; the blur runs last on the cleaned shape.
pub struct MaskRefiner {
    config: RefineConfig,
}

impl MaskRefiner {
    pub fn new(config: RefineConfig) -> Result<Self, CompositeError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    pub fn refine(&self, mask: &GrayImage) -> GrayImage {
        let _span = tracing::debug_span!("refine_mask").entered();
        let norm = self.config.element.norm();

        let closed = close(mask, norm, self.config.radius);
        let opened = open(&closed, norm, self.config.radius);
        gaussian_blur(&opened, self.config.blur_kernel)
    }
}
