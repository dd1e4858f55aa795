mod placement;
pub mod resample;

pub use placement::Placement;

use crate::error::{ensure_non_empty, CompositeError};
use crate::filters::gaussian_blur;
use image::{imageops, Pixel};
use imageproc::definitions::Image;

pub const DEFAULT_PADDING_PERCENT: f64 = 10.0;
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0 / 3.0;

/// Kernel of the blur applied after a cover crop to hide resampling seams
const COVER_BLUR_KERNEL: u32 = 5;

/// How a layer is sized against a target frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitPolicy {
    /// Scale to cover the target completely, then centre-crop to it
    CoverCrop,
    /// Largest uniform scale that fits inside the target minus a margin
    FitWithin { padding_percent: f64 },
    /// Height is a fraction of the target height, width follows the aspect ratio
    FixedFraction { scale_factor: f64 },
}

impl FitPolicy {
    pub fn fit_within(padding_percent: f64) -> Result<Self, CompositeError> {
        Self::FitWithin { padding_percent }.validate()
    }

    pub fn fixed_fraction(scale_factor: f64) -> Result<Self, CompositeError> {
        Self::FixedFraction { scale_factor }.validate()
    }

    pub fn validate(self) -> Result<Self, CompositeError> {
        match self {
            Self::CoverCrop => Ok(self),
            Self::FitWithin { padding_percent } => {
                if !(0.0..100.0).contains(&padding_percent) {
                    return Err(CompositeError::InvalidConfig(format!(
                        "padding must be in [0, 100), got {padding_percent}"
                    )));
                }
                Ok(self)
            }
            Self::FixedFraction { scale_factor } => {
                if !(scale_factor > 0.0 && scale_factor.is_finite()) {
                    return Err(CompositeError::InvalidConfig(format!(
                        "scale factor must be positive, got {scale_factor}"
                    )));
                }
                Ok(self)
            }
        }
    }

    /// Size the layer will have after fitting a `source` image to `target`.
    ///
    /// For [`FitPolicy::CoverCrop`] this is the intermediate, uncropped size.
    pub fn scaled_size(
        &self,
        (src_w, src_h): (u32, u32),
        (dst_w, dst_h): (u32, u32),
    ) -> Result<(u32, u32), CompositeError> {
        ensure_non_empty("source", (src_w, src_h))?;
        ensure_non_empty("target", (dst_w, dst_h))?;
        let (sw, sh, tw, th) = (src_w as u64, src_h as u64, dst_w as u64, dst_h as u64);

        let size = match *self {
            Self::CoverCrop => {
                // Larger ratio wins; compare tw/sw against th/sh without floats
                if tw * sh >= th * sw {
                    (tw, (sh * tw / sw).max(th))
                } else {
                    ((sw * th / sh).max(tw), th)
                }
            }
            Self::FitWithin { padding_percent } => {
                let keep = 1.0 - padding_percent / 100.0;
                let bound_w = (tw as f64 * keep).floor() as u64;
                let bound_h = (th as f64 * keep).floor() as u64;
                if bound_w == 0 || bound_h == 0 {
                    return Err(CompositeError::Dimension(format!(
                        "{padding_percent}% padding leaves no room in {dst_w}x{dst_h}"
                    )));
                }
                // Smaller ratio wins; the limiting axis lands exactly on its bound
                if bound_w * sh <= bound_h * sw {
                    (bound_w, (sh * bound_w / sw).clamp(1, bound_h))
                } else {
                    ((sw * bound_h / sh).clamp(1, bound_w), bound_h)
                }
            }
            Self::FixedFraction { scale_factor } => {
                let height = (th as f64 * scale_factor).floor() as u64;
                if height == 0 {
                    return Err(CompositeError::Dimension(format!(
                        "scale factor {scale_factor} of {dst_h}px leaves no height"
                    )));
                }
                let width = sw * height / sh;
                if width == 0 {
                    return Err(CompositeError::Dimension(format!(
                        "{src_w}x{src_h} is too narrow to scale to {height}px high"
                    )));
                }
                (width, height)
            }
        };

        let to_u32 = |v: u64| {
            u32::try_from(v).map_err(|_| {
                CompositeError::Dimension(format!("scaled dimension {v} is too large"))
            })
        };
        Ok((to_u32(size.0)?, to_u32(size.1)?))
    }
}

/// Resize `image` for placement on a `target`-sized frame.
///
/// Returns the resized layer and where it goes. Cover-crop output always
/// matches `target` exactly; the other policies are centred and rejected
/// with [`CompositeError::Dimension`] when they would not fit.
pub fn fit<P>(
    image: &Image<P>,
    target: (u32, u32),
    policy: &FitPolicy,
) -> Result<(Image<P>, Placement), CompositeError>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let _span = tracing::debug_span!("fit").entered();

    let (width, height) = policy.scaled_size(image.dimensions(), target)?;
    tracing::debug!(
        "{:?}: {:?} -> {}x{} for {:?} frame",
        policy,
        image.dimensions(),
        width,
        height,
        target
    );

    let resized = resample::resize(image, width, height)?;

    match policy {
        FitPolicy::CoverCrop => {
            let (target_w, target_h) = target;
            let x = (width - target_w) / 2;
            let y = (height - target_h) / 2;
            let cropped = imageops::crop_imm(&resized, x, y, target_w, target_h).to_image();
            let smoothed = gaussian_blur(&cropped, COVER_BLUR_KERNEL);
            Ok((smoothed, Placement::full(target)))
        }
        FitPolicy::FitWithin { .. } | FitPolicy::FixedFraction { .. } => {
            let placement = Placement::centered(resized.dimensions(), target)?;
            Ok((resized, placement))
        }
    }
}
