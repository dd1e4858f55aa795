mod feather;

pub use feather::soft_border_panel;

use crate::error::{ensure_non_empty, CompositeError};
use crate::fitting::Placement;
use crate::matting::alpha::alpha;
use image::{GrayImage, Rgb, RgbImage};

pub const DEFAULT_OPACITY: f32 = 0.95;
pub const DEFAULT_FEATHER_BORDER: u32 = 30;
pub const DEFAULT_FEATHER_SIGMA: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatherConfig {
    /// Card margin around the photo, in pixels
    pub border: u32,
    /// Blur applied to the photo rectangle to build the fade
    pub sigma: f32,
    /// Opacity of the finished card over the background
    pub opacity: f32,
}

impl Default for FeatherConfig {
    fn default() -> Self {
        Self {
            border: DEFAULT_FEATHER_BORDER,
            sigma: DEFAULT_FEATHER_SIGMA,
            opacity: DEFAULT_OPACITY,
        }
    }
}

/// How foreground pixels are mixed into the background
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendPolicy {
    /// Per-pixel alpha from the refined mask
    Alpha,
    /// One opacity for the whole layer
    FixedOpacity { opacity: f32 },
    /// Photo on a soft-edged white card, then blended at fixed opacity
    Feathered(FeatherConfig),
}

impl BlendPolicy {
    pub fn validate(self) -> Result<Self, CompositeError> {
        let opacity = match self {
            Self::Alpha => return Ok(self),
            Self::FixedOpacity { opacity } => opacity,
            Self::Feathered(config) => {
                if !(config.sigma > 0.0 && config.sigma.is_finite()) {
                    return Err(CompositeError::InvalidConfig(format!(
                        "feather sigma must be positive, got {}",
                        config.sigma
                    )));
                }
                config.opacity
            }
        };
        if !(0.0..=1.0).contains(&opacity) {
            return Err(CompositeError::InvalidConfig(format!(
                "opacity must be in [0, 1], got {opacity}"
            )));
        }
        Ok(self)
    }

    pub fn needs_mask(&self) -> bool {
        matches!(self, Self::Alpha)
    }
}

/// `fg * alpha + bg * (1 - alpha)`, rounded and saturated.
#[inline]
fn blend(fg: Rgb<u8>, bg: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mut out = bg;
    for c in 0..3 {
        let value = fg[c] as f32 * alpha + bg[c] as f32 * (1.0 - alpha);
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Copy `background` and blend `layer` into the `placement` rectangle.
///
/// Callers validate the placement first; this only writes inside it.
fn blend_region<F>(
    background: &RgbImage,
    layer: &RgbImage,
    placement: Placement,
    alpha_at: F,
) -> RgbImage
where
    F: Fn(u32, u32) -> f32,
{
    let mut output = background.clone();
    for (lx, ly, fg) in layer.enumerate_pixels() {
        let target = output.get_pixel_mut(placement.x + lx, placement.y + ly);
        *target = blend(*fg, *target, alpha_at(lx, ly));
    }
    output
}

pub struct Compositor {
    policy: BlendPolicy,
}

impl Compositor {
    pub fn new(policy: BlendPolicy) -> Result<Self, CompositeError> {
        Ok(Self {
            policy: policy.validate()?,
        })
    }

    pub fn policy(&self) -> &BlendPolicy {
        &self.policy
    }

    /// Blend `foreground` onto a copy of `background` at `placement`.
    ///
    /// `mask` must be present, and the size of `foreground`, for
    /// [`BlendPolicy::Alpha`]; the other policies ignore it. Every size and
    /// bounds check happens before the output buffer is allocated.
    pub fn composite(
        &self,
        background: &RgbImage,
        foreground: &RgbImage,
        mask: Option<&GrayImage>,
        placement: Placement,
    ) -> Result<RgbImage, CompositeError> {
        let _span = tracing::debug_span!("composite").entered();

        ensure_non_empty("background", background.dimensions())?;
        ensure_non_empty("foreground", foreground.dimensions())?;
        if placement.size() != foreground.dimensions() {
            return Err(CompositeError::Dimension(format!(
                "placement {:?} does not match {:?} foreground",
                placement.size(),
                foreground.dimensions()
            )));
        }
        let placement = placement.validate(background.dimensions()).inspect_err(|e| {
            tracing::warn!("Skipping composite: {}", e);
        })?;

        match self.policy {
            BlendPolicy::Alpha => {
                let mask = mask.ok_or_else(|| {
                    CompositeError::Processing("alpha blending needs a mask".to_string())
                })?;
                if mask.dimensions() != foreground.dimensions() {
                    return Err(CompositeError::Dimension(format!(
                        "mask {:?} does not match foreground {:?}",
                        mask.dimensions(),
                        foreground.dimensions()
                    )));
                }
                Ok(blend_region(background, foreground, placement, |x, y| {
                    alpha(mask.get_pixel(x, y)[0])
                }))
            }
            BlendPolicy::FixedOpacity { opacity } => {
                Ok(blend_region(background, foreground, placement, |_, _| opacity))
            }
            BlendPolicy::Feathered(config) => {
                let card = placement
                    .expand(config.border)
                    .and_then(|p| p.validate(background.dimensions()))
                    .inspect_err(|e| tracing::warn!("Skipping composite: {}", e))?;
                let panel = soft_border_panel(foreground, config.border, config.sigma);
                Ok(blend_region(background, &panel, card, |_, _| config.opacity))
            }
        }
    }
}
