use crate::error::CompositeError;
use image::{Rgb, RgbImage};
use imageproc::map::map_colors;

/// Brightness/contrast lift applied to inset photos before placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceConfig {
    /// Multiplier on every sample
    pub contrast: f32,
    /// Offset added after the multiplier
    pub brightness: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            contrast: 1.3,
            brightness: 10.0,
        }
    }
}

impl EnhanceConfig {
    pub fn validate(self) -> Result<Self, CompositeError> {
        if !self.contrast.is_finite() || !self.brightness.is_finite() {
            return Err(CompositeError::InvalidConfig(format!(
                "enhancement parameters must be finite: {self:?}"
            )));
        }
        Ok(self)
    }
}

/// `|v * contrast + brightness|` saturated to u8, then a min-max stretch
/// of the whole image (all channels together) back over 0..=255.
pub fn enhance(image: &RgbImage, config: &EnhanceConfig) -> RgbImage {
    let _span = tracing::debug_span!("enhance").entered();

    let scaled = map_colors(image, |Rgb(channels)| {
        Rgb(channels.map(|v| {
            (v as f32 * config.contrast + config.brightness)
                .abs()
                .round()
                .min(255.0) as u8
        }))
    });
    stretch(scaled)
}

/// Min-max normalisation; a flat image is returned as is.
fn stretch(image: RgbImage) -> RgbImage {
    let raw = image.as_raw();
    let (Some(&min), Some(&max)) = (raw.iter().min(), raw.iter().max()) else {
        return image;
    };
    if min == max || (min == 0 && max == 255) {
        return image;
    }

    tracing::debug!("Stretching samples {}..={} to full range", min, max);
    let span = (max - min) as f32;
    map_colors(&image, |Rgb(channels)| {
        Rgb(channels.map(|v| ((v - min) as f32 * 255.0 / span).round() as u8))
    })
}
