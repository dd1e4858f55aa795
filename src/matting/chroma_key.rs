use super::types::MaskEstimator;
use crate::error::{ensure_non_empty, CompositeError};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Hue of a green screen on the 8-bit hue scale (0..180, i.e. 120 degrees)
pub const GREEN_HUE: u8 = 60;

/// Widest accepted hue window; one step more would start keying pure red.
pub const MAX_SENSITIVITY: u8 = GREEN_HUE - 1;

/// Colour range treated as green screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromaKeyConfig {
    /// Half-width of the hue window around [`GREEN_HUE`]
    pub sensitivity: u8,
    /// Minimum saturation for a pixel to count as screen
    pub saturation_threshold: u8,
    /// Minimum value (brightness) for a pixel to count as screen
    pub value_threshold: u8,
}

impl Default for ChromaKeyConfig {
    fn default() -> Self {
        Self {
            sensitivity: 40,
            saturation_threshold: 50,
            value_threshold: 50,
        }
    }
}

impl ChromaKeyConfig {
    pub fn validate(self) -> Result<Self, CompositeError> {
        if self.sensitivity > MAX_SENSITIVITY {
            return Err(CompositeError::InvalidConfig(format!(
                "chroma key sensitivity must be at most {MAX_SENSITIVITY}, got {}",
                self.sensitivity
            )));
        }
        Ok(self)
    }

    fn hue_range(&self) -> (u8, u8) {
        (
            GREEN_HUE - self.sensitivity,
            GREEN_HUE + self.sensitivity,
        )
    }
}

/// Convert RGB to HSV on the 8-bit scale: H in 0..180, S and V in 0..=255.
pub fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let value = max;
    let delta = (max - min) as f32;

    if max == 0 || delta == 0.0 {
        return [0, 0, value];
    }

    let saturation = (255.0 * delta / max as f32).round() as u8;

    let mut hue = if max == r {
        60.0 * (gf - bf) / delta
    } else if max == g {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    let hue = (hue / 2.0).round() as u32 % 180;
    [hue as u8, saturation, value]
}

/// Green screen keyer
pub struct ChromaKeyEstimator {
    config: ChromaKeyConfig,
}

impl ChromaKeyEstimator {
    pub fn new(config: ChromaKeyConfig) -> Result<Self, CompositeError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    /// True when the pixel falls inside the screen colour window.
    ///
    /// Dark or washed-out pixels are never screen, whatever their hue.
    pub fn is_screen(&self, pixel: Rgb<u8>) -> bool {
        let [h, s, v] = rgb_to_hsv(pixel);
        let (low, high) = self.config.hue_range();
        (low..=high).contains(&h)
            && s >= self.config.saturation_threshold
            && v >= self.config.value_threshold
    }
}

impl MaskEstimator for ChromaKeyEstimator {
    fn estimate(&mut self, image: &RgbImage) -> Result<GrayImage, CompositeError> {
        let _span = tracing::debug_span!("chroma_key_mask").entered();
        ensure_non_empty("foreground", image.dimensions())?;

        tracing::debug!("Keying with {:?}", self.config);

        let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([if self.is_screen(*image.get_pixel(x, y)) { 0 } else { 255 }])
        });

        Ok(mask)
    }

    fn name(&self) -> &'static str {
        "chroma-key"
    }
}
