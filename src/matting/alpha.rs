use crate::error::CompositeError;
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::map::map_colors2;

/// Attach `mask` to `image` as its alpha channel.
///
/// Lets colour and matte travel through resampling together, so the
/// resized matte stays aligned with the resized colour.
pub fn attach_alpha(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage, CompositeError> {
    if image.dimensions() != mask.dimensions() {
        return Err(CompositeError::Dimension(format!(
            "mask {:?} does not match image {:?}",
            mask.dimensions(),
            image.dimensions()
        )));
    }
    Ok(map_colors2(image, mask, |Rgb([r, g, b]), Luma([a])| {
        Rgba([r, g, b, a])
    }))
}

/// Split an RGBA layer back into colour and mask.
pub fn split_alpha(layer: &RgbaImage) -> (RgbImage, GrayImage) {
    let (width, height) = layer.dimensions();
    let colour = RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, _]) = *layer.get_pixel(x, y);
        Rgb([r, g, b])
    });
    let mask = GrayImage::from_fn(width, height, |x, y| Luma([layer.get_pixel(x, y)[3]]));
    (colour, mask)
}

/// Normalised alpha for a mask sample.
#[inline]
pub fn alpha(sample: u8) -> f32 {
    sample as f32 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{noise, solid_mask};

    #[test]
    fn attach_then_split_restores_parts() {
        let image = noise(7, 5, 9);
        let mask = GrayImage::from_fn(7, 5, |x, y| Luma([(x * 30 + y) as u8]));

        let layer = attach_alpha(&image, &mask).unwrap();
        assert_eq!(layer.get_pixel(3, 2)[3], 92);

        let (colour, alpha_mask) = split_alpha(&layer);
        assert_eq!(colour, image);
        assert_eq!(alpha_mask, mask);
    }

    #[test]
    fn attach_rejects_mismatched_mask() {
        assert!(attach_alpha(&noise(4, 4, 1), &solid_mask(4, 3, 0)).is_err());
    }

    #[test]
    fn alpha_spans_unit_interval() {
        assert_eq!(alpha(0), 0.0);
        assert_eq!(alpha(255), 1.0);
        assert!((0..=255u8).map(alpha).all(|a| (0.0..=1.0).contains(&a)));
    }
}
