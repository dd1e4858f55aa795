use crate::error::CompositeError;
use image::{imageops, ImageBuffer, Pixel};
use imageproc::definitions::Image;

/// One source contribution to a destination index.
#[derive(Debug, Clone, Copy)]
struct AreaWeight {
    destination: usize,
    source: usize,
    weight: f32,
}

/// Weight table for area interpolation along one axis.
///
/// Each destination cell covers `src / dst` source cells; every source cell
/// contributes in proportion to its overlap with that span.
fn area_weights(src_size: u32, dst_size: u32) -> Vec<AreaWeight> {
    let scale = src_size as f64 / dst_size as f64;
    (0..dst_size)
        .flat_map(|dst| {
            let start = dst as f64 * scale;
            let end = (start + scale).min(src_size as f64);
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_size);
            (first..last).filter_map(move |src| {
                let overlap = end.min(src as f64 + 1.0) - start.max(src as f64);
                (overlap > 1e-9).then_some(AreaWeight {
                    destination: dst as usize,
                    source: src as usize,
                    weight: (overlap / (end - start)) as f32,
                })
            })
        })
        .collect()
}

/// Area-averaging downscale (the INTER_AREA scheme).
///
/// Both target dimensions must be positive and no larger than the source.
pub fn resize_area<P>(
    image: &Image<P>,
    new_width: u32,
    new_height: u32,
) -> Result<Image<P>, CompositeError>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    if new_width == 0 || new_height == 0 || new_width > width || new_height > height {
        return Err(CompositeError::Dimension(format!(
            "area resize from {width}x{height} to {new_width}x{new_height} is not a downscale"
        )));
    }

    let channels = P::CHANNEL_COUNT as usize;
    let src = image.as_raw();
    let (w, h, nw, nh) = (
        width as usize,
        height as usize,
        new_width as usize,
        new_height as usize,
    );

    // Horizontal pass: h rows of nw pixels
    let mut horizontal = vec![0f32; h * nw * channels];
    let x_weights = area_weights(width, new_width);
    for y in 0..h {
        let src_row = &src[y * w * channels..(y + 1) * w * channels];
        let dst_row = &mut horizontal[y * nw * channels..(y + 1) * nw * channels];
        for tap in &x_weights {
            for c in 0..channels {
                dst_row[tap.destination * channels + c] +=
                    src_row[tap.source * channels + c] as f32 * tap.weight;
            }
        }
    }

    // Vertical pass: nh rows of nw pixels
    let row_len = nw * channels;
    let mut vertical = vec![0f32; nh * row_len];
    for tap in &area_weights(height, new_height) {
        let src_row = &horizontal[tap.source * row_len..(tap.source + 1) * row_len];
        let dst_row = &mut vertical[tap.destination * row_len..(tap.destination + 1) * row_len];
        for (dst, value) in dst_row.iter_mut().zip(src_row) {
            *dst += value * tap.weight;
        }
    }

    let data: Vec<u8> = vertical
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();

    ImageBuffer::from_raw(new_width, new_height, data).ok_or_else(|| {
        CompositeError::Processing("area resize produced a malformed buffer".to_string())
    })
}

/// Anti-aliased resize: area averaging when shrinking, Lanczos3 otherwise.
pub fn resize<P>(image: &Image<P>, new_width: u32, new_height: u32) -> Result<Image<P>, CompositeError>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (width, height) = image.dimensions();
    if new_width == 0 || new_height == 0 {
        return Err(CompositeError::Dimension(format!(
            "cannot resize {width}x{height} to {new_width}x{new_height}"
        )));
    }

    if (new_width, new_height) == (width, height) {
        return Ok(image.clone());
    }

    if new_width <= width && new_height <= height {
        tracing::debug!(
            "Area resize {}x{} -> {}x{}",
            width,
            height,
            new_width,
            new_height
        );
        resize_area(image, new_width, new_height)
    } else {
        tracing::debug!(
            "Lanczos resize {}x{} -> {}x{}",
            width,
            height,
            new_width,
            new_height
        );
        Ok(imageops::resize(
            image,
            new_width,
            new_height,
            imageops::FilterType::Lanczos3,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{noise, solid, BLUE};
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn weights_sum_to_one_per_destination() {
        for (src, dst) in [(10, 3), (7, 7), (100, 33), (5, 1)] {
            let mut sums = vec![0f32; dst as usize];
            for tap in area_weights(src, dst) {
                sums[tap.destination] += tap.weight;
            }
            assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5), "{src}->{dst}: {sums:?}");
        }
    }

    #[test]
    fn area_halving_averages_blocks() {
        let image = GrayImage::from_fn(4, 2, |x, _| Luma([if x % 2 == 0 { 0 } else { 200 }]));
        let resized = resize_area(&image, 2, 1).unwrap();

        assert_eq!(resized.dimensions(), (2, 1));
        assert_eq!(resized.get_pixel(0, 0)[0], 100);
        assert_eq!(resized.get_pixel(1, 0)[0], 100);
    }

    #[test]
    fn area_fractional_scale_keeps_solid_colour() {
        let image = solid(31, 17, BLUE);
        let resized = resize_area(&image, 10, 6).unwrap();

        assert_eq!(resized.dimensions(), (10, 6));
        assert!(resized.pixels().all(|p| *p == BLUE));
    }

    #[test]
    fn area_rejects_upscale() {
        let image = solid(4, 4, BLUE);
        assert!(resize_area(&image, 5, 4).is_err());
    }

    #[test]
    fn resize_same_size_is_a_copy() {
        let image = noise(13, 9, 3);
        assert_eq!(resize(&image, 13, 9).unwrap(), image);
    }

    #[test]
    fn resize_enlarges_with_lanczos() {
        let image = noise(8, 8, 11);
        let resized = resize(&image, 20, 12).unwrap();
        assert_eq!(resized.dimensions(), (20, 12));
    }

    #[test]
    fn resize_handles_rgba_and_zero_targets() {
        let image: image::RgbaImage = image::RgbaImage::from_pixel(6, 6, image::Rgba([1, 2, 3, 4]));
        assert_eq!(resize(&image, 3, 3).unwrap().get_pixel(1, 1), &image::Rgba([1, 2, 3, 4]));

        let rgb = RgbImage::from_pixel(3, 3, Rgb([0, 0, 0]));
        assert!(resize(&rgb, 0, 3).is_err());
    }
}
