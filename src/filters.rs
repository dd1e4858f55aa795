use image::Pixel;
use imageproc::definitions::Image;

/// Sigma implied by a Gaussian kernel size when none is given explicitly,
/// the rule OpenCV uses for `sigma = 0`.
pub fn sigma_for_kernel(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Odd kernel size covering three sigmas on each side.
pub fn kernel_for_sigma(sigma: f32) -> u32 {
    2 * (3.0 * sigma).ceil().max(1.0) as u32 + 1
}

/// Normalised 1-D Gaussian of `size` taps. `size` must be odd.
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let radius = (size / 2) as i32;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// One 1-D pass over interleaved samples, edges replicated.
///
/// `lines` runs of `len` pixels each; consecutive pixels of a run are `step`
/// samples apart and consecutive runs `stride` samples apart.
fn convolve(
    input: &[f32],
    output: &mut [f32],
    (lines, len): (usize, usize),
    (stride, step): (usize, usize),
    channels: usize,
    kernel: &[f32],
) {
    let radius = (kernel.len() / 2) as isize;
    let last = len as isize - 1;
    for line in 0..lines {
        for i in 0..len {
            for c in 0..channels {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let j = (i as isize + k as isize - radius).clamp(0, last) as usize;
                    acc += input[line * stride + j * step + c] * weight;
                }
                output[line * stride + i * step + c] = acc;
            }
        }
    }
}

/// Separable Gaussian blur with an explicit odd kernel size.
///
/// Both passes run in f32 and samples are rounded once at the end, so a
/// constant image comes back unchanged.
pub fn gaussian_blur<P>(image: &Image<P>, size: u32) -> Image<P>
where
    P: Pixel<Subpixel = u8>,
{
    blur_with_kernel(image, &gaussian_kernel(size, sigma_for_kernel(size)))
}

/// Gaussian blur sized from `sigma` alone.
pub fn gaussian_blur_sigma<P>(image: &Image<P>, sigma: f32) -> Image<P>
where
    P: Pixel<Subpixel = u8>,
{
    blur_with_kernel(image, &gaussian_kernel(kernel_for_sigma(sigma), sigma))
}

fn blur_with_kernel<P>(image: &Image<P>, kernel: &[f32]) -> Image<P>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let channels = P::CHANNEL_COUNT as usize;
    if w == 0 || h == 0 {
        return image.clone();
    }

    let samples: Vec<f32> = image.as_raw().iter().map(|&v| v as f32).collect();
    let mut horizontal = vec![0f32; samples.len()];
    convolve(&samples, &mut horizontal, (h, w), (w * channels, channels), channels, kernel);
    let mut vertical = vec![0f32; samples.len()];
    convolve(&horizontal, &mut vertical, (w, h), (channels, w * channels), channels, kernel);

    let rounded: Vec<u8> = vertical
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    Image::<P>::from_fn(width, height, |x, y| {
        let start = (y as usize * w + x as usize) * channels;
        *P::from_slice(&rounded[start..start + channels])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn sigma_matches_common_kernel_sizes() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(7) - 1.4).abs() < 1e-6);
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let kernel = gaussian_kernel(7, 1.4);
        assert_eq!(kernel.len(), 7);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[6]).abs() < 1e-7);
        assert!(kernel[3] > kernel[2]);
    }

    #[test]
    fn blur_spreads_a_single_dot() {
        let mut image = GrayImage::new(9, 9);
        image.put_pixel(4, 4, Luma([255]));
        let blurred = gaussian_blur(&image, 5);

        assert_eq!(blurred.dimensions(), (9, 9));
        assert!(blurred.get_pixel(4, 4)[0] < 255);
        assert!(blurred.get_pixel(5, 4)[0] > 0);
        assert_eq!(blurred.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn constant_images_come_back_unchanged() {
        for size in [3, 5, 7] {
            let full = GrayImage::from_pixel(12, 9, Luma([255]));
            assert_eq!(gaussian_blur(&full, size), full);
        }
        let grey = RgbImage::from_pixel(10, 10, Rgb([200, 17, 255]));
        assert_eq!(gaussian_blur(&grey, 5), grey);
        assert_eq!(gaussian_blur_sigma(&grey, 15.0), grey);
    }

    #[test]
    fn sigma_kernel_is_odd_and_wide_enough() {
        assert_eq!(kernel_for_sigma(1.0), 7);
        assert_eq!(kernel_for_sigma(15.0), 91);
        assert_eq!(kernel_for_sigma(0.1), 3);
    }
}
