use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use crate::filters::gaussian_blur_sigma;

/// Canvas colour around a feathered photo
const CARD: Rgb<u8> = Rgb([255, 255, 255]);

/// Mount `photo` on a white card that fades out towards its edges.
///
/// The card is `border` pixels larger than the photo on every side. A hard
/// rectangle over the photo is blurred with `sigma`; where the blurred
/// weight `m` is low the card is dimmed to half intensity:
/// `card * (1 - m) * 0.5 + card * m`.
pub fn soft_border_panel(photo: &RgbImage, border: u32, sigma: f32) -> RgbImage {
    let _span = tracing::debug_span!("soft_border").entered();

    let (width, height) = photo.dimensions();
    let (panel_w, panel_h) = (width + 2 * border, height + 2 * border);

    let mut canvas = RgbImage::from_pixel(panel_w, panel_h, CARD);
    imageops::replace(&mut canvas, photo, border as i64, border as i64);

    let inside = |x: u32, y: u32| {
        (border..border + width).contains(&x) && (border..border + height).contains(&y)
    };
    let hard = GrayImage::from_fn(panel_w, panel_h, |x, y| {
        Luma([if inside(x, y) { 255 } else { 0 }])
    });
    let soft = gaussian_blur_sigma(&hard, sigma);

    RgbImage::from_fn(panel_w, panel_h, |x, y| {
        let m = soft.get_pixel(x, y)[0] as f32 / 255.0;
        let weight = (1.0 - m) * 0.5 + m;
        let Rgb(channels) = *canvas.get_pixel(x, y);
        Rgb(channels.map(|c| (c as f32 * weight).round().clamp(0.0, 255.0) as u8))
    })
}
