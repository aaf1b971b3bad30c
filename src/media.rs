use image::imageops::FilterType;
use image::DynamicImage;
use kontrol_a49::{Bitmap, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Resize an image to fill the display and threshold it down to one bit per pixel.
///
/// Transparent pixels are mixed against white, the display background, before thresholding.
pub fn encode_bitmap(image: &DynamicImage, threshold: u8, invert: bool, nearest: bool) -> Bitmap {
    let filter = if nearest {
        FilterType::Nearest
    } else {
        FilterType::Gaussian
    };
    let resized = image
        .resize_to_fill(SCREEN_WIDTH, SCREEN_HEIGHT, filter)
        .to_luma_alpha8();

    Bitmap::from_fn(|x, y| {
        let bright = resized.get_pixel_checked(x, y).is_some_and(|p| {
            let [l, a] = p.0.map(u32::from);
            (l * a + 255 * (255 - a)) / 255 >= u32::from(threshold)
        });
        bright != invert
    })
}
