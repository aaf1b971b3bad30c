//! Monochrome display images.

use image::GrayImage;

/// Display width in pixels
pub const SCREEN_WIDTH: u32 = 128;
/// Display height in pixels
pub const SCREEN_HEIGHT: u32 = 32;

/// Anything that can be queried for pixels over the 128x32 display grid.
///
/// A non-zero value is a lit pixel.
pub trait PixelSource {
    fn pixel(&self, x: u32, y: u32) -> u8;
}

/// 1-bit 128x32 image, one `u128` per row with bit `x` holding column `x`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bitmap {
    rows: [u128; SCREEN_HEIGHT as usize],
}

impl Bitmap {
    /// All pixels off
    pub fn new() -> Self {
        Self::default()
    }

    /// All pixels lit
    pub fn filled() -> Self {
        Self {
            rows: [u128::MAX; SCREEN_HEIGHT as usize],
        }
    }

    /// Build a bitmap by evaluating `f` for every pixel
    pub fn from_fn(mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bitmap = Self::new();
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                bitmap.set(x, y, f(x, y));
            }
        }
        bitmap
    }

    /// Copy any pixel source into a bitmap
    pub fn from_source(source: &impl PixelSource) -> Self {
        Self::from_fn(|x, y| source.pixel(x, y) != 0)
    }

    /// Get a pixel. Coordinates outside of the display read as unlit.
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < SCREEN_WIDTH && y < SCREEN_HEIGHT && self.rows[y as usize] >> x & 1 == 1
    }

    /// Set a pixel. Coordinates outside of the display are ignored.
    pub fn set(&mut self, x: u32, y: u32, lit: bool) {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return;
        }
        let row = &mut self.rows[y as usize];
        if lit {
            *row |= 1 << x;
        } else {
            *row &= !(1 << x);
        }
    }

    /// Set every pixel inside the rectangle, clipped to the display
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, lit: bool) {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x + width as i32).clamp(0, SCREEN_WIDTH as i32) as u32;
        let y1 = (y + height as i32).clamp(0, SCREEN_HEIGHT as i32) as u32;
        for py in y0..y1 {
            for px in x0..x1 {
                self.set(px, py, lit);
            }
        }
    }

    /// Flip every pixel
    pub fn invert(&mut self) {
        for row in &mut self.rows {
            *row = !*row;
        }
    }
}

impl PixelSource for Bitmap {
    fn pixel(&self, x: u32, y: u32) -> u8 {
        self.get(x, y) as u8
    }
}

impl PixelSource for GrayImage {
    /// Luma value, with pixels outside of the image reading as unlit
    fn pixel(&self, x: u32, y: u32) -> u8 {
        self.get_pixel_checked(x, y).map_or(0, |p| p.0[0])
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn set_and_get() {
        let mut bitmap = Bitmap::new();
        bitmap.set(127, 31, true);
        bitmap.set(0, 0, true);
        assert!(bitmap.get(127, 31));
        assert!(bitmap.get(0, 0));
        assert!(!bitmap.get(1, 0));
        bitmap.set(0, 0, false);
        assert!(!bitmap.get(0, 0));

        // out of bounds is a no-op
        bitmap.set(128, 0, true);
        bitmap.set(0, 32, true);
        assert!(!bitmap.get(128, 0));
    }

    #[test]
    fn fill_rect_clips() {
        let mut bitmap = Bitmap::new();
        bitmap.fill_rect(-2, -2, 4, 4, true);
        let lit = Bitmap::from_fn(|x, y| x < 2 && y < 2);
        assert_eq!(bitmap, lit);

        let mut bitmap = Bitmap::new();
        bitmap.fill_rect(120, 30, 20, 20, true);
        assert!(bitmap.get(127, 31));
        assert!(bitmap.get(120, 30));
        assert!(!bitmap.get(119, 30));
    }

    #[test]
    fn invert_round_trip() {
        let mut bitmap = Bitmap::new();
        bitmap.invert();
        assert_eq!(bitmap, Bitmap::filled());
        bitmap.invert();
        assert_eq!(bitmap, Bitmap::new());
    }

    #[test]
    fn gray_image_source() {
        let mut image = GrayImage::new(SCREEN_WIDTH, SCREEN_HEIGHT);
        image.put_pixel(5, 7, Luma([1]));
        image.put_pixel(6, 7, Luma([200]));
        let bitmap = Bitmap::from_source(&image);
        assert!(bitmap.get(5, 7));
        assert!(bitmap.get(6, 7));
        assert!(!bitmap.get(7, 7));

        let small = GrayImage::from_pixel(2, 2, Luma([255]));
        assert_eq!(small.pixel(1, 1), 255);
        assert_eq!(small.pixel(64, 16), 0);
    }
}
