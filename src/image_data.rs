// SPDX-License-Identifier: GPL-3.0-only

//! Host-side float images and 8-bit RGB conversion
//!
//! Pyramid images hold BT.601 YCbCr with chroma centred on zero, plus alpha.

use image::RgbImage;

/// Interleaved `f32` pixels in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl ImageData {
    /// Panics if `data` is not `width * height * channels` long
    pub fn new(width: u32, height: u32, channels: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * channels,
            "{}x{}x{} image needs {} values",
            width,
            height,
            channels,
            width as usize * height as usize * channels
        );
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Every channel of every pixel set to `value`
    pub fn constant(width: u32, height: u32, channels: usize, value: f32) -> Self {
        let len = width as usize * height as usize * channels;
        Self::new(width, height, channels, vec![value; len])
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        &self.data[start..start + self.channels]
    }

    fn pixel_clamped(&self, x: i64, y: i64) -> &[f32] {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.pixel(x, y)
    }

    /// Largest per-value difference, for comparing outputs
    pub fn max_abs_difference(&self, other: &ImageData) -> f32 {
        assert_eq!(
            (self.width, self.height, self.channels),
            (other.width, other.height, other.channels),
            "images differ in shape"
        );
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }

    /// 8-bit RGB to 4-channel YCbCr with alpha 1
    pub fn from_rgb8(rgb: &RgbImage) -> Self {
        let mut data = Vec::with_capacity(rgb.width() as usize * rgb.height() as usize * 4);
        for pixel in rgb.pixels() {
            let [r, g, b] = pixel.0.map(|v| v as f32 / 255.0);
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            let cb = (b - y) * 0.564;
            let cr = (r - y) * 0.713;
            data.extend_from_slice(&[y, cb, cr, 1.0]);
        }
        Self::new(rgb.width(), rgb.height(), 4, data)
    }

    /// Back to 8-bit RGB, clamping out-of-gamut values
    ///
    /// A 2-channel image is shown as gradient magnitude in grey.
    pub fn to_rgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let p = self.pixel(x, y);
            let rgb = match self.channels {
                2 => {
                    let m = p[0].hypot(p[1]);
                    [m, m, m]
                }
                c if c >= 3 => {
                    let (luma, cb, cr) = (p[0], p[1], p[2]);
                    [
                        luma + 1.403 * cr,
                        luma - 0.344 * cb - 0.714 * cr,
                        luma + 1.773 * cb,
                    ]
                }
                _ => [p[0]; 3],
            };
            image::Rgb(rgb.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
        })
    }

    /// Sobel gradient of channel 0 as a 2-channel (dx, dy) image
    ///
    /// Normalised by 1/8 so a ramp rising 1 per pixel gives 1.
    pub fn gradient(&self) -> ImageData {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 2);
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let l = |dx: i64, dy: i64| self.pixel_clamped(x + dx, y + dy)[0];
                let gx = (l(1, -1) + 2.0 * l(1, 0) + l(1, 1))
                    - (l(-1, -1) + 2.0 * l(-1, 0) + l(-1, 1));
                let gy = (l(-1, 1) + 2.0 * l(0, 1) + l(1, 1))
                    - (l(-1, -1) + 2.0 * l(0, -1) + l(1, -1));
                data.extend_from_slice(&[gx / 8.0, gy / 8.0]);
            }
        }
        ImageData::new(self.width, self.height, 2, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "needs 12 values")]
    fn test_new_rejects_wrong_length() {
        ImageData::new(3, 1, 4, vec![0.0; 5]);
    }

    #[test]
    fn test_pixel_indexing() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let image = ImageData::new(3, 2, 2, data);
        assert_eq!(image.pixel(0, 0), &[0.0, 1.0]);
        assert_eq!(image.pixel(2, 1), &[10.0, 11.0]);
    }

    #[test]
    fn test_grey_has_no_chroma() {
        let rgb = RgbImage::from_pixel(2, 2, image::Rgb([128, 128, 128]));
        let image = ImageData::from_rgb8(&rgb);
        let p = image.pixel(1, 1);
        assert!((p[0] - 128.0 / 255.0).abs() < 1e-5);
        assert!(p[1].abs() < 1e-5 && p[2].abs() < 1e-5);
        assert_eq!(p[3], 1.0);
    }

    #[test]
    fn test_rgb_conversion_is_close_to_lossless() {
        let rgb = RgbImage::from_fn(4, 4, |x, y| {
            image::Rgb([(x * 60) as u8, (y * 60) as u8, 200 - (x * 20) as u8])
        });
        let back = ImageData::from_rgb8(&rgb).to_rgb8();
        for (a, b) in rgb.pixels().zip(back.pixels()) {
            for c in 0..3 {
                assert!((a.0[c] as i32 - b.0[c] as i32).abs() <= 1, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_gradient_of_flat_image_is_zero() {
        let image = ImageData::constant(5, 4, 4, 0.3);
        let gradient = image.gradient();
        assert_eq!(gradient.channels, 2);
        assert!(gradient.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_gradient_of_vertical_step() {
        // Left half 0, right half 1
        let data: Vec<f32> = (0..6 * 3)
            .flat_map(|i| {
                let v = if i % 6 >= 3 { 1.0 } else { 0.0 };
                [v, 0.0, 0.0, 1.0]
            })
            .collect();
        let gradient = ImageData::new(6, 3, 4, data).gradient();
        // Columns 2 and 3 straddle the step
        assert!((gradient.pixel(2, 1)[0] - 0.5).abs() < 1e-6);
        assert!((gradient.pixel(3, 1)[0] - 0.5).abs() < 1e-6);
        assert_eq!(gradient.pixel(0, 1)[0], 0.0);
        assert_eq!(gradient.pixel(2, 1)[1], 0.0);
    }
}
