//! Input pixel grids (heightmaps and classification maps)

use image::DynamicImage;

/// Row-major grid of RGB pixels
#[derive(Clone, Debug, PartialEq)]
pub struct ColorGrid {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 3]>,
}

impl ColorGrid {
    /// Grid filled with a single color
    pub fn new(width: u32, height: u32, fill: [u8; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; (width as usize) * (height as usize)],
        }
    }

    /// Build a grid by evaluating `f(x, y)` for each pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    /// Convert a decoded image (alpha is dropped)
    pub fn from_image(img: &DynamicImage) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.pixels().map(|p| p.0).collect();
        Self { width, height, pixels }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels[(x + y * self.width) as usize]
    }

    /// Raw height sample: R + G + B
    #[inline]
    pub fn luminance_sum(&self, x: u32, y: u32) -> u32 {
        let [r, g, b] = self.get(x, y);
        r as u32 + g as u32 + b as u32
    }

    /// Whether `pixels` holds exactly `width * height` entries
    pub fn is_complete(&self) -> bool {
        self.pixels.len() as u64 == self.width as u64 * self.height as u64
    }

    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }
}
