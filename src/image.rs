use std::path::Path;

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::error::ImageError;

/// Struct, representing a pixel color. Single channel images only use `r`,
/// rgb images ignore `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    pub const fn gray(value: u8) -> Color {
        Color::rgb(value, value, value)
    }

    /// Scales every color channel by `intensity`, clamping to the 8 bit range.
    /// Alpha is left as is.
    pub fn scale(self, intensity: f32) -> Color {
        fn channel(value: u8, intensity: f32) -> u8 {
            (value as f32 * intensity).clamp(0.0, 255.0) as u8
        }
        return Color {
            r: channel(self.r, intensity),
            g: channel(self.g, intensity),
            b: channel(self.b, intensity),
            a: self.a,
        };
    }

    /// Packs the color as `0xRRGGBBAA`.
    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    pub fn from_u32(packed: u32) -> Color {
        let [r, g, b, a] = packed.to_be_bytes();
        Color { r, g, b, a }
    }
}

/// Channel layout of an [`Image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Grayscale,
    Rgb,
    Rgba,
}

impl Format {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Format::Grayscale => 1,
            Format::Rgb => 3,
            Format::Rgba => 4,
        }
    }
}

/// Anything the rasterizer can read colors from or write colors to.
///
/// Coordinates are signed so callers can ask about pixels outside the buffer; such
/// accesses fail instead of touching memory.
pub trait PixelBuffer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn get(&self, x: i32, y: i32) -> Option<Color>;
    /// Returns false, without writing, when `(x, y)` is outside the buffer.
    fn set(&mut self, x: i32, y: i32, color: Color) -> bool;
}

/// Image, holding its width, height and private flat array(vec) of pixel data.
/// (0, 0) is the bottom left coordinate, rows are stored top to bottom so the
/// data can be handed to an encoder as is.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: Format,
    pixel_data: Vec<u8>,
}

impl Image {
    /// Generates a black image of the given size and format.
    pub fn new(width: u32, height: u32, format: Format) -> Result<Image, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }
        let capacity = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
            .ok_or(ImageError::Allocation { width, height })?;
        let mut pixel_data = Vec::new();
        pixel_data
            .try_reserve_exact(capacity)
            .map_err(|_| ImageError::Allocation { width, height })?;
        pixel_data.resize(capacity, 0);
        return Ok(Image {
            width,
            height,
            format,
            pixel_data,
        });
    }

    /// Wraps raw pixel data laid out top row first.
    pub fn from_raw(width: u32, height: u32, format: Format, pixel_data: Vec<u8>) -> Result<Image, ImageError> {
        let bytespp = format.bytes_per_pixel();
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }
        if pixel_data.len() != width as usize * height as usize * bytespp {
            return Err(ImageError::DataLength {
                width,
                height,
                bytespp,
                len: pixel_data.len(),
            });
        }
        return Ok(Image {
            width,
            height,
            format,
            pixel_data,
        });
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn as_pixel_data(&self) -> &[u8] {
        return &self.pixel_data[..];
    }

    /// Sets every pixel to `color`.
    pub fn clear(&mut self, color: Color) {
        let bytes = self.encode(color);
        let bytespp = self.format.bytes_per_pixel();
        for pixel in self.pixel_data.chunks_exact_mut(bytespp) {
            pixel.copy_from_slice(&bytes[..bytespp]);
        }
    }

    /// Mirrors the image around its horizontal center line.
    pub fn flip_vertically(&mut self) {
        let row_len = self.width as usize * self.format.bytes_per_pixel();
        let height = self.height as usize;
        for row in 0..height / 2 {
            let (top, bottom) = self.pixel_data.split_at_mut((height - 1 - row) * row_len);
            top[row * row_len..(row + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
        }
    }

    /// Number of pixels currently equal to `color`.
    pub fn count(&self, color: Color) -> usize {
        let mut counter = 0;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if self.get(x, y) == Some(color) {
                    counter += 1;
                }
            }
        }
        return counter;
    }

    /// Converts to an `image` crate buffer, keeping the upright orientation.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        let bytespp = self.format.bytes_per_pixel();
        for pixel in self.pixel_data.chunks_exact(bytespp) {
            let color = self.decode(pixel);
            data.extend_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        // Length always matches, so from_raw can't fail here; fall back to an
        // empty buffer rather than panic.
        return ImageBuffer::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| ImageBuffer::new(self.width, self.height));
    }

    pub fn from_rgba_image(buffer: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<Image, ImageError> {
        return Image::from_raw(buffer.width(), buffer.height(), Format::Rgba, buffer.as_raw().clone());
    }

    /// Decodes any format the `image` crate understands (tga, png, jpeg ...).
    pub fn load(path: impl AsRef<Path>) -> Result<Image, ImageError> {
        let decoded = image::open(path)?.to_rgba8();
        return Image::from_rgba_image(&decoded);
    }

    /// Encodes the image, picking the codec from the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        self.to_rgba_image().save(path)?;
        return Ok(());
    }

    /// Index of the first byte of a pixel, None if out of bounds.
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        // Forcing (0, 0) to be in the bottom left here by inverting y.
        let row = (self.height as i32 - 1 - y) as usize;
        return Some((row * self.width as usize + x as usize) * self.format.bytes_per_pixel());
    }

    fn encode(&self, color: Color) -> [u8; 4] {
        match self.format {
            Format::Grayscale => [color.r, 0, 0, 0],
            Format::Rgb => [color.r, color.g, color.b, 0],
            Format::Rgba => [color.r, color.g, color.b, color.a],
        }
    }

    fn decode(&self, bytes: &[u8]) -> Color {
        match self.format {
            Format::Grayscale => Color::gray(bytes[0]),
            Format::Rgb => Color::rgb(bytes[0], bytes[1], bytes[2]),
            Format::Rgba => Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3]),
        }
    }
}

impl PixelBuffer for Image {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn get(&self, x: i32, y: i32) -> Option<Color> {
        let index = self.offset(x, y)?;
        let bytespp = self.format.bytes_per_pixel();
        Some(self.decode(&self.pixel_data[index..index + bytespp]))
    }

    fn set(&mut self, x: i32, y: i32, color: Color) -> bool {
        let Some(index) = self.offset(x, y) else {
            return false;
        };
        let bytespp = self.format.bytes_per_pixel();
        let bytes = self.encode(color);
        self.pixel_data[index..index + bytespp].copy_from_slice(&bytes[..bytespp]);
        true
    }
}
