//! Per-pixel depth storage for a render pass.
//!
//! Larger depth values are nearer to the camera; a pixel accepts a fragment
//! only if its depth is strictly greater than what is stored.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::RenderError;
use crate::image::{Color, Format, Image, PixelBuffer};

/// Marks a pixel nothing has been drawn to.
pub const UNOCCUPIED: i32 = i32::MIN;

/// Z-buffer, one i32 per pixel, starting out as [`UNOCCUPIED`].
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    z_buffer: Vec<i32>,
}

fn allocate<T: Clone>(width: u32, height: u32, value: T) -> Result<Vec<T>, RenderError> {
    let n_pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or(RenderError::Allocation { width, height })?;
    let mut data = Vec::new();
    data.try_reserve_exact(n_pixels)
        .map_err(|_| RenderError::Allocation { width, height })?;
    data.resize(n_pixels, value);
    return Ok(data);
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Result<DepthBuffer, RenderError> {
        let z_buffer = allocate(width, height, UNOCCUPIED)?;
        return Ok(DepthBuffer {
            width,
            height,
            z_buffer,
        });
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(x as usize + y as usize * self.width as usize)
    }

    /// Stored depth at (x, y), None outside the buffer.
    pub fn get(&self, x: i32, y: i32) -> Option<i32> {
        self.index(x, y).map(|i| self.z_buffer[i])
    }

    /// Stores `depth` and returns true iff it is strictly nearer than the
    /// stored value. Out of bounds coordinates are rejected.
    pub fn test_and_set(&mut self, x: i32, y: i32, depth: i32) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        if depth <= self.z_buffer[index] {
            return false;
        }
        self.z_buffer[index] = depth;
        return true;
    }

    /// Resets every pixel to [`UNOCCUPIED`].
    pub fn clear(&mut self) {
        self.z_buffer.fill(UNOCCUPIED);
    }

    /// Grayscale picture of the buffer: occupied pixels are scaled between the
    /// nearest (white) and farthest (dark) stored depth, unoccupied ones stay black.
    pub fn to_image(&self) -> Result<Image, RenderError> {
        let mut image = Image::new(self.width, self.height, Format::Grayscale)
            .map_err(|_| RenderError::Allocation {
                width: self.width,
                height: self.height,
            })?;
        let occupied = self.z_buffer.iter().copied().filter(|&z| z != UNOCCUPIED);
        let (z_min, z_max) = occupied.fold((i32::MAX, i32::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)));
        if z_min > z_max {
            return Ok(image);
        }
        let scale = (z_max as f64 - z_min as f64).max(1.0);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let z = self.z_buffer[x as usize + y as usize * self.width as usize];
                if z == UNOCCUPIED {
                    continue;
                }
                // Keep the farthest surface visible against the background.
                let t = (z as f64 - z_min as f64) / scale;
                image.set(x, y, Color::gray((32.0 + t * 223.0) as u8));
            }
        }
        return Ok(image);
    }
}

/// Depth buffer and color target fused into one atomic word per pixel, for
/// rendering several triangles at once.
///
/// Each word is `(biased depth << 32) | rgba`, so a single `fetch_max` does
/// the nearer-wins depth test and the color write together. Fragments at equal
/// depth resolve to the larger packed color, independent of arrival order.
pub struct AtomicFrame {
    width: u32,
    height: u32,
    words: Vec<AtomicU64>,
}

impl AtomicFrame {
    pub fn new(width: u32, height: u32) -> Result<AtomicFrame, RenderError> {
        let n_pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or(RenderError::Allocation { width, height })?;
        let mut words = Vec::new();
        words
            .try_reserve_exact(n_pixels)
            .map_err(|_| RenderError::Allocation { width, height })?;
        words.extend((0..n_pixels).map(|_| AtomicU64::new(0)));
        return Ok(AtomicFrame { width, height, words });
    }

    fn pack(depth: i32, color: Color) -> u64 {
        let biased = (depth as i64 - UNOCCUPIED as i64) as u64;
        (biased << 32) | color.to_u32() as u64
    }

    fn unpack(word: u64) -> (i32, Color) {
        let depth = ((word >> 32) as i64 + UNOCCUPIED as i64) as i32;
        (depth, Color::from_u32(word as u32))
    }

    /// Writes the fragment if it is nearer than what the pixel holds.
    /// Returns true if this call changed the pixel.
    pub fn test_and_set(&self, x: i32, y: i32, depth: i32, color: Color) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        let word = AtomicFrame::pack(depth, color);
        let index = x as usize + y as usize * self.width as usize;
        let previous = self.words[index].fetch_max(word, Ordering::Relaxed);
        return word > previous;
    }

    /// Depth at (x, y), [`UNOCCUPIED`] if nothing was drawn there.
    pub fn depth(&self, x: i32, y: i32) -> Option<i32> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let word = self.words[x as usize + y as usize * self.width as usize].load(Ordering::Relaxed);
        Some(AtomicFrame::unpack(word).0)
    }

    /// Copies every drawn pixel into `target`, returning how many were written.
    pub fn resolve<P: PixelBuffer + ?Sized>(&self, target: &mut P) -> usize {
        let mut written = 0;
        for (i, word) in self.words.iter().enumerate() {
            let word = word.load(Ordering::Acquire);
            if word == 0 {
                continue;
            }
            let x = (i % self.width as usize) as i32;
            let y = (i / self.width as usize) as i32;
            let (_, color) = AtomicFrame::unpack(word);
            if target.set(x, y, color) {
                written += 1;
            }
        }
        return written;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unoccupied() {
        let buffer = DepthBuffer::new(3, 2).unwrap();
        assert_eq!(buffer.get(2, 1), Some(UNOCCUPIED));
        assert_eq!(buffer.get(3, 0), None);
    }

    #[test]
    fn only_strictly_nearer_depth_is_accepted() {
        let mut buffer = DepthBuffer::new(2, 2).unwrap();
        assert!(buffer.test_and_set(1, 1, 10));
        assert!(!buffer.test_and_set(1, 1, 10));
        assert!(!buffer.test_and_set(1, 1, 3));
        assert_eq!(buffer.get(1, 1), Some(10));
        assert!(buffer.test_and_set(1, 1, 11));
        assert_eq!(buffer.get(1, 1), Some(11));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut buffer = DepthBuffer::new(2, 2).unwrap();
        assert!(!buffer.test_and_set(-1, 0, 5));
        assert!(!buffer.test_and_set(0, 2, 5));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut buffer = DepthBuffer::new(2, 2).unwrap();
        buffer.test_and_set(0, 0, 1);
        buffer.clear();
        assert_eq!(buffer.get(0, 0), Some(UNOCCUPIED));
    }

    #[test]
    fn depth_image_is_brightest_where_nearest() {
        let mut buffer = DepthBuffer::new(3, 1).unwrap();
        buffer.test_and_set(0, 0, 0);
        buffer.test_and_set(1, 0, 100);
        let image = buffer.to_image().unwrap();
        assert_eq!(image.get(0, 0), Some(Color::gray(32)));
        assert_eq!(image.get(1, 0), Some(Color::gray(255)));
        assert_eq!(image.get(2, 0), Some(Color::BLACK));
    }

    #[test]
    fn atomic_frame_keeps_the_nearest_fragment() {
        let frame = AtomicFrame::new(2, 2).unwrap();
        assert!(frame.test_and_set(0, 0, 5, Color::RED));
        assert!(!frame.test_and_set(0, 0, -3, Color::BLUE));
        assert!(frame.test_and_set(0, 0, 7, Color::GREEN));
        assert!(!frame.test_and_set(0, 0, 7, Color::GREEN));
        assert_eq!(frame.depth(0, 0), Some(7));
        assert_eq!(frame.depth(1, 1), Some(UNOCCUPIED));

        let mut target = Image::new(2, 2, Format::Rgb).unwrap();
        assert_eq!(frame.resolve(&mut target), 1);
        assert_eq!(target.get(0, 0), Some(Color::GREEN));
    }
}
