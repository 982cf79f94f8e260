//! Line and triangle scan conversion.

use std::cmp::{max, min};

use crate::error::RenderError;
use crate::geometry::{Vec2, Vec2f, Vec2i, Vec3, Vec3f, Vec3i};
use crate::image::{Color, PixelBuffer};

use super::buffer::DepthBuffer;
use super::shader::{FragmentShader, Shading};

/// Returned by [`barycentric`] for triangles with no area; the negative
/// component makes every caller skip the pixel.
pub const DEGENERATE: Vec3f = Vec3f {
    x: -1.0,
    y: 1.0,
    z: 1.0,
};

/// Draws a line between `a` and `b` with integer Bresenham stepping.
/// Returns how many pixels were actually written.
///
/// Only the columns (rows for steep lines) inside the canvas are walked; the
/// error term at the first visible one is computed directly, so the lit
/// pixels are the same as for an unclipped walk.
pub fn draw_line<P: PixelBuffer + ?Sized>(a: Vec2i, b: Vec2i, target: &mut P, color: Color) -> usize {
    let (mut x_0, mut y_0, mut x_1, mut y_1) = (a.x as i64, a.y as i64, b.x as i64, b.y as i64);
    // Walking along the major axis, transposing steep lines so it is always x.
    let steep = (x_1 - x_0).abs() < (y_1 - y_0).abs();
    if steep {
        std::mem::swap(&mut x_0, &mut y_0);
        std::mem::swap(&mut x_1, &mut y_1);
    }
    if x_0 > x_1 {
        std::mem::swap(&mut x_0, &mut x_1);
        std::mem::swap(&mut y_0, &mut y_1);
    }

    let dx = x_1 - x_0;
    let d_error = 2 * (y_1 - y_0).abs();
    let y_step = if y_1 > y_0 { 1 } else { -1 };

    let limit = i64::from(if steep { target.height() } else { target.width() });
    let first = x_0.max(0);
    let last = x_1.min(limit - 1);
    if first > last {
        return 0;
    }
    // After k steps the error is k*d_error - 2*dx*m for the unique m that
    // keeps it in (-dx, dx].
    let (mut error, mut y) = if dx > 0 {
        let k = (first - x_0) as i128;
        let (d_error, dx) = (d_error as i128, dx as i128);
        let m = (k * d_error - dx + 2 * dx - 1).div_euclid(2 * dx);
        ((k * d_error - 2 * dx * m) as i64, y_0 + y_step * m as i64)
    } else {
        (0, y_0)
    };

    let mut written = 0;
    for x in first..=last {
        let (px, py) = if steep { (y, x) } else { (x, y) };
        if let (Ok(px), Ok(py)) = (i32::try_from(px), i32::try_from(py)) {
            if target.set(px, py, color) {
                written += 1;
            }
        }
        error += d_error;
        if error > dx {
            y += y_step;
            error -= 2 * dx;
        }
    }
    return written;
}

/// Barycentric weights `(w, u, v)` of `p` with respect to triangle `abc`,
/// i.e. `p = w*a + u*b + v*c`.
///
/// Solves `u*AB + v*AC + PA = 0` with one cross product. Coordinates are
/// widened to i128 before any arithmetic, so the sign of every weight is exact
/// for all i32 inputs and a pixel on an edge gets a weight of exactly zero.
/// Degenerate triangles yield [`DEGENERATE`].
pub fn barycentric(p: Vec2i, a: Vec2i, b: Vec2i, c: Vec2i) -> Vec3f {
    let (p, a, b, c) = (wide(p), wide(a), wide(b), wide(c));
    let raw_cross = Vec3::new(b.x - a.x, c.x - a.x, a.x - p.x).cross(Vec3::new(b.y - a.y, c.y - a.y, a.y - p.y));
    if raw_cross.z.abs() < 1 {
        // Degenerate triangle, returning something with negative coordinate.
        return DEGENERATE;
    }
    let z = raw_cross.z as f64;
    let w = (raw_cross.z - raw_cross.x - raw_cross.y) as f64;
    return Vec3f::new(
        (w / z) as f32,
        (raw_cross.x as f64 / z) as f32,
        (raw_cross.y as f64 / z) as f32,
    );
}

fn wide(v: Vec2i) -> Vec2<i128> {
    Vec2::new(v.x as i128, v.y as i128)
}

/// True if all weights are non-negative, i.e. the pixel is inside or on an edge.
pub fn is_inside(weights: Vec3f) -> bool {
    weights.x >= 0.0 && weights.y >= 0.0 && weights.z >= 0.0
}

/// Simple bounding box of pixel coordinates, both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub ll: Vec2i, // lower left corner
    pub ur: Vec2i, // upper right corner
}

impl BoundingBox {
    /// Box around the three points, clamped to `[0, width-1] x [0, height-1]`.
    /// None if nothing of it is left on the canvas.
    pub fn clamped(points: [Vec2i; 3], width: u32, height: u32) -> Option<BoundingBox> {
        let [a, b, c] = points;
        let ll = Vec2i::new(max(min(min(a.x, b.x), c.x), 0), max(min(min(a.y, b.y), c.y), 0));
        let ur = Vec2i::new(
            min(max(max(a.x, b.x), c.x), width as i32 - 1),
            min(max(max(a.y, b.y), c.y), height as i32 - 1),
        );
        if ll.x > ur.x || ll.y > ur.y {
            return None;
        }
        Some(BoundingBox { ll, ur })
    }
}

/// Calls `emit(x, y, weights)` for every pixel of the canvas covered by the
/// triangle, edges included. Returns the number of covered pixels.
pub fn rasterize<F>(points: [Vec2i; 3], width: u32, height: u32, mut emit: F) -> usize
where
    F: FnMut(i32, i32, Vec3f),
{
    let Some(bbox) = BoundingBox::clamped(points, width, height) else {
        return 0;
    };
    let [a, b, c] = points;
    let mut covered = 0;
    for y in bbox.ll.y..=bbox.ur.y {
        for x in bbox.ll.x..=bbox.ur.x {
            let weights = barycentric(Vec2i::new(x, y), a, b, c);
            if !is_inside(weights) {
                // If any of the weights are negative, pixel is not in the triangle, so skipping it.
                continue;
            }
            covered += 1;
            emit(x, y, weights);
        }
    }
    return covered;
}

/// Interpolated, rounded depth of a fragment.
pub fn interpolate_depth(points: &[Vec3i; 3], weights: Vec3f) -> i32 {
    let z = weights.x * points[0].z as f32 + weights.y * points[1].z as f32 + weights.z * points[2].z as f32;
    z.round() as i32
}

/// Screen space triangle handed to the rasterizer. Built per face and dropped
/// right after drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// x, y in pixels, z as quantized depth.
    pub points: [Vec3i; 3],
    /// Texture coordinates in [0, 1], one per point.
    pub uvs: Option<[Vec2f; 3]>,
    /// Flat shading factor applied to every fragment.
    pub intensity: f32,
}

impl Triangle {
    pub fn new(points: [Vec3i; 3]) -> Triangle {
        Triangle {
            points,
            uvs: None,
            intensity: 1.0,
        }
    }

    /// Flat 2D triangle, every point at depth 0.
    pub fn flat(a: Vec2i, b: Vec2i, c: Vec2i) -> Triangle {
        Triangle::new([
            Vec3i::new(a.x, a.y, 0),
            Vec3i::new(b.x, b.y, 0),
            Vec3i::new(c.x, c.y, 0),
        ])
    }

    pub fn with_uvs(mut self, uvs: [Vec2f; 3]) -> Triangle {
        self.uvs = Some(uvs);
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Triangle {
        self.intensity = intensity;
        self
    }

    pub fn screen_points(&self) -> [Vec2i; 3] {
        [self.points[0].xy(), self.points[1].xy(), self.points[2].xy()]
    }
}

/// Fills a triangle. With a depth buffer, only fragments strictly nearer than
/// what is stored are written; `shading` picks flat color or texture lookup.
/// Returns how many pixels were written.
pub fn draw_triangle<P: PixelBuffer + ?Sized>(
    triangle: &Triangle,
    target: &mut P,
    mut depth: Option<&mut DepthBuffer>,
    shading: &Shading,
) -> Result<usize, RenderError> {
    let shader = FragmentShader::new(shading, triangle)?;
    let (width, height) = (target.width(), target.height());
    let mut written = 0;
    rasterize(triangle.screen_points(), width, height, |x, y, weights| {
        let Some(color) = shader.shade(weights) else {
            return;
        };
        if let Some(depth) = depth.as_deref_mut() {
            // Checking z-buffer, on success redrawing the pixel and updating the buffer.
            if !depth.test_and_set(x, y, interpolate_depth(&triangle.points, weights)) {
                return;
            }
        }
        if target.set(x, y, color) {
            written += 1;
        }
    });
    return Ok(written);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Format, Image};
    use std::collections::HashSet;

    fn lit(image: &Image) -> HashSet<(i32, i32)> {
        let mut set = HashSet::new();
        for y in 0..image.height() as i32 {
            for x in 0..image.width() as i32 {
                if image.get(x, y) != Some(Color::BLACK) {
                    set.insert((x, y));
                }
            }
        }
        set
    }

    fn line_pixels(a: Vec2i, b: Vec2i) -> HashSet<(i32, i32)> {
        let mut image = Image::new(40, 40, Format::Rgb).unwrap();
        draw_line(a, b, &mut image, Color::WHITE);
        lit(&image)
    }

    #[test]
    fn single_point_line_draws_one_pixel() {
        let pixels = line_pixels(Vec2i::new(5, 7), Vec2i::new(5, 7));
        assert_eq!(pixels, HashSet::from([(5, 7)]));
    }

    #[test]
    fn lines_are_direction_independent() {
        let cases = [
            ((0, 0), (7, 3)),
            ((5, 5), (1, 9)),
            ((0, 10), (10, 0)),
            ((2, 1), (2, 30)),
            ((3, 4), (33, 19)),
            ((0, 0), (10, 5)),
        ];
        for ((ax, ay), (bx, by)) in cases {
            let a = Vec2i::new(ax, ay);
            let b = Vec2i::new(bx, by);
            assert_eq!(line_pixels(a, b), line_pixels(b, a), "{} -> {}", a, b);
        }
    }

    #[test]
    fn steep_line_has_one_pixel_per_row() {
        let pixels = line_pixels(Vec2i::new(20, 13), Vec2i::new(25, 35));
        assert_eq!(pixels.len(), 23);
        for y in 13..=35 {
            assert_eq!(pixels.iter().filter(|p| p.1 == y).count(), 1);
        }
    }

    #[test]
    fn line_leaving_the_canvas_is_clipped_per_pixel() {
        let mut image = Image::new(10, 10, Format::Rgb).unwrap();
        let written = draw_line(Vec2i::new(-5, 2), Vec2i::new(14, 2), &mut image, Color::WHITE);
        assert_eq!(written, 10);
    }

    #[test]
    fn far_off_canvas_endpoints_only_walk_the_canvas() {
        let mut image = Image::new(10, 10, Format::Rgb).unwrap();
        let written = draw_line(
            Vec2i::new(-1_100_000_000, 5),
            Vec2i::new(1_100_000_000, 5),
            &mut image,
            Color::WHITE,
        );
        assert_eq!(written, 10);
        let steep = draw_line(Vec2i::new(3, i32::MIN), Vec2i::new(3, i32::MAX), &mut image, Color::RED);
        assert_eq!(steep, 10);
    }

    #[test]
    fn clipped_line_matches_the_unclipped_walk() {
        // Bresenham is shift invariant, so the same line drawn well inside a
        // bigger canvas shows which pixels the clipped walk has to light.
        let mut small = Image::new(20, 20, Format::Rgb).unwrap();
        draw_line(Vec2i::new(-50, -20), Vec2i::new(60, 33), &mut small, Color::WHITE);
        let mut big = Image::new(200, 200, Format::Rgb).unwrap();
        draw_line(Vec2i::new(50, 80), Vec2i::new(160, 133), &mut big, Color::WHITE);

        let expected: HashSet<(i32, i32)> = lit(&big)
            .into_iter()
            .filter(|&(x, y)| (100..120).contains(&x) && (100..120).contains(&y))
            .map(|(x, y)| (x - 100, y - 100))
            .collect();
        assert_eq!(lit(&small), expected);
        assert_eq!(expected.len(), 20);
    }

    #[test]
    fn weights_stay_exact_for_huge_coordinates() {
        let w = barycentric(
            Vec2i::new(0, 0),
            Vec2i::new(-1_100_000_000, -1),
            Vec2i::new(1_100_000_000, -1),
            Vec2i::new(49, 60),
        );
        assert!(is_inside(w), "{}", w);
        assert!((w.x + w.y + w.z - 1.0).abs() < 1e-6);
        assert!((w.z - 1.0 / 61.0).abs() < 1e-6);
    }

    #[test]
    fn weights_at_vertices_are_the_standard_basis() {
        let (a, b, c) = (Vec2i::new(1, 1), Vec2i::new(11, 3), Vec2i::new(4, 9));
        assert_eq!(barycentric(a, a, b, c), Vec3f::new(1.0, 0.0, 0.0));
        assert_eq!(barycentric(b, a, b, c), Vec3f::new(0.0, 1.0, 0.0));
        assert_eq!(barycentric(c, a, b, c), Vec3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn interior_weights_are_positive_and_sum_to_one() {
        let (a, b, c) = (Vec2i::new(0, 0), Vec2i::new(30, 0), Vec2i::new(0, 30));
        for p in [Vec2i::new(1, 1), Vec2i::new(10, 10), Vec2i::new(5, 20)] {
            let w = barycentric(p, a, b, c);
            assert!(w.x > 0.0 && w.y > 0.0 && w.z > 0.0, "{}", w);
            assert!((w.x + w.y + w.z - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn winding_does_not_matter() {
        let (a, b, c) = (Vec2i::new(0, 0), Vec2i::new(30, 0), Vec2i::new(0, 30));
        let p = Vec2i::new(7, 9);
        assert!(is_inside(barycentric(p, a, b, c)));
        assert!(is_inside(barycentric(p, a, c, b)));
        assert!(!is_inside(barycentric(Vec2i::new(20, 20), a, c, b)));
    }

    #[test]
    fn edge_pixels_have_a_zero_weight_and_are_inside() {
        let (a, b, c) = (Vec2i::new(0, 0), Vec2i::new(10, 0), Vec2i::new(0, 10));
        let on_hypotenuse = barycentric(Vec2i::new(5, 5), a, b, c);
        assert_eq!(on_hypotenuse.x, 0.0);
        assert!(is_inside(on_hypotenuse));
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let w = barycentric(Vec2i::new(1, 1), Vec2i::new(0, 0), Vec2i::new(2, 2), Vec2i::new(4, 4));
        assert_eq!(w, DEGENERATE);
        let covered = rasterize(
            [Vec2i::new(0, 0), Vec2i::new(2, 2), Vec2i::new(4, 4)],
            10,
            10,
            |_, _, _| panic!("degenerate triangles emit nothing"),
        );
        assert_eq!(covered, 0);
    }

    #[test]
    fn bounding_box_is_inclusive_and_clamped() {
        let points = [Vec2i::new(-5, 2), Vec2i::new(8, 20), Vec2i::new(3, -1)];
        let bbox = BoundingBox::clamped(points, 10, 10).unwrap();
        assert_eq!(bbox.ll, Vec2i::new(0, 0));
        assert_eq!(bbox.ur, Vec2i::new(8, 9));
        let off_canvas = [Vec2i::new(20, 20), Vec2i::new(30, 20), Vec2i::new(20, 30)];
        assert_eq!(BoundingBox::clamped(off_canvas, 10, 10), None);
    }

    #[test]
    fn last_row_and_column_of_the_box_are_filled() {
        let mut image = Image::new(20, 20, Format::Rgb).unwrap();
        let triangle = Triangle::flat(Vec2i::new(0, 0), Vec2i::new(10, 0), Vec2i::new(10, 10));
        draw_triangle(&triangle, &mut image, None, &Shading::Flat(Color::RED)).unwrap();
        assert_eq!(image.get(10, 0), Some(Color::RED));
        assert_eq!(image.get(10, 10), Some(Color::RED));
        assert_eq!(image.count(Color::RED), 66);
    }

    #[test]
    fn square_split_along_diagonal_has_no_gaps() {
        let mut image = Image::new(30, 30, Format::Rgb).unwrap();
        let (a, b, c, d) = (
            Vec2i::new(0, 0),
            Vec2i::new(20, 0),
            Vec2i::new(20, 20),
            Vec2i::new(0, 20),
        );
        draw_triangle(&Triangle::flat(a, b, c), &mut image, None, &Shading::Flat(Color::RED)).unwrap();
        draw_triangle(&Triangle::flat(a, c, d), &mut image, None, &Shading::Flat(Color::BLUE)).unwrap();
        assert_eq!(lit(&image).len(), 21 * 21);
    }

    #[test]
    fn depth_test_keeps_nearer_fragments() {
        let mut image = Image::new(20, 20, Format::Rgb).unwrap();
        let mut depth = DepthBuffer::new(20, 20).unwrap();
        let near = Triangle::new([Vec3i::new(0, 0, 50), Vec3i::new(15, 0, 50), Vec3i::new(0, 15, 50)]);
        let far = Triangle::new([Vec3i::new(0, 0, 10), Vec3i::new(15, 0, 10), Vec3i::new(0, 15, 10)]);
        let drawn = draw_triangle(&near, &mut image, Some(&mut depth), &Shading::Flat(Color::GREEN)).unwrap();
        assert!(drawn > 0);
        let overwritten = draw_triangle(&far, &mut image, Some(&mut depth), &Shading::Flat(Color::RED)).unwrap();
        assert_eq!(overwritten, 0);
        assert_eq!(image.count(Color::RED), 0);
        assert_eq!(depth.get(3, 3), Some(50));
    }

    #[test]
    fn interpolated_depth_follows_weights() {
        let points = [Vec3i::new(0, 0, 0), Vec3i::new(10, 0, 100), Vec3i::new(0, 10, 200)];
        assert_eq!(interpolate_depth(&points, Vec3f::new(1.0, 0.0, 0.0)), 0);
        assert_eq!(interpolate_depth(&points, Vec3f::new(0.5, 0.5, 0.0)), 50);
        assert_eq!(interpolate_depth(&points, Vec3f::new(0.0, 0.25, 0.75)), 175);
    }

    #[test]
    fn textured_fill_without_uvs_fails() {
        let mut image = Image::new(4, 4, Format::Rgb).unwrap();
        let texture = Image::new(2, 2, Format::Rgb).unwrap();
        let triangle = Triangle::flat(Vec2i::new(0, 0), Vec2i::new(3, 0), Vec2i::new(0, 3));
        let err = draw_triangle(&triangle, &mut image, None, &Shading::Textured(&texture)).unwrap_err();
        assert!(matches!(err, RenderError::MissingUv));
    }
}
