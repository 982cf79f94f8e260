//! Per-triangle lighting and per-fragment color.

use crate::error::{GeometryError, RenderError};
use crate::geometry::{Vec2f, Vec3f};
use crate::image::{Color, PixelBuffer};

use super::raster::Triangle;

/// How fragments of a triangle get their color.
#[derive(Clone, Copy)]
pub enum Shading<'a> {
    /// One color for the whole triangle.
    Flat(Color),
    /// Nearest texel at the interpolated texture coordinate.
    Textured(&'a dyn PixelBuffer),
}

/// Flat lighting factor of a world space triangle: the unit face normal
/// `(v2 - v0) x (v1 - v0)` dotted with `light_direction`.
///
/// Values `<= 0` mean the face points away from the light and should be
/// culled. A zero area face has no normal and fails.
pub fn flat_intensity(vertices: [Vec3f; 3], light_direction: Vec3f) -> Result<f32, GeometryError> {
    let face_normal = (vertices[2] - vertices[0])
        .cross(vertices[1] - vertices[0])
        .normalized()?;
    return Ok(face_normal.dot(light_direction));
}

/// Nearest neighbour lookup. Texture coordinates outside [0, 1] are clamped
/// to the border texels.
pub fn sample_texture(texture: &dyn PixelBuffer, uv: Vec2f) -> Option<Color> {
    let width = texture.width() as i32;
    let height = texture.height() as i32;
    if width == 0 || height == 0 {
        return None;
    }
    let x = ((uv.x * width as f32) as i32).clamp(0, width - 1);
    let y = ((uv.y * height as f32) as i32).clamp(0, height - 1);
    return texture.get(x, y);
}

/// Color source for the fragments of one triangle.
pub struct FragmentShader<'a> {
    kind: ShaderKind<'a>,
    intensity: f32,
}

enum ShaderKind<'a> {
    Flat(Color),
    Textured {
        texture: &'a dyn PixelBuffer,
        uvs: [Vec2f; 3],
    },
}

impl<'a> FragmentShader<'a> {
    pub fn new(shading: &Shading<'a>, triangle: &Triangle) -> Result<FragmentShader<'a>, RenderError> {
        let kind = match *shading {
            // Flat color doesn't change across the triangle, so scaling it once.
            Shading::Flat(color) => ShaderKind::Flat(color.scale(triangle.intensity)),
            Shading::Textured(texture) => ShaderKind::Textured {
                texture,
                uvs: triangle.uvs.ok_or(RenderError::MissingUv)?,
            },
        };
        return Ok(FragmentShader {
            kind,
            intensity: triangle.intensity,
        });
    }

    /// Color of the fragment with barycentric `weights`; None if the texture
    /// lookup failed, in which case nothing may be written.
    pub fn shade(&self, weights: Vec3f) -> Option<Color> {
        match &self.kind {
            ShaderKind::Flat(color) => Some(*color),
            ShaderKind::Textured { texture, uvs } => {
                let uv = uvs[0] * weights.x + uvs[1] * weights.y + uvs[2] * weights.z;
                let texel = sample_texture(*texture, uv)?;
                Some(texel.scale(self.intensity))
            }
        }
    }
}
