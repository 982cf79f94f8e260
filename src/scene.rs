//! One synchronous mesh-to-image render pass.

pub mod buffer;
pub mod parallel;
pub mod raster;
pub mod shader;
pub mod transform;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, RenderError};
use crate::geometry::{Vec2f, Vec3f, Vec3i};
use crate::image::{Color, PixelBuffer};
use crate::mesh::{FaceVertex, MeshSource};

use buffer::DepthBuffer;
use raster::{draw_line, draw_triangle, Triangle};
use shader::{flat_intensity, Shading};
use transform::{Transform, Viewport};

/// What a render pass draws for every face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Face edges as lines, no culling.
    Wireframe,
    /// Light-scaled flat fill in submission order, no depth test.
    Flat,
    /// Light-scaled flat fill with depth test.
    Depth,
    /// Light-scaled texture lookup with depth test.
    Textured,
}

/// Scene parameters for a render pass, owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub viewport: Viewport,
    pub camera_distance: f32,
    /// Unit vector the light travels along.
    pub light_direction: Vec3f,
    /// Fill color for flat modes, line color for wireframe.
    pub base_color: Color,
    pub mode: RenderMode,
}

impl RenderContext {
    /// Defaults for a canvas: centered viewport, camera at distance 3 and light
    /// shining into the screen.
    pub fn new(width: u32, height: u32) -> RenderContext {
        RenderContext {
            viewport: Viewport::centered(width, height),
            camera_distance: 3.0,
            light_direction: Vec3f::new(0.0, 0.0, -1.0),
            base_color: Color::WHITE,
            mode: RenderMode::Depth,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> RenderContext {
        self.mode = mode;
        self
    }

    /// Sets the light direction, normalized.
    pub fn with_light(mut self, light_direction: Vec3f) -> Result<RenderContext, GeometryError> {
        self.light_direction = light_direction.normalized()?;
        Ok(self)
    }

    pub fn transform(&self) -> Result<Transform, GeometryError> {
        Transform::new(&self.viewport, self.camera_distance)
    }
}

/// Counters collected over one render pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Triangles after fan triangulation of the faces.
    pub triangles: usize,
    /// Triangles handed to the rasterizer.
    pub rasterized: usize,
    /// Triangles facing away from the light.
    pub culled: usize,
    /// Triangles without a face normal.
    pub degenerate: usize,
    /// Triangles with a vertex that could not be mapped to the screen.
    pub clipped: usize,
    /// Successful pixel writes.
    pub pixels: usize,
}

/// Outcome of preparing one triangle of a face.
pub(crate) enum Prepared {
    Ready(Triangle),
    Culled,
    Degenerate,
    Clipped,
}

/// Fan triangulation: `(c0, c1, c2), (c0, c2, c3), ...`
pub(crate) fn fan(face: &[FaceVertex]) -> impl Iterator<Item = [FaceVertex; 3]> + '_ {
    (1..face.len().saturating_sub(1)).map(move |i| [face[0], face[i], face[i + 1]])
}

/// Runs the per-vertex stage for one triangle: lighting, culling, projection.
pub(crate) fn prepare_triangle<M: MeshSource + ?Sized>(
    mesh: &M,
    face_index: usize,
    corners: [FaceVertex; 3],
    context: &RenderContext,
    transform: &Transform,
) -> Result<Prepared, RenderError> {
    let mut world = [Vec3f::default(); 3];
    for (slot, corner) in world.iter_mut().zip(corners.iter()) {
        *slot = mesh
            .vertex(corner.vertex)
            .ok_or(RenderError::MeshIndex { face: face_index })?;
    }

    let intensity = match flat_intensity(world, context.light_direction) {
        Ok(intensity) => intensity,
        Err(_) => return Ok(Prepared::Degenerate),
    };
    // Backface culling by the sign of the light term.
    if intensity <= 0.0 {
        return Ok(Prepared::Culled);
    }

    let mut points = [Vec3i::default(); 3];
    for (slot, vertex) in points.iter_mut().zip(world.iter()) {
        match transform.to_screen(*vertex) {
            Ok(point) => *slot = point,
            Err(err) => {
                log::warn!("face {} dropped: {}", face_index, err);
                return Ok(Prepared::Clipped);
            }
        }
    }

    let mut triangle = Triangle::new(points).with_intensity(intensity);
    if context.mode == RenderMode::Textured {
        let mut uvs = [Vec2f::default(); 3];
        for (slot, corner) in uvs.iter_mut().zip(corners.iter()) {
            let index = corner.uv.ok_or(RenderError::FaceWithoutUv { face: face_index })?;
            *slot = mesh.uv(index).ok_or(RenderError::MeshIndex { face: face_index })?;
        }
        triangle = triangle.with_uvs(uvs);
    }
    return Ok(Prepared::Ready(triangle));
}

/// A render pass owning its depth buffer for the lifetime of one frame.
pub struct RenderPass<'a> {
    context: &'a RenderContext,
    transform: Transform,
    depth: DepthBuffer,
}

impl<'a> RenderPass<'a> {
    pub fn new(context: &'a RenderContext, width: u32, height: u32) -> Result<RenderPass<'a>, RenderError> {
        let transform = context.transform()?;
        let depth = DepthBuffer::new(width, height)?;
        log::debug!(
            "render pass {}x{}, mode {:?}, viewport {:?}, camera distance {}",
            width,
            height,
            context.mode,
            context.viewport,
            context.camera_distance
        );
        return Ok(RenderPass {
            context,
            transform,
            depth,
        });
    }

    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    pub fn into_depth(self) -> DepthBuffer {
        self.depth
    }

    /// Draws every face of `mesh` into `target`, one triangle at a time.
    pub fn draw_mesh<M, P>(
        &mut self,
        mesh: &M,
        target: &mut P,
        texture: Option<&dyn PixelBuffer>,
    ) -> Result<RenderStats, RenderError>
    where
        M: MeshSource + ?Sized,
        P: PixelBuffer + ?Sized,
    {
        let mut stats = RenderStats::default();
        if self.context.mode == RenderMode::Wireframe {
            self.draw_wireframe(mesh, target, &mut stats)?;
            log::info!("wireframe pass done: {:?}", stats);
            return Ok(stats);
        }

        let shading = match (self.context.mode, texture) {
            (RenderMode::Textured, Some(texture)) => Shading::Textured(texture),
            (RenderMode::Textured, None) => return Err(RenderError::MissingTexture),
            _ => Shading::Flat(self.context.base_color),
        };

        for face_index in 0..mesh.face_count() {
            let face = mesh
                .face(face_index)
                .ok_or(RenderError::MeshIndex { face: face_index })?;
            for corners in fan(face) {
                stats.triangles += 1;
                match prepare_triangle(mesh, face_index, corners, self.context, &self.transform)? {
                    Prepared::Ready(triangle) => {
                        let depth = match self.context.mode {
                            RenderMode::Flat => None,
                            _ => Some(&mut self.depth),
                        };
                        stats.pixels += draw_triangle(&triangle, target, depth, &shading)?;
                        stats.rasterized += 1;
                    }
                    Prepared::Culled => stats.culled += 1,
                    Prepared::Degenerate => {
                        log::trace!("face {} has no normal, skipped", face_index);
                        stats.degenerate += 1;
                    }
                    Prepared::Clipped => stats.clipped += 1,
                }
            }
        }

        log::info!(
            "render pass done: {} of {} triangles drawn ({} culled, {} degenerate, {} clipped), {} pixels",
            stats.rasterized,
            stats.triangles,
            stats.culled,
            stats.degenerate,
            stats.clipped,
            stats.pixels
        );
        return Ok(stats);
    }

    fn draw_wireframe<M, P>(&self, mesh: &M, target: &mut P, stats: &mut RenderStats) -> Result<(), RenderError>
    where
        M: MeshSource + ?Sized,
        P: PixelBuffer + ?Sized,
    {
        'faces: for face_index in 0..mesh.face_count() {
            let face = mesh
                .face(face_index)
                .ok_or(RenderError::MeshIndex { face: face_index })?;
            stats.triangles += face.len().saturating_sub(2);
            let mut screen = Vec::with_capacity(face.len());
            for corner in face {
                let vertex = mesh
                    .vertex(corner.vertex)
                    .ok_or(RenderError::MeshIndex { face: face_index })?;
                match self.transform.to_screen(vertex) {
                    Ok(point) => screen.push(point.xy()),
                    Err(err) => {
                        log::warn!("face {} dropped: {}", face_index, err);
                        stats.clipped += face.len().saturating_sub(2);
                        continue 'faces;
                    }
                }
            }
            for j in 0..screen.len() {
                let next = screen[(j + 1) % screen.len()];
                stats.pixels += draw_line(screen[j], next, target, self.context.base_color);
            }
            stats.rasterized += face.len().saturating_sub(2);
        }
        Ok(())
    }
}

/// Renders `mesh` into `target` with a fresh depth buffer.
pub fn render<M, P>(
    mesh: &M,
    target: &mut P,
    context: &RenderContext,
    texture: Option<&dyn PixelBuffer>,
) -> Result<RenderStats, RenderError>
where
    M: MeshSource + ?Sized,
    P: PixelBuffer + ?Sized,
{
    let mut pass = RenderPass::new(context, target.width(), target.height())?;
    return pass.draw_mesh(mesh, target, texture);
}
