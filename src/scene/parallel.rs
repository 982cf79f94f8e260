//! Multi-threaded variant of the render pass.
//!
//! Faces are prepared on the calling thread, then chunks of triangles are
//! rasterized on a thread pool into an [`AtomicFrame`]. The result equals the
//! serial pass wherever depths differ; ties resolve by packed color instead of
//! submission order.

use std::sync::{mpsc, Arc};

use threadpool::ThreadPool;

use crate::error::RenderError;
use crate::image::{Image, PixelBuffer};
use crate::mesh::MeshSource;

use super::buffer::AtomicFrame;
use super::raster::{interpolate_depth, rasterize, Triangle};
use super::shader::{FragmentShader, Shading};
use super::{fan, prepare_triangle, render, Prepared, RenderContext, RenderMode, RenderStats};

/// Smallest batch of triangles handed to one job.
const MIN_CHUNK: usize = 64;

/// Rasterizes `triangles` into `frame`, stopping at the first triangle the
/// shading cannot be applied to.
fn draw_chunk(triangles: &[Triangle], frame: &AtomicFrame, shading: &Shading) -> Result<(), RenderError> {
    let (width, height) = (frame.width(), frame.height());
    for triangle in triangles {
        let shader = FragmentShader::new(shading, triangle)?;
        rasterize(triangle.screen_points(), width, height, |x, y, weights| {
            if let Some(color) = shader.shade(weights) {
                frame.test_and_set(x, y, interpolate_depth(&triangle.points, weights), color);
            }
        });
    }
    Ok(())
}

/// Renders `mesh` into `target` on `threads` worker threads.
///
/// Only the depth tested modes run in parallel; wireframe and flat fill
/// depend on submission order and fall back to the serial pass, as does
/// `threads <= 1`.
pub fn render_parallel<M, P>(
    mesh: &M,
    target: &mut P,
    context: &RenderContext,
    texture: Option<Arc<Image>>,
    threads: usize,
) -> Result<RenderStats, RenderError>
where
    M: MeshSource + ?Sized,
    P: PixelBuffer + ?Sized,
{
    let ordered = matches!(context.mode, RenderMode::Wireframe | RenderMode::Flat);
    if threads <= 1 || ordered {
        log::debug!("running serial pass (mode {:?}, {} thread(s))", context.mode, threads);
        let texture = texture.as_deref().map(|t| t as &dyn PixelBuffer);
        return render(mesh, target, context, texture);
    }
    if context.mode == RenderMode::Textured && texture.is_none() {
        return Err(RenderError::MissingTexture);
    }

    let transform = context.transform()?;
    let mut stats = RenderStats::default();
    let mut triangles = Vec::new();
    for face_index in 0..mesh.face_count() {
        let face = mesh
            .face(face_index)
            .ok_or(RenderError::MeshIndex { face: face_index })?;
        for corners in fan(face) {
            stats.triangles += 1;
            match prepare_triangle(mesh, face_index, corners, context, &transform)? {
                Prepared::Ready(triangle) => triangles.push(triangle),
                Prepared::Culled => stats.culled += 1,
                Prepared::Degenerate => stats.degenerate += 1,
                Prepared::Clipped => stats.clipped += 1,
            }
        }
    }
    stats.rasterized = triangles.len();

    let (width, height) = (target.width(), target.height());
    let frame = Arc::new(AtomicFrame::new(width, height)?);
    let triangles: Arc<Vec<Triangle>> = Arc::new(triangles);
    let chunk = MIN_CHUNK.max(triangles.len().div_ceil(threads * 4));

    let pool = ThreadPool::new(threads);
    let (error_sender, error_receiver) = mpsc::channel();
    for start in (0..triangles.len()).step_by(chunk) {
        let end = (start + chunk).min(triangles.len());
        let triangles = Arc::clone(&triangles);
        let frame = Arc::clone(&frame);
        let texture = texture.clone();
        let base_color = context.base_color;
        let error_sender = error_sender.clone();
        pool.execute(move || {
            let shading = match texture.as_deref() {
                Some(texture) => Shading::Textured(texture),
                None => Shading::Flat(base_color),
            };
            if let Err(err) = draw_chunk(&triangles[start..end], &frame, &shading) {
                // The receiver outlives the pool.
                let _ = error_sender.send(err);
            }
        });
    }
    pool.join();

    let panicked = pool.panic_count();
    if panicked > 0 {
        return Err(RenderError::WorkerPanicked { count: panicked });
    }
    if let Ok(err) = error_receiver.try_recv() {
        return Err(err);
    }
    stats.pixels = frame.resolve(target);
    log::info!(
        "parallel pass done on {} threads: {} of {} triangles drawn, {} pixels",
        threads,
        stats.rasterized,
        stats.triangles,
        stats.pixels
    );
    return Ok(stats);
}
