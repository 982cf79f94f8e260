use std::path::PathBuf;
use std::sync::Arc;
use std::time;

use anyhow::Context;

use soft_rasterizer::config::RenderConfig;
use soft_rasterizer::image::{Format, Image, PixelBuffer};
use soft_rasterizer::mesh::Mesh;
use soft_rasterizer::scene::parallel::render_parallel;
use soft_rasterizer::scene::{RenderMode, RenderPass, RenderStats};

/// What to render and where the results go.
pub struct Params {
    pub model_path: PathBuf,
    pub texture_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub depth_output_path: Option<PathBuf>,
    pub config: RenderConfig,
    pub show: bool,
}

/// Renders one frame of the model and writes it out.
pub fn run(params: Params) -> anyhow::Result<()> {
    let context = params
        .config
        .to_context()
        .context("invalid render configuration")?;
    let (width, height) = (params.config.width, params.config.height);

    let mesh = Mesh::load_obj(&params.model_path)
        .with_context(|| format!("failed to load model {}", params.model_path.display()))?;
    let texture = match (&params.texture_path, context.mode) {
        (Some(path), RenderMode::Textured) => Some(Arc::new(
            Image::load(path).with_context(|| format!("failed to load texture {}", path.display()))?,
        )),
        (Some(path), mode) => {
            log::warn!("texture {} ignored in {:?} mode", path.display(), mode);
            None
        }
        (None, _) => None,
    };

    let mut frame = Image::new(width, height, Format::Rgb).context("failed to allocate the frame")?;
    let time_begin = time::Instant::now();
    let stats: RenderStats = if params.depth_output_path.is_none() {
        render_parallel(&mesh, &mut frame, &context, texture, params.config.threads)?
    } else {
        // The depth image needs the depth buffer of a serial pass.
        if params.config.threads > 1 {
            log::warn!(
                "depth output requested, rendering on one thread instead of {}",
                params.config.threads
            );
        }
        let mut pass = RenderPass::new(&context, width, height)?;
        let stats = pass.draw_mesh(&mesh, &mut frame, texture.as_deref().map(|t| t as &dyn PixelBuffer))?;
        if let Some(path) = &params.depth_output_path {
            pass.into_depth()
                .to_image()?
                .save(path)
                .with_context(|| format!("failed to write depth image {}", path.display()))?;
            log::info!("depth image written to {}", path.display());
        }
        stats
    };
    log::info!(
        "rendered {} triangles in {:.1} ms",
        stats.rasterized,
        time::Instant::now().duration_since(time_begin).as_secs_f64() * 1000.0
    );

    frame
        .save(&params.output_path)
        .with_context(|| format!("failed to write {}", params.output_path.display()))?;
    log::info!("frame written to {}", params.output_path.display());

    if params.show {
        preview(&frame)?;
    }
    return Ok(());
}

#[cfg(feature = "preview")]
fn preview(frame: &Image) -> anyhow::Result<()> {
    use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};

    /// Helper, defining exit event to be an Escape key press.
    fn is_exit_event(window_event: event::WindowEvent) -> bool {
        if let event::WindowEvent::KeyboardInput(event) = window_event {
            if event.input.key_code == Some(event::VirtualKeyCode::Escape) && event.input.state.is_released() {
                return true;
            }
        }
        return false;
    }

    let (width, height) = (frame.width(), frame.height());
    let window_options = WindowOptions {
        size: Some([width, height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let image_data = ImageView::new(ImageInfo::rgb8(width, height), frame.as_pixel_data());
    window.set_image("image", image_data)?;

    // Blocking until Escape is released or the window goes away.
    for window_event in window.event_channel()?.iter() {
        if is_exit_event(window_event) {
            break;
        }
    }
    return Ok(());
}

#[cfg(not(feature = "preview"))]
fn preview(_frame: &Image) -> anyhow::Result<()> {
    log::warn!("built without the `preview` feature, not opening a window");
    return Ok(());
}
