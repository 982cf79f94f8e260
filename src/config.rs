use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::geometry::Vec3f;
use crate::image::Color;
use crate::scene::transform::Viewport;
use crate::scene::{RenderContext, RenderMode};

/// Render settings as read from a JSON file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// `[x, y, width, height]` of the screen box; centered 3/4 of the canvas if unset.
    pub viewport: Option<[i32; 4]>,
    pub depth_range: i32,
    pub camera_distance: f32,
    pub light_direction: [f32; 3],
    pub mode: RenderMode,
    /// Worker threads for the depth tested modes, 1 renders on the caller.
    pub threads: usize,
    pub base_color: [u8; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            viewport: None,
            depth_range: 255,
            camera_distance: 3.0,
            light_direction: [0.0, 0.0, -1.0],
            mode: RenderMode::Depth,
            threads: 1,
            base_color: [255, 255, 255, 255],
        }
    }
}

impl RenderConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        log::debug!("loaded render config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Checks the settings and turns them into the scene parameters of a pass.
    pub fn to_context(&self) -> Result<RenderContext, ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.depth_range <= 0 {
            return Err(ConfigError::InvalidDepthRange(self.depth_range));
        }
        let viewport = match self.viewport {
            Some(rect @ [x, y, width, height]) => {
                if width <= 0 || height <= 0 {
                    return Err(ConfigError::InvalidViewport(rect));
                }
                Viewport {
                    x,
                    y,
                    width,
                    height,
                    depth: self.depth_range,
                }
            }
            None => Viewport {
                depth: self.depth_range,
                ..Viewport::centered(self.width, self.height)
            },
        };
        let [r, g, b, a] = self.base_color;
        let [lx, ly, lz] = self.light_direction;
        let context = RenderContext {
            viewport,
            camera_distance: self.camera_distance,
            light_direction: Vec3f::default(),
            base_color: Color::rgba(r, g, b, a),
            mode: self.mode,
        }
        .with_light(Vec3f::new(lx, ly, lz))?;
        // Fails early on an unusable camera distance.
        context.transform()?;
        Ok(context)
    }
}
