//! Software triangle rasterizer: lines, filled and depth tested triangles,
//! flat lighting and texture lookup into an in-memory image.

pub mod config;
pub mod error;
pub mod geometry;
pub mod image;
pub mod matrix;
pub mod mesh;
pub mod scene;

pub use config::RenderConfig;
pub use error::{ConfigError, GeometryError, ImageError, MeshError, RenderError};
pub use geometry::{Vec2, Vec2f, Vec2i, Vec3, Vec3f, Vec3i};
pub use matrix::Matrix;
pub use scene::{render, RenderContext, RenderMode, RenderPass, RenderStats};
