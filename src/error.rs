//! Error types shared by the rasterizer.

use thiserror::Error;

/// Failures of the vector/matrix math and the transform pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("cannot normalize a vector of zero (or subnormal) length")]
    ZeroLength,
    #[error("cannot multiply a {left:?} matrix by a {right:?} matrix")]
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("matrix is {rows}x{cols}, expected a square matrix")]
    NotSquare { rows: usize, cols: usize },
    #[error("matrix is singular")]
    Singular,
    #[error("matrix is {rows}x{cols}, expected a 4x1 homogeneous point")]
    NotHomogeneous { rows: usize, cols: usize },
    #[error("homogeneous w component is zero")]
    ZeroW,
    #[error("value {0} is not representable in the target numeric type")]
    NotRepresentable(f64),
    #[error("camera distance must be finite and non-zero, got {0}")]
    InvalidCameraDistance(f32),
    #[error("screen point ({x}, {y}) lies too far outside the viewport")]
    OutsideGuardBand { x: f32, y: f32 },
    #[error("matrix data of length {len} does not fit a {rows}x{cols} shape")]
    InvalidShape { rows: usize, cols: usize, len: usize },
}

/// Failures of the in-memory pixel buffer and its codec glue.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("cannot allocate a {width}x{height} image")]
    Allocation { width: u32, height: u32 },
    #[error("pixel data of length {len} does not match a {width}x{height} image with {bytespp} bytes per pixel")]
    DataLength {
        width: u32,
        height: u32,
        bytespp: usize,
        len: usize,
    },
    #[error(transparent)]
    Codec(#[from] image::ImageError),
}

/// Failures while building a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] obj::ObjError),
    #[error("face {face} references {kind} index {index}, but only {count} exist")]
    IndexOutOfRange {
        face: usize,
        kind: &'static str,
        index: usize,
        count: usize,
    },
    #[error("face {face} has {len} vertices, at least 3 are required")]
    FaceTooSmall { face: usize, len: usize },
}

/// Failures that abort a whole render pass.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} depth buffer")]
    Allocation { width: u32, height: u32 },
    #[error("textured fill needs texture coordinates")]
    MissingUv,
    #[error("face {face} has no texture coordinates")]
    FaceWithoutUv { face: usize },
    #[error("textured rendering requested without a texture")]
    MissingTexture,
    #[error("face {face} references data the mesh does not have")]
    MeshIndex { face: usize },
    #[error("{count} render worker(s) panicked")]
    WorkerPanicked { count: usize },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Failures while loading or validating a render configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
    #[error("canvas dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("viewport {0:?} has a non-positive size")]
    InvalidViewport([i32; 4]),
    #[error("depth range must be positive, got {0}")]
    InvalidDepthRange(i32),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
