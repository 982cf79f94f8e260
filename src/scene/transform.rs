//! Object space to screen space: projection, viewport and the homogeneous
//! conversions around them.

use crate::error::GeometryError;
use crate::geometry::{Vec3f, Vec3i};
use crate::matrix::Matrix;

/// |w| below this is treated as a divide by zero.
const W_EPSILON: f32 = 1e-6;

/// Screen points may lie at most this many viewport extents from the origin.
const GUARD_BAND: f32 = 4.0;

/// Matrix mapping the cube [-1, 1]^3 onto the screen box at (x, y) of size
/// (w, h), with depth mapped onto [0, depth].
pub fn viewport(x: i32, y: i32, w: i32, h: i32, depth: i32) -> Matrix {
    let mut m = Matrix::identity(4);
    m[(0, 3)] = x as f32 + w as f32 / 2.0;
    m[(1, 3)] = y as f32 + h as f32 / 2.0;
    m[(2, 3)] = depth as f32 / 2.0;

    m[(0, 0)] = w as f32 / 2.0;
    m[(1, 1)] = h as f32 / 2.0;
    m[(2, 2)] = depth as f32 / 2.0;
    return m;
}

/// Single parameter perspective: camera on the z axis at `camera_distance`,
/// looking toward -z.
pub fn projection(camera_distance: f32) -> Result<Matrix, GeometryError> {
    if camera_distance == 0.0 || !camera_distance.is_finite() {
        return Err(GeometryError::InvalidCameraDistance(camera_distance));
    }
    let mut m = Matrix::identity(4);
    m[(3, 2)] = -1.0 / camera_distance;
    return Ok(m);
}

/// Transformation of a point to a 4x1 homogeneous matrix (w = 1).
pub fn to_homogeneous(v: Vec3f) -> Matrix {
    let mut m = Matrix::zeros(4, 1);
    m[(0, 0)] = v.x;
    m[(1, 0)] = v.y;
    m[(2, 0)] = v.z;
    m[(3, 0)] = 1.0;
    return m;
}

/// Transformation of a 4x1 homogeneous matrix back to a point, dividing by w.
pub fn from_homogeneous(m: &Matrix) -> Result<Vec3f, GeometryError> {
    if m.nrows() != 4 || m.ncols() != 1 {
        return Err(GeometryError::NotHomogeneous {
            rows: m.nrows(),
            cols: m.ncols(),
        });
    }
    let w = m[(3, 0)];
    if w.abs() < W_EPSILON || !w.is_finite() {
        return Err(GeometryError::ZeroW);
    }
    return Ok(Vec3f::new(m[(0, 0)] / w, m[(1, 0)] / w, m[(2, 0)] / w));
}

/// Screen rectangle plus depth resolution the canonical cube is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

impl Viewport {
    /// Centered rectangle covering 3/4 of a canvas, depth resolution 255.
    pub fn centered(canvas_width: u32, canvas_height: u32) -> Viewport {
        let w = canvas_width as i32;
        let h = canvas_height as i32;
        return Viewport {
            x: w / 8,
            y: h / 8,
            width: w * 3 / 4,
            height: h * 3 / 4,
            depth: 255,
        };
    }

    pub fn matrix(&self) -> Matrix {
        viewport(self.x, self.y, self.width, self.height, self.depth)
    }
}

/// Precomputed `viewport * projection`, plus the guard band screen points
/// have to fall into.
#[derive(Debug, Clone)]
pub struct Transform {
    matrix: Matrix,
    reach: f32,
}

impl Transform {
    pub fn new(viewport: &Viewport, camera_distance: f32) -> Result<Transform, GeometryError> {
        let matrix = viewport.matrix().multiply(&projection(camera_distance)?)?;
        let extent = (viewport.x.unsigned_abs() as f32 + viewport.width.unsigned_abs() as f32)
            .max(viewport.y.unsigned_abs() as f32 + viewport.height.unsigned_abs() as f32)
            .max(1.0);
        return Ok(Transform {
            matrix,
            reach: extent * GUARD_BAND,
        });
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Screen space position as floats.
    pub fn apply(&self, v: Vec3f) -> Result<Vec3f, GeometryError> {
        let screen = self.matrix.multiply(&to_homogeneous(v))?;
        return from_homogeneous(&screen);
    }

    /// Screen point truncated to integer pixel coordinates and depth.
    /// Points that land outside the guard band around the viewport fail,
    /// which happens for vertices close to the camera plane.
    pub fn to_screen(&self, v: Vec3f) -> Result<Vec3i, GeometryError> {
        let screen = self.apply(v)?;
        if !(screen.x.abs() <= self.reach && screen.y.abs() <= self.reach) {
            return Err(GeometryError::OutsideGuardBand {
                x: screen.x,
                y: screen.y,
            });
        }
        return screen.try_cast::<i32>();
    }
}
