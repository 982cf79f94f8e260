//! Dense row-major matrix of f32.
//!
//! Only ever used as 4x4 (transforms) or 4x1 (homogeneous points) by the
//! pipeline, but the shape is explicit so dimension mistakes are reported
//! instead of silently producing garbage.

use std::fmt;
use std::ops::{Index, IndexMut};

use nalgebra as na;

use crate::error::GeometryError;

/// Pivots smaller than this are treated as zero during inversion.
const SINGULAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>, // Storing flat array, row after row.
}

impl Matrix {
    /// All zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        return Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        };
    }

    pub fn identity(dimensions: usize) -> Self {
        let mut m = Self::zeros(dimensions, dimensions);
        for i in 0..dimensions {
            m[(i, i)] = 1.0;
        }
        return m;
    }

    /// Builds a matrix from row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, GeometryError> {
        if data.len() != rows * cols {
            return Err(GeometryError::InvalidShape {
                rows,
                cols,
                len: data.len(),
            });
        }
        return Ok(Self { rows, cols, data });
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }

    /// `self * rhs`. The row count of `rhs` must equal the column count of `self`.
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix, GeometryError> {
        if self.cols != rhs.rows {
            return Err(GeometryError::DimensionMismatch {
                left: (self.rows, self.cols),
                right: (rhs.rows, rhs.cols),
            });
        }
        let mut result = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for j in 0..rhs.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self[(i, k)] * rhs[(k, j)];
                }
                result[(i, j)] = sum;
            }
        }
        return Ok(result);
    }

    pub fn transpose(&self) -> Matrix {
        let mut result = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                result[(j, i)] = self[(i, j)];
            }
        }
        return result;
    }

    /// Inverse via Gauss-Jordan elimination on the augmented matrix `[self | I]`,
    /// with partial pivoting.
    pub fn inverse(&self) -> Result<Matrix, GeometryError> {
        if self.rows != self.cols {
            return Err(GeometryError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let width = 2 * n;
        let mut augmented = Matrix::zeros(n, width);
        for i in 0..n {
            for j in 0..n {
                augmented[(i, j)] = self[(i, j)];
            }
            augmented[(i, n + i)] = 1.0;
        }

        for col in 0..n {
            // Largest remaining entry in this column becomes the pivot.
            let mut pivot_row = col;
            for row in col + 1..n {
                if augmented[(row, col)].abs() > augmented[(pivot_row, col)].abs() {
                    pivot_row = row;
                }
            }
            if augmented[(pivot_row, col)].abs() < SINGULAR_EPSILON {
                return Err(GeometryError::Singular);
            }
            augmented.swap_rows(col, pivot_row);

            let pivot = augmented[(col, col)];
            for j in 0..width {
                augmented[(col, j)] /= pivot;
            }
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = augmented[(row, col)];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..width {
                    let delta = factor * augmented[(col, j)];
                    augmented[(row, j)] -= delta;
                }
            }
        }

        let mut result = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                result[(i, j)] = augmented[(i, n + j)];
            }
        }
        return Ok(result);
    }

    /// Element-wise comparison within `tolerance`. Shapes must match.
    pub fn approx_eq(&self, other: &Matrix, tolerance: f32) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        assert!(row < self.rows && col < self.cols, "matrix index ({}, {}) out of range", row, col);
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        assert!(row < self.rows && col < self.cols, "matrix index ({}, {}) out of range", row, col);
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{}", self[(i, j)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl From<na::Matrix4<f32>> for Matrix {
    fn from(m: na::Matrix4<f32>) -> Self {
        let mut result = Matrix::zeros(4, 4);
        for i in 0..4 {
            for j in 0..4 {
                result[(i, j)] = m[(i, j)];
            }
        }
        return result;
    }
}

impl TryFrom<&Matrix> for na::Matrix4<f32> {
    type Error = GeometryError;

    fn try_from(m: &Matrix) -> Result<Self, GeometryError> {
        if m.rows != 4 || m.cols != 4 {
            return Err(GeometryError::InvalidShape {
                rows: 4,
                cols: 4,
                len: m.data.len(),
            });
        }
        return Ok(na::Matrix4::from_row_slice(&m.data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::from_vec(
            4,
            4,
            vec![
                2.0, 0.0, 1.0, 3.0, //
                1.0, 4.0, 0.0, 0.0, //
                0.0, 1.0, 5.0, 2.0, //
                0.0, 0.0, 1.0, 1.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn identity_is_neutral_on_both_sides() {
        let m = sample();
        assert_eq!(Matrix::identity(4).multiply(&m).unwrap(), m);
        assert_eq!(m.multiply(&Matrix::identity(4)).unwrap(), m);

        let column = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 1.0]).unwrap();
        assert_eq!(Matrix::identity(4).multiply(&column).unwrap(), column);
    }

    #[test]
    fn multiply_rejects_mismatched_shapes() {
        let column = Matrix::zeros(4, 1);
        let err = column.multiply(&sample()).unwrap_err();
        assert_eq!(
            err,
            GeometryError::DimensionMismatch {
                left: (4, 1),
                right: (4, 4)
            }
        );
    }

    #[test]
    fn transpose_swaps_shape_and_entries() {
        let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let t = m.transpose();
        assert_eq!((t.nrows(), t.ncols()), (3, 2));
        assert_eq!(t[(2, 1)], 6.0);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let m = sample();
        let inv = m.inverse().unwrap();
        assert!(inv.multiply(&m).unwrap().approx_eq(&Matrix::identity(4), 1e-5));
        assert!(m.multiply(&inv).unwrap().approx_eq(&Matrix::identity(4), 1e-5));
    }

    #[test]
    fn inverse_agrees_with_nalgebra() {
        let m = sample();
        let reference = na::Matrix4::try_from(&m).unwrap().try_inverse().unwrap();
        assert!(m.inverse().unwrap().approx_eq(&Matrix::from(reference), 1e-5));
    }

    #[test]
    fn inverse_needs_row_swaps_when_leading_entry_is_zero() {
        let m = Matrix::from_vec(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(m.inverse().unwrap(), m);
    }

    #[test]
    fn singular_and_non_square_inverses_fail() {
        let singular = Matrix::from_vec(2, 2, vec![1.0, 2.0, 2.0, 4.0]).unwrap();
        assert_eq!(singular.inverse().unwrap_err(), GeometryError::Singular);
        assert_eq!(
            Matrix::zeros(4, 1).inverse().unwrap_err(),
            GeometryError::NotSquare { rows: 4, cols: 1 }
        );
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Matrix::from_vec(2, 2, vec![1.0; 3]).is_err());
        assert_eq!(Matrix::zeros(2, 2).get(2, 0), None);
    }
}
