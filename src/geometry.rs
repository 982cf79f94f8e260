//! Small fixed-size vectors used by the rasterizer.
//!
//! `Vec2<T>` and `Vec3<T>` are generic over a [`Scalar`]; the pipeline uses
//! `i32` for pixel coordinates, `i128` for exact edge tests and `f32` for
//! everything that gets interpolated. Conversions between instantiations are
//! always explicit and checked, see [`Vec3::try_cast`].

use std::fmt;
use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

use nalgebra as na;

use crate::error::GeometryError;

/// Numeric type a vector can hold.
pub trait Scalar:
    Copy
    + Default
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;

    fn to_f64(self) -> f64;

    /// Checked conversion from f64. Integers truncate toward zero.
    fn try_from_f64(value: f64) -> Option<Self>;
}

/// Scalars with a square root, needed for normalization.
pub trait Float: Scalar + std::ops::Div<Output = Self> {
    fn sqrt(self) -> Self;
    fn is_normal(self) -> bool;
}

macro_rules! impl_int_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn try_from_f64(value: f64) -> Option<Self> {
                let truncated = value.trunc();
                if !truncated.is_finite() || truncated < <$t>::MIN as f64 || truncated > <$t>::MAX as f64 {
                    return None;
                }
                Some(truncated as $t)
            }
        }
    };
}

macro_rules! impl_float_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn try_from_f64(value: f64) -> Option<Self> {
                let converted = value as $t;
                if !converted.is_finite() {
                    return None;
                }
                Some(converted)
            }
        }

        impl Float for $t {
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            fn is_normal(self) -> bool {
                <$t>::is_normal(self)
            }
        }
    };
}

impl_int_scalar!(i32);
impl_int_scalar!(i64);
impl_int_scalar!(i128);
impl_float_scalar!(f32);
impl_float_scalar!(f64);

/// Two component vector. `x`/`y` double as `u`/`v` for texture coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vec2<T> {
    pub x: T,
    pub y: T,
}

/// Three component vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

pub type Vec2i = Vec2<i32>;
pub type Vec2f = Vec2<f32>;
pub type Vec3i = Vec3<i32>;
pub type Vec3f = Vec3<f32>;

fn cast<T: Scalar, U: Scalar>(value: T) -> Result<U, GeometryError> {
    let wide = value.to_f64();
    return U::try_from_f64(wide).ok_or(GeometryError::NotRepresentable(wide));
}

impl<T: Scalar> Vec2<T> {
    pub fn new(x: T, y: T) -> Self {
        return Self { x, y };
    }

    pub fn u(&self) -> T {
        self.x
    }

    pub fn v(&self) -> T {
        self.y
    }

    /// Dot product of 2 Vec2's.
    pub fn dot(self, other: Self) -> T {
        return self.x * other.x + self.y * other.y;
    }

    /// 2D pseudo cross product: signed area of the parallelogram spanned by
    /// `self` and `other`. Positive when `other` turns counter-clockwise.
    pub fn cross(self, other: Self) -> T {
        return self.x * other.y - self.y * other.x;
    }

    pub fn norm(self) -> f64 {
        self.dot(self).to_f64().sqrt()
    }

    pub fn scale(self, factor: T) -> Self {
        return Self::new(self.x * factor, self.y * factor);
    }

    /// Converts to another scalar type, failing on values the target can't hold.
    pub fn try_cast<U: Scalar>(self) -> Result<Vec2<U>, GeometryError> {
        return Ok(Vec2::new(cast(self.x)?, cast(self.y)?));
    }
}

impl<T: Scalar> Vec3<T> {
    pub fn new(x: T, y: T, z: T) -> Self {
        return Self { x, y, z };
    }

    /// Dot product of 2 Vec3's.
    pub fn dot(self, other: Self) -> T {
        return self.x * other.x + self.y * other.y + self.z * other.z;
    }

    /// Cross product of 2 Vec3's.
    pub fn cross(self, other: Self) -> Self {
        return Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        };
    }

    /// Euclidean norm, computed in f64 regardless of `T`.
    pub fn norm(self) -> f64 {
        self.dot(self).to_f64().sqrt()
    }

    pub fn scale(self, factor: T) -> Self {
        return Self::new(self.x * factor, self.y * factor, self.z * factor);
    }

    pub fn xy(self) -> Vec2<T> {
        Vec2::new(self.x, self.y)
    }

    /// Converts to another scalar type, failing on values the target can't hold.
    /// Float to integer conversion truncates toward zero.
    pub fn try_cast<U: Scalar>(self) -> Result<Vec3<U>, GeometryError> {
        return Ok(Vec3::new(cast(self.x)?, cast(self.y)?, cast(self.z)?));
    }
}

impl<T: Float> Vec3<T> {
    /// Scales the vector in place to the requested length.
    /// Fails without touching the vector when its norm is zero or subnormal.
    pub fn normalize(&mut self, length: T) -> Result<&mut Self, GeometryError> {
        let norm = self.dot(*self).sqrt();
        if !norm.is_normal() {
            return Err(GeometryError::ZeroLength);
        }
        *self = self.scale(length / norm);
        return Ok(self);
    }

    /// Unit length copy of the vector.
    pub fn normalized(self) -> Result<Self, GeometryError> {
        let mut v = self;
        v.normalize(T::ONE)?;
        return Ok(v);
    }
}

impl<T: Float> Vec2<T> {
    /// Scales the vector in place to the requested length.
    pub fn normalize(&mut self, length: T) -> Result<&mut Self, GeometryError> {
        let norm = self.dot(*self).sqrt();
        if !norm.is_normal() {
            return Err(GeometryError::ZeroLength);
        }
        *self = self.scale(length / norm);
        return Ok(self);
    }
}

impl<T: Scalar> Add for Vec2<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T: Scalar> Sub for Vec2<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<T: Scalar> Mul<T> for Vec2<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        self.scale(rhs)
    }
}

impl<T: Scalar> Add for Vec3<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl<T: Scalar> Sub for Vec3<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl<T: Scalar> Mul<T> for Vec3<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        self.scale(rhs)
    }
}

impl<T: Scalar> Neg for Vec3<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl<T> Index<usize> for Vec2<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => panic!("Vec2 index {} out of range", i),
        }
    }
}

impl<T> IndexMut<usize> for Vec2<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => panic!("Vec2 index {} out of range", i),
        }
    }
}

impl<T> Index<usize> for Vec3<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index {} out of range", i),
        }
    }
}

impl<T> IndexMut<usize> for Vec3<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 index {} out of range", i),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Vec2<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl<T: fmt::Display> fmt::Display for Vec3<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// nalgebra interop.

impl From<Vec3f> for na::Vector3<f32> {
    fn from(v: Vec3f) -> Self {
        na::vector![v.x, v.y, v.z]
    }
}

impl From<na::Vector3<f32>> for Vec3f {
    fn from(v: na::Vector3<f32>) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec2f> for na::Vector2<f32> {
    fn from(v: Vec2f) -> Self {
        na::vector![v.x, v.y]
    }
}

impl From<na::Vector2<f32>> for Vec2f {
    fn from(v: na::Vector2<f32>) -> Self {
        Vec2::new(v.x, v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_is_perpendicular_with_parallelogram_magnitude() {
        let a = Vec3f::new(2.0, 0.0, 0.0);
        let b = Vec3f::new(1.0, 3.0, 0.0);
        let c = a.cross(b);
        assert_eq!(c, Vec3f::new(0.0, 0.0, 6.0));
        assert_eq!(c.dot(a), 0.0);
        assert_eq!(c.dot(b), 0.0);
    }

    #[test]
    fn pseudo_cross_sign_gives_turn_direction() {
        let right = Vec2i::new(1, 0);
        assert!(right.cross(Vec2i::new(0, 1)) > 0);
        assert!(right.cross(Vec2i::new(0, -1)) < 0);
        assert_eq!(right.cross(Vec2i::new(5, 0)), 0);
    }

    #[test]
    fn dot_goes_negative_for_opposing_vectors() {
        let n = Vec3f::new(0.0, 0.0, 1.0);
        assert_eq!(n.dot(Vec3f::new(0.0, 0.0, -1.0)), -1.0);
    }

    #[test]
    fn normalize_scales_to_requested_length() {
        let mut v = Vec3f::new(3.0, 0.0, 4.0);
        v.normalize(10.0).unwrap();
        assert!((v.x - 6.0).abs() < 1e-6);
        assert!((v.z - 8.0).abs() < 1e-6);
        assert!((v.norm() - 10.0).abs() < 1e-5);
    }

    #[test]
    fn normalize_zero_vector_fails_and_leaves_it_alone() {
        let mut v = Vec3f::default();
        assert_eq!(v.normalize(1.0).unwrap_err(), GeometryError::ZeroLength);
        assert_eq!(v, Vec3f::default());

        let mut tiny = Vec3f::new(f32::MIN_POSITIVE / 4.0, 0.0, 0.0);
        assert!(tiny.normalize(1.0).is_err());
    }

    #[test]
    fn indexing_matches_named_fields() {
        let mut v = Vec3i::new(1, 2, 3);
        assert_eq!((v[0], v[1], v[2]), (1, 2, 3));
        v[2] = 9;
        assert_eq!(v.z, 9);
        let uv = Vec2f::new(0.25, 0.75);
        assert_eq!((uv.u(), uv.v()), (uv[0], uv[1]));
    }

    #[test]
    #[should_panic]
    fn indexing_past_the_end_panics() {
        let v = Vec2i::new(1, 2);
        let _ = v[2];
    }

    #[test]
    fn float_to_int_cast_truncates_and_checks_range() {
        let v = Vec3f::new(1.9, -1.9, 0.0);
        assert_eq!(v.try_cast::<i32>().unwrap(), Vec3i::new(1, -1, 0));
        assert!(Vec3f::new(f32::NAN, 0.0, 0.0).try_cast::<i32>().is_err());
        assert!(Vec3f::new(1e20, 0.0, 0.0).try_cast::<i32>().is_err());
        assert_eq!(
            Vec3i::new(4, 5, 6).try_cast::<f32>().unwrap(),
            Vec3f::new(4.0, 5.0, 6.0)
        );
    }

    #[test]
    fn nalgebra_round_trip_keeps_components() {
        let v = Vec3f::new(1.0, -2.0, 0.5);
        let n: na::Vector3<f32> = v.into();
        assert_eq!(n.cross(&na::Vector3::x()), na::Vector3::from(v.cross(Vec3f::new(1.0, 0.0, 0.0))));
        assert_eq!(Vec3f::from(n), v);
    }
}
