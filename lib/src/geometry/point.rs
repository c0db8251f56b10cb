//! Point types for 2D and 3D geometry.
//!
//! Layer geometry lives in scaled integer coordinates ([`Point`]); the
//! relaxation solver and the tube mesher work in millimetres ([`PointF`],
//! [`Point3F`]).

use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2D point with scaled integer coordinates.
///
/// # Example
/// ```
/// use organic_support::geometry::Point;
/// use organic_support::scale;
///
/// let p = Point::new(scale(1.0), scale(2.0));
/// assert_eq!(p, Point::new_scale(1.0, 2.0));
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a point from coordinates in mm.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self {
            x: scale(x),
            y: scale(y),
        }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Convert to floating-point coordinates (in mm).
    #[inline]
    pub fn to_f64(&self) -> PointF {
        PointF {
            x: unscale(self.x),
            y: unscale(self.y),
        }
    }

    /// Squared distance in scaled units. i128 avoids overflow.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        let dx = (other.x - self.x) as i128;
        let dy = (other.y - self.y) as i128;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        (self.distance_squared(other) as CoordF).sqrt()
    }

    /// 2D pseudo-cross product.
    #[inline]
    pub fn cross(&self, other: &Point) -> i128 {
        (self.x as i128) * (other.y as i128) - (self.y as i128) * (other.x as i128)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", unscale(self.x), unscale(self.y))
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl From<PointF> for Point {
    #[inline]
    fn from(p: PointF) -> Self {
        Self::new_scale(p.x, p.y)
    }
}

/// A 2D point with floating-point coordinates (in mm).
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: CoordF,
    pub y: CoordF,
}

impl PointF {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Convert to scaled integer coordinates, rounding to the nearest unit.
    #[inline]
    pub fn to_scaled(&self) -> Point {
        Point::from(*self)
    }

    #[inline]
    pub fn distance_squared(&self, other: &PointF) -> CoordF {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: &PointF) -> CoordF {
        self.distance_squared(other).sqrt()
    }

    #[inline]
    pub fn length_squared(&self) -> CoordF {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. A zero vector stays zero.
    #[inline]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            *self
        }
    }

    #[inline]
    pub fn dot(&self, other: &PointF) -> CoordF {
        self.x * other.x + self.y * other.y
    }
}

impl fmt::Debug for PointF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointF({:.6}, {:.6})", self.x, self.y)
    }
}

impl Add for PointF {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for PointF {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for PointF {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<CoordF> for PointF {
    type Output = Self;

    #[inline]
    fn mul(self, s: CoordF) -> Self {
        Self::new(self.x * s, self.y * s)
    }
}

impl From<Point> for PointF {
    #[inline]
    fn from(p: Point) -> Self {
        p.to_f64()
    }
}

/// A 3D point with floating-point coordinates (in mm).
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3F {
    pub x: CoordF,
    pub y: CoordF,
    pub z: CoordF,
}

impl Point3F {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    /// Lift a 2D point to the given height.
    #[inline]
    pub const fn from_2d(p: PointF, z: CoordF) -> Self {
        Self { x: p.x, y: p.y, z }
    }

    /// Project to the XY plane.
    #[inline]
    pub const fn to_2d(&self) -> PointF {
        PointF {
            x: self.x,
            y: self.y,
        }
    }

    #[inline]
    pub fn distance_squared(&self, other: &Point3F) -> CoordF {
        (*other - *self).length_squared()
    }

    #[inline]
    pub fn length_squared(&self) -> CoordF {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. A zero vector stays zero.
    #[inline]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            *self * (1.0 / len)
        } else {
            *self
        }
    }

    #[inline]
    pub fn dot(&self, other: &Point3F) -> CoordF {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Point3F) -> Point3F {
        Point3F {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
}

impl fmt::Debug for Point3F {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point3F({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

impl Add for Point3F {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Point3F {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Neg for Point3F {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<CoordF> for Point3F {
    type Output = Self;

    #[inline]
    fn mul(self, s: CoordF) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_scale_roundtrip() {
        let p = Point::new_scale(1.5, -2.25);
        assert_eq!(p.x, 1_500_000);
        assert_eq!(p.y, -2_250_000);
        let f = p.to_f64();
        assert!((f.x - 1.5).abs() < 1e-9);
        assert!((f.y + 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_pointf_normalize_zero() {
        let z = PointF::zero().normalize();
        assert_eq!(z, PointF::zero());
        let n = PointF::new(3.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_point3f_cross() {
        let x = Point3F::new(1.0, 0.0, 0.0);
        let y = Point3F::new(0.0, 1.0, 0.0);
        let z = x.cross(&y);
        assert!((z.z - 1.0).abs() < 1e-12);
        assert!(z.x.abs() < 1e-12 && z.y.abs() < 1e-12);
    }

    #[test]
    fn test_point3f_from_2d() {
        let p = Point3F::from_2d(PointF::new(1.0, 2.0), 0.6);
        assert_eq!(p.to_2d(), PointF::new(1.0, 2.0));
        assert!((p.z - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_point3f_zero() {
        assert_eq!(Point3F::zero(), Point3F::new(0.0, 0.0, 0.0));
    }
}
