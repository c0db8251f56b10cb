//! Line segment type in mm.

use super::{BoundingBoxF, PointF};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D line segment with floating-point coordinates (in mm).
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LineF {
    pub a: PointF,
    pub b: PointF,
}

impl LineF {
    #[inline]
    pub const fn new(a: PointF, b: PointF) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBoxF {
        BoundingBoxF::from_points([self.a, self.b])
    }

    #[inline]
    pub fn midpoint(&self) -> PointF {
        PointF::new((self.a.x + self.b.x) * 0.5, (self.a.y + self.b.y) * 0.5)
    }

    /// Closest point on the segment to `p`.
    pub fn closest_point(&self, p: &PointF) -> PointF {
        let d = self.b - self.a;
        let len2 = d.length_squared();
        if len2 <= 0.0 {
            return self.a;
        }
        let t = ((*p - self.a).dot(&d) / len2).clamp(0.0, 1.0);
        self.a + d * t
    }

    /// Squared distance from `p` to the segment, with the closest point.
    #[inline]
    pub fn squared_distance_to_point(&self, p: &PointF) -> (CoordF, PointF) {
        let c = self.closest_point(p);
        (c.distance_squared(p), c)
    }
}

impl fmt::Debug for LineF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineF({:?} -> {:?})", self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_point_interior() {
        let l = LineF::new(PointF::new(0.0, 0.0), PointF::new(10.0, 0.0));
        let (d2, c) = l.squared_distance_to_point(&PointF::new(3.0, 4.0));
        assert!((d2 - 16.0).abs() < 1e-12);
        assert!((c.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_closest_point_endpoint() {
        let l = LineF::new(PointF::new(0.0, 0.0), PointF::new(10.0, 0.0));
        let c = l.closest_point(&PointF::new(-5.0, 1.0));
        assert_eq!(c, PointF::new(0.0, 0.0));
    }

    #[test]
    fn test_degenerate_segment() {
        let p = PointF::new(1.0, 1.0);
        let l = LineF::new(p, p);
        let (d2, c) = l.squared_distance_to_point(&PointF::new(4.0, 5.0));
        assert_eq!(c, p);
        assert!((d2 - 25.0).abs() < 1e-12);
    }
}
