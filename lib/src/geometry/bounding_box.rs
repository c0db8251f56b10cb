//! Axis-aligned bounding boxes in mm.

use super::{Point3F, PointF};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D axis-aligned bounding box with floating-point coordinates (in mm).
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxF {
    pub min: PointF,
    pub max: PointF,
    defined: bool,
}

impl BoundingBoxF {
    /// Create a new empty bounding box.
    #[inline]
    pub fn new() -> Self {
        Self {
            min: PointF::new(CoordF::MAX, CoordF::MAX),
            max: PointF::new(CoordF::MIN, CoordF::MIN),
            defined: false,
        }
    }

    #[inline]
    pub fn from_points_minmax(min: PointF, max: PointF) -> Self {
        Self {
            min,
            max,
            defined: true,
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = PointF>) -> Self {
        let mut bb = Self::new();
        for p in points {
            bb.merge_point(p);
        }
        bb
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn merge_point(&mut self, p: PointF) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    pub fn merge(&mut self, other: &BoundingBoxF) {
        if other.defined {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    #[inline]
    pub fn center(&self) -> PointF {
        PointF::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Squared distance from a point to the box, zero inside.
    #[inline]
    pub fn squared_exterior_distance(&self, p: &PointF) -> CoordF {
        if !self.defined {
            return CoordF::MAX;
        }
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        dx * dx + dy * dy
    }

    #[inline]
    pub fn contains_point(&self, p: &PointF) -> bool {
        self.defined
            && p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
    }
}

impl fmt::Debug for BoundingBoxF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defined {
            write!(f, "BoundingBoxF({:?} - {:?})", self.min, self.max)
        } else {
            write!(f, "BoundingBoxF(undefined)")
        }
    }
}

/// A 3D axis-aligned bounding box in mm.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3F {
    pub min: Point3F,
    pub max: Point3F,
    defined: bool,
}

impl BoundingBox3F {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn merge_point(&mut self, p: Point3F) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.min.z = self.min.z.min(p.z);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
            self.max.z = self.max.z.max(p.z);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    #[inline]
    pub fn to_2d(&self) -> BoundingBoxF {
        if self.defined {
            BoundingBoxF::from_points_minmax(self.min.to_2d(), self.max.to_2d())
        } else {
            BoundingBoxF::new()
        }
    }
}

impl fmt::Debug for BoundingBox3F {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defined {
            write!(f, "BoundingBox3F({:?} - {:?})", self.min, self.max)
        } else {
            write!(f, "BoundingBox3F(undefined)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_merge() {
        let bb = BoundingBoxF::from_points([PointF::new(1.0, 2.0), PointF::new(-1.0, 5.0)]);
        assert!(bb.is_defined());
        assert_eq!(bb.min, PointF::new(-1.0, 2.0));
        assert_eq!(bb.max, PointF::new(1.0, 5.0));
    }

    #[test]
    fn test_bbox_exterior_distance() {
        let bb = BoundingBoxF::from_points_minmax(PointF::new(0.0, 0.0), PointF::new(1.0, 1.0));
        assert_eq!(bb.squared_exterior_distance(&PointF::new(0.5, 0.5)), 0.0);
        assert!((bb.squared_exterior_distance(&PointF::new(4.0, 5.0)) - 25.0).abs() < 1e-12);
        assert_eq!(
            BoundingBoxF::new().squared_exterior_distance(&PointF::zero()),
            CoordF::MAX
        );
    }
}
