//! Polygon type for closed contours.

use super::{BoundingBoxF, LineF, Point};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A closed polygon defined by a sequence of points.
///
/// The polygon is implicitly closed - the last point connects back to the first.
/// Points should be ordered counter-clockwise for outer contours (positive area)
/// and clockwise for holes (negative area).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Signed area in scaled units squared (positive for CCW).
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }
        let n = self.points.len();
        let mut twice: i128 = 0;
        for i in 0..n {
            let a = &self.points[i];
            let b = &self.points[(i + 1) % n];
            twice += a.cross(b);
        }
        twice as CoordF / 2.0
    }

    /// Absolute area in scaled units squared.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Orient the polygon counter-clockwise.
    pub fn make_counter_clockwise(&mut self) {
        if self.signed_area() < 0.0 {
            self.reverse();
        }
    }

    /// Orient the polygon clockwise.
    pub fn make_clockwise(&mut self) {
        if self.signed_area() > 0.0 {
            self.reverse();
        }
    }

    /// Bounding box in mm.
    pub fn bounding_box(&self) -> BoundingBoxF {
        BoundingBoxF::from_points(self.points.iter().map(|p| p.to_f64()))
    }

    /// Boundary segments in mm, closing segment included.
    pub fn lines(&self) -> Vec<LineF> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        (0..n)
            .map(|i| LineF::new(self.points[i].to_f64(), self.points[(i + 1) % n].to_f64()))
            .collect()
    }

    /// Ray casting point-in-polygon test.
    pub fn contains_point(&self, p: &Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;

        for i in 0..self.points.len() {
            let pi = &self.points[i];
            let pj = &self.points[j];

            if ((pi.y > p.y) != (pj.y > p.y))
                && (p.x as i128)
                    < (pj.x as i128 - pi.x as i128) * (p.y as i128 - pi.y as i128)
                        / (pj.y as i128 - pi.y as i128)
                        + pi.x as i128
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }

    /// Axis aligned rectangle, counter-clockwise.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Square centered at a point.
    pub fn square(center: Point, half_size: Coord) -> Self {
        Self::rectangle(
            Point::new(center.x - half_size, center.y - half_size),
            Point::new(center.x + half_size, center.y + half_size),
        )
    }

    /// Circle approximation with `segments` vertices, counter-clockwise.
    pub fn circle(center: Point, radius: Coord, segments: usize) -> Self {
        if segments < 3 {
            return Self::new();
        }
        let points = (0..segments)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * i as CoordF / segments as CoordF;
                Point::new(
                    center.x + (radius as CoordF * angle.cos()).round() as Coord,
                    center.y + (radius as CoordF * angle.sin()).round() as Coord,
                )
            })
            .collect();
        Self::from_points(points)
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

impl Deref for Polygon {
    type Target = [Point];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl DerefMut for Polygon {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.points
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::from_points(points)
    }
}

/// Type alias for a collection of polygons.
pub type Polygons = Vec<Polygon>;

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square() -> Polygon {
        Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(100, 0),
            Point::new(100, 100),
            Point::new(0, 100),
        ])
    }

    #[test]
    fn test_polygon_area() {
        let mut poly = make_square();
        assert!((poly.signed_area() - 10000.0).abs() < 1e-9);
        assert!(poly.is_counter_clockwise());
        poly.reverse();
        assert!((poly.signed_area() + 10000.0).abs() < 1e-9);
        poly.make_counter_clockwise();
        assert!(poly.is_counter_clockwise());
    }

    #[test]
    fn test_polygon_contains_point() {
        let poly = make_square();
        assert!(poly.contains_point(&Point::new(50, 50)));
        assert!(!poly.contains_point(&Point::new(150, 50)));
    }

    #[test]
    fn test_polygon_lines_closed() {
        let lines = make_square().lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3].b, lines[0].a);
    }

    #[test]
    fn test_circle_is_ccw() {
        let c = Polygon::circle(Point::zero(), 1_000_000, 32);
        assert_eq!(c.len(), 32);
        assert!(c.is_counter_clockwise());
        let expected = std::f64::consts::PI * 1e12;
        assert!((c.area() - expected).abs() / expected < 0.01);
    }
}
