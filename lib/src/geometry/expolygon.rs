//! ExPolygon type for polygons with holes.

use super::{BoundingBoxF, LineF, Point, Polygon};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A polygon with holes (exterior polygon + interior hole polygons).
///
/// The contour is the outer boundary (should be counter-clockwise for positive area).
/// The holes are interior boundaries (should be clockwise).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    pub contour: Polygon,
    pub holes: Vec<Polygon>,
}

impl ExPolygon {
    #[inline]
    pub fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    #[inline]
    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    /// Contour area minus hole areas, in scaled units squared.
    pub fn area(&self) -> CoordF {
        let holes: CoordF = self.holes.iter().map(|h| h.area()).sum();
        self.contour.area() - holes
    }

    pub fn bounding_box(&self) -> BoundingBoxF {
        self.contour.bounding_box()
    }

    /// Inside the contour and outside every hole.
    pub fn contains_point(&self, p: &Point) -> bool {
        self.contour.contains_point(p) && !self.holes.iter().any(|h| h.contains_point(p))
    }

    /// All boundary segments (contour and holes) in mm.
    pub fn lines(&self) -> Vec<LineF> {
        let mut lines = self.contour.lines();
        for hole in &self.holes {
            lines.extend(hole.lines());
        }
        lines
    }

    /// Contour first, then holes.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::with_capacity(1 + self.holes.len());
        out.push(self.contour.clone());
        out.extend(self.holes.iter().cloned());
        out
    }

    pub fn translate(&mut self, v: Point) {
        self.contour.translate(v);
        for hole in &mut self.holes {
            hole.translate(v);
        }
    }

    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::new(Polygon::rectangle(min, max))
    }

    pub fn square(center: Point, half_size: Coord) -> Self {
        Self::new(Polygon::square(center, half_size))
    }

    pub fn circle(center: Point, radius: Coord, segments: usize) -> Self {
        Self::new(Polygon::circle(center, radius, segments))
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon(contour: {} points, holes: {})",
            self.contour.len(),
            self.holes.len()
        )
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        Self::new(contour)
    }
}

/// Type alias for a collection of ExPolygons.
pub type ExPolygons = Vec<ExPolygon>;

/// Flatten to contours and holes.
pub fn to_polygons(expolygons: &[ExPolygon]) -> Vec<Polygon> {
    expolygons.iter().flat_map(|e| e.to_polygons()).collect()
}

/// All boundary segments in mm.
pub fn to_lines(expolygons: &[ExPolygon]) -> Vec<LineF> {
    expolygons.iter().flat_map(|e| e.lines()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_hole() -> ExPolygon {
        let mut hole = Polygon::rectangle(Point::new(25, 25), Point::new(75, 75));
        hole.make_clockwise();
        ExPolygon::with_holes(Polygon::rectangle(Point::new(0, 0), Point::new(100, 100)), vec![hole])
    }

    #[test]
    fn test_expolygon_area_with_hole() {
        let ex = square_with_hole();
        assert!((ex.area() - 7500.0).abs() < 1e-9);
    }

    #[test]
    fn test_expolygon_contains_point() {
        let ex = square_with_hole();
        assert!(ex.contains_point(&Point::new(10, 10)));
        assert!(!ex.contains_point(&Point::new(50, 50)));
        assert!(!ex.contains_point(&Point::new(150, 50)));
    }

    #[test]
    fn test_expolygon_lines() {
        let ex = square_with_hole();
        assert_eq!(ex.lines().len(), 8);
        assert_eq!(to_lines(&[ex.clone(), ex]).len(), 16);
    }
}
