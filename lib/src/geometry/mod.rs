//! Geometry primitives.
//!
//! Scaled integer points and polygons for layer outlines, plus millimetre
//! vectors, segments and bounding boxes for the solver and the mesher.

mod aabb_tree;
mod bounding_box;
mod expolygon;
mod line;
mod point;
mod polygon;

pub use aabb_tree::{AABBNode, AABBTreeLines, ClosestLineResult, LinesDistancer};
pub use bounding_box::{BoundingBox3F, BoundingBoxF};
pub use expolygon::{to_lines, to_polygons, ExPolygon, ExPolygons};
pub use line::LineF;
pub use point::{Point, Point3F, PointF};
pub use polygon::{Polygon, Polygons};
