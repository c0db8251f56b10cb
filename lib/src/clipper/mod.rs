//! Clipper polygon boolean operations module.
//!
//! Union, intersection, difference and offsets on [`ExPolygons`] using the
//! geo-clipper library. Offsets and tolerances are given in mm.

use crate::geometry::{ExPolygon, ExPolygons, Point, PointF, Polygon};
use crate::{scale, unscale, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon, Simplify};
use geo_clipper::{Clipper, EndType, JoinType};

/// Integer precision passed to clipper (1 unit = 1 micron).
const CLIPPER_FACTOR: f64 = 1000.0;

/// Arc tolerance for round joins, in mm.
const ROUND_ARC_TOLERANCE: f64 = 0.005;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    Square,
    #[default]
    Round,
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(ROUND_ARC_TOLERANCE),
            OffsetJoinType::Miter => JoinType::Miter(2.0),
        }
    }
}

fn ring_to_geo(poly: &Polygon) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(*first);
        }
    }
    LineString::new(ring)
}

fn geo_to_ring(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();
    // Our Polygon doesn't store the closing point
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Polygon::from_points(points)
}

fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    GeoPolygon::new(
        ring_to_geo(&expoly.contour),
        expoly.holes.iter().map(ring_to_geo).collect(),
    )
}

fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>) -> ExPolygon {
    ExPolygon::with_holes(
        geo_to_ring(geo_poly.exterior()),
        geo_poly.interiors().iter().map(geo_to_ring).collect(),
    )
}

fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi
        .0
        .iter()
        .map(geo_to_expolygon)
        .filter(|e| e.contour.len() >= 3)
        .collect()
}

fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

// ============================================================================
// Boolean Operations
// ============================================================================

/// Union of two sets of polygons. Each set must be free of self-overlaps.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return clip.to_vec();
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.union(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Union of a set of potentially overlapping polygons.
///
/// Merges pairs level by level so each boolean sees inputs of similar size.
pub fn union_ex(polygons: &[ExPolygon]) -> ExPolygons {
    if polygons.len() <= 1 {
        return polygons.to_vec();
    }

    let mut level: Vec<ExPolygons> = polygons.iter().map(|p| vec![p.clone()]).collect();
    while level.len() > 1 {
        let mut next_level = Vec::with_capacity(level.len().div_ceil(2));
        let mut pairs = level.into_iter();
        while let Some(a) = pairs.next() {
            match pairs.next() {
                Some(b) => next_level.push(union(&a, &b)),
                // Odd one out - pass through
                None => next_level.push(a),
            }
        }
        level = next_level;
    }
    level.into_iter().next().unwrap_or_default()
}

/// Intersection of two sets of polygons.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.intersection(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Difference of two sets of polygons (subject - clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.difference(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset ExPolygons by `delta` mm (positive grows, negative shrinks).
pub fn offset_expolygons(
    expolygons: &[ExPolygon],
    delta: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }
    if delta == 0.0 {
        return expolygons.to_vec();
    }

    let geo_multi = expolygons_to_geo_multi(expolygons);
    let result = geo_multi.offset(delta, join_type.into(), EndType::ClosedPolygon, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Shrink (inset) ExPolygons by `distance` mm.
pub fn shrink(expolygons: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolygons, -distance.abs(), join_type)
}

/// Grow (outset) ExPolygons by `distance` mm.
pub fn grow(expolygons: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolygons, distance.abs(), join_type)
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Remove vertices closer than `tolerance` mm to the simplified outline.
///
/// Rings that collapse below three vertices are dropped.
pub fn simplify(expolygons: &[ExPolygon], tolerance: CoordF) -> ExPolygons {
    if tolerance <= 0.0 {
        return expolygons.to_vec();
    }
    expolygons
        .iter()
        .map(|expoly| {
            geo_to_expolygon(&Simplify::simplify(&expolygon_to_geo(expoly), &tolerance))
        })
        .filter_map(|mut expoly| {
            if expoly.contour.len() < 3 {
                return None;
            }
            expoly.holes.retain(|h| h.len() >= 3);
            Some(expoly)
        })
        .collect()
}

/// Cut across sharp concave notches.
///
/// Reflex corners opening narrower than a right angle are replaced by a
/// shortcut placed up to `clip_length` mm down each leg. The outline only
/// ever grows and separate polygons are never merged.
pub fn smooth_outward(expolygons: &[ExPolygon], clip_length: CoordF) -> ExPolygons {
    if clip_length <= 0.0 {
        return expolygons.to_vec();
    }
    expolygons
        .iter()
        .map(|expoly| {
            let mut contour = expoly.contour.clone();
            contour.make_counter_clockwise();
            let holes = expoly
                .holes
                .iter()
                .map(|hole| {
                    let mut hole = hole.clone();
                    hole.make_clockwise();
                    smooth_ring_outward(&hole, clip_length)
                })
                .collect();
            ExPolygon::with_holes(smooth_ring_outward(&contour, clip_length), holes)
        })
        .collect()
}

/// `ring` must keep the filled region on its left.
fn smooth_ring_outward(ring: &Polygon, clip_length: CoordF) -> Polygon {
    let points = ring.points();
    let n = points.len();
    if n < 3 {
        return ring.clone();
    }
    let mut out = Vec::with_capacity(n + n / 4);
    for i in 0..n {
        let prev = PointF::from(points[(i + n - 1) % n]);
        let v = PointF::from(points[i]);
        let next = PointF::from(points[(i + 1) % n]);
        let (incoming, outgoing) = (v - prev, next - v);
        let reflex = incoming.x * outgoing.y - incoming.y * outgoing.x < 0.0;
        let (to_prev, to_next) = ((prev - v).normalize(), (next - v).normalize());
        if reflex && to_prev.dot(&to_next) > 0.0 {
            let d_prev = clip_length.min(0.5 * incoming.length());
            let d_next = clip_length.min(0.5 * outgoing.length());
            out.push((v + to_prev * d_prev).to_scaled());
            out.push((v + to_next * d_next).to_scaled());
        } else {
            out.push(points[i]);
        }
    }
    Polygon::from_points(out)
}

/// Total area of a set of polygons, in scaled units squared.
pub fn total_area(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(|p| p.area()).sum()
}

/// Area in mm².
#[inline]
pub fn total_area_mm2(expolygons: &[ExPolygon]) -> CoordF {
    total_area(expolygons) / (crate::SCALING_FACTOR * crate::SCALING_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square_mm(x: f64, y: f64, size: f64) -> ExPolygon {
        ExPolygon::rectangle(Point::new_scale(x, y), Point::new_scale(x + size, y + size))
    }

    #[test]
    fn test_union() {
        let square1 = make_square_mm(0.0, 0.0, 10.0);
        let square2 = make_square_mm(5.0, 0.0, 10.0);

        let result = union(&[square1], &[square2]);
        assert_eq!(result.len(), 1);
        assert!((total_area_mm2(&result) - 150.0).abs() < 0.01);
    }

    #[test]
    fn test_union_ex_overlapping_set() {
        // Five squares along a line, each overlapping the next by half
        let squares: Vec<ExPolygon> = (0..5)
            .map(|i| make_square_mm(i as f64 * 5.0, 0.0, 10.0))
            .collect();
        let result = union_ex(&squares);
        assert_eq!(result.len(), 1);
        assert!((total_area_mm2(&result) - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_union_ex_disjoint() {
        let squares = vec![make_square_mm(0.0, 0.0, 1.0), make_square_mm(10.0, 0.0, 1.0)];
        let result = union_ex(&squares);
        assert_eq!(result.len(), 2);
        assert!(union_ex(&[]).is_empty());
    }

    #[test]
    fn test_intersection() {
        let square1 = make_square_mm(0.0, 0.0, 10.0);
        let square2 = make_square_mm(5.0, 0.0, 10.0);

        let result = intersection(&[square1], &[square2]);
        assert!((total_area_mm2(&result) - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_intersection_no_overlap() {
        let square1 = make_square_mm(0.0, 0.0, 10.0);
        let square2 = make_square_mm(20.0, 0.0, 10.0);

        let result = intersection(&[square1], &[square2]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_difference_makes_hole() {
        let large = make_square_mm(0.0, 0.0, 20.0);
        let small = make_square_mm(5.0, 5.0, 10.0);

        let result = difference(&[large], &[small]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert!((total_area_mm2(&result) - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_shrink_grow() {
        let square = make_square_mm(10.0, 10.0, 20.0);

        let shrunk = shrink(&[square.clone()], 2.0, OffsetJoinType::Miter);
        assert!((total_area_mm2(&shrunk) - 256.0).abs() < 0.1);

        let grown = grow(&[square], 2.0, OffsetJoinType::Round);
        // 24x24 square with rounded corners
        let expected = 400.0 + 4.0 * 20.0 * 2.0 + std::f64::consts::PI * 4.0;
        assert!((total_area_mm2(&grown) - expected).abs() < 0.5);
    }

    #[test]
    fn test_shrink_to_nothing() {
        let square = make_square_mm(10.0, 10.0, 2.0);
        assert!(shrink(&[square], 2.0, OffsetJoinType::Square).is_empty());
    }

    #[test]
    fn test_simplify_keeps_shape() {
        let circle = ExPolygon::circle(Point::zero(), scale(5.0), 720);
        let simplified = simplify(&[circle.clone()], 0.03);
        assert_eq!(simplified.len(), 1);
        assert!(simplified[0].contour.len() < circle.contour.len());
        let ratio = total_area(&simplified) / total_area(&[circle]);
        assert!((ratio - 1.0).abs() < 0.01);
    }

    fn notched_square() -> ExPolygon {
        // 10mm square with a sharp V cut into its top edge
        ExPolygon::new(Polygon::from_points(vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(10.0, 0.0),
            Point::new_scale(10.0, 10.0),
            Point::new_scale(5.0, 2.0),
            Point::new_scale(0.0, 10.0),
        ]))
    }

    #[test]
    fn test_smooth_outward_fills_notch() {
        let notched = notched_square();
        let smoothed = smooth_outward(&[notched.clone()], 0.4);
        assert_eq!(smoothed.len(), 1);
        assert_eq!(smoothed[0].contour.len(), 6);
        assert!(total_area(&smoothed) > total_area(&[notched.clone()]));
        // Nothing of the input is lost
        assert!(total_area_mm2(&difference(&[notched], &smoothed)) < 1e-4);
    }

    #[test]
    fn test_smooth_outward_keeps_convex_outline() {
        let circle = ExPolygon::circle(Point::zero(), scale(1.0), 32);
        let smoothed = smooth_outward(&[circle.clone()], 0.4);
        assert_eq!(smoothed[0].contour.points(), circle.contour.points());
    }

    #[test]
    fn test_smooth_outward_shrinks_sharp_hole() {
        let mut contour = Polygon::rectangle(Point::new_scale(-5.0, -5.0), Point::new_scale(5.0, 5.0));
        contour.make_counter_clockwise();
        let hole = Polygon::from_points(vec![
            Point::new_scale(-2.0, -1.0),
            Point::new_scale(2.0, -1.0),
            Point::new_scale(0.0, 2.0),
        ]);
        let holed = ExPolygon::with_holes(contour, vec![hole]);
        let smoothed = smooth_outward(&[holed.clone()], 0.4);
        assert_eq!(smoothed[0].holes[0].len(), 6);
        assert!(smoothed[0].holes[0].area() < holed.holes[0].area());
        assert!(total_area(&smoothed) > total_area(&[holed]));
    }
}
