//! Mesh Slicer - Triangle-plane intersection algorithm.
//!
//! Computes the intersection of a closed triangle mesh with horizontal planes:
//! 1. Bin every triangle into the planes its Z range spans
//! 2. Cut each binned triangle into one directed segment per plane
//! 3. Stitch segments into closed loops through shared mesh edges
//! 4. Classify loops as contours (CCW) or holes (CW) and return ExPolygons
//!
//! A vertex counts as below a plane iff `z < slice_z`, otherwise above. With
//! that rule every crossing lies on an edge with one endpoint on each side,
//! so vertices lying exactly on a plane need no special case.

use crate::clipper::union_ex;
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::mesh::TriangleMesh;
use crate::{scale, CoordF};
use rayon::prelude::*;
use std::collections::HashMap;

/// Undirected mesh edge, smaller vertex index first.
type EdgeKey = (u32, u32);

#[inline]
fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Directed intersection segment on one plane.
///
/// Oriented so that walking from `a` to `b` keeps the mesh interior on the left.
#[derive(Clone, Debug)]
struct IntersectionLine {
    a: Point,
    b: Point,
    edge_a: EdgeKey,
    edge_b: EdgeKey,
}

/// Crossing of edge `key` with the plane, computed from the sorted endpoints
/// so both triangles sharing the edge produce the identical point.
fn edge_crossing(mesh: &TriangleMesh, key: EdgeKey, slice_z: CoordF) -> Point {
    let lo = mesh.vertex(key.0);
    let hi = mesh.vertex(key.1);
    let dz = hi.z - lo.z;
    let t = if dz.abs() > 0.0 {
        ((slice_z - lo.z) / dz).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Point::new(
        scale(lo.x + (hi.x - lo.x) * t),
        scale(lo.y + (hi.y - lo.y) * t),
    )
}

/// Cut one triangle with a plane.
fn slice_facet(
    mesh: &TriangleMesh,
    indices: &[u32; 3],
    slice_z: CoordF,
) -> Option<IntersectionLine> {
    let below = indices.map(|i| mesh.vertex(i).z < slice_z);
    let mut down: Option<EdgeKey> = None;
    let mut up: Option<EdgeKey> = None;

    for k in 0..3 {
        let l = (k + 1) % 3;
        match (below[k], below[l]) {
            (false, true) => down = Some(edge_key(indices[k], indices[l])),
            (true, false) => up = Some(edge_key(indices[k], indices[l])),
            _ => {}
        }
    }

    // Segment runs from the edge going down to the edge going up
    let (edge_a, edge_b) = (down?, up?);
    Some(IntersectionLine {
        a: edge_crossing(mesh, edge_a, slice_z),
        b: edge_crossing(mesh, edge_b, slice_z),
        edge_a,
        edge_b,
    })
}

/// Cut all triangles against the planes they span. `zs` must be sorted ascending.
fn slice_mesh_to_lines(mesh: &TriangleMesh, zs: &[CoordF]) -> Vec<Vec<IntersectionLine>> {
    let mut lines: Vec<Vec<IntersectionLine>> = vec![Vec::new(); zs.len()];
    if mesh.is_empty() || zs.is_empty() {
        return lines;
    }

    for tri in mesh.indices() {
        let [v0, v1, v2] = tri.indices.map(|i| mesh.vertex(i));
        let min_z = v0.z.min(v1.z).min(v2.z);
        let max_z = v0.z.max(v1.z).max(v2.z);

        // Planes with min_z < z <= max_z separate at least one vertex
        let first_layer = zs.partition_point(|&z| z <= min_z);
        let last_layer = zs.partition_point(|&z| z <= max_z);

        for layer_idx in first_layer..last_layer {
            if let Some(line) = slice_facet(mesh, &tri.indices, zs[layer_idx]) {
                lines[layer_idx].push(line);
            }
        }
    }

    lines
}

/// Chain intersection lines into closed polygons through shared edges.
fn chain_lines_to_polygons(lines: &[IntersectionLine]) -> Vec<Polygon> {
    if lines.is_empty() {
        return Vec::new();
    }

    let by_edge_a: HashMap<EdgeKey, usize> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (line.edge_a, idx))
        .collect();

    let mut used = vec![false; lines.len()];
    let mut polygons = Vec::new();

    for start_idx in 0..lines.len() {
        if used[start_idx] {
            continue;
        }

        let mut points: Vec<Point> = Vec::new();
        let mut current_idx = start_idx;
        let mut closed = false;
        used[current_idx] = true;

        loop {
            let current = &lines[current_idx];
            if points.last() != Some(&current.a) {
                points.push(current.a);
            }

            match by_edge_a.get(&current.edge_b) {
                Some(&idx) if idx == start_idx => {
                    closed = true;
                    break;
                }
                Some(&idx) if !used[idx] => {
                    used[idx] = true;
                    current_idx = idx;
                }
                // Non-manifold input, chain broken
                _ => break,
            }
        }

        if closed && points.first() == points.last() && points.len() > 1 {
            points.pop();
        }
        if points.len() >= 3 {
            polygons.push(Polygon::from_points(points));
        }
    }

    polygons
}

/// Classify polygons as contours (CCW) or holes (CW) and combine into ExPolygons.
fn make_expolygons(polygons: Vec<Polygon>) -> ExPolygons {
    let mut contours: Vec<Polygon> = Vec::new();
    let mut holes: Vec<Polygon> = Vec::new();

    for poly in polygons {
        let area = poly.signed_area();
        if area > 0.0 {
            contours.push(poly);
        } else if area < 0.0 {
            holes.push(poly);
        }
        // Zero area polygons are degenerate and ignored
    }

    // Smallest enclosing contour first, so nested islands get their own holes
    contours.sort_by(|a, b| a.area().total_cmp(&b.area()));

    let mut expolygons: Vec<ExPolygon> = contours.into_iter().map(ExPolygon::new).collect();
    for hole in holes {
        let Some(&test_point) = hole.points().first() else {
            continue;
        };
        if let Some(owner) = expolygons
            .iter_mut()
            .find(|e| e.contour.contains_point(&test_point))
        {
            owner.holes.push(hole);
        }
    }

    // Loops of a bent tube can overlap each other
    if expolygons.len() > 1 {
        union_ex(&expolygons)
    } else {
        expolygons
    }
}

/// Slice a mesh at a single Z height, returning ExPolygons.
pub fn slice_mesh_at_z(mesh: &TriangleMesh, z: CoordF) -> ExPolygons {
    slice_mesh(mesh, &[z]).pop().unwrap_or_default()
}

/// Slice a mesh at multiple ascending Z heights, returning ExPolygons for each height.
pub fn slice_mesh(mesh: &TriangleMesh, zs: &[CoordF]) -> Vec<ExPolygons> {
    debug_assert!(zs.windows(2).all(|w| w[0] <= w[1]));
    slice_mesh_to_lines(mesh, zs)
        .par_iter()
        .map(|lines| make_expolygons(chain_lines_to_polygons(lines)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::total_area_mm2;
    use crate::mesh::TriangleMesh;

    #[test]
    fn test_slice_cube() {
        let mesh = TriangleMesh::cube(10.0);

        let result = slice_mesh_at_z(&mesh, 0.0);
        assert_eq!(result.len(), 1, "Expected 1 contour for cube slice");

        let expoly = &result[0];
        assert!(expoly.holes.is_empty(), "Cube slice should have no holes");
        assert!(expoly.contour.is_counter_clockwise());
        assert!(
            (total_area_mm2(&result) - 100.0).abs() < 0.01,
            "Area {} not close to 100",
            total_area_mm2(&result)
        );
    }

    #[test]
    fn test_slice_cube_multiple_layers() {
        let mesh = TriangleMesh::cube(10.0);

        let zs: Vec<f64> = (-4..=4).map(|i| i as f64 + 0.5).collect();
        let results = slice_mesh(&mesh, &zs);

        assert_eq!(results.len(), zs.len());
        for (i, result) in results.iter().enumerate() {
            let expected = if zs[i] < 5.0 { 1 } else { 0 };
            assert_eq!(result.len(), expected, "Layer {} at z={}", i, zs[i]);
        }
    }

    #[test]
    fn test_slice_through_vertex_plane() {
        // Plane exactly at the bottom face: all bottom vertices count as above
        let mesh = TriangleMesh::cube(10.0);
        let result = slice_mesh_at_z(&mesh, -5.0);
        assert!(result.is_empty());
        let result = slice_mesh_at_z(&mesh, 5.0);
        assert_eq!(result.len(), 1);
        assert!((total_area_mm2(&result) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_slice_empty_mesh() {
        let mesh = TriangleMesh::new();
        assert!(slice_mesh_at_z(&mesh, 0.0).is_empty());
        assert!(slice_mesh(&mesh, &[]).is_empty());
    }

    #[test]
    fn test_slice_no_intersection() {
        let mesh = TriangleMesh::cube(10.0);
        assert!(slice_mesh_at_z(&mesh, 10.0).is_empty());
        assert!(slice_mesh_at_z(&mesh, -10.0).is_empty());
    }
}
