//! Triangle mesh data structure.
//!
//! An indexed triangle set: a vertex array plus index triples. Branch tubes
//! are built into it and the slicer reads it back.

use crate::geometry::{BoundingBox3F, Point3F};
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single triangle defined by three vertex indices.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    /// Indices into the vertex array, counter-clockwise seen from outside.
    pub indices: [u32; 3],
}

impl Triangle {
    #[inline]
    pub const fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self {
            indices: [v0, v1, v2],
        }
    }

    /// Check if this triangle has duplicate vertices.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.indices[0] == self.indices[1]
            || self.indices[1] == self.indices[2]
            || self.indices[2] == self.indices[0]
    }
}

impl fmt::Debug for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Triangle({}, {}, {})",
            self.indices[0], self.indices[1], self.indices[2]
        )
    }
}

impl From<[u32; 3]> for Triangle {
    #[inline]
    fn from(indices: [u32; 3]) -> Self {
        Self { indices }
    }
}

/// A 3D triangle mesh represented as an indexed triangle set.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions (in mm).
    vertices: Vec<Point3F>,
    indices: Vec<Triangle>,
}

impl TriangleMesh {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            indices: Vec::with_capacity(triangle_count),
        }
    }

    pub fn from_parts(vertices: Vec<Point3F>, indices: Vec<Triangle>) -> Self {
        Self { vertices, indices }
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3F] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[Triangle] {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append a vertex and return its index.
    #[inline]
    pub fn add_vertex(&mut self, v: Point3F) -> u32 {
        let idx = self.vertices.len() as u32;
        self.vertices.push(v);
        idx
    }

    #[inline]
    pub fn add_triangle_indices(&mut self, v0: u32, v1: u32, v2: u32) {
        self.indices.push(Triangle::new(v0, v1, v2));
    }

    #[inline]
    pub fn vertex(&self, idx: u32) -> Point3F {
        self.vertices[idx as usize]
    }

    pub fn bounding_box(&self) -> BoundingBox3F {
        let mut bb = BoundingBox3F::new();
        for v in &self.vertices {
            bb.merge_point(*v);
        }
        bb
    }

    /// Signed volume; positive when triangles face outward.
    pub fn signed_volume(&self) -> CoordF {
        self.indices
            .iter()
            .map(|tri| {
                let v0 = self.vertices[tri.indices[0] as usize];
                let v1 = self.vertices[tri.indices[1] as usize];
                let v2 = self.vertices[tri.indices[2] as usize];
                v0.dot(&v1.cross(&v2)) / 6.0
            })
            .sum()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Check that every index refers to an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len() as u32;
        for (i, tri) in self.indices.iter().enumerate() {
            for &idx in &tri.indices {
                if idx >= vertex_count {
                    return Err(Error::Mesh(format!(
                        "Triangle {} has invalid vertex index {} (only {} vertices)",
                        i, idx, vertex_count
                    )));
                }
            }
        }
        Ok(())
    }

    /// Closed and consistently oriented: every directed edge appears exactly
    /// once and its reverse appears exactly once.
    pub fn is_closed_manifold(&self) -> bool {
        if self.indices.is_empty() {
            return false;
        }
        let mut edges: HashMap<(u32, u32), u32> = HashMap::with_capacity(self.indices.len() * 3);
        for tri in &self.indices {
            if tri.is_degenerate() {
                return false;
            }
            for k in 0..3 {
                let e = (tri.indices[k], tri.indices[(k + 1) % 3]);
                *edges.entry(e).or_insert(0) += 1;
            }
        }
        edges
            .iter()
            .all(|(&(a, b), &count)| count == 1 && edges.get(&(b, a)) == Some(&1))
    }

    /// Axis aligned cube centered at the origin.
    pub fn cube(size: CoordF) -> Self {
        let half = size / 2.0;
        let vertices = vec![
            // Bottom face
            Point3F::new(-half, -half, -half),
            Point3F::new(half, -half, -half),
            Point3F::new(half, half, -half),
            Point3F::new(-half, half, -half),
            // Top face
            Point3F::new(-half, -half, half),
            Point3F::new(half, -half, half),
            Point3F::new(half, half, half),
            Point3F::new(-half, half, half),
        ];

        let indices = vec![
            Triangle::new(0, 2, 1),
            Triangle::new(0, 3, 2),
            Triangle::new(4, 5, 6),
            Triangle::new(4, 6, 7),
            Triangle::new(0, 1, 5),
            Triangle::new(0, 5, 4),
            Triangle::new(2, 3, 7),
            Triangle::new(2, 7, 6),
            Triangle::new(0, 4, 7),
            Triangle::new(0, 7, 3),
            Triangle::new(1, 2, 6),
            Triangle::new(1, 6, 5),
        ];

        Self::from_parts(vertices, indices)
    }
}

impl fmt::Debug for TriangleMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TriangleMesh({} vertices, {} triangles)",
            self.vertices.len(),
            self.indices.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_is_closed() {
        let cube = TriangleMesh::cube(2.0);
        assert!(cube.validate().is_ok());
        assert!(cube.is_closed_manifold());
        assert!((cube.signed_volume() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_mesh_is_not_manifold() {
        let mut mesh = TriangleMesh::cube(1.0);
        let mut tris = mesh.indices().to_vec();
        tris.pop();
        mesh = TriangleMesh::from_parts(mesh.vertices().to_vec(), tris);
        assert!(!mesh.is_closed_manifold());
    }

    #[test]
    fn test_validate_bad_index() {
        let mut mesh = TriangleMesh::new();
        mesh.add_vertex(Point3F::zero());
        mesh.add_triangle_indices(0, 1, 2);
        assert!(matches!(mesh.validate(), Err(Error::Mesh(_))));
    }

    #[test]
    fn test_bounding_box() {
        let bb = TriangleMesh::cube(2.0).bounding_box();
        assert!((bb.min.z + 1.0).abs() < 1e-12);
        assert!((bb.max.x - 1.0).abs() < 1e-12);
    }
}
