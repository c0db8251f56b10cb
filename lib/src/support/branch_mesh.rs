//! Branch mesh drawing for tree supports.
//!
//! A branch path is turned into a closed tube:
//! - bottom hemisphere at the first element, built from stacked partial rings
//! - one ring per inner element, oriented along the bisector of the
//!   incoming and outgoing directions
//! - top hemisphere at the last element
//!
//! Consecutive rings are stitched with a zig-zag strip that always takes the
//! shorter of the two candidate diagonals, so rings of different vertex
//! counts connect without twisting.

use super::element::{NodeId, SupportElements};
use super::settings::{LayerIndex, TreeSupportSettings};
use crate::geometry::Point3F;
use crate::mesh::TriangleMesh;
use crate::{unscale, CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use tracing::warn;

/// Default chord deviation for ring discretization (mm).
const DEFAULT_EPS: f64 = 0.015;

/// Configuration for branch mesh generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchMeshConfig {
    /// Maximum deviation of a ring edge from the ideal circle (mm).
    pub eps: f64,
}

impl Default for BranchMeshConfig {
    fn default() -> Self {
        Self { eps: DEFAULT_EPS }
    }
}

impl BranchMeshConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.eps.is_nan() || self.eps <= 0.0 {
            return Err(Error::Config(format!("eps must be positive, got {}", self.eps)));
        }
        Ok(())
    }
}

/// Angle between ring vertices keeping the chord within `eps` of the circle.
fn discretization_angle(radius: CoordF, eps: CoordF) -> CoordF {
    2.0 * (1.0 - eps / radius).clamp(-1.0, 1.0).acos()
}

/// Number of vertices of a ring of `radius`.
pub(crate) fn circle_segment_count(radius: CoordF, eps: CoordF) -> usize {
    let steps = (2.0 * PI / discretization_angle(radius, eps)).ceil() as usize;
    steps.max(3)
}

/// Number of angular steps over a quarter circle, at least two so every
/// hemisphere has a ring.
pub(crate) fn hemisphere_steps(radius: CoordF, eps: CoordF) -> usize {
    let steps = (PI / (2.0 * discretization_angle(radius, eps))).ceil() as usize;
    steps.max(2)
}

/// In-plane basis for a ring with `normal`.
fn ring_basis(normal: Point3F) -> (Point3F, Point3F) {
    let mut x = normal.cross(&Point3F::new(0.0, -1.0, 0.0));
    if x.length_squared() < 1e-12 {
        // Normal along Y
        x = normal.cross(&Point3F::new(1.0, 0.0, 0.0));
    }
    let x = x.normalize();
    let y = normal.cross(&x).normalize();
    (x, y)
}

/// Append a ring of vertices, returning their index range.
fn discretize_circle(
    mesh: &mut TriangleMesh,
    center: Point3F,
    normal: Point3F,
    radius: CoordF,
    eps: CoordF,
) -> Range<u32> {
    let nsteps = circle_segment_count(radius, eps);
    let angle_step = 2.0 * PI / nsteps as f64;
    let (x, y) = ring_basis(normal);
    let (x, y) = (x * radius, y * radius);

    let begin = mesh.vertex_count() as u32;
    for i in 0..nsteps {
        let angle = i as f64 * angle_step;
        mesh.add_vertex(center + x * angle.cos() + y * angle.sin());
    }
    begin..mesh.vertex_count() as u32
}

/// Fan between a single vertex and a ring. `flip` reverses the winding.
fn triangulate_fan(mesh: &mut TriangleMesh, ifan: u32, ring: Range<u32>, flip: bool) {
    debug_assert!(ring.len() >= 3);
    let mut u = ring.end - 1;
    for v in ring {
        if flip {
            mesh.add_triangle_indices(ifan, u, v);
        } else {
            mesh.add_triangle_indices(ifan, v, u);
        }
        u = v;
    }
}

/// Zig-zag strip between two rings.
fn triangulate_strip(mesh: &mut TriangleMesh, ring1: Range<u32>, ring2: Range<u32>) {
    debug_assert!(ring1.len() >= 3 && ring2.len() >= 3);
    let next = |i: u32, ring: &Range<u32>| if i + 1 == ring.end { ring.start } else { i + 1 };

    // Start the second ring at the vertex closest to the first ring's start
    let p1 = mesh.vertex(ring1.start);
    let istart2 = ring2
        .clone()
        .min_by(|&a, &b| {
            let da = mesh.vertex(a).distance_squared(&p1);
            let db = mesh.vertex(b).distance_squared(&p1);
            da.total_cmp(&db)
        })
        .unwrap_or(ring2.start);

    let (mut n1, mut n2) = (ring1.len(), ring2.len());
    let (mut u, mut v) = (ring1.start, istart2);
    while n1 > 0 || n2 > 0 {
        let u2 = next(u, &ring1);
        let v2 = next(v, &ring2);
        let take_first = if n1 == 0 {
            false
        } else if n2 == 0 {
            true
        } else {
            let l1 = mesh.vertex(u2).distance_squared(&mesh.vertex(v));
            let l2 = mesh.vertex(v2).distance_squared(&mesh.vertex(u));
            l1 < l2
        };
        if take_first {
            mesh.add_triangle_indices(u, u2, v);
            n1 -= 1;
            u = u2;
        } else {
            mesh.add_triangle_indices(u, v2, v);
            n2 -= 1;
            v = v2;
        }
    }
}

fn node_position(
    node: NodeId,
    move_bounds: &[SupportElements],
    settings: &TreeSupportSettings,
) -> Option<Point3F> {
    let xy = node.get(move_bounds).state.result_on_layer?.to_f64();
    Some(Point3F::from_2d(xy, settings.layer_z(node.layer_idx as LayerIndex)))
}

/// Bottom hemisphere below `center`, facing away from `normal`.
/// Returns the top ring and the Z of the lowest point.
fn extrude_bottom_cap(
    mesh: &mut TriangleMesh,
    center: Point3F,
    normal: Point3F,
    radius: CoordF,
    eps: CoordF,
) -> (Range<u32>, CoordF) {
    let nsteps = hemisphere_steps(radius, eps);
    let angle_step = PI / (2.0 * nsteps as f64);

    let fan_point = center - normal * radius;
    let ifan = mesh.add_vertex(fan_point);
    let mut prev_ring = ifan..ifan;
    for i in 1..nsteps {
        let angle = i as f64 * angle_step;
        let ring = discretize_circle(
            mesh,
            center - normal * (radius * angle.cos()),
            normal,
            radius * angle.sin(),
            eps,
        );
        if i == 1 {
            triangulate_fan(mesh, ifan, ring.clone(), false);
        } else {
            triangulate_strip(mesh, prev_ring, ring.clone());
        }
        prev_ring = ring;
    }
    (prev_ring, fan_point.z)
}

/// Top hemisphere above `center`, closing `prev_ring`. Returns the Z of the highest point.
fn extrude_top_cap(
    mesh: &mut TriangleMesh,
    mut prev_ring: Range<u32>,
    center: Point3F,
    normal: Point3F,
    radius: CoordF,
    eps: CoordF,
) -> CoordF {
    let nsteps = hemisphere_steps(radius, eps);
    let angle_step = PI / (2.0 * nsteps as f64);

    for i in 0..nsteps {
        let angle = PI / 2.0 - i as f64 * angle_step;
        let ring = discretize_circle(
            mesh,
            center + normal * (radius * angle.cos()),
            normal,
            radius * angle.sin(),
            eps,
        );
        triangulate_strip(mesh, prev_ring, ring.clone());
        prev_ring = ring;
    }

    let fan_point = center + normal * radius;
    let ifan = mesh.add_vertex(fan_point);
    triangulate_fan(mesh, ifan, prev_ring, true);
    fan_point.z
}

/// Extrude one branch path into a closed tube appended to `mesh`.
///
/// Returns the Z span (lowest cap point, highest cap point) in mm, or `None`
/// if the path is too short, carries a non-positive radius or passes through
/// an element without a resolved position.
pub fn extrude_branch(
    path: &[NodeId],
    move_bounds: &[SupportElements],
    settings: &TreeSupportSettings,
    config: &BranchMeshConfig,
    mesh: &mut TriangleMesh,
) -> Option<(CoordF, CoordF)> {
    if path.len() < 2 {
        return None;
    }
    if path.iter().any(|node| node.get(move_bounds).state.radius <= 0) {
        warn!(
            first = ?path[0],
            "Skipping branch with a non-positive radius"
        );
        return None;
    }
    debug_assert!(path.windows(2).all(|w| w[0].layer_idx + 1 == w[1].layer_idx));

    let eps = config.eps;
    let radius = |node: NodeId| unscale(node.get(move_bounds).state.radius);
    let Some(positions) = path
        .iter()
        .map(|&node| node_position(node, move_bounds, settings))
        .collect::<Option<Vec<Point3F>>>()
    else {
        warn!(
            first = ?path[0],
            "Skipping branch with an unresolved element position"
        );
        return None;
    };

    let mut zmin = 0.0;
    let mut zmax = 0.0;
    let mut prev_ring = 0..0;

    for ipath in 1..path.len() {
        let p1 = positions[ipath - 1];
        let p2 = positions[ipath];
        let v1 = (p2 - p1).normalize();

        if ipath == 1 {
            let (ring, z) = extrude_bottom_cap(mesh, p1, v1, radius(path[0]), eps);
            prev_ring = ring;
            zmin = z;
        }

        if ipath + 1 == path.len() {
            zmax = extrude_top_cap(mesh, prev_ring.clone(), p2, v1, radius(path[ipath]), eps);
        } else {
            let v2 = (positions[ipath + 1] - p2).normalize();
            let ncurrent = (v1 + v2).normalize();
            let ring = discretize_circle(mesh, p2, ncurrent, radius(path[ipath]), eps);
            triangulate_strip(mesh, prev_ring, ring.clone());
            prev_ring = ring;
        }
    }

    Some((zmin, zmax))
}
