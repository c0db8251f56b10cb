//! # Organic Support
//!
//! Geometry core for organic tree supports in FFF slicing.
//!
//! Given a layered graph of support nodes, the crate:
//! - relaxes node positions so branches clear the model and stay smooth
//! - splits the relaxed graph into branches and trees
//! - extrudes every branch into a capsule-like tube mesh
//! - re-slices the tubes per layer and composes base / bottom contact layers
//!
//! ## Example
//!
//! ```rust,ignore
//! use organic_support::support::{organic_draw_branches, never_cancel, OrganicDrawOutput};
//!
//! let mut output = OrganicDrawOutput::new(num_layers);
//! organic_draw_branches(
//!     &mut volumes,
//!     &settings,
//!     &smooth_config,
//!     &mesh_config,
//!     &mut move_bounds,
//!     &top_contacts,
//!     &mut output,
//!     &never_cancel,
//! )?;
//! ```

pub mod clipper;
pub mod geometry;
pub mod mesh;
pub mod slice;
pub mod support;

pub use geometry::{
    BoundingBoxF, ExPolygon, ExPolygons, LineF, Point, Point3F, PointF, Polygon, Polygons,
};
pub use mesh::{Triangle, TriangleMesh};
pub use slice::{slice_mesh, slice_mesh_at_z};

pub use clipper::{
    difference, intersection, offset_expolygons, simplify, total_area, union, union_ex,
    OffsetJoinType,
};

pub use support::{
    extract_trees, extrude_branch, never_cancel, organic_draw_branches,
    organic_smooth_branches_avoid_collisions, Branch, BranchMeshConfig, ElementsWithLinkDown,
    LayerCollisionCache, LayerId, ModelVolumes, NodeId, OrganicDrawOutput, OrganicDrawStats,
    OrganicSmoothConfig, SmoothingStats, SupportElement, SupportElementState,
    SupportGeneratorLayer, SupportGeneratorLayerStorage, SupportLayerType, Tree,
    TreeModelVolumes, TreeModelVolumesConfig, TreeSelection, TreeSupportSettings,
};

/// Coordinate type used throughout the crate.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Threshold below which a collision depth does not count as a move.
pub const EPSILON: f64 = 1e-4;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for support generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Slicing error: {0}")]
    Slicing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
