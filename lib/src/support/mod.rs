//! Organic tree support generation.
//!
//! Turns a layered graph of support elements into printable support layers.
//!
//! # Pipeline
//!
//! 1. **Collision caches**: per layer, the model boundary as line segments
//!    with a distance index (`collision_cache`)
//! 2. **Relaxation**: elements become collision spheres that are pushed out
//!    of the model and smoothed along their branches (`organic_smooth`)
//! 3. **Extraction**: the settled graph is split into trees made of
//!    unbranched chains (`tree_extract`)
//! 4. **Extrusion**: every branch becomes a closed tube mesh with
//!    hemispherical caps (`branch_mesh`)
//! 5. **Slicing and composition**: tubes are sliced per layer, merged per
//!    tree and per layer, and stored as base / bottom contact layers
//!    (`organic_draw`)
//!
//! Elements live in `move_bounds: Vec<SupportElements>`, one vector per
//! layer, and refer to their parents by index into the layer above.
//!
//! Long running operations take a cancellation check. It is polled from
//! every loop and every parallel task; returning [`Error::Cancelled`]
//! aborts the whole operation.
//!
//! [`Error::Cancelled`]: crate::Error::Cancelled

pub mod branch_mesh;
pub mod collision_cache;
pub mod element;
pub mod layer_storage;
pub mod organic_draw;
pub mod organic_smooth;
pub mod settings;
pub mod tree_extract;
pub mod volumes;

pub use branch_mesh::{extrude_branch, BranchMeshConfig};
pub use collision_cache::{build_layer_collision_caches, LayerCollisionCache};
pub use element::{NodeId, SupportElement, SupportElementState, SupportElements};
pub use layer_storage::{
    layer_allocate, LayerId, SupportGeneratorLayer, SupportGeneratorLayerStorage,
    SupportLayerType,
};
pub use organic_draw::{
    organic_draw_branches, OrganicDrawOutput, OrganicDrawStats, Slice, TreeSlices,
};
pub use organic_smooth::{
    build_collision_spheres, organic_smooth_branches_avoid_collisions, relax_collision_spheres,
    CollisionSphere, ElementsWithLinkDown, OrganicSmoothConfig, SmoothingStats,
};
pub use settings::{LayerIndex, TreeSelection, TreeSupportSettings};
pub use tree_extract::{extract_trees, unmark_all, Branch, Tree};
pub use volumes::{ModelVolumes, TreeModelVolumes, TreeModelVolumesConfig};

use crate::Result;

/// Cancellation check that never fires.
pub fn never_cancel() -> Result<()> {
    Ok(())
}
