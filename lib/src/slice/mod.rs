//! Slicing triangle meshes into per-layer outlines.

mod mesh_slicer;

pub use mesh_slicer::{slice_mesh, slice_mesh_at_z};
