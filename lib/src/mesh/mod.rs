//! Triangle meshes.
//!
//! - [`TriangleMesh`] - indexed triangle set built by the branch mesher
//! - [`Triangle`] - a single triangle

mod triangle_mesh;

pub use triangle_mesh::{Triangle, TriangleMesh};
