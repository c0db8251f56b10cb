//! Tree support settings and layer geometry.
//!
//! Lengths that end up in polygons (`branch_radius`, `support_line_width`,
//! `resolution`) are scaled integers; layer heights are in mm.

use crate::{scale, Coord, CoordF, Error, Result};
use serde::{Deserialize, Serialize};

/// Layer index. Signed so that layer arithmetic can step below zero.
pub type LayerIndex = i64;

/// Which extracted trees are extruded and sliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeSelection {
    /// Every tree.
    #[default]
    All,
    /// Only trees whose seed node is lost or very lost.
    LostOnly,
}

/// Settings consumed by the organic drawing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSupportSettings {
    /// Regular layer height (mm).
    pub layer_height: CoordF,
    /// Height of the first object layer (mm).
    pub first_layer_height: CoordF,
    /// Print Z of the bottom of the object (mm).
    pub object_print_z_min: CoordF,
    /// Print Z of every raft layer (mm), lowest first.
    pub raft_layers: Vec<CoordF>,
    /// Default branch radius (scaled).
    pub branch_radius: Coord,
    /// Support extrusion width (scaled).
    pub support_line_width: Coord,
    /// Polygon simplification resolution (scaled).
    pub resolution: Coord,
    /// Number of support floor interface layers; zero disables bottom contacts.
    pub support_floor_layers: usize,
    pub tree_selection: TreeSelection,
}

impl Default for TreeSupportSettings {
    fn default() -> Self {
        Self {
            layer_height: 0.2,
            first_layer_height: 0.2,
            object_print_z_min: 0.0,
            raft_layers: Vec::new(),
            branch_radius: scale(1.0),
            support_line_width: scale(0.4),
            resolution: scale(0.025),
            support_floor_layers: 0,
            tree_selection: TreeSelection::All,
        }
    }
}

impl TreeSupportSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_height.is_nan() || self.layer_height <= 0.0 {
            return Err(Error::Config(format!(
                "layer_height must be positive, got {}",
                self.layer_height
            )));
        }
        if self.first_layer_height < 0.0 {
            return Err(Error::Config(format!(
                "first_layer_height must not be negative, got {}",
                self.first_layer_height
            )));
        }
        if self.branch_radius <= 0 {
            return Err(Error::Config("branch_radius must be positive".into()));
        }
        if self.raft_layers.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::Config("raft_layers must be ascending".into()));
        }
        Ok(())
    }

    /// Layer height as a scaled integer.
    #[inline]
    pub fn layer_height_scaled(&self) -> Coord {
        scale(self.layer_height)
    }

    #[inline]
    fn raft_count(&self) -> LayerIndex {
        self.raft_layers.len() as LayerIndex
    }

    /// Print Z of a layer (mm). Negative indices map to the bed.
    pub fn layer_z(&self, layer_idx: LayerIndex) -> CoordF {
        if layer_idx < 0 {
            return 0.0;
        }
        match self.raft_layers.get(layer_idx as usize) {
            Some(&z) => z,
            None => {
                self.object_print_z_min
                    + self.first_layer_height
                    + (layer_idx - self.raft_count()) as CoordF * self.layer_height
            }
        }
    }

    /// Bottom of a layer: print Z of the layer below, or the bed.
    #[inline]
    pub fn layer_bottom_z(&self, layer_idx: LayerIndex) -> CoordF {
        self.layer_z(layer_idx - 1)
    }

    /// Mid-plane of a layer, where branch tubes are sliced.
    #[inline]
    pub fn layer_slice_z(&self, layer_idx: LayerIndex) -> CoordF {
        0.5 * (self.layer_bottom_z(layer_idx) + self.layer_z(layer_idx))
    }

    fn layer_steps(&self, z: CoordF) -> CoordF {
        (z - self.object_print_z_min - self.first_layer_height) / self.layer_height
    }

    /// Lowest object layer with print Z at or above `z`.
    pub fn layer_idx_ceil(&self, z: CoordF) -> LayerIndex {
        self.raft_count() + (self.layer_steps(z).ceil() as LayerIndex).max(0)
    }

    /// Highest object layer with print Z at or below `z`.
    pub fn layer_idx_floor(&self, z: CoordF) -> LayerIndex {
        self.raft_count() + (self.layer_steps(z).floor() as LayerIndex).max(0)
    }
}
