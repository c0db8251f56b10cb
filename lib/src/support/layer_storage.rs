//! Output layer storage for generated support.
//!
//! Layers are allocated into an arena and referred to by [`LayerId`], so
//! per-layer slots can point at them without borrowing the storage.

use super::settings::{LayerIndex, TreeSupportSettings};
use crate::geometry::ExPolygons;
use crate::{clipper, CoordF};

/// Role of a generated support layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportLayerType {
    /// Interface where a branch rests on the model or the bed.
    BottomContact,
    /// Regular branch body.
    Base,
}

/// A single layer of generated support.
#[derive(Debug, Clone)]
pub struct SupportGeneratorLayer {
    pub layer_type: SupportLayerType,
    /// Top of the layer (mm).
    pub print_z: CoordF,
    /// Bottom of the layer (mm).
    pub bottom_z: CoordF,
    /// Layer thickness (mm).
    pub height: CoordF,
    pub idx_layer: LayerIndex,
    pub polygons: ExPolygons,
}

impl SupportGeneratorLayer {
    pub fn new(
        layer_type: SupportLayerType,
        print_z: CoordF,
        bottom_z: CoordF,
        idx_layer: LayerIndex,
    ) -> Self {
        Self {
            layer_type,
            print_z,
            bottom_z,
            height: print_z - bottom_z,
            idx_layer,
            polygons: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Area in mm².
    pub fn area(&self) -> CoordF {
        clipper::total_area_mm2(&self.polygons)
    }
}

/// Handle of a layer inside [`SupportGeneratorLayerStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

/// Arena owning every allocated support layer.
#[derive(Debug, Default)]
pub struct SupportGeneratorLayerStorage {
    layers: Vec<SupportGeneratorLayer>,
}

impl SupportGeneratorLayerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, layer: SupportGeneratorLayer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    pub fn get(&self, id: LayerId) -> Option<&SupportGeneratorLayer> {
        self.layers.get(id.0)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut SupportGeneratorLayer> {
        self.layers.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SupportGeneratorLayer> {
        self.layers.iter()
    }
}

/// Allocate an empty layer of `layer_type` spanning layer `layer_idx`.
pub fn layer_allocate(
    storage: &mut SupportGeneratorLayerStorage,
    layer_type: SupportLayerType,
    settings: &TreeSupportSettings,
    layer_idx: LayerIndex,
) -> LayerId {
    storage.allocate(SupportGeneratorLayer::new(
        layer_type,
        settings.layer_z(layer_idx),
        settings.layer_bottom_z(layer_idx),
        layer_idx,
    ))
}
