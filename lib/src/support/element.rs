//! Support elements: the nodes of the layered support graph.
//!
//! Elements live in per-layer vectors (`move_bounds[layer][elem]`). A node
//! refers to the nodes above it that it carries through `parents`, which are
//! indices into the next layer's vector.

use super::settings::LayerIndex;
use crate::geometry::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// Bit flags for support element state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportElementStateBits {
    /// Root can rest on a flat surface (build plate or model).
    pub to_model_gracious: bool,
    /// Root lost its avoidance area and may hang in the air.
    pub lost: bool,
    /// Root lost its avoidance area and could not be recovered.
    pub verylost: bool,
    /// General purpose visited marker.
    pub marked: bool,
}

/// State of a support element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportElementState {
    pub bits: SupportElementStateBits,
    pub layer_idx: LayerIndex,
    /// Resolved center of the branch circle on this layer.
    pub result_on_layer: Option<Point>,
    /// Branch radius at this node (scaled).
    pub radius: Coord,
}

impl SupportElementState {
    pub fn new(layer_idx: LayerIndex, position: Point, radius: Coord) -> Self {
        Self {
            bits: SupportElementStateBits::default(),
            layer_idx,
            result_on_layer: Some(position),
            radius,
        }
    }

    #[inline]
    pub fn result_on_layer_is_set(&self) -> bool {
        self.result_on_layer.is_some()
    }
}

/// A node of the support graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportElement {
    pub state: SupportElementState,
    /// Indices of the supported elements in the layer above.
    pub parents: Vec<usize>,
}

impl SupportElement {
    pub fn new(state: SupportElementState) -> Self {
        Self {
            state,
            parents: Vec::new(),
        }
    }

    pub fn with_parents(state: SupportElementState, parents: Vec<usize>) -> Self {
        Self { state, parents }
    }

    /// Mark the element as resting graciously on a surface.
    pub fn gracious(mut self) -> Self {
        self.state.bits.to_model_gracious = true;
        self
    }

    pub fn lost(mut self) -> Self {
        self.state.bits.lost = true;
        self
    }

    pub fn verylost(mut self) -> Self {
        self.state.bits.verylost = true;
        self
    }

    #[inline]
    pub fn is_tip(&self) -> bool {
        self.parents.is_empty()
    }

    #[inline]
    pub fn radius(&self) -> Coord {
        self.state.radius
    }
}

/// All elements of one layer.
pub type SupportElements = Vec<SupportElement>;

/// Arena index of an element: `move_bounds[layer_idx][elem_idx]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub layer_idx: usize,
    pub elem_idx: usize,
}

impl NodeId {
    #[inline]
    pub const fn new(layer_idx: usize, elem_idx: usize) -> Self {
        Self {
            layer_idx,
            elem_idx,
        }
    }

    #[inline]
    pub fn get<'a>(&self, move_bounds: &'a [SupportElements]) -> &'a SupportElement {
        &move_bounds[self.layer_idx][self.elem_idx]
    }

    /// Parent `parent_pos` of this node, one layer up.
    #[inline]
    pub fn parent(&self, move_bounds: &[SupportElements], parent_pos: usize) -> NodeId {
        NodeId::new(
            self.layer_idx + 1,
            self.get(move_bounds).parents[parent_pos],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_flags() {
        let e = SupportElement::new(SupportElementState::new(3, Point::zero(), 1000))
            .gracious()
            .lost();
        assert!(e.state.bits.to_model_gracious);
        assert!(e.state.bits.lost);
        assert!(!e.state.bits.verylost);
        assert!(e.is_tip());
        assert_eq!(e.radius(), 1000);
    }

    #[test]
    fn test_node_id_parent() {
        let move_bounds = vec![
            vec![SupportElement::with_parents(
                SupportElementState::new(0, Point::zero(), 10),
                vec![1],
            )],
            vec![
                SupportElement::new(SupportElementState::new(1, Point::new(5, 5), 10)),
                SupportElement::new(SupportElementState::new(1, Point::new(7, 7), 10)),
            ],
        ];
        let root = NodeId::new(0, 0);
        let parent = root.parent(&move_bounds, 0);
        assert_eq!(parent, NodeId::new(1, 1));
        assert_eq!(
            parent.get(&move_bounds).state.result_on_layer,
            Some(Point::new(7, 7))
        );
    }
}
