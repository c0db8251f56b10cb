//! Organic support drawing.
//!
//! Runs the whole organic pipeline on a settled element graph:
//!
//! 1. Relax element positions away from the model ([`organic_smooth`])
//! 2. Split the graph into trees of branches ([`tree_extract`])
//! 3. Extrude every branch into a tube and slice it at the layer mid-planes
//! 4. Propagate unsupported roots downwards, collect bottom contacts
//! 5. Merge branch slices per tree, then trees per layer, and emit
//!    bottom contact and base layers
//!
//! [`organic_smooth`]: super::organic_smooth
//! [`tree_extract`]: super::tree_extract

use super::branch_mesh::{extrude_branch, BranchMeshConfig};
use super::element::{SupportElementState, SupportElements};
use super::layer_storage::{
    layer_allocate, LayerId, SupportGeneratorLayer, SupportGeneratorLayerStorage,
    SupportLayerType,
};
use super::organic_smooth::{
    organic_smooth_branches_avoid_collisions, ElementsWithLinkDown, OrganicSmoothConfig,
    SmoothingStats,
};
use super::settings::{LayerIndex, TreeSupportSettings};
use super::tree_extract::{extract_trees, unmark_all, Branch, Tree};
use super::volumes::ModelVolumes;
use crate::clipper;
use crate::geometry::ExPolygons;
use crate::mesh::TriangleMesh;
use crate::slice::slice_mesh;
use crate::{unscale, CoordF, Error, Result};
use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::{debug, info};

/// Simplification tolerance ceiling for composed base layers (mm).
const MAX_SIMPLIFY_TOLERANCE: CoordF = 0.03;

/// Rooted branches resting on the model are propagated at most this many
/// bottom radii downwards.
const PROPAGATE_RADIUS_FACTOR: i64 = 5;

/// Polygons accumulated for one layer.
#[derive(Debug, Clone, Default)]
pub struct Slice {
    pub polygons: ExPolygons,
    pub bottom_contacts: ExPolygons,
    /// Number of contributions. Above one, the polygons may overlap.
    pub num_branches: usize,
}

impl Slice {
    fn add(&mut self, polygons: ExPolygons, bottom_contacts: ExPolygons) {
        self.num_branches += 1;
        self.polygons.extend(polygons);
        self.bottom_contacts.extend(bottom_contacts);
    }

    /// Resolve overlaps left by multiple contributions.
    fn union_pending(&mut self) {
        if self.num_branches > 1 {
            self.polygons = clipper::union_ex(&self.polygons);
            self.bottom_contacts = clipper::union_ex(&self.bottom_contacts);
            self.num_branches = 1;
        }
    }
}

/// Per-layer slices of a single tree.
#[derive(Debug, Clone, Default)]
pub struct TreeSlices {
    /// Layer of `slices[0]`, `None` until a branch contributed.
    pub first_layer_id: Option<LayerIndex>,
    pub slices: Vec<Slice>,
}

impl TreeSlices {
    /// One past the last layer covered.
    pub fn end_layer_id(&self) -> Option<LayerIndex> {
        self.first_layer_id
            .map(|first| first + self.slices.len() as LayerIndex)
    }

    fn add_branch(&mut self, branch: BranchSlices) {
        let begin = branch.layer_begin;
        let end = begin + branch.slices.len() as LayerIndex;
        if begin >= end {
            return;
        }

        let new_begin = self.first_layer_id.map_or(begin, |first| first.min(begin));
        let new_end = self.end_layer_id().map_or(end, |old_end| old_end.max(end));
        if let Some(first) = self.first_layer_id {
            if first > new_begin {
                let grow = (first - new_begin) as usize;
                self.slices
                    .splice(0..0, std::iter::repeat_with(Slice::default).take(grow));
            }
        }
        self.slices
            .resize_with((new_end - new_begin) as usize, Slice::default);
        self.first_layer_id = Some(new_begin);

        let offset = (begin - new_begin) as usize;
        let mut contacts = branch.bottom_contacts.into_iter();
        for (j, polygons) in branch.slices.into_iter().enumerate() {
            let bottom = contacts.next().unwrap_or_default();
            if !polygons.is_empty() {
                self.slices[offset + j].add(polygons, bottom);
            }
        }
    }
}

/// Slices of one branch, starting at `layer_begin`.
#[derive(Debug, Default)]
struct BranchSlices {
    layer_begin: LayerIndex,
    slices: Vec<ExPolygons>,
    /// Aligned with `slices`, possibly shorter.
    bottom_contacts: Vec<ExPolygons>,
}

/// Layers produced by [`organic_draw_branches`].
#[derive(Debug, Default)]
pub struct OrganicDrawOutput {
    pub layer_storage: SupportGeneratorLayerStorage,
    /// Bottom contact layer per layer index.
    pub bottom_contacts: Vec<Option<LayerId>>,
    /// Base layer per layer index.
    pub intermediate_layers: Vec<Option<LayerId>>,
}

impl OrganicDrawOutput {
    pub fn new(num_layers: usize) -> Self {
        Self {
            layer_storage: SupportGeneratorLayerStorage::new(),
            bottom_contacts: vec![None; num_layers],
            intermediate_layers: vec![None; num_layers],
        }
    }

    pub fn bottom_contact_layer(&self, layer_idx: usize) -> Option<&SupportGeneratorLayer> {
        self.bottom_contacts
            .get(layer_idx)
            .copied()
            .flatten()
            .and_then(|id| self.layer_storage.get(id))
    }

    pub fn base_layer(&self, layer_idx: usize) -> Option<&SupportGeneratorLayer> {
        self.intermediate_layers
            .get(layer_idx)
            .copied()
            .flatten()
            .and_then(|id| self.layer_storage.get(id))
    }

    /// Whether no layer has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.layer_storage.is_empty()
            && self.bottom_contacts.iter().all(Option::is_none)
            && self.intermediate_layers.iter().all(Option::is_none)
    }

    fn ensure_layers(&mut self, num_layers: usize) {
        if self.bottom_contacts.len() < num_layers {
            self.bottom_contacts.resize(num_layers, None);
        }
        if self.intermediate_layers.len() < num_layers {
            self.intermediate_layers.resize(num_layers, None);
        }
    }
}

/// Summary of an [`organic_draw_branches`] run.
#[derive(Debug, Clone, Default)]
pub struct OrganicDrawStats {
    pub smoothing: SmoothingStats,
    pub num_trees: usize,
    pub num_branches: usize,
    pub num_base_layers: usize,
    pub num_bottom_contact_layers: usize,
}

/// Extrude and slice one branch, clip it by the model and handle its root.
fn slice_branch<V: ModelVolumes + ?Sized>(
    volumes: &V,
    settings: &TreeSupportSettings,
    mesh_config: &BranchMeshConfig,
    move_bounds: &[SupportElements],
    branch: &Branch,
) -> Option<BranchSlices> {
    let mut mesh = TriangleMesh::new();
    let (zmin, zmax) = extrude_branch(&branch.path, move_bounds, settings, mesh_config, &mut mesh)?;

    let first = &branch.first().get(move_bounds).state;
    let last = &branch.last().get(move_bounds).state;
    let mut layer_begin = if branch.has_root {
        first.layer_idx
    } else {
        first.layer_idx.min(settings.layer_idx_ceil(zmin))
    };
    let layer_end = 1 + if branch.has_tip {
        last.layer_idx
    } else {
        last.layer_idx.max(settings.layer_idx_floor(zmax))
    };

    let zs: Vec<CoordF> = (layer_begin..layer_end)
        .map(|layer_idx| settings.layer_slice_z(layer_idx))
        .collect();
    let mut slices: Vec<ExPolygons> = slice_mesh(&mesh, &zs)
        .into_iter()
        .zip(layer_begin..)
        .map(|(slice, layer_idx)| {
            clipper::difference(&slice, &volumes.collision(0, layer_idx as usize, true))
        })
        .collect();
    let mut bottom_contacts: Vec<ExPolygons> = Vec::new();

    let num_empty = slices.iter().take_while(|s| s.is_empty()).count();
    if num_empty == slices.len() {
        return None;
    }

    if num_empty == 0 && branch.has_root {
        if first.bits.to_model_gracious {
            if settings.support_floor_layers > 0 {
                bottom_contacts.push(clipper::intersection(
                    &slices[0],
                    &volumes.placeable_areas(0, layer_begin as usize),
                ));
            }
        } else if layer_begin > 0 {
            let extra = propagate_downwards(volumes, settings, &slices[0], first, layer_begin);
            let num_extra = extra.len();
            if num_extra > 0 {
                if settings.support_floor_layers > 0 {
                    // The lowest propagated slice carries no contact
                    bottom_contacts.push(Vec::new());
                    for (i, polygons) in extra.iter().enumerate().rev().skip(1) {
                        let layer_idx = layer_begin - i as LayerIndex - 1;
                        bottom_contacts.push(clipper::intersection(
                            polygons,
                            &volumes.placeable_areas(0, layer_idx as usize),
                        ));
                    }
                }
                layer_begin -= num_extra as LayerIndex;
                slices.splice(0..0, extra.into_iter().rev());
            }
        }
    }

    while slices.last().is_some_and(|s| s.is_empty()) {
        slices.pop();
    }
    slices.drain(..num_empty);

    Some(BranchSlices {
        layer_begin: layer_begin + num_empty as LayerIndex,
        slices,
        bottom_contacts,
    })
}

/// Drop the footprint of a root that does not rest on anything layer by layer.
///
/// Returns the propagated footprints, the one directly below `layer_begin` first.
fn propagate_downwards<V: ModelVolumes + ?Sized>(
    volumes: &V,
    settings: &TreeSupportSettings,
    footprint: &ExPolygons,
    root: &SupportElementState,
    layer_begin: LayerIndex,
) -> Vec<ExPolygons> {
    let bottom_radius = root.radius as CoordF;
    let layers_propagate_max =
        PROPAGATE_RADIUS_FACTOR * root.radius / settings.layer_height_scaled().max(1);
    let layer_bottommost = if root.bits.verylost {
        // Hanging in the air, bring it all the way down
        0
    } else {
        (layer_begin - layers_propagate_max).max(0)
    };
    let branch_radius = settings.branch_radius as CoordF;
    let support_area_stop =
        (0.2 * PI * bottom_radius * bottom_radius).max(0.5 * PI * branch_radius * branch_radius);

    let mut extra: Vec<ExPolygons> = Vec::new();
    let mut layer_idx = layer_begin - 1;
    while layer_idx >= layer_bottommost {
        let above = extra.last().unwrap_or(footprint);
        let rest_support =
            clipper::difference(above, &volumes.collision(0, layer_idx as usize, false));
        if clipper::total_area(&rest_support) < support_area_stop {
            break;
        }
        extra.push(rest_support);
        layer_idx -= 1;
    }

    debug!(
        layer_begin,
        propagated = extra.len(),
        verylost = root.bits.verylost,
        "Propagated branch root downwards"
    );
    extra
}

/// Extrude, slice and accumulate every branch of `tree`.
fn draw_tree<V: ModelVolumes + ?Sized>(
    volumes: &V,
    settings: &TreeSupportSettings,
    mesh_config: &BranchMeshConfig,
    move_bounds: &[SupportElements],
    tree: &Tree,
    throw_on_cancel: &(dyn Fn() -> Result<()> + Sync),
) -> Result<TreeSlices> {
    let mut tree_slices = TreeSlices::default();
    for branch in &tree.branches {
        if let Some(slices) = slice_branch(volumes, settings, mesh_config, move_bounds, branch) {
            tree_slices.add_branch(slices);
        }
        throw_on_cancel()?;
    }
    Ok(tree_slices)
}

/// Compose the final polygons of one layer.
///
/// Returns (bottom contact, base), either possibly empty.
fn compose_layer(
    slice: Slice,
    top_contacts: Option<&ExPolygons>,
    settings: &TreeSupportSettings,
) -> (ExPolygons, ExPolygons) {
    let mut base = slice.polygons;
    let mut bottom = slice.bottom_contacts;
    if slice.num_branches > 1 {
        bottom = clipper::union_ex(&bottom);
    }

    if !base.is_empty() {
        base = clipper::smooth_outward(
            &clipper::union_ex(&base),
            unscale(settings.support_line_width),
        );
        let tolerance = MAX_SIMPLIFY_TOLERANCE.min(unscale(settings.resolution));
        base = clipper::simplify(&base, tolerance);
    }

    if let Some(top) = top_contacts.filter(|top| !top.is_empty()) {
        if !base.is_empty() {
            base = clipper::difference(&base, top);
            if !bottom.is_empty() {
                bottom = clipper::difference(&bottom, top);
            }
        }
    }
    if !bottom.is_empty() {
        base = clipper::difference(&base, &bottom);
    }
    if !base.is_empty() {
        base = clipper::union_ex(&base);
    }
    (bottom, base)
}

/// Draw organic branches from a settled element graph.
///
/// `move_bounds` holds the elements of every layer; their positions are
/// relaxed in place. `top_contacts` holds the top contact polygons per layer
/// and may be shorter than the number of layers. `output` must not hold any
/// layers yet. Nothing is written to it if the run is cancelled.
#[allow(clippy::too_many_arguments)]
pub fn organic_draw_branches<V: ModelVolumes + ?Sized>(
    volumes: &mut V,
    settings: &TreeSupportSettings,
    smooth_config: &OrganicSmoothConfig,
    mesh_config: &BranchMeshConfig,
    move_bounds: &mut [SupportElements],
    top_contacts: &[ExPolygons],
    output: &mut OrganicDrawOutput,
    throw_on_cancel: &(dyn Fn() -> Result<()> + Sync),
) -> Result<OrganicDrawStats> {
    if !output.is_empty() {
        return Err(Error::Config("organic draw output already holds layers".into()));
    }
    let links = ElementsWithLinkDown::build(move_bounds);
    throw_on_cancel()?;

    let smoothing = organic_smooth_branches_avoid_collisions(
        &*volumes,
        settings,
        smooth_config,
        move_bounds,
        &links,
        throw_on_cancel,
    )?;

    // Only the object collision is queried from here on
    volumes.clear_all_but_object_collision();
    unmark_all(move_bounds);
    let trees = extract_trees(move_bounds, settings.tree_selection);
    throw_on_cancel()?;

    let move_bounds: &[SupportElements] = move_bounds;
    let volumes: &V = volumes;

    let mut tree_slices = trees
        .par_iter()
        .map(|tree| draw_tree(volumes, settings, mesh_config, move_bounds, tree, throw_on_cancel))
        .collect::<Result<Vec<_>>>()?;

    tree_slices.par_iter_mut().try_for_each(|tree| {
        tree.slices.iter_mut().for_each(Slice::union_pending);
        throw_on_cancel()
    })?;

    let num_layers = tree_slices
        .iter()
        .filter_map(TreeSlices::end_layer_id)
        .max()
        .unwrap_or(0)
        .max(0) as usize;
    let mut slices = vec![Slice::default(); num_layers];
    for tree in tree_slices {
        let Some(first) = tree.first_layer_id else {
            continue;
        };
        for (layer_idx, src) in (first as usize..).zip(tree.slices) {
            if !src.polygons.is_empty() {
                slices[layer_idx].add(src.polygons, src.bottom_contacts);
            }
        }
    }
    slices.truncate(move_bounds.len());
    throw_on_cancel()?;

    let composed = slices
        .into_par_iter()
        .enumerate()
        .map(|(layer_idx, slice)| {
            let layer = compose_layer(slice, top_contacts.get(layer_idx), settings);
            throw_on_cancel()?;
            Ok(layer)
        })
        .collect::<Result<Vec<_>>>()?;

    output.ensure_layers(composed.len());
    let mut stats = OrganicDrawStats {
        smoothing,
        num_trees: trees.len(),
        num_branches: trees.iter().map(|t| t.branches.len()).sum(),
        ..Default::default()
    };
    for (layer_idx, (bottom, base)) in composed.into_iter().enumerate() {
        if !bottom.is_empty() {
            output.bottom_contacts[layer_idx] = Some(store_layer(
                &mut output.layer_storage,
                SupportLayerType::BottomContact,
                settings,
                layer_idx,
                bottom,
            ));
            stats.num_bottom_contact_layers += 1;
        }
        if !base.is_empty() {
            output.intermediate_layers[layer_idx] = Some(store_layer(
                &mut output.layer_storage,
                SupportLayerType::Base,
                settings,
                layer_idx,
                base,
            ));
            stats.num_base_layers += 1;
        }
    }

    info!(
        trees = stats.num_trees,
        branches = stats.num_branches,
        base_layers = stats.num_base_layers,
        bottom_contact_layers = stats.num_bottom_contact_layers,
        "Organic branches drawn"
    );
    Ok(stats)
}

fn store_layer(
    storage: &mut SupportGeneratorLayerStorage,
    layer_type: SupportLayerType,
    settings: &TreeSupportSettings,
    layer_idx: usize,
    polygons: ExPolygons,
) -> LayerId {
    let id = layer_allocate(storage, layer_type, settings, layer_idx as LayerIndex);
    if let Some(layer) = storage.get_mut(id) {
        layer.polygons = polygons;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::total_area_mm2;
    use crate::geometry::{ExPolygon, Point};
    use crate::support::element::{SupportElement, SupportElementState};
    use crate::support::never_cancel;
    use crate::support::volumes::{TreeModelVolumes, TreeModelVolumesConfig};
    use crate::scale;

    fn square(x: f64, size: f64) -> ExPolygons {
        vec![ExPolygon::square(Point::new_scale(x, 0.0), scale(size / 2.0))]
    }

    fn column(first: usize, last: usize, radius: f64) -> Vec<SupportElements> {
        (0..=last)
            .map(|layer| {
                if layer < first {
                    return Vec::new();
                }
                let parents = if layer < last { vec![0] } else { vec![] };
                vec![SupportElement::with_parents(
                    SupportElementState::new(layer as i64, Point::zero(), scale(radius)),
                    parents,
                )]
            })
            .collect()
    }

    #[test]
    fn test_tree_slices_grow_both_ways() {
        let mut tree = TreeSlices::default();
        assert_eq!(tree.end_layer_id(), None);

        tree.add_branch(BranchSlices {
            layer_begin: 4,
            slices: vec![square(0.0, 1.0), square(0.0, 1.0)],
            bottom_contacts: vec![square(0.0, 0.5)],
        });
        assert_eq!(tree.first_layer_id, Some(4));
        assert_eq!(tree.end_layer_id(), Some(6));
        assert_eq!(tree.slices[0].bottom_contacts.len(), 1);

        tree.add_branch(BranchSlices {
            layer_begin: 2,
            slices: vec![square(0.0, 1.0), Vec::new(), square(0.5, 1.0)],
            bottom_contacts: Vec::new(),
        });
        assert_eq!(tree.first_layer_id, Some(2));
        assert_eq!(tree.end_layer_id(), Some(6));
        assert_eq!(tree.slices[0].num_branches, 1);
        assert_eq!(tree.slices[1].num_branches, 0);
        assert_eq!(tree.slices[2].num_branches, 2);

        tree.add_branch(BranchSlices {
            layer_begin: 7,
            slices: vec![square(0.0, 1.0)],
            bottom_contacts: Vec::new(),
        });
        assert_eq!(tree.end_layer_id(), Some(8));
        assert_eq!(tree.slices.len(), 6);
        assert_eq!(tree.slices[4].num_branches, 0);
    }

    #[test]
    fn test_union_pending_merges_overlaps() {
        let mut slice = Slice::default();
        slice.add(square(0.0, 2.0), Vec::new());
        slice.add(square(1.0, 2.0), Vec::new());
        assert_eq!(slice.polygons.len(), 2);

        slice.union_pending();
        assert_eq!(slice.num_branches, 1);
        assert_eq!(slice.polygons.len(), 1);
        assert!((total_area_mm2(&slice.polygons) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_compose_layer_subtracts_contacts() {
        let settings = TreeSupportSettings::default();
        let slice = Slice {
            polygons: square(0.0, 4.0),
            bottom_contacts: square(-1.0, 2.0),
            num_branches: 1,
        };
        let top = square(1.5, 1.0);
        let (bottom, base) = compose_layer(slice, Some(&top), &settings);
        assert!((total_area_mm2(&bottom) - 4.0).abs() < 1e-6);
        assert!((total_area_mm2(&base) - (16.0 - 4.0 - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_compose_layer_smooths_branch_junction() {
        let settings = TreeSupportSettings {
            resolution: 0,
            ..Default::default()
        };
        let branches: ExPolygons = [-0.9, 0.9]
            .iter()
            .map(|&x| ExPolygon::circle(Point::new_scale(x, 0.0), scale(1.0), 64))
            .collect();
        let merged = clipper::union_ex(&branches);
        let slice = Slice {
            polygons: branches,
            bottom_contacts: Vec::new(),
            num_branches: 2,
        };

        let (_, base) = compose_layer(slice, None, &settings);
        assert_eq!(base.len(), 1);
        // The notches between the branches are filled, the footprint kept
        assert!(total_area_mm2(&base) > total_area_mm2(&merged) + 1e-5);
        assert!(total_area_mm2(&clipper::difference(&merged, &base)) < 1e-4);
    }

    #[test]
    fn test_draw_single_column() {
        let mut volumes = TreeModelVolumes::new(TreeModelVolumesConfig::default());
        let settings = TreeSupportSettings::default();
        let mut move_bounds = column(0, 5, 1.0);
        let mut output = OrganicDrawOutput::new(move_bounds.len());

        let stats = organic_draw_branches(
            &mut volumes,
            &settings,
            &OrganicSmoothConfig::default(),
            &BranchMeshConfig::default(),
            &mut move_bounds,
            &[],
            &mut output,
            &never_cancel,
        )
        .expect("not cancelled");

        assert_eq!(stats.num_trees, 1);
        assert_eq!(stats.num_branches, 1);
        assert_eq!(stats.num_bottom_contact_layers, 0);
        assert_eq!(stats.num_base_layers, 6);
        for layer_idx in 0..6 {
            let layer = output.base_layer(layer_idx).expect("base layer");
            assert_eq!(layer.layer_type, SupportLayerType::Base);
            assert_eq!(layer.idx_layer, layer_idx as i64);
            assert!(layer.area() > 2.5 && layer.area() < PI);
        }
    }

    #[test]
    fn test_gracious_root_emits_bottom_contact() {
        let mut volumes = TreeModelVolumes::new(TreeModelVolumesConfig::default());
        let settings = TreeSupportSettings {
            support_floor_layers: 2,
            ..Default::default()
        };
        let mut move_bounds = column(0, 4, 1.0);
        move_bounds[0][0].state.bits.to_model_gracious = true;
        let mut output = OrganicDrawOutput::new(move_bounds.len());

        let stats = organic_draw_branches(
            &mut volumes,
            &settings,
            &OrganicSmoothConfig::default(),
            &BranchMeshConfig::default(),
            &mut move_bounds,
            &[],
            &mut output,
            &never_cancel,
        )
        .expect("not cancelled");

        assert_eq!(stats.num_bottom_contact_layers, 1);
        let contact = output.bottom_contact_layer(0).expect("contact on the bed");
        assert_eq!(contact.layer_type, SupportLayerType::BottomContact);
        assert!(contact.area() > 2.5);
        // The contact is carved out of the base
        let base_area = output.base_layer(0).map_or(0.0, |layer| layer.area());
        assert!(base_area < 0.1);
        assert!(output.base_layer(1).is_some());
    }

    #[test]
    fn test_cancelled_run_writes_nothing() {
        let mut volumes = TreeModelVolumes::new(TreeModelVolumesConfig::default());
        let settings = TreeSupportSettings::default();
        let mut move_bounds = column(0, 5, 1.0);
        let mut output = OrganicDrawOutput::new(move_bounds.len());
        let cancel = || -> crate::Result<()> { Err(crate::Error::Cancelled) };

        let result = organic_draw_branches(
            &mut volumes,
            &settings,
            &OrganicSmoothConfig::default(),
            &BranchMeshConfig::default(),
            &mut move_bounds,
            &[],
            &mut output,
            &cancel,
        );
        assert!(matches!(result, Err(crate::Error::Cancelled)));
        assert!(output.layer_storage.is_empty());
        assert!(output.intermediate_layers.iter().all(Option::is_none));
    }

    #[test]
    fn test_reused_output_is_rejected() {
        let mut volumes = TreeModelVolumes::new(TreeModelVolumesConfig::default());
        let settings = TreeSupportSettings::default();
        let mut output = OrganicDrawOutput::new(6);
        assert!(output.is_empty());

        let mut run = |output: &mut OrganicDrawOutput| {
            organic_draw_branches(
                &mut volumes,
                &settings,
                &OrganicSmoothConfig::default(),
                &BranchMeshConfig::default(),
                &mut column(0, 5, 1.0),
                &[],
                output,
                &never_cancel,
            )
        };
        assert!(run(&mut output).is_ok());
        assert!(!output.is_empty());
        let stored = output.layer_storage.len();

        assert!(matches!(run(&mut output), Err(Error::Config(_))));
        assert_eq!(output.layer_storage.len(), stored);
    }
}
