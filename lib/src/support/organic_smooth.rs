//! Organic Smoothing - Branch smoothing and collision avoidance for tree supports.
//!
//! Every support element becomes a collision sphere. Spheres are nudged away
//! from the model boundary and pulled towards their neighbours until nothing
//! moves any more.
//!
//! # Algorithm Overview
//!
//! 1. **Collision Detection**: for every layer a sphere spans, intersect the
//!    sphere with the layer's collision boundary and keep the deepest hit
//! 2. **Collision Avoidance**: push the sphere away from that hit
//! 3. **Laplacian Smoothing**: blend towards the radius weighted average of the
//!    neighbours' positions from the previous iteration
//! 4. **Iteration**: repeat until no sphere collides or the iteration cap is hit
//!
//! Iterations are Jacobi style: neighbours are always read from the snapshot
//! taken at the start of the iteration, so spheres are updated in parallel.

use super::collision_cache::{build_layer_collision_caches, LayerCollisionCache};
use super::element::{NodeId, SupportElements};
use super::settings::{LayerIndex, TreeSupportSettings};
use super::volumes::ModelVolumes;
use crate::geometry::{Point3F, PointF};
use crate::{unscale, CoordF, Error, Result, EPSILON};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Configuration for organic smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganicSmoothConfig {
    /// Extra gap to keep from a collision (mm).
    pub collision_extra_gap: CoordF,
    /// Maximum distance to nudge per iteration for collision avoidance (mm).
    pub max_nudge_collision_avoidance: CoordF,
    /// Maximum distance to nudge per iteration for smoothing (mm).
    pub max_nudge_smoothing: CoordF,
    /// Blend factor towards the neighbour average (0.0 - 1.0).
    pub smoothing_factor: f64,
    pub max_iterations: usize,
}

impl Default for OrganicSmoothConfig {
    fn default() -> Self {
        Self {
            collision_extra_gap: 0.1,
            max_nudge_collision_avoidance: 0.5,
            max_nudge_smoothing: 0.2,
            smoothing_factor: 0.5,
            max_iterations: 100,
        }
    }
}

impl OrganicSmoothConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(Error::Config(format!(
                "smoothing_factor must be within [0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if self.max_nudge_collision_avoidance < 0.0 || self.max_nudge_smoothing < 0.0 {
            return Err(Error::Config("nudge limits must not be negative".into()));
        }
        Ok(())
    }
}

/// All elements in one flat list, each paired with the element it rests on.
///
/// Entry `linear_data_layers[layer] + elem_idx` is `move_bounds[layer][elem_idx]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementsWithLinkDown {
    /// Element and the index of its down link in the layer below.
    pub links: Vec<(NodeId, Option<usize>)>,
    /// Offset of each layer's first element in `links`, plus the total count.
    pub linear_data_layers: Vec<usize>,
}

impl ElementsWithLinkDown {
    /// Link every element to the element below that lists it as a parent.
    ///
    /// Parents without a resolved position get no link.
    pub fn build(move_bounds: &[SupportElements]) -> Self {
        let mut links = Vec::with_capacity(move_bounds.iter().map(Vec::len).sum());
        let mut linear_data_layers = Vec::with_capacity(move_bounds.len() + 1);
        linear_data_layers.push(0);

        let mut map_downwards_old: HashMap<usize, usize> = HashMap::new();
        for (layer_idx, layer) in move_bounds.iter().enumerate() {
            let layer_above = move_bounds.get(layer_idx + 1);
            let mut map_downwards_new: HashMap<usize, usize> = HashMap::new();
            for (elem_idx, elem) in layer.iter().enumerate() {
                let child = map_downwards_old.get(&elem_idx).copied();
                for &parent_idx in &elem.parents {
                    let parent_set = layer_above
                        .and_then(|above| above.get(parent_idx))
                        .is_some_and(|parent| parent.state.result_on_layer_is_set());
                    if parent_set {
                        let previous = map_downwards_new.insert(parent_idx, elem_idx);
                        // Only one link points to a node from below
                        debug_assert!(previous.is_none());
                    }
                }
                links.push((NodeId::new(layer_idx, elem_idx), child));
            }
            map_downwards_old = map_downwards_new;
            linear_data_layers.push(links.len());
        }

        Self {
            links,
            linear_data_layers,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Position of `node` in the flat list.
    #[inline]
    pub fn linear_index(&self, node: NodeId) -> usize {
        self.linear_data_layers[node.layer_idx] + node.elem_idx
    }
}

/// Relaxation state of one support element.
#[derive(Debug, Clone)]
pub struct CollisionSphere {
    pub node: NodeId,
    /// Linear index of the sphere this one rests on.
    pub element_below_id: Option<usize>,
    /// Linear indices of the spheres resting on this one.
    pub parent_ids: Vec<usize>,
    pub locked: bool,
    /// Radius (mm).
    pub radius: CoordF,
    /// Current position (mm); z is the layer's print Z.
    pub position: Point3F,
    pub last_collision: Option<Point3F>,
    pub last_collision_depth: CoordF,
    /// Z range over which collisions are evaluated.
    pub min_z: CoordF,
    pub max_z: CoordF,
    /// Layers checked for collisions, end exclusive.
    pub layer_begin: usize,
    pub layer_end: usize,
}

/// Build collision spheres for all linked elements.
///
/// Z spans are propagated in two passes: `min_z` upwards from the element
/// below, then `max_z` downwards from the tips. Both are finally clipped to
/// the sphere itself.
pub fn build_collision_spheres(
    move_bounds: &[SupportElements],
    links: &ElementsWithLinkDown,
    settings: &TreeSupportSettings,
    num_cache_layers: usize,
) -> Vec<CollisionSphere> {
    let mut unresolved = 0usize;
    let mut spheres: Vec<CollisionSphere> = Vec::with_capacity(links.len());

    for &(node, link_down) in &links.links {
        let element = node.get(move_bounds);
        let state = &element.state;
        let layer_idx = node.layer_idx as LayerIndex;
        let position_2d = match state.result_on_layer {
            Some(p) => p.to_f64(),
            None => {
                unresolved += 1;
                PointF::zero()
            }
        };
        let position = Point3F::from_2d(position_2d, settings.layer_z(layer_idx));
        let below_id = link_down.map(|below| links.linear_data_layers[node.layer_idx - 1] + below);
        let min_z = match below_id {
            Some(below) => spheres[below].min_z,
            None => position.z,
        };
        let offset_above = links.linear_data_layers.get(node.layer_idx + 1).copied();
        let parent_ids = match offset_above {
            Some(offset) => element.parents.iter().map(|&p| offset + p).collect(),
            None => Vec::new(),
        };

        spheres.push(CollisionSphere {
            node,
            element_below_id: below_id,
            parent_ids,
            // Roots and tips hold the branch in place
            locked: link_down.is_none()
                || element.parents.is_empty()
                || !state.result_on_layer_is_set(),
            radius: unscale(state.radius),
            position,
            last_collision: None,
            last_collision_depth: -CoordF::MAX,
            min_z,
            max_z: CoordF::MAX,
            layer_begin: 0,
            layer_end: 0,
        });
    }

    // Propagate max_z from the tips of the branches
    for sphere_id in (0..spheres.len()).rev() {
        let max_z = if spheres[sphere_id].parent_ids.is_empty() {
            spheres[sphere_id].position.z
        } else {
            spheres[sphere_id]
                .parent_ids
                .iter()
                .map(|&p| spheres[p].max_z)
                .fold(CoordF::MAX, CoordF::min)
        };
        spheres[sphere_id].max_z = max_z;
    }

    for sphere in &mut spheres {
        sphere.min_z = sphere.min_z.max(sphere.position.z - sphere.radius);
        sphere.max_z = sphere.max_z.min(sphere.position.z + sphere.radius);
        let layer_idx = sphere.node.layer_idx as LayerIndex;
        let begin = layer_idx.min(settings.layer_idx_ceil(sphere.min_z)).max(0);
        let end = (layer_idx.max(settings.layer_idx_floor(sphere.max_z)) + 1)
            .min(num_cache_layers as LayerIndex)
            .max(begin);
        sphere.layer_begin = begin as usize;
        sphere.layer_end = end as usize;
    }

    if unresolved > 0 {
        warn!(unresolved, "Support elements without a resolved position were locked");
    }
    spheres
}

/// Push a sphere out of the deepest collision it has with any layer it spans.
///
/// Returns whether the collision was deep enough to count as a move.
fn avoid_collision(
    sphere: &mut CollisionSphere,
    caches: &[LayerCollisionCache],
    settings: &TreeSupportSettings,
    config: &OrganicSmoothConfig,
) -> bool {
    sphere.last_collision_depth = -CoordF::MAX;
    sphere.last_collision = None;
    let center = sphere.position.to_2d();
    let own_layer = sphere.node.layer_idx as LayerIndex;

    for layer_id in sphere.layer_begin..sphere.layer_end {
        let dz = (layer_id as LayerIndex - own_layer) as CoordF * settings.layer_height;
        let r2 = sphere.radius * sphere.radius - dz * dz;
        if r2 <= 0.0 {
            continue;
        }
        let Some(cache) = caches.get(layer_id) else {
            continue;
        };
        if let Some((depth, hit)) = cache.collision_depth(&center, r2.sqrt()) {
            if depth > sphere.last_collision_depth {
                sphere.last_collision_depth = depth;
                sphere.last_collision = Some(Point3F::from_2d(
                    hit,
                    settings.layer_z(layer_id as LayerIndex),
                ));
            }
        }
    }

    let Some(hit) = sphere.last_collision else {
        return false;
    };
    if sphere.last_collision_depth <= 0.0 {
        return false;
    }
    let nudge_dist = (sphere.last_collision_depth + config.collision_extra_gap)
        .max(0.0)
        .min(config.max_nudge_collision_avoidance);
    let nudge = (center - hit.to_2d()).normalize() * nudge_dist;
    sphere.position.x += nudge.x;
    sphere.position.y += nudge.y;

    // A little hysteresis to detect the end of the iteration
    sphere.last_collision_depth > EPSILON
}

/// Blend a sphere towards the weighted average of its neighbours.
fn smooth(sphere: &mut CollisionSphere, prev_positions: &[PointF], config: &OrganicSmoothConfig) {
    let mut avg = PointF::zero();
    let mut weight = 0.0;
    for &parent in &sphere.parent_ids {
        let w = sphere.radius;
        avg += prev_positions[parent] * w;
        weight += w;
    }
    if let Some(below) = sphere.element_below_id {
        // The link down balances all parents together
        let w = weight;
        avg += prev_positions[below] * w;
        weight += w;
    }
    if weight <= 0.0 {
        return;
    }

    let avg = avg * (1.0 / weight);
    let old_pos = sphere.position.to_2d();
    let new_pos = old_pos * (1.0 - config.smoothing_factor) + avg * config.smoothing_factor;
    let shift = new_pos - old_pos;
    let nudge_dist = shift.length().min(config.max_nudge_smoothing);
    let nudged = old_pos + shift.normalize() * nudge_dist;
    sphere.position.x = nudged.x;
    sphere.position.y = nudged.y;
}

/// Outcome of a relaxation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmoothingStats {
    /// Iterations performed.
    pub iterations: usize,
    pub num_spheres: usize,
    pub num_locked: usize,
    /// Spheres moved by collision avoidance in the last iteration.
    pub last_num_moved: usize,
    /// Whether the run stopped because nothing moved.
    pub converged: bool,
}

/// Run the relaxation over prepared spheres and caches.
///
/// Positions are updated in place; locked spheres are never touched.
pub fn relax_collision_spheres(
    spheres: &mut [CollisionSphere],
    caches: &[LayerCollisionCache],
    settings: &TreeSupportSettings,
    config: &OrganicSmoothConfig,
    throw_on_cancel: &(dyn Fn() -> Result<()> + Sync),
) -> Result<SmoothingStats> {
    let mut stats = SmoothingStats {
        num_spheres: spheres.len(),
        num_locked: spheres.iter().filter(|s| s.locked).count(),
        ..Default::default()
    };

    for iter in 0..config.max_iterations {
        let prev_positions: Vec<PointF> = spheres.iter().map(|s| s.position.to_2d()).collect();
        let num_moved = AtomicUsize::new(0);

        spheres
            .par_iter_mut()
            .filter(|sphere| !sphere.locked)
            .try_for_each(|sphere| {
                if avoid_collision(sphere, caches, settings, config) {
                    num_moved.fetch_add(1, Ordering::Relaxed);
                }
                smooth(sphere, &prev_positions, config);
                throw_on_cancel()
            })?;

        stats.iterations = iter + 1;
        stats.last_num_moved = num_moved.into_inner();
        debug!(iteration = iter, moved = stats.last_num_moved, "Relaxation iteration");
        if stats.last_num_moved == 0 {
            stats.converged = true;
            break;
        }
    }

    Ok(stats)
}

/// Nudge branches away from the model and smooth their shape.
///
/// Final positions of unlocked elements are written back to
/// `result_on_layer` in `move_bounds`.
pub fn organic_smooth_branches_avoid_collisions<V: ModelVolumes + ?Sized>(
    volumes: &V,
    settings: &TreeSupportSettings,
    config: &OrganicSmoothConfig,
    move_bounds: &mut [SupportElements],
    links: &ElementsWithLinkDown,
    throw_on_cancel: &(dyn Fn() -> Result<()> + Sync),
) -> Result<SmoothingStats> {
    let caches = build_layer_collision_caches(volumes, move_bounds, throw_on_cancel)?;
    let mut spheres = build_collision_spheres(move_bounds, links, settings, caches.len());

    throw_on_cancel()?;

    let stats = relax_collision_spheres(&mut spheres, &caches, settings, config, throw_on_cancel)?;

    for sphere in spheres.iter().filter(|s| !s.locked) {
        let elem = &mut move_bounds[sphere.node.layer_idx][sphere.node.elem_idx];
        elem.state.result_on_layer = Some(sphere.position.to_2d().to_scaled());
    }

    info!(
        spheres = stats.num_spheres,
        locked = stats.num_locked,
        iterations = stats.iterations,
        converged = stats.converged,
        "Organic smoothing finished"
    );
    Ok(stats)
}
