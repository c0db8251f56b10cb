//! Per-layer collision boundaries for branch relaxation.
//!
//! One cache per build layer that holds elements, recording the smallest
//! element radius on it. The boundary is kept as unscaled line segments with an
//! AABB tree over them for nearest-distance queries.

use super::element::SupportElements;
use super::volumes::ModelVolumes;
use crate::geometry::{to_lines, ExPolygons, LinesDistancer, PointF};
use crate::{unscale, Coord, CoordF, Result};
use rayon::prelude::*;
use tracing::debug;

/// Collision boundary of one layer.
#[derive(Debug, Clone, Default)]
pub struct LayerCollisionCache {
    /// Smallest radius of any element on this layer, if any element is there.
    pub min_element_radius: Option<Coord>,
    /// Radius the boundary was computed for (scaled).
    pub collision_radius: Coord,
    distancer: LinesDistancer,
}

impl LayerCollisionCache {
    /// Cache that never reports a collision.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cache over `boundary`, which was computed for `collision_radius`.
    pub fn from_boundary(collision_radius: Coord, boundary: &ExPolygons) -> Self {
        Self {
            min_element_radius: None,
            collision_radius,
            distancer: LinesDistancer::new(to_lines(boundary)),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distancer.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.distancer.lines().len()
    }

    /// Penetration of a disc of `radius` mm centered at `point` into the boundary.
    ///
    /// Returns the depth and the closest boundary point, or `None` when the
    /// disc does not reach the boundary.
    pub fn collision_depth(&self, point: &PointF, radius: CoordF) -> Option<(CoordF, PointF)> {
        if self.is_empty() {
            return None;
        }
        let collision_radius = unscale(self.collision_radius);
        let max_dist = radius - collision_radius;
        if max_dist <= 0.0 {
            return None;
        }
        self.distancer
            .closest_within(point, max_dist)
            .map(|hit| (radius - (hit.squared_distance.sqrt() + collision_radius), hit.point))
    }
}

/// Build one cache per layer of `move_bounds`.
///
/// Layers without elements get an empty cache. Every other layer takes the
/// smallest boundary the volumes have, which is never larger than any element.
pub fn build_layer_collision_caches<V: ModelVolumes + ?Sized>(
    volumes: &V,
    move_bounds: &[SupportElements],
    throw_on_cancel: &(dyn Fn() -> Result<()> + Sync),
) -> Result<Vec<LayerCollisionCache>> {
    let min_radii: Vec<Option<Coord>> = move_bounds
        .iter()
        .map(|layer| layer.iter().map(|elem| elem.state.radius).min())
        .collect();

    throw_on_cancel()?;

    let caches = min_radii
        .par_iter()
        .enumerate()
        .map(|(layer_idx, min_radius)| {
            let Some(min_radius) = *min_radius else {
                return Ok(LayerCollisionCache::empty());
            };
            // Boundary lines have to stay outside every sphere center on this layer
            let mut cache = match volumes.collision_lower_bound_area(layer_idx, 0) {
                Some((collision_radius, boundary)) => {
                    LayerCollisionCache::from_boundary(collision_radius, &boundary)
                }
                None => LayerCollisionCache::empty(),
            };
            cache.min_element_radius = Some(min_radius);
            throw_on_cancel()?;
            Ok(cache)
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        layers = caches.len(),
        non_empty = caches.iter().filter(|c| !c.is_empty()).count(),
        "Built layer collision caches"
    );
    Ok(caches)
}
