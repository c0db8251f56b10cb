//! Model volumes - collision and placeable area queries for tree supports.
//!
//! The organic pipeline only needs three questions answered per layer:
//! 1. **Collision**: where may a branch of radius R not go?
//! 2. **Lower bound collision**: any already-computed boundary not larger
//!    than the requested radius, to build distance queries from.
//! 3. **Placeable areas**: where may a branch rest on the model or the bed?
//!
//! [`ModelVolumes`] is the query interface. [`TreeModelVolumes`] answers it
//! from per-layer model outlines and caches every (radius, layer) result.
//!
//! # Key Concepts
//!
//! - **Radius ceiling**: radii are rounded up to discrete values for caching
//! - **Lower bound**: largest cached radius not above the request

use crate::clipper::{self, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons, Point};
use crate::{scale, unscale, Coord, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Exponential growth factor for radius stepping above [`EXPONENTIAL_THRESHOLD`].
pub const EXPONENTIAL_FACTOR: f64 = 1.5;

/// Threshold below which linear radius stepping is used.
/// 3.0mm = 3,000,000 scaled units
pub const EXPONENTIAL_THRESHOLD: Coord = 3_000_000;

/// Volumetric queries consumed by the organic support pipeline.
///
/// Implementations must be deterministic for a given (radius, layer) pair.
pub trait ModelVolumes: Sync {
    /// Area a branch of `radius` centered inside would collide with the model.
    /// `min_xy_dist` selects the smaller model clearance.
    fn collision(&self, radius: Coord, layer_idx: usize, min_xy_dist: bool) -> ExPolygons;

    /// Collision area for the largest available radius not above `max_radius`,
    /// together with that radius. `None` if the layer has no data.
    fn collision_lower_bound_area(
        &self,
        layer_idx: usize,
        max_radius: Coord,
    ) -> Option<(Coord, ExPolygons)>;

    /// Areas where a branch of `radius` can rest.
    fn placeable_areas(&self, radius: Coord, layer_idx: usize) -> ExPolygons;

    /// Drop everything except the plain object collision cache.
    fn clear_all_but_object_collision(&mut self);
}

/// Key for caching layer polygons by radius and layer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RadiusLayerKey {
    pub radius: Coord,
    pub layer_idx: usize,
}

impl RadiusLayerKey {
    pub fn new(radius: Coord, layer_idx: usize) -> Self {
        Self { radius, layer_idx }
    }
}

/// Cache for polygons indexed by radius and layer.
///
/// Shared between worker threads. A poisoned lock still holds consistent
/// data (entries are only ever inserted whole), so poisoning is ignored.
#[derive(Debug, Default)]
pub struct RadiusLayerPolygonCache {
    data: RwLock<HashMap<RadiusLayerKey, Arc<ExPolygons>>>,
}

impl RadiusLayerPolygonCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RadiusLayerKey, Arc<ExPolygons>>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RadiusLayerKey, Arc<ExPolygons>>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, key: RadiusLayerKey, polygons: ExPolygons) -> Arc<ExPolygons> {
        let polygons = Arc::new(polygons);
        self.write().insert(key, Arc::clone(&polygons));
        polygons
    }

    pub fn get(&self, key: &RadiusLayerKey) -> Option<Arc<ExPolygons>> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &RadiusLayerKey) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.data
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Cached area for the largest radius <= `radius` on `layer_idx`.
    pub fn get_lower_bound(
        &self,
        radius: Coord,
        layer_idx: usize,
    ) -> Option<(Coord, Arc<ExPolygons>)> {
        self.read()
            .iter()
            .filter(|(key, _)| key.layer_idx == layer_idx && key.radius <= radius)
            .max_by_key(|(key, _)| key.radius)
            .map(|(key, polygons)| (key.radius, Arc::clone(polygons)))
    }
}

/// Configuration for [`TreeModelVolumes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeModelVolumesConfig {
    /// XY distance to keep from the model (scaled).
    pub xy_distance: Coord,
    /// Smaller XY distance used where the minimal clearance is requested (scaled).
    pub xy_min_distance: Coord,
    /// Linear radius rounding step below [`EXPONENTIAL_THRESHOLD`] (scaled).
    pub collision_resolution: Coord,
}

impl Default for TreeModelVolumesConfig {
    fn default() -> Self {
        Self {
            xy_distance: scale(0.8),
            xy_min_distance: scale(0.4),
            collision_resolution: scale(0.5),
        }
    }
}

impl TreeModelVolumesConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collision_resolution <= 0 {
            return Err(Error::Config(
                "collision_resolution must be positive".into(),
            ));
        }
        if self.xy_distance < 0 || self.xy_min_distance < 0 {
            return Err(Error::Config("xy distances must not be negative".into()));
        }
        Ok(())
    }
}

/// Cached collision and placeable areas computed from model outlines.
#[derive(Debug)]
pub struct TreeModelVolumes {
    config: TreeModelVolumesConfig,

    /// Model outlines at each layer.
    layer_outlines: Vec<ExPolygons>,

    /// Where branches may rest on layer 0.
    bed_area: ExPolygons,

    collision_cache: RadiusLayerPolygonCache,
    collision_cache_min_xy: RadiusLayerPolygonCache,
    placeable_cache: RadiusLayerPolygonCache,
}

impl TreeModelVolumes {
    pub fn new(config: TreeModelVolumesConfig) -> Self {
        let half = scale(1000.0);
        Self {
            config,
            layer_outlines: Vec::new(),
            bed_area: vec![ExPolygon::square(Point::zero(), half)],
            collision_cache: RadiusLayerPolygonCache::new(),
            collision_cache_min_xy: RadiusLayerPolygonCache::new(),
            placeable_cache: RadiusLayerPolygonCache::new(),
        }
    }

    /// Create with layer outlines from the sliced model.
    pub fn with_layer_outlines(
        config: TreeModelVolumesConfig,
        layer_outlines: Vec<ExPolygons>,
    ) -> Self {
        let mut volumes = Self::new(config);
        volumes.layer_outlines = layer_outlines;
        volumes
    }

    /// Replace the printable bed area. Clears cached placeable areas.
    pub fn set_bed_area(&mut self, bed_area: ExPolygons) {
        self.bed_area = bed_area;
        self.placeable_cache.clear();
    }

    /// Number of cached collision areas, all clearances included.
    pub fn cached_collision_count(&self) -> usize {
        self.collision_cache.len() + self.collision_cache_min_xy.len()
    }

    pub fn cached_placeable_count(&self) -> usize {
        self.placeable_cache.len()
    }

    /// Round a radius up to the next cached value.
    ///
    /// Linear steps of `collision_resolution` below [`EXPONENTIAL_THRESHOLD`],
    /// exponential steps of [`EXPONENTIAL_FACTOR`] above.
    pub fn ceil_radius(&self, radius: Coord) -> Coord {
        if radius <= 0 {
            return 0;
        }
        let step = self.config.collision_resolution;
        if radius <= EXPONENTIAL_THRESHOLD {
            return (radius + step - 1) / step * step;
        }
        let mut result = EXPONENTIAL_THRESHOLD as f64;
        while (result as Coord) < radius {
            result *= EXPONENTIAL_FACTOR;
        }
        result as Coord
    }

    /// Round a radius down to the previous cached value.
    pub fn floor_radius(&self, radius: Coord) -> Coord {
        if radius <= 0 {
            return 0;
        }
        let step = self.config.collision_resolution;
        if radius < EXPONENTIAL_THRESHOLD {
            return radius / step * step;
        }
        let mut result = EXPONENTIAL_THRESHOLD as f64;
        while ((result * EXPONENTIAL_FACTOR) as Coord) <= radius {
            result *= EXPONENTIAL_FACTOR;
        }
        result as Coord
    }

    fn calculate_collision(&self, radius: Coord, layer_idx: usize, min_xy_dist: bool) -> ExPolygons {
        let Some(outline) = self.layer_outlines.get(layer_idx) else {
            return Vec::new();
        };
        if outline.is_empty() {
            return Vec::new();
        }
        let xy = if min_xy_dist {
            self.config.xy_min_distance
        } else {
            self.config.xy_distance
        };
        clipper::offset_expolygons(outline, unscale(radius + xy), OffsetJoinType::Round)
    }

    fn calculate_placeable(&self, radius: Coord, layer_idx: usize) -> ExPolygons {
        let area = if layer_idx == 0 {
            self.bed_area.clone()
        } else {
            // Top surfaces: model on the layer below that is open on this layer
            match (
                self.layer_outlines.get(layer_idx - 1),
                self.layer_outlines.get(layer_idx),
            ) {
                (Some(below), Some(this)) => clipper::difference(below, this),
                (Some(below), None) => below.clone(),
                _ => Vec::new(),
            }
        };
        if radius > 0 {
            clipper::shrink(&area, unscale(radius), OffsetJoinType::Round)
        } else {
            area
        }
    }

    fn collision_cache_for(&self, min_xy_dist: bool) -> &RadiusLayerPolygonCache {
        if min_xy_dist {
            &self.collision_cache_min_xy
        } else {
            &self.collision_cache
        }
    }
}

impl ModelVolumes for TreeModelVolumes {
    fn collision(&self, radius: Coord, layer_idx: usize, min_xy_dist: bool) -> ExPolygons {
        let key = RadiusLayerKey::new(self.ceil_radius(radius), layer_idx);
        let cache = self.collision_cache_for(min_xy_dist);
        if let Some(cached) = cache.get(&key) {
            return (*cached).clone();
        }
        let collision = self.calculate_collision(key.radius, layer_idx, min_xy_dist);
        (*cache.insert(key, collision)).clone()
    }

    fn collision_lower_bound_area(
        &self,
        layer_idx: usize,
        max_radius: Coord,
    ) -> Option<(Coord, ExPolygons)> {
        if layer_idx >= self.layer_outlines.len() {
            return None;
        }
        if let Some((radius, polygons)) =
            self.collision_cache.get_lower_bound(max_radius, layer_idx)
        {
            return Some((radius, (*polygons).clone()));
        }
        let radius = self.floor_radius(max_radius);
        let collision = self.calculate_collision(radius, layer_idx, false);
        let polygons = self
            .collision_cache
            .insert(RadiusLayerKey::new(radius, layer_idx), collision);
        Some((radius, (*polygons).clone()))
    }

    fn placeable_areas(&self, radius: Coord, layer_idx: usize) -> ExPolygons {
        let key = RadiusLayerKey::new(self.ceil_radius(radius), layer_idx);
        if let Some(cached) = self.placeable_cache.get(&key) {
            return (*cached).clone();
        }
        let placeable = self.calculate_placeable(key.radius, layer_idx);
        (*self.placeable_cache.insert(key, placeable)).clone()
    }

    fn clear_all_but_object_collision(&mut self) {
        self.collision_cache_min_xy.clear();
        self.placeable_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::total_area_mm2;

    fn square_layers(layers: usize, size: f64) -> Vec<ExPolygons> {
        (0..layers)
            .map(|_| vec![ExPolygon::square(Point::zero(), scale(size / 2.0))])
            .collect()
    }

    #[test]
    fn test_ceil_radius_linear() {
        let volumes = TreeModelVolumes::new(TreeModelVolumesConfig::default());
        assert_eq!(volumes.ceil_radius(0), 0);
        assert_eq!(volumes.ceil_radius(scale(0.1)), scale(0.5));
        assert_eq!(volumes.ceil_radius(scale(0.5)), scale(0.5));
        assert_eq!(volumes.ceil_radius(scale(0.6)), scale(1.0));
    }

    #[test]
    fn test_ceil_radius_exponential() {
        let volumes = TreeModelVolumes::new(TreeModelVolumesConfig::default());
        assert_eq!(volumes.ceil_radius(scale(3.0)), scale(3.0));
        assert_eq!(volumes.ceil_radius(scale(3.1)), scale(4.5));
        assert_eq!(volumes.floor_radius(scale(4.4)), scale(3.0));
        assert_eq!(volumes.floor_radius(scale(0.7)), scale(0.5));
        assert_eq!(volumes.floor_radius(scale(0.2)), 0);
    }

    #[test]
    fn test_collision_grows_outline() {
        let volumes = TreeModelVolumes::with_layer_outlines(
            TreeModelVolumesConfig {
                xy_distance: scale(1.0),
                ..Default::default()
            },
            square_layers(2, 10.0),
        );
        let zero = volumes.collision(0, 0, false);
        // 10x10 square grown by 1mm with round corners
        let expected = 100.0 + 4.0 * 10.0 + std::f64::consts::PI;
        assert!((total_area_mm2(&zero) - expected).abs() < 0.1);

        let grown = volumes.collision(scale(0.5), 1, false);
        assert!(total_area_mm2(&grown) > total_area_mm2(&zero));
        assert_eq!(volumes.cached_collision_count(), 2);

        assert!(volumes.collision(0, 7, false).is_empty());
    }

    #[test]
    fn test_lower_bound_prefers_cached() {
        let volumes = TreeModelVolumes::with_layer_outlines(
            TreeModelVolumesConfig::default(),
            square_layers(1, 10.0),
        );
        let _ = volumes.collision(scale(1.0), 0, false);

        let (radius, area) = volumes
            .collision_lower_bound_area(0, scale(1.8))
            .expect("layer exists");
        assert_eq!(radius, scale(1.0));
        assert!(!area.is_empty());

        // Nothing cached below 0.9mm yet: computed on demand and cached
        let (radius, _) = volumes
            .collision_lower_bound_area(0, scale(0.9))
            .expect("layer exists");
        assert_eq!(radius, scale(0.5));
        assert!(volumes.collision_lower_bound_area(3, scale(1.0)).is_none());
    }

    #[test]
    fn test_placeable_areas() {
        let mut outlines = square_layers(2, 10.0);
        outlines[1] = vec![ExPolygon::square(Point::zero(), scale(2.0))];
        let mut volumes =
            TreeModelVolumes::with_layer_outlines(TreeModelVolumesConfig::default(), outlines);

        // Ring between the 10mm and 4mm squares is a top surface
        let top = volumes.placeable_areas(0, 1);
        assert!((total_area_mm2(&top) - 84.0).abs() < 0.01);

        volumes.set_bed_area(vec![ExPolygon::square(Point::zero(), scale(50.0))]);
        let bed = volumes.placeable_areas(0, 0);
        assert!((total_area_mm2(&bed) - 10_000.0).abs() < 0.01);
    }

    #[test]
    fn test_clear_keeps_object_collision() {
        let mut volumes = TreeModelVolumes::with_layer_outlines(
            TreeModelVolumesConfig::default(),
            square_layers(2, 10.0),
        );
        let _ = volumes.collision(0, 0, false);
        let _ = volumes.collision(0, 0, true);
        let _ = volumes.placeable_areas(0, 1);
        volumes.clear_all_but_object_collision();
        assert_eq!(volumes.cached_collision_count(), 1);
        assert_eq!(volumes.cached_placeable_count(), 0);
    }

    #[test]
    fn test_config_json() {
        let config = TreeModelVolumesConfig::from_json(r#"{ "xy_distance": 200000 }"#)
            .expect("valid");
        assert_eq!(config.xy_distance, 200_000);
        assert_eq!(config.collision_resolution, scale(0.5));
        assert!(matches!(
            TreeModelVolumesConfig::from_json(r#"{ "collision_resolution": 0 }"#),
            Err(Error::Config(_))
        ));
    }
}
