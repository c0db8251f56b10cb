//! AABB tree over 2D line segments.
//!
//! Used by the collision cache to answer "closest boundary segment to this
//! point, within this distance" queries against a layer's collision outline.
//!
//! # Algorithm
//!
//! The tree is a balanced binary tree built over bounding boxes of segments.
//! Each inner node splits its segments at the median centroid along the
//! longest axis of the combined bounding box.
//!
//! Tree storage uses an implicit indexing scheme where children of node `i` are
//! at positions `2*i + 1` (left) and `2*i + 2` (right).

use super::{BoundingBoxF, LineF, PointF};
use crate::CoordF;

/// Special index values for tree nodes.
const NPOS: usize = usize::MAX;
const INNER: usize = usize::MAX - 1;

/// A single node in the AABB tree.
#[derive(Debug, Clone)]
pub struct AABBNode {
    /// Segment index for leaves, INNER for internal nodes, NPOS for unused slots.
    pub idx: usize,
    pub bbox: BoundingBoxF,
}

impl AABBNode {
    #[inline]
    pub fn empty() -> Self {
        Self {
            idx: NPOS,
            bbox: BoundingBoxF::new(),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.idx != NPOS
    }

    #[inline]
    pub fn is_inner(&self) -> bool {
        self.idx == INNER
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_valid() && !self.is_inner()
    }
}

impl Default for AABBNode {
    fn default() -> Self {
        Self::empty()
    }
}

struct BuildInput {
    idx: usize,
    bbox: BoundingBoxF,
    centroid: PointF,
}

/// Result of a closest segment query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestLineResult {
    pub line_idx: usize,
    pub point: PointF,
    pub squared_distance: CoordF,
}

impl ClosestLineResult {
    #[inline]
    pub fn distance(&self) -> CoordF {
        self.squared_distance.sqrt()
    }
}

/// Balanced AABB tree with implicit child indexing.
#[derive(Debug, Clone, Default)]
pub struct AABBTreeLines {
    nodes: Vec<AABBNode>,
}

impl AABBTreeLines {
    #[inline]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn node(&self, idx: usize) -> Option<&AABBNode> {
        self.nodes.get(idx)
    }

    #[inline]
    pub fn left_child_idx(idx: usize) -> usize {
        idx * 2 + 1
    }

    #[inline]
    pub fn right_child_idx(idx: usize) -> usize {
        idx * 2 + 2
    }

    /// Build a tree over `lines`. Leaves store indices into `lines`.
    pub fn build(lines: &[LineF]) -> Self {
        if lines.is_empty() {
            return Self::new();
        }

        let mut input: Vec<BuildInput> = lines
            .iter()
            .enumerate()
            .map(|(idx, line)| BuildInput {
                idx,
                bbox: line.bounding_box(),
                centroid: line.midpoint(),
            })
            .collect();

        let mut tree = Self {
            nodes: vec![AABBNode::empty(); input.len().next_power_of_two() * 2 - 1],
        };
        tree.build_recursive(&mut input, 0);
        tree
    }

    fn build_recursive(&mut self, input: &mut [BuildInput], node_idx: usize) {
        debug_assert!(node_idx < self.nodes.len());
        debug_assert!(!input.is_empty());

        if input.len() == 1 {
            self.nodes[node_idx].idx = input[0].idx;
            self.nodes[node_idx].bbox = input[0].bbox;
            return;
        }

        let mut bbox = input[0].bbox;
        for item in input.iter().skip(1) {
            bbox.merge(&item.bbox);
        }

        let split_x = bbox.max.x - bbox.min.x >= bbox.max.y - bbox.min.y;
        let center = (input.len() - 1) / 2;
        input.select_nth_unstable_by(center, |a, b| {
            let (ka, kb) = if split_x {
                (a.centroid.x, b.centroid.x)
            } else {
                (a.centroid.y, b.centroid.y)
            };
            ka.total_cmp(&kb)
        });

        self.nodes[node_idx].idx = INNER;
        self.nodes[node_idx].bbox = bbox;

        let (left, right) = input.split_at_mut(center + 1);
        self.build_recursive(left, Self::left_child_idx(node_idx));
        self.build_recursive(right, Self::right_child_idx(node_idx));
    }

    /// Closest segment to `point` strictly nearer than `sqrt(max_sqr_dist)`.
    ///
    /// `lines` must be the slice the tree was built from.
    pub fn closest_line(
        &self,
        lines: &[LineF],
        point: &PointF,
        max_sqr_dist: CoordF,
    ) -> Option<ClosestLineResult> {
        if self.is_empty() {
            return None;
        }
        let mut best: Option<ClosestLineResult> = None;
        self.closest_recursive(lines, point, 0, max_sqr_dist, &mut best);
        best
    }

    fn closest_recursive(
        &self,
        lines: &[LineF],
        point: &PointF,
        node_idx: usize,
        mut up_sqr_d: CoordF,
        best: &mut Option<ClosestLineResult>,
    ) -> CoordF {
        let node = match self.node(node_idx) {
            Some(n) if n.is_valid() => n,
            _ => return up_sqr_d,
        };

        if node.is_leaf() {
            let (sqr_dist, closest) = lines[node.idx].squared_distance_to_point(point);
            if sqr_dist < up_sqr_d {
                *best = Some(ClosestLineResult {
                    line_idx: node.idx,
                    point: closest,
                    squared_distance: sqr_dist,
                });
                up_sqr_d = sqr_dist;
            }
            return up_sqr_d;
        }

        let left_idx = Self::left_child_idx(node_idx);
        let right_idx = Self::right_child_idx(node_idx);
        let dist = |idx: usize| {
            self.node(idx)
                .filter(|n| n.is_valid())
                .map(|n| n.bbox.squared_exterior_distance(point))
                .unwrap_or(CoordF::MAX)
        };
        let left_dist = dist(left_idx);
        let right_dist = dist(right_idx);

        // Visit closer child first
        let order = if left_dist <= right_dist {
            [(left_idx, left_dist), (right_idx, right_dist)]
        } else {
            [(right_idx, right_dist), (left_idx, left_dist)]
        };
        for (idx, d) in order {
            if d < up_sqr_d {
                up_sqr_d = self.closest_recursive(lines, point, idx, up_sqr_d, best);
            }
        }
        up_sqr_d
    }
}

/// Lines together with the tree built over them.
#[derive(Debug, Clone, Default)]
pub struct LinesDistancer {
    lines: Vec<LineF>,
    tree: AABBTreeLines,
}

impl LinesDistancer {
    pub fn new(lines: Vec<LineF>) -> Self {
        let tree = AABBTreeLines::build(&lines);
        Self { lines, tree }
    }

    #[inline]
    pub fn lines(&self) -> &[LineF] {
        &self.lines
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Closest segment within `max_dist` of `point`.
    #[inline]
    pub fn closest_within(&self, point: &PointF, max_dist: CoordF) -> Option<ClosestLineResult> {
        self.tree
            .closest_line(&self.lines, point, max_dist * max_dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_lines(size: CoordF) -> Vec<LineF> {
        let p = [
            PointF::new(0.0, 0.0),
            PointF::new(size, 0.0),
            PointF::new(size, size),
            PointF::new(0.0, size),
        ];
        (0..4).map(|i| LineF::new(p[i], p[(i + 1) % 4])).collect()
    }

    fn brute_force(lines: &[LineF], p: &PointF) -> CoordF {
        lines
            .iter()
            .map(|l| l.squared_distance_to_point(p).0)
            .fold(CoordF::MAX, CoordF::min)
    }

    #[test]
    fn test_empty_tree() {
        let tree = AABBTreeLines::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.closest_line(&[], &PointF::zero(), 1.0).is_none());
    }

    #[test]
    fn test_closest_line_square() {
        let lines = square_lines(10.0);
        let d = LinesDistancer::new(lines);
        let hit = d
            .closest_within(&PointF::new(5.0, 1.0), 100.0)
            .expect("segment in range");
        assert_eq!(hit.line_idx, 0);
        assert!((hit.distance() - 1.0).abs() < 1e-12);
        assert!((hit.point.x - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_distance_bound() {
        let d = LinesDistancer::new(square_lines(10.0));
        assert!(d.closest_within(&PointF::new(5.0, 5.0), 4.0).is_none());
        assert!(d.closest_within(&PointF::new(5.0, 5.0), 5.5).is_some());
    }

    #[test]
    fn test_matches_brute_force() {
        // Zig-zag polyline with many segments
        let pts: Vec<PointF> = (0..50)
            .map(|i| PointF::new(i as CoordF, if i % 2 == 0 { 0.0 } else { 3.0 }))
            .collect();
        let lines: Vec<LineF> = pts.windows(2).map(|w| LineF::new(w[0], w[1])).collect();
        let d = LinesDistancer::new(lines.clone());
        for q in [
            PointF::new(10.3, 7.0),
            PointF::new(-4.0, 1.0),
            PointF::new(25.5, 1.5),
            PointF::new(60.0, -2.0),
        ] {
            let expected = brute_force(&lines, &q);
            let hit = d.closest_within(&q, 1000.0).expect("in range");
            assert!((hit.squared_distance - expected).abs() < 1e-9);
        }
    }
}
