//! Splitting the support graph into branches and trees.
//!
//! A branch is a maximal chain of single-parent elements, running upwards
//! from a root or bifurcation to a tip or the next bifurcation. A tree is the
//! set of branches reachable from one seed element.

use super::element::{NodeId, SupportElements};
use super::settings::TreeSelection;
use tracing::debug;

/// A chain of elements on consecutive layers, lowest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub path: Vec<NodeId>,
    /// The path starts at the root of its tree.
    pub has_root: bool,
    /// The path ends at an element without parents.
    pub has_tip: bool,
}

impl Branch {
    pub fn first(&self) -> NodeId {
        self.path[0]
    }

    pub fn last(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }
}

/// Branches connected through bifurcations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub branches: Vec<Branch>,
    /// Element the traversal started from.
    pub seed: Option<NodeId>,
}

impl Tree {
    /// Collect the branches reachable from `seed`, marking every visited element.
    fn visit(move_bounds: &mut [SupportElements], seed: NodeId) -> Self {
        let mut tree = Tree {
            branches: Vec::new(),
            seed: Some(seed),
        };
        let mut stack = vec![seed];

        while let Some(start) = stack.pop() {
            debug_assert!(!start.get(move_bounds).state.bits.marked);
            debug_assert!(!start.get(move_bounds).parents.is_empty());
            move_bounds[start.layer_idx][start.elem_idx].state.bits.marked = true;
            let root = tree.branches.is_empty();

            for parent_pos in 0..start.get(move_bounds).parents.len() {
                let first_parent = start.parent(move_bounds, parent_pos);
                debug_assert!(!first_parent.get(move_bounds).state.bits.marked);
                let mut path = vec![start, first_parent];
                let mut next_branch = None;

                let mut current = first_parent;
                loop {
                    let num_parents = current.get(move_bounds).parents.len();
                    if num_parents > 1 {
                        // Branching point reached
                        next_branch = Some(current);
                        break;
                    }
                    move_bounds[current.layer_idx][current.elem_idx]
                        .state
                        .bits
                        .marked = true;
                    if num_parents == 0 {
                        break;
                    }
                    let next = current.parent(move_bounds, 0);
                    debug_assert!(!next.get(move_bounds).state.bits.marked);
                    debug_assert_eq!(current.layer_idx + 1, next.layer_idx);
                    path.push(next);
                    current = next;
                }

                tree.branches.push(Branch {
                    path,
                    has_root: root,
                    has_tip: next_branch.is_none(),
                });
                if let Some(next) = next_branch {
                    stack.push(next);
                }
            }
        }

        tree
    }

    /// Whether the seed element is flagged lost or very lost.
    pub fn is_lost(&self, move_bounds: &[SupportElements]) -> bool {
        self.seed.is_some_and(|seed| {
            let bits = seed.get(move_bounds).state.bits;
            bits.lost || bits.verylost
        })
    }

    pub fn node_count(&self) -> usize {
        // Bifurcation nodes open every branch leaving them
        self.branches.iter().map(|b| b.path.len() - 1).sum::<usize>() + 1
    }
}

/// Partition all unmarked elements with parents into trees.
///
/// Layers are scanned bottom up; every element left unmarked that carries
/// other elements seeds a new tree. Elements end up marked.
pub fn extract_trees(move_bounds: &mut [SupportElements], selection: TreeSelection) -> Vec<Tree> {
    let mut trees = Vec::new();
    let num_layers = move_bounds.len();

    for layer_idx in 0..num_layers.saturating_sub(1) {
        for elem_idx in 0..move_bounds[layer_idx].len() {
            let elem = &move_bounds[layer_idx][elem_idx];
            if elem.state.bits.marked || elem.parents.is_empty() {
                continue;
            }
            let tree = Tree::visit(move_bounds, NodeId::new(layer_idx, elem_idx));
            if selection == TreeSelection::LostOnly && !tree.is_lost(move_bounds) {
                continue;
            }
            trees.push(tree);
        }
    }

    debug!(
        trees = trees.len(),
        branches = trees.iter().map(|t| t.branches.len()).sum::<usize>(),
        "Extracted support trees"
    );
    trees
}

/// Clear the traversal marker on every element.
pub fn unmark_all(move_bounds: &mut [SupportElements]) {
    for elem in move_bounds.iter_mut().flatten() {
        elem.state.bits.marked = false;
    }
}
