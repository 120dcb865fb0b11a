use core::cmp::Ordering;

use intrusive_vec::{Arena, NodeId};
use thiserror::Error;

use crate::iter::successor;
use crate::node::{Links, RbLinked};
use crate::RbTree;

/// A broken red-black tree property, found by [`RbTree::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root {0} is red")]
    RedRoot(NodeId),
    #[error("root {0} has a parent")]
    RootHasParent(NodeId),
    #[error("red node {0} has a red child")]
    DoubleRed(NodeId),
    #[error("paths below {0} have different black heights")]
    BlackHeight(NodeId),
    #[error("child {child} does not point back to its parent {parent}")]
    BrokenParentLink { parent: NodeId, child: NodeId },
    #[error("node {0} is not ordered after its predecessor")]
    OutOfOrder(NodeId),
    #[error("tree counts {expected} members but {found} are linked")]
    CountMismatch { expected: usize, found: usize },
    #[error("link to {0} does not resolve in the arena")]
    Dangling(NodeId),
}

impl<T, C> RbTree<T, C>
where
    T: RbLinked,
    C: Fn(&T, &T) -> Ordering,
{
    /// Checks every red-black property, the parent back links, the order
    /// under the comparator and the member count.
    ///
    /// Returns the black height of the tree, counting absent leaves as one.
    /// O(n), meant for tests and the `checked` feature.
    pub fn validate<A>(&self, arena: &A) -> Result<usize, InvariantViolation>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let Some(root) = self.root() else {
            return match self.len() {
                0 => Ok(1),
                n => Err(InvariantViolation::CountMismatch {
                    expected: n,
                    found: 0,
                }),
            };
        };

        let link = arena
            .node(root)
            .ok_or(InvariantViolation::Dangling(root))?
            .rb_node();
        if link.color().is_red() {
            return Err(InvariantViolation::RedRoot(root));
        }
        if link.parent().is_some() {
            return Err(InvariantViolation::RootHasParent(root));
        }

        let mut found = 0;
        let height = check_subtree(arena, root, self.len(), &mut found)?;
        if found != self.len() {
            return Err(InvariantViolation::CountMismatch {
                expected: self.len(),
                found,
            });
        }

        // every link resolves past this point
        let mut prev = arena.min_of(root);
        while let Some(next) = successor(arena, prev) {
            if self.compare(arena.at(prev), arena.at(next)) != Ordering::Less {
                return Err(InvariantViolation::OutOfOrder(next));
            }
            prev = next;
        }

        Ok(height)
    }
}

// Black height of the subtree at `node`. Gives up past `limit` nodes so a
// cycle in the links cannot recurse forever.
fn check_subtree<A>(
    arena: &A,
    node: NodeId,
    limit: usize,
    found: &mut usize,
) -> Result<usize, InvariantViolation>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    *found += 1;
    if *found > limit {
        return Err(InvariantViolation::CountMismatch {
            expected: limit,
            found: *found,
        });
    }

    let link = *arena
        .node(node)
        .ok_or(InvariantViolation::Dangling(node))?
        .rb_node();

    let mut heights = [1, 1];
    for (height, child) in heights.iter_mut().zip([link.left(), link.right()]) {
        let Some(child) = child else {
            continue;
        };
        let child_link = arena
            .node(child)
            .ok_or(InvariantViolation::Dangling(child))?
            .rb_node();
        if child_link.parent() != Some(node) {
            return Err(InvariantViolation::BrokenParentLink {
                parent: node,
                child,
            });
        }
        if link.color().is_red() && child_link.color().is_red() {
            return Err(InvariantViolation::DoubleRed(node));
        }
        *height = check_subtree(arena, child, limit, found)?;
    }

    if heights[0] != heights[1] {
        return Err(InvariantViolation::BlackHeight(node));
    }
    Ok(heights[0] + usize::from(link.color().is_black()))
}
