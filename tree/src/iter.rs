use core::iter::FusedIterator;

use intrusive_vec::{Arena, NodeId};

use crate::error::RbError;
use crate::node::{Links, RbLinked};

/// The in-order successor of the member `node`, `Ok(None)` past the last one.
pub fn next<A>(arena: &A, node: NodeId) -> Result<Option<NodeId>, RbError>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    if !arena.resolves(node) {
        return Err(RbError::InvalidNode(node));
    }
    Ok(successor(arena, node))
}

/// The in-order predecessor of the member `node`, `Ok(None)` before the first one.
pub fn prev<A>(arena: &A, node: NodeId) -> Result<Option<NodeId>, RbError>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    if !arena.resolves(node) {
        return Err(RbError::InvalidNode(node));
    }
    Ok(predecessor(arena, node))
}

//       +---------- 34 ---------+
//       |                       |
// +---- 2 ----+                 58 ----+
// |           |                        |
// 1      +--- 9 ----+              +-- 77 --+
//        |          |              |        |
//     +- 6       +- 20 -+      +- 71 -+     82
//     |          |      |      |      |
//     5         12 -+   24    67      75
//                   |
//                   13

pub(crate) fn successor<A>(arena: &A, mut node: NodeId) -> Option<NodeId>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    match arena.right(node) {
        // 9 -> 12, 2 -> 5, 58 -> 67
        Some(right) => Some(arena.min_of(right)),
        None => {
            // 6 -> 9, 13 -> 20, 24 -> 34
            // The first ancestor reached from its left subtree.
            let mut parent = arena.parent(node);
            while let Some(p) = parent {
                if arena.left(p) == Some(node) {
                    break;
                }
                node = p;
                parent = arena.parent(node);
            }
            parent
        }
    }
}

pub(crate) fn predecessor<A>(arena: &A, mut node: NodeId) -> Option<NodeId>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    match arena.left(node) {
        // 2 -> 1, 9 -> 6, 20 -> 13
        Some(left) => Some(arena.max_of(left)),
        None => {
            // 12 -> 9, 58 -> 34, 67 -> 58
            let mut parent = arena.parent(node);
            while let Some(p) = parent {
                if arena.right(p) == Some(node) {
                    break;
                }
                node = p;
                parent = arena.parent(node);
            }
            parent
        }
    }
}

/// In-order iterator over the members of a tree, see [`RbTree::iter`].
///
/// [`RbTree::iter`]: crate::RbTree::iter
pub struct Iter<'a, A: ?Sized> {
    arena: &'a A,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, A> Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    pub(crate) fn new(
        arena: &'a A,
        front: Option<NodeId>,
        back: Option<NodeId>,
        len: usize,
    ) -> Self {
        Self {
            arena,
            front,
            back,
            remaining: len,
        }
    }
}

impl<'a, A> Iterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    type Item = (NodeId, &'a A::Node);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        self.remaining -= 1;
        self.front = successor(self.arena, id);
        Some((id, self.arena.at(id)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, A> DoubleEndedIterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        self.remaining -= 1;
        self.back = predecessor(self.arena, id);
        Some((id, self.arena.at(id)))
    }
}

impl<'a, A> ExactSizeIterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
}

impl<'a, A> FusedIterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
}
