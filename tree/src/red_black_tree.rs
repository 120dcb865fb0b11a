use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use intrusive_vec::{Arena, NodeId};
use log::{debug, trace};

use crate::error::RbError;
use crate::iter::{successor, Iter};
use crate::node::{Color, Links, NodePos, RbLinked};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Where a node that was not found would be linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    pub parent: NodeId,
    pub side: Side,
}

/// Outcome of [`RbTree::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    Found(NodeId),
    NotFound(InsertionPoint),
    /// The search started from an empty tree.
    Empty,
}

impl Search {
    pub fn found(&self) -> Option<NodeId> {
        match *self {
            Search::Found(id) => Some(id),
            _ => None,
        }
    }

    /// The node to hand to [`RbTree::insert`].
    ///
    /// For [`Search::Found`] this is the equal member itself, so inserting
    /// at it reports [`Insertion::AlreadyExists`].
    pub fn insertion_point(&self) -> Option<NodeId> {
        match *self {
            Search::Found(id) => Some(id),
            Search::NotFound(at) => Some(at.parent),
            Search::Empty => None,
        }
    }
}

/// Outcome of [`RbTree::insert`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    AlreadyExists(NodeId),
}

impl Insertion {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Insertion::Inserted)
    }
}

/// Intrusive red-black tree.
///
/// The tree stores only the root handle, the member count and the
/// comparator. Members are values of type `T` living in a caller supplied
/// [`Arena`]; every operation takes that arena as an argument and must
/// always be given the same one.
pub struct RbTree<T, C = fn(&T, &T) -> Ordering> {
    root: Option<NodeId>,
    len: usize,
    cmp: C,
    marker: PhantomData<fn(&T, &T)>,
}

impl<T, C> fmt::Debug for RbTree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbTree")
            .field("len", &self.len)
            .field("root", &self.root)
            .finish()
    }
}

impl<T, C> RbTree<T, C>
where
    T: RbLinked,
    C: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty tree ordered by `cmp`.
    ///
    /// `cmp` must be a total order and must not change its answers while
    /// values are members.
    pub fn new(cmp: C) -> Self {
        Self {
            root: None,
            len: 0,
            cmp,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[inline]
    pub(crate) fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.cmp)(a, b)
    }

    /// Searches for `needle` starting at `from`, or at the root if `from` is `None`.
    ///
    /// `needle` is only compared, it does not have to be a member or even live
    /// in the arena.
    pub fn find<A>(&self, arena: &A, from: Option<NodeId>, needle: &T) -> Result<Search, RbError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let start = match from {
            Some(id) if !arena.resolves(id) => return Err(RbError::InvalidNode(id)),
            Some(id) => Some(id),
            None => self.root,
        };

        let Some(mut x) = start else {
            return Ok(Search::Empty);
        };

        loop {
            match self.compare(needle, arena.at(x)) {
                Ordering::Less => match arena.left(x) {
                    Some(left) => x = left,
                    None => {
                        return Ok(Search::NotFound(InsertionPoint {
                            parent: x,
                            side: Side::Left,
                        }))
                    }
                },
                Ordering::Equal => return Ok(Search::Found(x)),
                Ordering::Greater => match arena.right(x) {
                    Some(right) => x = right,
                    None => {
                        return Ok(Search::NotFound(InsertionPoint {
                            parent: x,
                            side: Side::Right,
                        }))
                    }
                },
            }
        }
    }

    /// Links `node` below the insertion point `at` and rebalances.
    ///
    /// `at` must come from a [`find`](Self::find) for a needle equal to
    /// `node`, with no mutation of the tree in between; it may only be
    /// `None` while the tree is empty. Every check happens before any link
    /// is touched, so on `Err` or [`Insertion::AlreadyExists`] the tree is
    /// unchanged.
    pub fn insert<A>(
        &mut self,
        arena: &mut A,
        at: Option<NodeId>,
        node: NodeId,
    ) -> Result<Insertion, RbError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let Some(value) = arena.node(node) else {
            return Err(RbError::InvalidNode(node));
        };

        let slot = match (self.root, at) {
            (None, None) => None,
            (None, Some(at)) => return Err(RbError::StaleInsertionPoint(at)),
            (Some(_), None) => return Err(RbError::MissingInsertionPoint),
            (Some(_), Some(at)) => {
                let Some(parent) = arena.node(at) else {
                    return Err(RbError::InvalidNode(at));
                };
                let (side, occupant) = match self.compare(value, parent) {
                    Ordering::Equal => return Ok(Insertion::AlreadyExists(at)),
                    Ordering::Less => (Side::Left, parent.rb_node().left()),
                    Ordering::Greater => (Side::Right, parent.rb_node().right()),
                };
                if occupant.is_some() {
                    return Err(RbError::StaleInsertionPoint(at));
                }
                Some((at, side))
            }
        };
        debug_assert!(
            self.root != Some(node) && value.rb_node().is_detached(),
            "node {node} is already linked"
        );

        {
            let link = arena.rb_mut(node);
            link.reset();
            link.color = Color::Red;
            link.parent = slot.map(|(parent, _)| parent);
        }
        match slot {
            None => self.root = Some(node),
            Some((parent, Side::Left)) => arena.set_left(parent, Some(node)),
            Some((parent, Side::Right)) => arena.set_right(parent, Some(node)),
        }

        self.len += 1;
        self.insert_fixup(arena, node);
        self.check_after_mutation(arena);
        Ok(Insertion::Inserted)
    }

    fn insert_fixup<A>(&mut self, arena: &mut A, new_node: NodeId)
    where
        A: Arena<Node = T> + ?Sized,
    {
        let mut node = new_node;
        loop {
            let Some(mut parent) = arena.parent(node) else {
                break;
            };
            if arena.color(parent).is_black() {
                break;
            }
            // `node` and its parent are both red, that is the only violation.
            debug_assert!(arena.color(node).is_red());

            // a red parent is never the root, so the grand parent exists
            let grand_parent = arena
                .parent(parent)
                .expect("red node must have a parent");
            debug_assert!(arena.color(grand_parent).is_black());

            match arena.pos(parent) {
                NodePos::Root => unreachable!(),
                NodePos::Left => match arena.right(grand_parent) {
                    //     +--- gp:b ---+               +--- gp:r ---+
                    //     |            |               |            |
                    //  + p:r +      + u:r +   -->   + p:b +      + u:b +
                    //  |     |      |     |         |     |      |     |
                    // n:r   a:b    b:b   c:b       n:r   a:b    b:b   c:b
                    //
                    // Black height is unchanged, but gp may now have a red
                    // parent. Continue from gp.
                    Some(uncle) if arena.color(uncle).is_red() => {
                        trace!("insert fixup: red uncle {uncle}, recoloring {grand_parent}");
                        arena.set_color(parent, Color::Black);
                        arena.set_color(uncle, Color::Black);
                        arena.set_color(grand_parent, Color::Red);
                        node = grand_parent;
                    }
                    _ => {
                        if let NodePos::Right = arena.pos(node) {
                            //       +-- gp:b --+                 +-- gp:b --+
                            //       |          |                 |          |
                            //  +-- p:r --+    u:b  -->       +- n:r --+    u:b
                            //  |         |                   |        |
                            // a:b    +- n:r -+           +- p:r -+   c:b
                            //        |       |           |       |
                            //       b:b     c:b         a:b     b:b
                            trace!("insert fixup: left-right at {parent}");
                            self.rotate_left(arena, parent);
                            core::mem::swap(&mut parent, &mut node);
                        }

                        //           +-- gp:b --+            +----- p:b -----+
                        //           |          |            |               |
                        //      +-- p:r --+    u:b  -->   +- n:r -+     +- gp:r -+
                        //      |         |               |       |     |        |
                        //  +- n:r -+    c:b             a:b     b:b   c:b      u:b
                        //  |       |
                        // a:b     b:b
                        trace!("insert fixup: left-left at {grand_parent}");
                        arena.set_color(parent, Color::Black);
                        arena.set_color(grand_parent, Color::Red);
                        self.rotate_right(arena, grand_parent);
                    }
                },
                NodePos::Right => match arena.left(grand_parent) {
                    Some(uncle) if arena.color(uncle).is_red() => {
                        trace!("insert fixup: red uncle {uncle}, recoloring {grand_parent}");
                        arena.set_color(parent, Color::Black);
                        arena.set_color(uncle, Color::Black);
                        arena.set_color(grand_parent, Color::Red);
                        node = grand_parent;
                    }
                    _ => {
                        if let NodePos::Left = arena.pos(node) {
                            trace!("insert fixup: right-left at {parent}");
                            self.rotate_right(arena, parent);
                            core::mem::swap(&mut parent, &mut node);
                        }

                        trace!("insert fixup: right-right at {grand_parent}");
                        arena.set_color(parent, Color::Black);
                        arena.set_color(grand_parent, Color::Red);
                        self.rotate_left(arena, grand_parent);
                    }
                },
            }
        }

        if let Some(root) = self.root {
            arena.set_color(root, Color::Black);
        }
    }

    /// Unlinks the member `node`, rebalances and detaches `node`.
    ///
    /// A detached node, or any node of an empty tree, is rejected with
    /// [`RbError::NotAMember`]. Other non members are only caught with the
    /// `checked` feature.
    ///
    /// A node with two children is replaced by its in-order successor: the
    /// successor is relinked into the removed position and takes over its
    /// color. Values never move between handles.
    pub fn remove<A>(&mut self, arena: &mut A, node: NodeId) -> Result<(), RbError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        if !arena.resolves(node) {
            return Err(RbError::InvalidNode(node));
        }
        // only the root has no parent
        if self.root.is_none() || (arena.parent(node).is_none() && self.root != Some(node)) {
            return Err(RbError::NotAMember(node));
        }
        #[cfg(feature = "checked")]
        if !self.contains_node(arena, node) {
            return Err(RbError::NotAMember(node));
        }

        self.delete_core(arena, node);
        arena.rb_mut(node).reset();
        self.len -= 1;
        self.check_after_mutation(arena);
        Ok(())
    }

    fn delete_core<A>(&mut self, arena: &mut A, node: NodeId)
    where
        A: Arena<Node = T> + ?Sized,
    {
        //       ┌────────── 34 ─────────┐
        //       │                       │
        // ┌──── 2 ────┐                 58 ────┐
        // │           │                        │
        // 1      ┌─── 9 ────┐              ┌── 77 ──┐
        //        │          │              │        │
        //     ┌─ 6       ┌─ 20 ─┐      ┌─ 71 ─┐     82
        //     │          │      │      │      │
        //     5         12 ─┐   24    67      75
        //                   │
        //                   13

        // `x` is the subtree that moved into the position that lost a node
        // (possibly empty), `x_parent` its parent after the unlink.
        let x;
        let x_parent;
        let removed_color;
        match (arena.left(node), arena.right(node)) {
            // At most one child: splice it into place of `node`.
            // For example 1, 6, 12, 58 above.
            (None, child) | (child, None) => {
                removed_color = arena.color(node);
                x = child;
                x_parent = arena.parent(node);
                self.replace_subtree(arena, node, child);
            }
            // Two children: the successor is the minimum of the right
            // subtree and has no left child. It leaves its own position and
            // takes the one of `node`.
            (Some(left), Some(right)) => {
                let successor = arena.min_of(right);
                removed_color = arena.color(successor);
                x = arena.right(successor);

                if successor == right {
                    // 20, 75, 77 above
                    x_parent = Some(successor);
                } else {
                    // 9 above, successor is 12
                    x_parent = arena.parent(successor);
                    self.replace_subtree(arena, successor, x);
                    arena.set_right(successor, Some(right));
                    arena.set_parent(right, Some(successor));
                }

                self.replace_subtree(arena, node, Some(successor));
                arena.set_left(successor, Some(left));
                arena.set_parent(left, Some(successor));
                let color = arena.color(node);
                arena.set_color(successor, color);
            }
        }

        if removed_color.is_black() {
            self.delete_fixup(arena, x, x_parent);
        }
    }

    /// Paths through `x` are one black node short ("doubly black" `x`).
    ///
    /// `x` may be absent, which is why its parent is tracked separately.
    fn delete_fixup<A>(&mut self, arena: &mut A, mut x: Option<NodeId>, mut x_parent: Option<NodeId>)
    where
        A: Arena<Node = T> + ?Sized,
    {
        while x != self.root && arena.is_black(x) {
            let Some(parent) = x_parent else {
                break;
            };

            // The sibling exists: paths through it carry at least one more
            // black node than the paths through `x`.
            if x == arena.left(parent) {
                let mut sibling = arena
                    .right(parent)
                    .expect("doubly black node must have a sibling");

                if arena.color(sibling).is_red() {
                    //     ┌─── p:b ───┐                    ┌─── s:b ───┐
                    //     │           │                    │           │
                    // ┌─ x:b ─┐   ┌─ s:r ─┐   ──►      ┌─ p:r ─┐      d:b
                    // │       │   │       │            │       │
                    // a       b  c:b     d:b       ┌─ x:b ─┐  c:b
                    //
                    // x still misses a black node but now has a red parent and
                    // a black sibling.
                    trace!("remove fixup: red sibling {sibling}, rotating {parent} left");
                    arena.set_color(sibling, Color::Black);
                    arena.set_color(parent, Color::Red);
                    self.rotate_left(arena, parent);
                    sibling = arena
                        .right(parent)
                        .expect("doubly black node must have a sibling");
                }

                let near = arena.left(sibling);
                let far = arena.right(sibling);
                if arena.is_black(near) && arena.is_black(far) {
                    // Take one black off x and s and push it to the parent.
                    trace!("remove fixup: black nephews, moving up to {parent}");
                    arena.set_color(sibling, Color::Red);
                    x = Some(parent);
                    x_parent = arena.parent(parent);
                } else {
                    if arena.is_black(far) {
                        //    ┌───── p:c ─────┐                ┌─── p:c ───┐
                        //    │               │                │           │
                        // ┌─ x:b ─┐      ┌─ s:b ─┐   ──►  ┌─ x:b ─┐   ┌─ c:b ─┐
                        // │       │      │       │        │       │   │       │
                        // a       b  ┌─ c:r ─┐  d:b       a       b   e   ┌─ s:r ─┐
                        //            │       │                            │       │
                        //            e       f                            f      d:b
                        trace!("remove fixup: near red nephew, rotating {sibling} right");
                        if let Some(near) = near {
                            arena.set_color(near, Color::Black);
                        }
                        arena.set_color(sibling, Color::Red);
                        self.rotate_right(arena, sibling);
                        sibling = arena
                            .right(parent)
                            .expect("doubly black node must have a sibling");
                    }

                    //     ┌─── p:c ───┐                     ┌── s:c ──┐
                    //     │           │                     │         │
                    // ┌─ x:b ─┐   ┌─ s:b ─┐   ──►       ┌─ p:b ─┐    d:b
                    // │       │   │       │             │       │
                    // a       b  c       d:r       ┌─ x:b ─┐    c
                    //
                    // x gains a black ancestor, the paths through d keep their
                    // count because d turns black. Done.
                    trace!("remove fixup: far red nephew, rotating {parent} left");
                    let color = arena.color(parent);
                    arena.set_color(sibling, color);
                    arena.set_color(parent, Color::Black);
                    if let Some(far) = arena.right(sibling) {
                        arena.set_color(far, Color::Black);
                    }
                    self.rotate_left(arena, parent);
                    x = self.root;
                    break;
                }
            } else {
                // same as above with left and right switched
                let mut sibling = arena
                    .left(parent)
                    .expect("doubly black node must have a sibling");

                if arena.color(sibling).is_red() {
                    trace!("remove fixup: red sibling {sibling}, rotating {parent} right");
                    arena.set_color(sibling, Color::Black);
                    arena.set_color(parent, Color::Red);
                    self.rotate_right(arena, parent);
                    sibling = arena
                        .left(parent)
                        .expect("doubly black node must have a sibling");
                }

                let near = arena.right(sibling);
                let far = arena.left(sibling);
                if arena.is_black(near) && arena.is_black(far) {
                    trace!("remove fixup: black nephews, moving up to {parent}");
                    arena.set_color(sibling, Color::Red);
                    x = Some(parent);
                    x_parent = arena.parent(parent);
                } else {
                    if arena.is_black(far) {
                        trace!("remove fixup: near red nephew, rotating {sibling} left");
                        if let Some(near) = near {
                            arena.set_color(near, Color::Black);
                        }
                        arena.set_color(sibling, Color::Red);
                        self.rotate_left(arena, sibling);
                        sibling = arena
                            .left(parent)
                            .expect("doubly black node must have a sibling");
                    }

                    trace!("remove fixup: far red nephew, rotating {parent} right");
                    let color = arena.color(parent);
                    arena.set_color(sibling, color);
                    arena.set_color(parent, Color::Black);
                    if let Some(far) = arena.left(sibling) {
                        arena.set_color(far, Color::Black);
                    }
                    self.rotate_right(arena, parent);
                    x = self.root;
                    break;
                }
            }
        }

        if let Some(x) = x {
            arena.set_color(x, Color::Black);
        }
        if let Some(root) = self.root {
            arena.set_color(root, Color::Black);
        }
    }

    fn replace_child<A>(
        &mut self,
        arena: &mut A,
        parent: Option<NodeId>,
        old: NodeId,
        new: Option<NodeId>,
    ) where
        A: Arena<Node = T> + ?Sized,
    {
        match parent {
            None => self.root = new,
            Some(p) if arena.left(p) == Some(old) => arena.set_left(p, new),
            Some(p) => arena.set_right(p, new),
        }
    }

    /// The links of `old` itself are left as they were.
    fn replace_subtree<A>(&mut self, arena: &mut A, old: NodeId, new: Option<NodeId>)
    where
        A: Arena<Node = T> + ?Sized,
    {
        let parent = arena.parent(old);
        self.replace_child(arena, parent, old, new);
        if let Some(new) = new {
            arena.set_parent(new, parent);
        }
    }

    fn rotate_left<A>(&mut self, arena: &mut A, node: NodeId)
    where
        A: Arena<Node = T> + ?Sized,
    {
        //    p                       p
        //    |                       |
        // +-node-+               +-right-+
        // |      |      -->      |       |
        // a  +-right-+       +-node-+    c
        //    |       |       |      |
        //    b       c       a      b
        let Some(right) = arena.right(node) else {
            return;
        };

        let b = arena.left(right);
        arena.set_right(node, b);
        if let Some(b) = b {
            arena.set_parent(b, Some(node));
        }

        let parent = arena.parent(node);
        self.replace_child(arena, parent, node, Some(right));
        arena.set_parent(right, parent);

        arena.set_left(right, Some(node));
        arena.set_parent(node, Some(right));
    }

    fn rotate_right<A>(&mut self, arena: &mut A, node: NodeId)
    where
        A: Arena<Node = T> + ?Sized,
    {
        //         p              p
        //         |              |
        //     +-node-+       +-left-+
        //     |      |       |      |
        // +-left-+   c  -->  a  +-node-+
        // |      |              |      |
        // a      b              b      c
        let Some(left) = arena.left(node) else {
            return;
        };

        let b = arena.right(left);
        arena.set_left(node, b);
        if let Some(b) = b {
            arena.set_parent(b, Some(node));
        }

        let parent = arena.parent(node);
        self.replace_child(arena, parent, node, Some(left));
        arena.set_parent(left, parent);

        arena.set_right(left, Some(node));
        arena.set_parent(node, Some(left));
    }

    pub fn first<A>(&self, arena: &A) -> Option<NodeId>
    where
        A: Arena<Node = T> + ?Sized,
    {
        self.root.map(|root| arena.min_of(root))
    }

    pub fn last<A>(&self, arena: &A) -> Option<NodeId>
    where
        A: Arena<Node = T> + ?Sized,
    {
        self.root.map(|root| arena.max_of(root))
    }

    pub fn next<A>(&self, arena: &A, node: NodeId) -> Result<Option<NodeId>, RbError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        crate::iter::next(arena, node)
    }

    pub fn prev<A>(&self, arena: &A, node: NodeId) -> Result<Option<NodeId>, RbError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        crate::iter::prev(arena, node)
    }

    pub fn iter<'a, A>(&self, arena: &'a A) -> Iter<'a, A>
    where
        A: Arena<Node = T> + ?Sized,
    {
        Iter::new(arena, self.first(arena), self.last(arena), self.len)
    }

    /// Returns `true` if `node` is linked into this tree.
    ///
    /// Walks up to the root, O(log n).
    pub fn contains_node<A>(&self, arena: &A, node: NodeId) -> bool
    where
        A: Arena<Node = T> + ?Sized,
    {
        let Some(root) = self.root else {
            return false;
        };

        let mut x = node;
        // a member is at most `len` steps away from the root
        for _ in 0..=self.len {
            match arena.node(x).map(|v| v.rb_node().parent()) {
                None => return false,
                Some(None) => return x == root,
                Some(Some(parent)) => x = parent,
            }
        }
        false
    }

    /// Detaches every member and empties the tree.
    pub fn invalidate<A>(&mut self, arena: &mut A)
    where
        A: Arena<Node = T> + ?Sized,
    {
        self.invalidate_with(arena, |_, _| {});
    }

    /// Calls `on_destroy` for every member in order, then detaches every
    /// member and empties the tree.
    ///
    /// The values stay in the arena. `on_destroy` must not touch the links.
    pub fn invalidate_with<A, F>(&mut self, arena: &mut A, mut on_destroy: F)
    where
        A: Arena<Node = T> + ?Sized,
        F: FnMut(NodeId, &mut T),
    {
        let mut current = self.first(arena);
        while let Some(id) = current {
            current = successor(arena, id);
            on_destroy(id, arena.at_mut(id));
        }

        self.unlink_all(arena);
        debug!("invalidated tree with {} nodes", self.len);
        self.root = None;
        self.len = 0;
    }

    fn unlink_all<A>(&mut self, arena: &mut A)
    where
        A: Arena<Node = T> + ?Sized,
    {
        let Some(mut x) = self.root else {
            return;
        };

        loop {
            if let Some(left) = arena.left(x) {
                x = left;
                continue;
            }
            if let Some(right) = arena.right(x) {
                x = right;
                continue;
            }

            let parent = arena.parent(x);
            arena.rb_mut(x).reset();
            match parent {
                None => break,
                Some(p) => {
                    if arena.left(p) == Some(x) {
                        arena.set_left(p, None);
                    } else {
                        arena.set_right(p, None);
                    }
                    x = p;
                }
            }
        }
    }

    #[inline]
    fn check_after_mutation<A>(&self, arena: &A)
    where
        A: Arena<Node = T> + ?Sized,
    {
        #[cfg(feature = "checked")]
        if let Err(violation) = self.validate(arena) {
            panic!("red-black tree invariant broken: {violation}");
        }
        #[cfg(not(feature = "checked"))]
        let _ = arena;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::node::RbNode;

    #[derive(Debug, Default)]
    pub(crate) struct Item {
        pub(crate) key: i32,
        pub(crate) link: RbNode,
    }

    impl RbLinked for Item {
        fn rb_node(&self) -> &RbNode {
            &self.link
        }

        fn rb_node_mut(&mut self) -> &mut RbNode {
            &mut self.link
        }
    }

    pub(crate) fn item(key: i32) -> Item {
        Item {
            key,
            link: RbNode::new(),
        }
    }

    pub(crate) fn by_key(a: &Item, b: &Item) -> Ordering {
        a.key.cmp(&b.key)
    }

    pub(crate) fn id(i: usize) -> NodeId {
        NodeId::new(i)
    }

    pub(crate) fn init_logging() {
        use simplelog::{Config, LevelFilter, TestLogger};
        let _ = TestLogger::init(LevelFilter::Trace, Config::default());
    }

    /// Find followed by insert, the way every caller is expected to do it.
    pub(crate) fn insert(tree: &mut RbTree<Item>, arena: &mut Vec<Item>, node: NodeId) -> Insertion {
        let at = tree
            .find(&*arena, None, &arena[node.index()])
            .unwrap()
            .insertion_point();
        tree.insert(arena, at, node).unwrap()
    }

    /// Arena holding one item per key, all of them inserted in order.
    pub(crate) fn build(keys: &[i32]) -> (RbTree<Item>, Vec<Item>) {
        let mut arena: Vec<Item> = keys.iter().copied().map(item).collect();
        let mut tree: RbTree<Item> = RbTree::new(by_key);
        for i in 0..keys.len() {
            assert!(insert(&mut tree, &mut arena, id(i)).is_inserted());
        }
        (tree, arena)
    }

    pub(crate) fn keys(tree: &RbTree<Item>, arena: &[Item]) -> Vec<i32> {
        tree.iter(arena).map(|(_, item)| item.key).collect()
    }

    pub(crate) fn lookup(tree: &RbTree<Item>, arena: &[Item], key: i32) -> Option<NodeId> {
        tree.find(arena, None, &item(key)).unwrap().found()
    }

    /// Parenthesized shape of the subtree, colors included.
    fn shape(arena: &[Item], node: Option<NodeId>) -> String {
        match node {
            None => String::from("."),
            Some(n) => {
                let link = arena[n.index()].link;
                let color = if link.color().is_red() { 'r' } else { 'b' };
                if link.left().is_none() && link.right().is_none() {
                    format!("{}{}", arena[n.index()].key, color)
                } else {
                    format!(
                        "({}{} {} {})",
                        arena[n.index()].key,
                        color,
                        shape(arena, link.left()),
                        shape(arena, link.right())
                    )
                }
            }
        }
    }

    /// Same as `shape` but ignoring colors, for rotations which don't recolor.
    fn keys_shape(arena: &[Item], node: Option<NodeId>) -> String {
        shape(arena, node).replace(['r', 'b'], "")
    }

    fn assert_red_blackness(tree: &RbTree<Item>, arena: &[Item]) {
        if let Err(e) = tree.validate(arena) {
            panic!("{e}: {}", shape(arena, tree.root()));
        }
    }

    #[test]
    fn concrete_insert_and_remove() {
        init_logging();
        let (mut tree, mut arena) = build(&[50, 30, 70, 20, 40, 60, 80]);
        assert_eq!(tree.len(), 7);
        assert_eq!(keys(&tree, &arena), [20, 30, 40, 50, 60, 70, 80]);
        assert_red_blackness(&tree, &arena);

        let thirty = lookup(&tree, &arena, 30).unwrap();
        tree.remove(&mut arena, thirty).unwrap();
        assert_eq!(tree.len(), 6);
        assert_eq!(keys(&tree, &arena), [20, 40, 50, 60, 70, 80]);
        assert_red_blackness(&tree, &arena);
        assert!(arena[thirty.index()].link.is_detached());
        assert_eq!(lookup(&tree, &arena, 30), None);
    }

    #[test]
    fn insertion_diagonals() {
        // Each order hits one of the four shapes of the black uncle case
        // and must end up as the same balanced triple.
        for order in [[3, 2, 1], [3, 1, 2], [1, 3, 2], [1, 2, 3]] {
            let (tree, arena) = build(&order);
            assert_eq!(shape(&arena, tree.root()), "(2b 1r 3r)", "order {order:?}");
            assert_red_blackness(&tree, &arena);
        }
    }

    #[test]
    fn red_uncle_recolors() {
        let (mut tree, mut arena) = build(&[2, 1, 3]);
        arena.push(item(4));
        assert!(insert(&mut tree, &mut arena, id(3)).is_inserted());
        assert_eq!(shape(&arena, tree.root()), "(2b 1b (3b . 4r))");
        assert_red_blackness(&tree, &arena);
    }

    #[test]
    fn duplicate_is_rejected() {
        let (mut tree, mut arena) = build(&[50, 30, 70]);
        let before = shape(&arena, tree.root());
        arena.push(item(30));
        let dup = id(3);

        let search = tree.find(&arena, None, &arena[3]).unwrap();
        let thirty = lookup(&tree, &arena, 30).unwrap();
        assert_eq!(search, Search::Found(thirty));
        assert_eq!(
            tree.insert(&mut arena, search.insertion_point(), dup),
            Ok(Insertion::AlreadyExists(thirty))
        );
        assert_eq!(tree.len(), 3);
        assert_eq!(shape(&arena, tree.root()), before);
        assert!(arena[3].link.is_detached());
    }

    #[test]
    fn find_on_empty_and_single() {
        let mut arena = vec![item(10), item(5)];
        let mut tree: RbTree<Item> = RbTree::new(by_key);
        assert_eq!(tree.find(&arena, None, &item(5)), Ok(Search::Empty));
        assert_eq!(tree.find(&arena, None, &item(5)).unwrap().insertion_point(), None);

        assert!(tree.insert(&mut arena, None, id(0)).unwrap().is_inserted());
        assert_eq!(
            tree.find(&arena, None, &item(5)),
            Ok(Search::NotFound(InsertionPoint {
                parent: id(0),
                side: Side::Left,
            }))
        );
        assert_eq!(
            tree.find(&arena, None, &item(15)),
            Ok(Search::NotFound(InsertionPoint {
                parent: id(0),
                side: Side::Right,
            }))
        );
        assert_eq!(tree.find(&arena, None, &item(10)), Ok(Search::Found(id(0))));

        assert!(tree.insert(&mut arena, Some(id(0)), id(1)).unwrap().is_inserted());
        assert_eq!(arena[0].link.left(), Some(id(1)));
        assert_eq!(arena[1].link.parent(), Some(id(0)));
    }

    #[test]
    fn find_from_subtree() {
        let (tree, arena) = build(&[50, 30, 70, 20, 40, 60, 80]);
        let thirty = lookup(&tree, &arena, 30).unwrap();
        let forty = lookup(&tree, &arena, 40).unwrap();
        assert_eq!(tree.find(&arena, Some(thirty), &item(40)), Ok(Search::Found(forty)));
        // 70 is outside of the subtree, the search runs off its right edge
        assert_eq!(
            tree.find(&arena, Some(thirty), &item(70)),
            Ok(Search::NotFound(InsertionPoint {
                parent: forty,
                side: Side::Right,
            }))
        );
        assert_eq!(
            tree.find(&arena, Some(id(99)), &item(70)),
            Err(RbError::InvalidNode(id(99)))
        );
    }

    #[test]
    fn insert_contract_errors() {
        let (mut tree, mut arena) = build(&[50, 30, 70]);
        arena.push(item(10));
        let ten = id(3);
        let root = tree.root();
        let before = shape(&arena, root);

        assert_eq!(
            tree.insert(&mut arena, None, ten),
            Err(RbError::MissingInsertionPoint)
        );
        assert_eq!(
            tree.insert(&mut arena, Some(id(42)), ten),
            Err(RbError::InvalidNode(id(42)))
        );
        assert_eq!(
            tree.insert(&mut arena, Some(id(0)), id(42)),
            Err(RbError::InvalidNode(id(42)))
        );
        // 10 belongs left of 50, where 30 already sits
        assert_eq!(
            tree.insert(&mut arena, Some(id(0)), ten),
            Err(RbError::StaleInsertionPoint(id(0)))
        );
        assert_eq!(tree.len(), 3);
        assert_eq!(shape(&arena, tree.root()), before);

        let mut empty: RbTree<Item> = RbTree::new(by_key);
        assert_eq!(
            empty.insert(&mut arena, Some(id(0)), ten),
            Err(RbError::StaleInsertionPoint(id(0)))
        );
        assert!(empty.is_empty());
    }

    #[test]
    fn remove_rejects_unknown_handle() {
        let (mut tree, mut arena) = build(&[1, 2]);
        assert_eq!(tree.remove(&mut arena, id(7)), Err(RbError::InvalidNode(id(7))));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn remove_rejects_detached_node() {
        let mut arena = vec![item(1), item(2)];
        let mut empty: RbTree<Item> = RbTree::new(by_key);
        assert_eq!(empty.remove(&mut arena, id(0)), Err(RbError::NotAMember(id(0))));
        assert_eq!(empty.len(), 0);

        let (mut tree, mut arena) = build(&[1, 2, 3]);
        arena.push(item(4));
        let before = shape(&arena, tree.root());
        assert_eq!(tree.remove(&mut arena, id(3)), Err(RbError::NotAMember(id(3))));
        assert_eq!(tree.len(), 3);
        assert_eq!(shape(&arena, tree.root()), before);

        // the root itself has no parent either
        let root = tree.root().unwrap();
        tree.remove(&mut arena, root).unwrap();
        assert_eq!(keys(&tree, &arena), [1, 3]);
    }

    #[cfg(feature = "checked")]
    #[test]
    fn remove_rejects_non_member() {
        let (mut tree, mut arena) = build(&[1, 2]);
        arena.push(item(3));
        assert_eq!(tree.remove(&mut arena, id(2)), Err(RbError::NotAMember(id(2))));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn boundaries() {
        let (tree, arena) = build(&[50, 30, 70, 20, 40, 60, 80]);
        let first = tree.first(&arena).unwrap();
        let last = tree.last(&arena).unwrap();
        assert_eq!(arena[first.index()].key, 20);
        assert_eq!(arena[last.index()].key, 80);
        assert_eq!(tree.next(&arena, last), Ok(None));
        assert_eq!(tree.prev(&arena, first), Ok(None));
        assert_eq!(tree.next(&arena, id(100)), Err(RbError::InvalidNode(id(100))));

        let empty: RbTree<Item> = RbTree::new(by_key);
        assert_eq!(empty.first(&arena), None);
        assert_eq!(empty.last(&arena), None);
    }

    #[test]
    fn rotate_roundtrip() {
        let (mut tree, mut arena) = build(&[12, 9, 15, 14, 16]);
        let expected0 = "(12 9 (15 14 16))";
        assert_eq!(keys_shape(&arena, tree.root()), expected0);

        let root = tree.root().unwrap();
        tree.rotate_left(&mut arena, root);
        let expected1 = "(15 (12 9 14) 16)";
        assert_eq!(keys_shape(&arena, tree.root()), expected1);

        let root = tree.root().unwrap();
        tree.rotate_left(&mut arena, root);
        let expected2 = "(16 (15 (12 9 14) .) .)";
        assert_eq!(keys_shape(&arena, tree.root()), expected2);

        let twelve = lookup(&tree, &arena, 12).unwrap();
        tree.rotate_left(&mut arena, twelve);
        let expected3 = "(16 (15 (14 (12 9 .) .) .) .)";
        assert_eq!(keys_shape(&arena, tree.root()), expected3);

        let fourteen = lookup(&tree, &arena, 14).unwrap();
        tree.rotate_right(&mut arena, fourteen);
        assert_eq!(keys_shape(&arena, tree.root()), expected2);

        let root = tree.root().unwrap();
        tree.rotate_right(&mut arena, root);
        assert_eq!(keys_shape(&arena, tree.root()), expected1);

        let root = tree.root().unwrap();
        tree.rotate_right(&mut arena, root);
        assert_eq!(keys_shape(&arena, tree.root()), expected0);

        // rotating without the needed child does nothing
        let nine = lookup(&tree, &arena, 9).unwrap();
        tree.rotate_left(&mut arena, nine);
        tree.rotate_right(&mut arena, nine);
        assert_eq!(keys_shape(&arena, tree.root()), expected0);
    }

    #[test]
    fn remove_every_shape() {
        init_logging();
        let order = [12, 5, 9, 2, 18, 15, 13, 17, 19];
        for victim in order {
            let (mut tree, mut arena) = build(&order);
            let node = lookup(&tree, &arena, victim).unwrap();
            tree.remove(&mut arena, node).unwrap();
            assert_red_blackness(&tree, &arena);
            let expected: Vec<i32> = {
                let mut v: Vec<i32> = order.iter().copied().filter(|k| *k != victim).collect();
                v.sort();
                v
            };
            assert_eq!(keys(&tree, &arena), expected);
        }
    }

    #[test]
    fn delete_sequences() {
        for inserts in [
            &[26, 81, 303, 0][..],
            &[3836, 3865, 4173, 1635, 4585, 8422, 4412, 2624, 2138, 128][..],
            &[2, 5, 9, 18, 12, 15, 13, 17, 19][..],
        ] {
            let (mut tree, mut arena) = build(inserts);
            for key in inserts {
                let node = lookup(&tree, &arena, *key).unwrap();
                tree.remove(&mut arena, node).unwrap();
                assert_red_blackness(&tree, &arena);
            }
            assert!(tree.is_empty());
            assert_eq!(tree.first(&arena), None);
            assert_eq!(tree.last(&arena), None);
            assert!(arena.iter().all(|i| i.link.is_detached()));
        }
    }

    #[test]
    fn removed_node_can_join_another_tree() {
        let (mut a, mut arena) = build(&[1, 2, 3, 4]);
        let three = lookup(&a, &arena, 3).unwrap();
        a.remove(&mut arena, three).unwrap();

        let mut b: RbTree<Item> = RbTree::new(by_key);
        assert!(b.insert(&mut arena, None, three).unwrap().is_inserted());
        assert_eq!(keys(&a, &arena), [1, 2, 4]);
        assert_eq!(keys(&b, &arena), [3]);
        assert!(b.contains_node(&arena, three));
        assert!(!a.contains_node(&arena, three));
    }

    #[test]
    fn descending_comparator() {
        let mut arena: Vec<Item> = [5, 1, 4, 2, 3].into_iter().map(item).collect();
        let mut tree: RbTree<Item, _> = RbTree::new(|a: &Item, b: &Item| b.key.cmp(&a.key));
        for i in 0..arena.len() {
            let at = tree.find(&arena, None, &arena[i]).unwrap().insertion_point();
            assert!(tree.insert(&mut arena, at, id(i)).unwrap().is_inserted());
        }
        let keys: Vec<i32> = tree.iter(&arena).map(|(_, i)| i.key).collect();
        assert_eq!(keys, [5, 4, 3, 2, 1]);
    }

    #[test]
    fn invalidate_walks_in_order() {
        let (mut tree, mut arena) = build(&[50, 30, 70, 20, 40, 60, 80]);
        let mut destroyed = Vec::new();
        tree.invalidate_with(&mut arena, |_, item| destroyed.push(item.key));
        assert_eq!(destroyed, [20, 30, 40, 50, 60, 70, 80]);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert!(arena.iter().all(|i| i.link.is_detached()));

        // everything can go back in
        for i in 0..arena.len() {
            assert!(insert(&mut tree, &mut arena, id(i)).is_inserted());
        }
        assert_eq!(tree.len(), 7);
        assert_red_blackness(&tree, &arena);

        tree.invalidate(&mut arena);
        assert!(tree.is_empty());
        let mut empty: RbTree<Item> = RbTree::new(by_key);
        empty.invalidate(&mut arena);
        assert!(empty.is_empty());
    }

    #[test]
    fn contains_node() {
        let (tree, mut arena) = build(&[1, 2, 3]);
        arena.push(item(4));
        for i in 0..3 {
            assert!(tree.contains_node(&arena, id(i)));
        }
        assert!(!tree.contains_node(&arena, id(3)));
        assert!(!tree.contains_node(&arena, id(8)));
    }

    #[test]
    fn works_over_array() {
        use intrusive_vec::Array;

        let mut arena: Array<Item> = Array::new();
        let mut tree: RbTree<Item> = RbTree::new(by_key);
        for key in [4, 8, 1, 7] {
            let node = arena.push_node(item(key));
            let at = tree.find(&arena, None, &arena[node.index()]).unwrap().insertion_point();
            assert!(tree.insert(&mut arena, at, node).unwrap().is_inserted());
        }
        let keys: Vec<i32> = tree.iter(&arena).map(|(_, i)| i.key).collect();
        assert_eq!(keys, [1, 4, 7, 8]);
        assert!(tree.validate(&arena).is_ok());
    }

    mod proptests {
        use std::collections::BTreeSet;

        use proptest::prelude::*;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;

        use super::*;

        #[cfg(not(miri))]
        const TREE_SIZE: usize = 1000;
        #[cfg(miri)]
        const TREE_SIZE: usize = 50;

        #[cfg(not(miri))]
        const PROPTEST_CASES: u32 = 256;
        #[cfg(miri)]
        const PROPTEST_CASES: u32 = 10;

        proptest!(
            #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

            #[test]
            fn order(inserts in proptest::collection::vec(0..10000i32, 0..TREE_SIZE)) {
                let mut arena: Vec<Item> = inserts.iter().copied().map(item).collect();
                let mut tree: RbTree<Item> = RbTree::new(by_key);
                let mut duplicates = 0;
                for i in 0..arena.len() {
                    if let Insertion::AlreadyExists(_) = insert(&mut tree, &mut arena, id(i)) {
                        duplicates += 1;
                    }
                }

                let unique: BTreeSet<i32> = inserts.iter().copied().collect();
                prop_assert_eq!(tree.len(), unique.len());
                prop_assert_eq!(duplicates, inserts.len() - unique.len());
                prop_assert_eq!(keys(&tree, &arena), unique.into_iter().collect::<Vec<_>>());
                prop_assert!(tree.validate(&arena).is_ok());
            }

            #[test]
            fn next_prev_inverse(inserts in proptest::collection::hash_set(0..10000i32, 1..TREE_SIZE)) {
                let inserts: Vec<i32> = inserts.into_iter().collect();
                let (tree, arena) = build(&inserts);

                let mut x = tree.first(&arena).unwrap();
                let mut steps = 1;
                while let Some(next) = tree.next(&arena, x).unwrap() {
                    prop_assert!(arena[x.index()].key < arena[next.index()].key);
                    prop_assert_eq!(tree.prev(&arena, next).unwrap(), Some(x));
                    x = next;
                    steps += 1;
                }
                prop_assert_eq!(Some(x), tree.last(&arena));
                prop_assert_eq!(steps, tree.len());

                let mut steps = 1;
                while let Some(prev) = tree.prev(&arena, x).unwrap() {
                    prop_assert!(arena[prev.index()].key < arena[x.index()].key);
                    prop_assert_eq!(tree.next(&arena, prev).unwrap(), Some(x));
                    x = prev;
                    steps += 1;
                }
                prop_assert_eq!(Some(x), tree.first(&arena));
                prop_assert_eq!(steps, tree.len());
            }

            #[test]
            fn delete(
                inserts in proptest::collection::hash_set(0..10000i32, 0..TREE_SIZE),
                seed in any::<u64>(),
            ) {
                let inserts: Vec<i32> = inserts.into_iter().collect();
                let (mut tree, mut arena) = build(&inserts);

                let mut order: Vec<usize> = (0..inserts.len()).collect();
                order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
                let mut remaining: BTreeSet<i32> = inserts.iter().copied().collect();
                for i in order {
                    tree.remove(&mut arena, id(i)).unwrap();
                    remaining.remove(&inserts[i]);
                    prop_assert!(arena[i].link.is_detached());
                    prop_assert_eq!(tree.len(), remaining.len());
                    if let Err(e) = tree.validate(&arena) {
                        return Err(TestCaseError::fail(e.to_string()));
                    }
                }

                prop_assert_eq!(tree.root(), None);
                prop_assert_eq!(tree.first(&arena), None);
                prop_assert_eq!(tree.last(&arena), None);
            }

            #[test]
            fn insert_remove_roundtrip(
                inserts in proptest::collection::hash_set(0..10000i32, 0..TREE_SIZE),
                extra in 10000..20000i32,
            ) {
                let inserts: Vec<i32> = inserts.into_iter().collect();
                let (mut tree, mut arena) = build(&inserts);
                let before = keys(&tree, &arena);

                arena.push(item(extra));
                let node = id(arena.len() - 1);
                prop_assert!(insert(&mut tree, &mut arena, node).is_inserted());
                prop_assert!(tree.validate(&arena).is_ok());
                tree.remove(&mut arena, node).unwrap();

                prop_assert_eq!(keys(&tree, &arena), before);
                prop_assert_eq!(tree.len(), inserts.len());
                prop_assert!(tree.validate(&arena).is_ok());
            }
        );
    }
}
