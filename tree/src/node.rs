use intrusive_vec::{Arena, NodeId};

use crate::error::RbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    Red,
    #[default]
    Black,
}

impl Color {
    #[must_use]
    pub fn is_red(&self) -> bool {
        matches!(self, Self::Red)
    }

    #[must_use]
    pub fn is_black(&self) -> bool {
        matches!(self, Self::Black)
    }
}

/// Intrusive red-black tree link, embedded in every value that can join a tree.
///
/// A detached link is black and has no parent or children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) color: Color,
}

impl Default for RbNode {
    fn default() -> Self {
        Self::new()
    }
}

impl RbNode {
    pub const fn new() -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            color: Color::Black,
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    #[inline]
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    /// The only member of a one node tree also looks detached.
    pub fn is_detached(&self) -> bool {
        *self == Self::new()
    }
}

pub trait RbLinked {
    fn rb_node(&self) -> &RbNode;

    fn rb_node_mut(&mut self) -> &mut RbNode;
}

/// Resets the link of the value at `id`. Idempotent.
pub fn node_init<A>(arena: &mut A, id: NodeId) -> Result<(), RbError>
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    match arena.node_mut(id) {
        Some(node) => {
            node.rb_node_mut().reset();
            Ok(())
        }
        None => Err(RbError::InvalidNode(id)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodePos {
    Root,
    Left,
    Right,
}

#[cold]
#[track_caller]
fn unlinked(id: NodeId) -> ! {
    panic!("node {id} is linked into a tree but missing from the arena")
}

// Link access for tree members. A member that does not resolve is corruption
// and panics.
pub(crate) trait Links: Arena {
    fn at(&self, id: NodeId) -> &Self::Node;

    fn at_mut(&mut self, id: NodeId) -> &mut Self::Node;

    fn rb(&self, id: NodeId) -> &RbNode;

    fn rb_mut(&mut self, id: NodeId) -> &mut RbNode;

    #[inline]
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.rb(id).parent
    }

    #[inline]
    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.rb(id).left
    }

    #[inline]
    fn right(&self, id: NodeId) -> Option<NodeId> {
        self.rb(id).right
    }

    #[inline]
    fn color(&self, id: NodeId) -> Color {
        self.rb(id).color
    }

    #[inline]
    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.rb_mut(id).parent = parent;
    }

    #[inline]
    fn set_left(&mut self, id: NodeId, left: Option<NodeId>) {
        self.rb_mut(id).left = left;
    }

    #[inline]
    fn set_right(&mut self, id: NodeId, right: Option<NodeId>) {
        self.rb_mut(id).right = right;
    }

    #[inline]
    fn set_color(&mut self, id: NodeId, color: Color) {
        self.rb_mut(id).color = color;
    }

    /// Absent children count as black.
    #[inline]
    fn is_black(&self, id: Option<NodeId>) -> bool {
        id.map_or(true, |id| self.color(id).is_black())
    }

    #[inline]
    fn pos(&self, id: NodeId) -> NodePos {
        match self.parent(id) {
            None => NodePos::Root,
            Some(p) if self.left(p) == Some(id) => NodePos::Left,
            Some(p) => {
                debug_assert_eq!(self.right(p), Some(id));
                NodePos::Right
            }
        }
    }

    fn min_of(&self, root: NodeId) -> NodeId {
        let mut x = root;
        while let Some(left) = self.left(x) {
            x = left;
        }
        x
    }

    fn max_of(&self, root: NodeId) -> NodeId {
        let mut x = root;
        while let Some(right) = self.right(x) {
            x = right;
        }
        x
    }
}

impl<A> Links for A
where
    A: Arena + ?Sized,
    A::Node: RbLinked,
{
    #[inline]
    fn at(&self, id: NodeId) -> &A::Node {
        match self.node(id) {
            Some(node) => node,
            None => unlinked(id),
        }
    }

    #[inline]
    fn at_mut(&mut self, id: NodeId) -> &mut A::Node {
        match self.node_mut(id) {
            Some(node) => node,
            None => unlinked(id),
        }
    }

    #[inline]
    fn rb(&self, id: NodeId) -> &RbNode {
        self.at(id).rb_node()
    }

    #[inline]
    fn rb_mut(&mut self, id: NodeId) -> &mut RbNode {
        self.at_mut(id).rb_node_mut()
    }
}
