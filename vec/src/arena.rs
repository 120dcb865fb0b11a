use core::fmt;

/// Handle of a value stored in an [`Arena`].
///
/// Handles are plain indices. They are what the intrusive links store in
/// place of pointers, so a handle stays meaningful only as long as the
/// arena keeps the value at the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage that resolves [`NodeId`]s to values.
///
/// A lookup that returns `None` is how the containers detect an invalid
/// node reference. Implementations must keep a value at the same handle
/// for as long as it is linked into a container.
pub trait Arena {
    type Node;

    fn node(&self, id: NodeId) -> Option<&Self::Node>;

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Self::Node>;

    #[inline]
    fn resolves(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }
}

impl<T> Arena for [T] {
    type Node = T;

    #[inline]
    fn node(&self, id: NodeId) -> Option<&T> {
        self.get(id.index())
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id.index())
    }
}

impl<T, const N: usize> Arena for [T; N] {
    type Node = T;

    #[inline]
    fn node(&self, id: NodeId) -> Option<&T> {
        self.get(id.index())
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id.index())
    }
}

impl<T> Arena for Vec<T> {
    type Node = T;

    #[inline]
    fn node(&self, id: NodeId) -> Option<&T> {
        self.get(id.index())
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id.index())
    }
}
