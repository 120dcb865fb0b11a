use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use intrusive_vec::{Arena, NodeId};

use crate::error::ListError;

/// Intrusive singly linked list link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SListLink {
    pub(crate) next: Option<NodeId>,
}

impl SListLink {
    pub const fn new() -> Self {
        Self { next: None }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.next = None;
    }

    #[inline]
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// The last member of a list also looks detached.
    pub fn is_detached(&self) -> bool {
        self.next.is_none()
    }
}

/// Values that carry an [`SListLink`].
pub trait SListLinked {
    fn slist_link(&self) -> &SListLink;

    fn slist_link_mut(&mut self) -> &mut SListLink;
}

/// Intrusive singly linked list, a stack with insertion after any member.
pub struct SList<T> {
    head: Option<NodeId>,
    len: usize,
    marker: PhantomData<fn(&T)>,
}

impl<T> fmt::Debug for SList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SList")
            .field("len", &self.len)
            .field("head", &self.head)
            .finish()
    }
}

impl<T> Default for SList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SList<T> {
    pub fn new() -> Self {
        Self {
            head: None,
            len: 0,
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<NodeId> {
        self.head
    }
}

/// Resets the singly linked link of the value at `id`.
pub fn slink_init<A>(arena: &mut A, id: NodeId) -> Result<(), ListError>
where
    A: Arena + ?Sized,
    A::Node: SListLinked,
{
    arena
        .node_mut(id)
        .map(|node| node.slist_link_mut().reset())
        .ok_or(ListError::InvalidNode(id))
}

fn check<A>(arena: &A, id: NodeId) -> Result<(), ListError>
where
    A: Arena + ?Sized,
    A::Node: SListLinked,
{
    match arena.node(id) {
        Some(node) => {
            debug_assert!(
                node.slist_link().is_detached(),
                "node {id} is already linked"
            );
            Ok(())
        }
        None => Err(ListError::InvalidNode(id)),
    }
}

fn next_of<A>(arena: &A, id: NodeId) -> Result<Option<NodeId>, ListError>
where
    A: Arena + ?Sized,
    A::Node: SListLinked,
{
    arena
        .node(id)
        .map(|node| node.slist_link().next)
        .ok_or(ListError::InvalidNode(id))
}

fn set_next<A>(arena: &mut A, id: NodeId, next: Option<NodeId>) -> Result<(), ListError>
where
    A: Arena + ?Sized,
    A::Node: SListLinked,
{
    arena
        .node_mut(id)
        .map(|node| node.slist_link_mut().next = next)
        .ok_or(ListError::InvalidNode(id))
}

impl<T: SListLinked> SList<T> {
    pub fn push_front<A>(&mut self, arena: &mut A, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        check(arena, id)?;
        set_next(arena, id, self.head)?;
        self.head = Some(id);
        self.len += 1;
        Ok(())
    }

    pub fn pop_front<A>(&mut self, arena: &mut A) -> Option<NodeId>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let head = self.head?;
        let next = next_of(arena, head).ok()?;
        set_next(arena, head, None).ok()?;
        self.head = next;
        self.len -= 1;
        Some(head)
    }

    /// Links `id` right after the member `at`.
    pub fn insert_after<A>(&mut self, arena: &mut A, at: NodeId, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        check(arena, id)?;
        let next = next_of(arena, at)?;
        set_next(arena, id, next)?;
        set_next(arena, at, Some(id))?;
        self.len += 1;
        Ok(())
    }

    /// Unlinks and returns the member following `at`, `Ok(None)` if `at` is last.
    pub fn remove_after<A>(&mut self, arena: &mut A, at: NodeId) -> Result<Option<NodeId>, ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let Some(removed) = next_of(arena, at)? else {
            return Ok(None);
        };
        let next = next_of(arena, removed)?;
        set_next(arena, at, next)?;
        set_next(arena, removed, None)?;
        self.len -= 1;
        Ok(Some(removed))
    }

    /// Resets the link of every member and empties the list.
    pub fn clear<A>(&mut self, arena: &mut A)
    where
        A: Arena<Node = T> + ?Sized,
    {
        while self.pop_front(arena).is_some() {}
        self.head = None;
        self.len = 0;
    }

    pub fn iter<'a, A>(&self, arena: &'a A) -> SIter<'a, A>
    where
        A: Arena<Node = T> + ?Sized,
    {
        SIter {
            arena,
            current: self.head,
            remaining: self.len,
        }
    }
}

/// Iterator over the members of an [`SList`].
pub struct SIter<'a, A: ?Sized> {
    arena: &'a A,
    current: Option<NodeId>,
    remaining: usize,
}

impl<'a, A> Iterator for SIter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: SListLinked,
{
    type Item = (NodeId, &'a A::Node);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.current?;
        let node = self.arena.node(id)?;
        self.remaining -= 1;
        self.current = node.slist_link().next;
        Some((id, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<'a, A> FusedIterator for SIter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: SListLinked,
{
}
