use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use intrusive_vec::{Arena, NodeId};

use crate::error::ListError;

/// Intrusive doubly linked list link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListLink {
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl ListLink {
    pub const fn new() -> Self {
        Self {
            prev: None,
            next: None,
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    #[inline]
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// The only member of a one element list also looks detached.
    pub fn is_detached(&self) -> bool {
        self.prev.is_none() && self.next.is_none()
    }
}

/// Values that carry a [`ListLink`].
pub trait ListLinked {
    fn list_link(&self) -> &ListLink;

    fn list_link_mut(&mut self) -> &mut ListLink;
}

/// Resets the link of the value at `id`.
pub fn link_init<A>(arena: &mut A, id: NodeId) -> Result<(), ListError>
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
    arena
        .node_mut(id)
        .map(|node| node.list_link_mut().reset())
        .ok_or(ListError::InvalidNode(id))
}

pub fn next<A>(arena: &A, id: NodeId) -> Result<Option<NodeId>, ListError>
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
    arena
        .node(id)
        .map(|node| node.list_link().next)
        .ok_or(ListError::InvalidNode(id))
}

pub fn prev<A>(arena: &A, id: NodeId) -> Result<Option<NodeId>, ListError>
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
    arena
        .node(id)
        .map(|node| node.list_link().prev)
        .ok_or(ListError::InvalidNode(id))
}

#[cold]
#[track_caller]
fn unlinked(id: NodeId) -> ! {
    panic!("node {id} is linked into a list but missing from the arena")
}

#[inline]
fn link<A>(arena: &A, id: NodeId) -> &ListLink
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
    match arena.node(id) {
        Some(node) => node.list_link(),
        None => unlinked(id),
    }
}

#[inline]
fn link_mut<A>(arena: &mut A, id: NodeId) -> &mut ListLink
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
    match arena.node_mut(id) {
        Some(node) => node.list_link_mut(),
        None => unlinked(id),
    }
}

/// Intrusive doubly linked list over values of type `T` stored in an [`Arena`].
pub struct List<T> {
    // Head and tail can only be None both at once (when count == 0).
    // If count == 1 both point to the same node.
    head_tail: Option<HeadTail>,
    count: usize,
    marker: PhantomData<fn(&T)>,
}

#[derive(Debug, Clone, Copy)]
struct HeadTail {
    head: NodeId,
    tail: NodeId,
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("count", &self.count)
            .field("head", &self.front())
            .field("tail", &self.back())
            .finish()
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self {
            head_tail: None,
            count: 0,
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn front(&self) -> Option<NodeId> {
        self.head_tail.map(|ht| ht.head)
    }

    pub fn back(&self) -> Option<NodeId> {
        self.head_tail.map(|ht| ht.tail)
    }

    fn set_head(&mut self, head: NodeId) {
        if let Some(ht) = self.head_tail.as_mut() {
            ht.head = head;
        }
    }

    fn set_tail(&mut self, tail: NodeId) {
        if let Some(ht) = self.head_tail.as_mut() {
            ht.tail = tail;
        }
    }
}

impl<T: ListLinked> List<T> {
    fn check<A>(arena: &A, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        match arena.node(id) {
            Some(node) => {
                debug_assert!(
                    node.list_link().is_detached(),
                    "node {id} is already linked"
                );
                Ok(())
            }
            None => Err(ListError::InvalidNode(id)),
        }
    }

    pub fn push_back<A>(&mut self, arena: &mut A, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        Self::check(arena, id)?;
        *link_mut(arena, id) = ListLink {
            prev: self.back(),
            next: None,
        };

        match &mut self.head_tail {
            Some(HeadTail { tail, .. }) => {
                link_mut(arena, *tail).next = Some(id);
                *tail = id;
            }
            None => {
                debug_assert_eq!(self.count, 0);
                self.head_tail = Some(HeadTail { head: id, tail: id });
            }
        }

        self.count += 1;
        Ok(())
    }

    pub fn push_front<A>(&mut self, arena: &mut A, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        Self::check(arena, id)?;
        *link_mut(arena, id) = ListLink {
            prev: None,
            next: self.front(),
        };

        match &mut self.head_tail {
            Some(HeadTail { head, .. }) => {
                link_mut(arena, *head).prev = Some(id);
                *head = id;
            }
            None => {
                debug_assert_eq!(self.count, 0);
                self.head_tail = Some(HeadTail { head: id, tail: id });
            }
        }

        self.count += 1;
        Ok(())
    }

    /// Links `id` right after the member `at`.
    pub fn insert_after<A>(&mut self, arena: &mut A, at: NodeId, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        if !arena.resolves(at) {
            return Err(ListError::InvalidNode(at));
        }
        Self::check(arena, id)?;

        let next = link(arena, at).next;
        *link_mut(arena, id) = ListLink {
            prev: Some(at),
            next,
        };
        link_mut(arena, at).next = Some(id);
        match next {
            Some(next) => link_mut(arena, next).prev = Some(id),
            None => self.set_tail(id),
        }

        self.count += 1;
        Ok(())
    }

    /// Links `id` right before the member `at`.
    pub fn insert_before<A>(&mut self, arena: &mut A, at: NodeId, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        if !arena.resolves(at) {
            return Err(ListError::InvalidNode(at));
        }
        Self::check(arena, id)?;

        let prev = link(arena, at).prev;
        *link_mut(arena, id) = ListLink {
            prev,
            next: Some(at),
        };
        link_mut(arena, at).prev = Some(id);
        match prev {
            Some(prev) => link_mut(arena, prev).next = Some(id),
            None => self.set_head(id),
        }

        self.count += 1;
        Ok(())
    }

    /// Unlinks the member `id` and resets its link.
    ///
    /// A node that claims to be an end of the list without being that end is
    /// rejected with [`ListError::NotAMember`]. Other non members are not
    /// detected and corrupt the list.
    pub fn remove<A>(&mut self, arena: &mut A, id: NodeId) -> Result<(), ListError>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let ListLink { prev, next } = match arena.node(id) {
            Some(node) => *node.list_link(),
            None => return Err(ListError::InvalidNode(id)),
        };

        match (prev, next) {
            (None, None) => {
                // only node
                if self.front() != Some(id) {
                    return Err(ListError::NotAMember(id));
                }
                debug_assert_eq!(self.count, 1);
                self.head_tail = None;
            }
            (Some(prev), Some(next)) => {
                // middle
                link_mut(arena, prev).next = Some(next);
                link_mut(arena, next).prev = Some(prev);
            }
            (Some(prev), None) => {
                // tail
                if self.back() != Some(id) {
                    return Err(ListError::NotAMember(id));
                }
                link_mut(arena, prev).next = None;
                self.set_tail(prev);
            }
            (None, Some(next)) => {
                // head
                if self.front() != Some(id) {
                    return Err(ListError::NotAMember(id));
                }
                link_mut(arena, next).prev = None;
                self.set_head(next);
            }
        }

        link_mut(arena, id).reset();
        self.count -= 1;
        Ok(())
    }

    pub fn pop_front<A>(&mut self, arena: &mut A) -> Option<NodeId>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let head = self.front()?;
        self.remove(arena, head).ok()?;
        Some(head)
    }

    pub fn pop_back<A>(&mut self, arena: &mut A) -> Option<NodeId>
    where
        A: Arena<Node = T> + ?Sized,
    {
        let tail = self.back()?;
        self.remove(arena, tail).ok()?;
        Some(tail)
    }

    /// Resets the link of every member and empties the list.
    pub fn clear<A>(&mut self, arena: &mut A)
    where
        A: Arena<Node = T> + ?Sized,
    {
        let mut current = self.front();
        while let Some(id) = current {
            let link = link_mut(arena, id);
            current = link.next;
            link.reset();
        }
        self.head_tail = None;
        self.count = 0;
    }

    pub fn iter<'a, A>(&self, arena: &'a A) -> Iter<'a, A>
    where
        A: Arena<Node = T> + ?Sized,
    {
        Iter {
            arena,
            front: self.front(),
            back: self.back(),
            remaining: self.count,
        }
    }
}

/// Iterator over the members of a [`List`] from front to back.
pub struct Iter<'a, A: ?Sized> {
    arena: &'a A,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, A> Iterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
    type Item = (NodeId, &'a A::Node);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        let node = match self.arena.node(id) {
            Some(node) => node,
            None => unlinked(id),
        };
        self.remaining -= 1;
        self.front = node.list_link().next;
        Some((id, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, A> DoubleEndedIterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        let node = match self.arena.node(id) {
            Some(node) => node,
            None => unlinked(id),
        };
        self.remaining -= 1;
        self.back = node.list_link().prev;
        Some((id, node))
    }
}

impl<'a, A> ExactSizeIterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
}

impl<'a, A> FusedIterator for Iter<'a, A>
where
    A: Arena + ?Sized,
    A::Node: ListLinked,
{
}
