//! Intrusive linked lists.
//!
//! [`List`] is doubly linked over [`ListLink`], [`SList`] singly linked over
//! [`SListLink`]. Like every container of the workspace they only store
//! handles: members live in a caller owned [`Arena`] and removing a member
//! resets its link so it can be linked again.

#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

mod error;
mod list;
mod slist;

pub use error::ListError;
pub use intrusive_vec::{Arena, NodeId};
pub use list::{link_init, next, prev, Iter, List, ListLink, ListLinked};
pub use slist::{slink_init, SIter, SList, SListLink, SListLinked};
