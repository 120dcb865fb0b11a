//! Intrusive red-black tree.
//!
//! The tree never owns or allocates its members. Each member embeds an
//! [`RbNode`], lives in an [`Arena`] owned by the caller and is referred to
//! by its [`NodeId`]. Insertion is split in two steps: [`RbTree::find`]
//! reports where a value belongs, [`RbTree::insert`] links it there.
//!
//! ```
//! use std::cmp::Ordering;
//!
//! use intrusive_rbtree::{RbLinked, RbNode, RbTree, Search};
//!
//! struct Entry {
//!     key: u32,
//!     link: RbNode,
//! }
//!
//! impl RbLinked for Entry {
//!     fn rb_node(&self) -> &RbNode {
//!         &self.link
//!     }
//!
//!     fn rb_node_mut(&mut self) -> &mut RbNode {
//!         &mut self.link
//!     }
//! }
//!
//! fn by_key(a: &Entry, b: &Entry) -> Ordering {
//!     a.key.cmp(&b.key)
//! }
//!
//! let mut arena: Vec<Entry> = [3, 1, 2]
//!     .into_iter()
//!     .map(|key| Entry { key, link: RbNode::new() })
//!     .collect();
//! let mut tree: RbTree<Entry> = RbTree::new(by_key);
//!
//! for i in 0..arena.len() {
//!     let id = i.into();
//!     let at = tree.find(&arena, None, &arena[i])?.insertion_point();
//!     assert!(tree.insert(&mut arena, at, id)?.is_inserted());
//! }
//!
//! let keys: Vec<u32> = tree.iter(&arena).map(|(_, e)| e.key).collect();
//! assert_eq!(keys, [1, 2, 3]);
//!
//! let needle = Entry { key: 2, link: RbNode::new() };
//! let Search::Found(two) = tree.find(&arena, None, &needle)? else {
//!     unreachable!()
//! };
//! tree.remove(&mut arena, two)?;
//! assert_eq!(tree.len(), 2);
//! # Ok::<(), intrusive_rbtree::RbError>(())
//! ```

#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

mod error;
mod iter;
mod node;
mod red_black_tree;
mod validate;

pub use error::RbError;
pub use intrusive_vec::{Arena, NodeId};
pub use iter::{next, prev, Iter};
pub use node::{node_init, Color, RbLinked, RbNode};
pub use red_black_tree::{Insertion, InsertionPoint, RbTree, Search, Side};
pub use validate::InvariantViolation;
