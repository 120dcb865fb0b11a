//! Node storage shared by the intrusive containers.
//!
//! Containers in this workspace never allocate. Their link records live
//! inside caller values, and those values live in some [`Arena`] where they
//! are addressed by a [`NodeId`]. [`Array`] is the growable buffer the
//! workspace provides for that purpose, but plain slices and `Vec`s work too.

#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

mod arena;
mod vec;

pub use arena::{Arena, NodeId};
pub use vec::Array;
