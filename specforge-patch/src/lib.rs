//! specforge patch - pointer resolution and atomic document mutation
//!
//! The engine applies a bounded batch of pointer-addressed operations to a
//! working copy of the document, re-validates the whole result against the
//! schema, and commits all-or-nothing. Pointer handling lives in `pointer`,
//! per-operation semantics in `engine`.

mod engine;
mod pointer;

pub use engine::apply;
pub use pointer::{escape, parse_pointer, resolve, seq_index, END_TOKEN};
