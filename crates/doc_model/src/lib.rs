//! Document Model - rich-text tree with inline annotation nodes
//!
//! This crate provides the document tree the editor mutates: an arena of
//! block and inline nodes with stable ids, the abbreviation and language-tag
//! annotation nodes, range selections, and the JSON snapshot format used for
//! persistence and static HTML conversion.

mod annotation;
mod error;
mod node;
mod node_id;
mod selection;
mod snapshot;
mod tree;

pub use annotation::*;
pub use error::*;
pub use node::*;
pub use node_id::*;
pub use selection::*;
pub use snapshot::*;
pub use tree::*;
