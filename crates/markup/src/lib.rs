//! Markup - HTML import, export and static rendering
//!
//! This crate connects the document model to HTML: a lenient fragment
//! parser, the element importers and exporters of annotation nodes, whole
//! document import and export, and the converter pipeline that renders stored
//! snapshots to HTML strings.

mod dom;
mod element;
mod error;
mod escape;
mod html;
mod parser;

pub use dom::*;
pub use element::*;
pub use error::*;
pub use escape::*;
pub use html::*;
pub use parser::*;
