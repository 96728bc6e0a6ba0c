//! Edit Engine - annotation toggling, editor commands, and undo/redo
//!
//! This crate applies and removes inline annotations on a
//! [`doc_model::DocumentTree`], runs the editor's typed command bus, drives
//! the floating annotation editor, and records every change for undo/redo.

mod bus;
mod command;
mod error;
mod executor;
mod floating_editor;
mod plugin;
mod schema;
mod session;
mod settings;
mod toggle;
mod toolbar;
mod undo;

pub use bus::*;
pub use command::*;
pub use error::*;
pub use executor::*;
pub use floating_editor::*;
pub use plugin::*;
pub use schema::*;
pub use session::*;
pub use settings::*;
pub use toggle::*;
pub use toolbar::*;
pub use undo::*;
