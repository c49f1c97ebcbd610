//! # State
//!
//! The editable state of a document. Everything here is read-only to the outside world,
//! changes happen exclusively through [`crate::commands`].

pub mod document;
pub mod layer;

pub use document::{Document, DocumentID, DocumentSnapshot, Version};
pub use layer::{Layer, LayerID, LayerStack};
