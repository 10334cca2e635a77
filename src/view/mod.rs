//! Rendering of API payloads into the page document

pub mod document;
pub mod format;
pub mod logs;
pub mod stats;

pub use document::{anchor, Document, Node, Patch};
