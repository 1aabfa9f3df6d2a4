//! DOM Module - Arena-based XML Document
//!
//! Implements a compact element tree using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - Namespace resolution stack applied while building

pub mod document;
pub mod namespace;
pub mod node;

pub use document::{ChildIter, Document, Element, ParseOptions};
pub use namespace::ns;
pub use node::{NodeId, XmlAttribute, XmlNode};
