//! Raw-text primitives
//!
//! Everything that runs before (or beneath) structural parsing:
//! - Scanner: comment-aware line scanning using memchr
//! - Validation: DTD vs XSD detection over the raw stream
//! - Encoding: BOM / UTF-16 detection and conversion to UTF-8
//! - DTD: DOCTYPE external identifier parsing

pub mod dtd;
pub mod encoding;
pub mod scanner;
pub mod validation;
