//! Entity resolution
//!
//! Maps the external identifiers a document declares (a DOCTYPE system id,
//! `xsi:schemaLocation` entries) to bytes:
//! - [`DelegatingEntityResolver`]: local DTD and schema tables
//! - [`ResourceEntityResolver`]: the tables first, then the resource loader,
//!   then a remote fetch for `.dtd` / `.xsd` identifiers

pub mod delegating;
pub mod resource;

use crate::error::ResourceError;

pub use delegating::{DelegatingEntityResolver, DtdResolver, SchemaResolver};
pub use resource::ResourceEntityResolver;

pub const DTD_SUFFIX: &str = ".dtd";
pub const XSD_SUFFIX: &str = ".xsd";

/// Resolved entity content with the identifiers it was requested under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub bytes: Vec<u8>,
}

impl InputSource {
    pub fn new(public_id: Option<&str>, system_id: Option<&str>, bytes: Vec<u8>) -> Self {
        InputSource {
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
            bytes,
        }
    }
}

/// Resolves external identifiers to content
pub trait EntityResolver {
    /// `Ok(None)` leaves resolution to the parser's default behaviour
    fn resolve_entity(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Option<InputSource>, ResourceError>;
}

/// Resolver that never resolves anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEntityResolver;

impl EntityResolver for NoEntityResolver {
    fn resolve_entity(&self, _: Option<&str>, _: Option<&str>) -> Result<Option<InputSource>, ResourceError> {
        Ok(None)
    }
}
