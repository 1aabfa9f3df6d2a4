//! Local DTD and schema tables

use std::collections::HashMap;

use super::{EntityResolver, InputSource, DTD_SUFFIX, XSD_SUFFIX};
use crate::error::ResourceError;

/// DTDs keyed by file name, so any URL ending in a known name matches
#[derive(Debug, Clone, Default)]
pub struct DtdResolver {
    dtds: HashMap<String, Vec<u8>>,
}

impl DtdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, file_name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.dtds.insert(file_name.into(), content.into());
    }

    pub fn resolve(&self, public_id: Option<&str>, system_id: &str) -> Option<InputSource> {
        if !system_id.ends_with(DTD_SUFFIX) {
            return None;
        }
        let file_name = system_id.rsplit('/').next().unwrap_or(system_id);
        let content = self.dtds.get(file_name)?;
        tracing::trace!(system_id, "found DTD in local table");
        Some(InputSource::new(public_id, Some(system_id), content.clone()))
    }
}

/// Schemas keyed by system id. An `https:` id also matches an `http:` entry.
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver {
    schemas: HashMap<String, Vec<u8>>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, system_id: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.schemas.insert(system_id.into(), content.into());
    }

    pub fn resolve(&self, public_id: Option<&str>, system_id: &str) -> Option<InputSource> {
        let content = self.schemas.get(system_id).or_else(|| {
            let rest = system_id.strip_prefix("https:")?;
            self.schemas.get(&format!("http:{}", rest))
        })?;
        tracing::trace!(system_id, "found schema in local table");
        Some(InputSource::new(public_id, Some(system_id), content.clone()))
    }
}

/// Routes `.dtd` ids to a [`DtdResolver`] and `.xsd` ids to a [`SchemaResolver`]
#[derive(Debug, Clone, Default)]
pub struct DelegatingEntityResolver {
    dtd: DtdResolver,
    schema: SchemaResolver,
}

impl DelegatingEntityResolver {
    pub fn new(dtd: DtdResolver, schema: SchemaResolver) -> Self {
        DelegatingEntityResolver { dtd, schema }
    }

    pub fn dtd_mut(&mut self) -> &mut DtdResolver {
        &mut self.dtd
    }

    pub fn schema_mut(&mut self) -> &mut SchemaResolver {
        &mut self.schema
    }
}

impl EntityResolver for DelegatingEntityResolver {
    fn resolve_entity(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Option<InputSource>, ResourceError> {
        let Some(system_id) = system_id else {
            return Ok(None);
        };
        if system_id.ends_with(DTD_SUFFIX) {
            Ok(self.dtd.resolve(public_id, system_id))
        } else if system_id.ends_with(XSD_SUFFIX) {
            Ok(self.schema.resolve(public_id, system_id))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DelegatingEntityResolver {
        let mut dtd = DtdResolver::new();
        dtd.register("beans.dtd", "<!ELEMENT beans ANY>");
        let mut schema = SchemaResolver::new();
        schema.register("http://example.com/schema/beans.xsd", "<xsd:schema/>");
        DelegatingEntityResolver::new(dtd, schema)
    }

    #[test]
    fn test_dtd_matched_by_file_name() {
        let source = resolver()
            .resolve_entity(Some("-//APP//DTD BEANS//EN"), Some("http://anywhere.org/dtd/beans.dtd"))
            .unwrap()
            .unwrap();
        assert_eq!(source.bytes, b"<!ELEMENT beans ANY>");
        assert_eq!(source.public_id.as_deref(), Some("-//APP//DTD BEANS//EN"));
        assert_eq!(source.system_id.as_deref(), Some("http://anywhere.org/dtd/beans.dtd"));
    }

    #[test]
    fn test_schema_https_falls_back_to_http_entry() {
        let r = resolver();
        assert!(r
            .resolve_entity(None, Some("https://example.com/schema/beans.xsd"))
            .unwrap()
            .is_some());
        assert!(r
            .resolve_entity(None, Some("https://example.com/schema/other.xsd"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_other_suffixes_unresolved() {
        let r = resolver();
        assert!(r.resolve_entity(None, Some("beans.xml")).unwrap().is_none());
        assert!(r.resolve_entity(Some("-//X//EN"), None).unwrap().is_none());
    }
}
