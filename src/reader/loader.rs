//! Document loading
//!
//! Bytes in, element tree out. The grammar a document declares is looked up
//! through the entity resolver and checked against the document:
//! - DTD mode: the external subset must declare the root element
//! - XSD mode: each `xsi:schemaLocation` entry must be an XML Schema whose
//!   target namespace matches the namespace it is listed under
//!
//! Content models are not validated. A grammar the resolver cannot find is
//! not an error; its system id is handed back so the caller can report it.

use crate::core::dtd::declares_element;
use crate::core::encoding::decode_document;
use crate::core::validation::ValidationMode;
use crate::dom::{ns, Document, ParseOptions};
use crate::error::DocumentError;
use crate::resolver::{EntityResolver, InputSource};

/// A parsed document plus the grammars that could not be resolved
#[derive(Debug)]
pub struct LoadedDocument {
    pub document: Document,
    /// System ids the entity resolver returned nothing for
    pub unresolved: Vec<String>,
}

/// Strategy for turning raw bytes into a [`Document`]
pub trait DocumentLoader {
    fn load_document(
        &self,
        bytes: Vec<u8>,
        description: &str,
        entity_resolver: &dyn EntityResolver,
        mode: ValidationMode,
        options: ParseOptions,
    ) -> Result<LoadedDocument, DocumentError>;
}

/// Loader built on the quick-xml backed [`Document`] parser
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlDocumentLoader;

impl XmlDocumentLoader {
    fn check_doctype(
        &self,
        document: &Document,
        description: &str,
        entity_resolver: &dyn EntityResolver,
        unresolved: &mut Vec<String>,
    ) -> Result<(), DocumentError> {
        let Some(doctype) = document.doctype() else {
            return Err(DocumentError::Malformed {
                position: 0,
                message: "DTD validation requested but the document has no DOCTYPE declaration".to_string(),
            });
        };
        let root = document.root_element();
        if doctype.root_name != root.tag_name() {
            return Err(DocumentError::DoctypeMismatch {
                declared: doctype.root_name.clone(),
                actual: root.tag_name().to_string(),
            });
        }
        let Some(system_id) = doctype.system_id.as_deref() else {
            return Ok(());
        };
        let Some(source) = entity_resolver.resolve_entity(doctype.public_id.as_deref(), Some(system_id))? else {
            tracing::debug!(description, system_id, "DTD not resolved");
            unresolved.push(system_id.to_string());
            return Ok(());
        };

        let dtd = grammar_text(source, system_id)?;
        if !declares_element(&dtd, &doctype.root_name) {
            return Err(DocumentError::Grammar {
                system_id: system_id.to_string(),
                message: format!("root element <{}> is not declared", doctype.root_name),
            });
        }
        tracing::trace!(description, system_id, "DTD declares the root element");
        Ok(())
    }

    fn check_schemas(
        &self,
        document: &Document,
        description: &str,
        entity_resolver: &dyn EntityResolver,
        unresolved: &mut Vec<String>,
    ) -> Result<(), DocumentError> {
        let Some(locations) = document.root_element().attribute_ns(ns::XSI, "schemaLocation") else {
            return Ok(());
        };
        // namespace / location pairs
        let tokens: Vec<&str> = locations.split_whitespace().collect();
        for pair in tokens.chunks(2) {
            let [namespace, location] = pair else {
                tracing::debug!(description, "odd number of schemaLocation tokens, ignoring the last one");
                continue;
            };
            let Some(source) = entity_resolver.resolve_entity(None, Some(location))? else {
                tracing::debug!(description, namespace, location, "schema not resolved");
                unresolved.push(location.to_string());
                continue;
            };
            check_schema(source, namespace, location)?;
            tracing::trace!(description, namespace, location, "schema matches its namespace");
        }
        Ok(())
    }
}

impl DocumentLoader for XmlDocumentLoader {
    fn load_document(
        &self,
        bytes: Vec<u8>,
        description: &str,
        entity_resolver: &dyn EntityResolver,
        mode: ValidationMode,
        options: ParseOptions,
    ) -> Result<LoadedDocument, DocumentError> {
        let text = decode_document(bytes)?;
        let document = Document::parse(text, options)?;
        tracing::trace!(description, %mode, nodes = document.node_count(), "parsed document");
        let mut unresolved = Vec::new();
        match mode {
            ValidationMode::Dtd => self.check_doctype(&document, description, entity_resolver, &mut unresolved)?,
            ValidationMode::Xsd => self.check_schemas(&document, description, entity_resolver, &mut unresolved)?,
            ValidationMode::None | ValidationMode::Auto => {}
        }
        Ok(LoadedDocument { document, unresolved })
    }
}

fn grammar_text(source: InputSource, system_id: &str) -> Result<String, DocumentError> {
    decode_document(source.bytes).map_err(|e| DocumentError::Grammar {
        system_id: system_id.to_string(),
        message: e.to_string(),
    })
}

/// The resolved bytes must be an `xsd:schema` targeting `namespace`
fn check_schema(source: InputSource, namespace: &str, location: &str) -> Result<(), DocumentError> {
    let rejected = |message: String| DocumentError::Grammar {
        system_id: location.to_string(),
        message,
    };
    let text = grammar_text(source, location)?;
    let schema = Document::parse(text, ParseOptions::default()).map_err(|e| rejected(e.to_string()))?;
    let root = schema.root_element();
    if root.namespace_uri() != Some(ns::XSD) || root.local_name() != "schema" {
        return Err(rejected(format!("<{}> is not an XML Schema root", root.tag_name())));
    }
    let target = root.attribute("targetNamespace").unwrap_or_default();
    if target != namespace {
        return Err(rejected(format!(
            "target namespace [{}] does not match [{}]",
            target, namespace
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::resolver::NoEntityResolver;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves grammars from a table and records every request
    #[derive(Default)]
    struct TableResolver {
        grammars: HashMap<String, String>,
        requested: RefCell<Vec<String>>,
    }

    impl TableResolver {
        fn with(mut self, system_id: &str, content: &str) -> Self {
            self.grammars.insert(system_id.to_string(), content.to_string());
            self
        }
    }

    impl EntityResolver for TableResolver {
        fn resolve_entity(
            &self,
            public_id: Option<&str>,
            system_id: Option<&str>,
        ) -> Result<Option<InputSource>, ResourceError> {
            let system_id = system_id.unwrap_or_default();
            self.requested.borrow_mut().push(system_id.to_string());
            Ok(self
                .grammars
                .get(system_id)
                .map(|content| InputSource::new(public_id, Some(system_id), content.clone().into_bytes())))
        }
    }

    fn load(xml: &str, resolver: &dyn EntityResolver, mode: ValidationMode) -> Result<LoadedDocument, DocumentError> {
        XmlDocumentLoader.load_document(xml.as_bytes().to_vec(), "test", resolver, mode, ParseOptions::default())
    }

    const BEANS_XSD: &str = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:beans"/>"#;

    #[test]
    fn test_dtd_declares_root() {
        let resolver = TableResolver::default().with("http://example.com/beans.dtd", "<!ELEMENT beans ANY>");
        let loaded = load(
            r#"<!DOCTYPE beans PUBLIC "-//APP//DTD BEAN//EN" "http://example.com/beans.dtd"><beans/>"#,
            &resolver,
            ValidationMode::Dtd,
        )
        .unwrap();
        assert_eq!(loaded.document.root_element().tag_name(), "beans");
        assert!(loaded.unresolved.is_empty());
        assert_eq!(*resolver.requested.borrow(), vec!["http://example.com/beans.dtd"]);
    }

    #[test]
    fn test_dtd_without_root_declaration_rejected() {
        let resolver = TableResolver::default().with("beans.dtd", "this is not a DTD");
        let err = load(r#"<!DOCTYPE beans SYSTEM "beans.dtd"><beans/>"#, &resolver, ValidationMode::Dtd).unwrap_err();
        assert!(matches!(err, DocumentError::Grammar { ref system_id, .. } if system_id == "beans.dtd"));
    }

    #[test]
    fn test_unresolved_dtd_reported() {
        let loaded = load(r#"<!DOCTYPE beans SYSTEM "beans.dtd"><beans/>"#, &NoEntityResolver, ValidationMode::Dtd)
            .unwrap();
        assert_eq!(loaded.unresolved, vec!["beans.dtd"]);
    }

    #[test]
    fn test_doctype_root_mismatch() {
        let err = load(r#"<!DOCTYPE beans SYSTEM "beans.dtd"><other/>"#, &NoEntityResolver, ValidationMode::Dtd)
            .unwrap_err();
        assert!(matches!(err, DocumentError::DoctypeMismatch { .. }));
    }

    #[test]
    fn test_dtd_mode_requires_doctype() {
        assert!(load("<beans/>", &NoEntityResolver, ValidationMode::Dtd).is_err());
        assert!(load("<beans/>", &NoEntityResolver, ValidationMode::None).is_ok());
    }

    #[test]
    fn test_schema_locations_checked() {
        let resolver = TableResolver::default().with("http://example.com/beans.xsd", BEANS_XSD);
        let loaded = load(
            r#"<beans xmlns="urn:beans" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                xsi:schemaLocation="urn:beans http://example.com/beans.xsd urn:p http://example.com/p.xsd"/>"#,
            &resolver,
            ValidationMode::Xsd,
        )
        .unwrap();
        assert_eq!(
            *resolver.requested.borrow(),
            vec!["http://example.com/beans.xsd", "http://example.com/p.xsd"]
        );
        assert_eq!(loaded.unresolved, vec!["http://example.com/p.xsd"]);
    }

    #[test]
    fn test_schema_content_rejected() {
        let doc = r#"<beans xmlns="urn:beans" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                xsi:schemaLocation="urn:beans http://example.com/beans.xsd"/>"#;

        let garbage = TableResolver::default().with("http://example.com/beans.xsd", "this is not a schema at all");
        assert!(matches!(
            load(doc, &garbage, ValidationMode::Xsd).unwrap_err(),
            DocumentError::Grammar { .. }
        ));

        let not_schema = TableResolver::default().with("http://example.com/beans.xsd", "<beans/>");
        let err = load(doc, &not_schema, ValidationMode::Xsd).unwrap_err();
        assert!(err.to_string().contains("is not an XML Schema root"));

        let other_ns = TableResolver::default().with(
            "http://example.com/beans.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:other"/>"#,
        );
        let err = load(doc, &other_ns, ValidationMode::Xsd).unwrap_err();
        assert!(err.to_string().contains("does not match [urn:beans]"));
    }

    #[test]
    fn test_utf16_document() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<beans/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let loaded = XmlDocumentLoader
            .load_document(bytes, "utf16", &NoEntityResolver, ValidationMode::Xsd, ParseOptions::default())
            .unwrap();
        assert_eq!(loaded.document.root_element().local_name(), "beans");
    }
}
