//! Namespace handlers
//!
//! Elements and attributes outside the default grammar are routed by
//! namespace URI to a [`NamespaceHandler`]. The `p` namespace handler is
//! built in: `p:url="..."` sets a literal property, `p:dao-ref="..."` a
//! reference.

use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::{DefinitionHolder, Value};
use crate::dom::{Element, XmlAttribute};
use crate::reader::ReaderContext;

/// Namespace URI of the property shortcut namespace
pub const P_NAMESPACE_URI: &str = "http://www.springframework.org/schema/p";

const REF_SUFFIX: &str = "-ref";

/// Handler for one foreign namespace
pub trait NamespaceHandler {
    /// Parse a top-level element of this namespace. A returned holder is
    /// registered by the caller.
    fn parse(&self, element: Element<'_>, ctx: &mut ReaderContext<'_>) -> Option<DefinitionHolder>;

    /// Decorate a definition with an attribute of this namespace found on
    /// its component element
    fn decorate_attribute(
        &self,
        _attribute: &XmlAttribute,
        _element: Element<'_>,
        holder: DefinitionHolder,
        _ctx: &mut ReaderContext<'_>,
    ) -> DefinitionHolder {
        holder
    }

    /// Decorate a definition with a child element of this namespace
    fn decorate_element(
        &self,
        _child: Element<'_>,
        holder: DefinitionHolder,
        _ctx: &mut ReaderContext<'_>,
    ) -> DefinitionHolder {
        holder
    }
}

/// Namespace URI to handler table
#[derive(Clone, Default)]
pub struct NamespaceHandlerResolver {
    handlers: HashMap<String, Arc<dyn NamespaceHandler>>,
}

impl NamespaceHandlerResolver {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in handlers registered
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();
        resolver.register(P_NAMESPACE_URI, Arc::new(PropertyNamespaceHandler));
        resolver
    }

    pub fn register(&mut self, namespace_uri: impl Into<String>, handler: Arc<dyn NamespaceHandler>) {
        self.handlers.insert(namespace_uri.into(), handler);
    }

    pub fn resolve(&self, namespace_uri: &str) -> Option<Arc<dyn NamespaceHandler>> {
        self.handlers.get(namespace_uri).cloned()
    }
}

impl std::fmt::Debug for NamespaceHandlerResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// `p` namespace: attribute shortcut for property values
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyNamespaceHandler;

impl NamespaceHandler for PropertyNamespaceHandler {
    fn parse(&self, element: Element<'_>, ctx: &mut ReaderContext<'_>) -> Option<DefinitionHolder> {
        ctx.error(
            "Simple 'p:' namespace does not have any defined elements, use it as attributes instead",
            element,
        );
        None
    }

    fn decorate_attribute(
        &self,
        attribute: &XmlAttribute,
        element: Element<'_>,
        mut holder: DefinitionHolder,
        ctx: &mut ReaderContext<'_>,
    ) -> DefinitionHolder {
        let local = attribute.local_name();
        let (name, value) = match local.strip_suffix(REF_SUFFIX) {
            Some(name) => (name, Value::Reference(attribute.value.clone())),
            None => (local, Value::Literal(attribute.value.clone())),
        };
        if holder.definition.property(name).is_some() {
            ctx.error(
                format!(
                    "Property '{}' is already defined using both <property> and inline syntax. Only one approach may be used per property.",
                    name
                ),
                element,
            );
            return holder;
        }
        holder.definition.set_property(name, value);
        holder
    }
}
