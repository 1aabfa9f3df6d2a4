//! Document registration engine
//!
//! Walks one parsed document and registers what it declares:
//! - `import`: placeholder substitution, then [`resolve_import`]
//! - `alias`: both attributes required, then the registry
//! - `component` / `bean`: built by the [`ElementParser`], decorated, registered
//! - nested `beans`: recursion with a child [`ScopeContext`]
//! - anything in a foreign namespace: handed to the parser's custom handling
//!
//! The enclosing scope travels down the recursion as a parameter, so a child
//! scope can never disturb its parent's defaults. A failing child element is
//! reported as a [`Problem`](super::Problem) and its siblings still run.
//!
//! A registrar borrows its reader mutably for one pass and is not meant to
//! be shared between threads.

use std::sync::Arc;

use super::context::ReaderContext;
use super::definition_reader::XmlDefinitionReader;
use super::import::resolve_import;
use crate::definition::ScopeDefaults;
use crate::dom::{Document, Element};
use crate::environment::tokenize;
use crate::parser::{
    ElementParser, ALIAS_ATTRIBUTE, ALIAS_ELEMENT, BEAN_ELEMENT, COMPONENT_ELEMENT, IMPORT_ELEMENT,
    MULTI_VALUE_ATTRIBUTE_DELIMITERS, NAME_ATTRIBUTE, NESTED_SCOPE_ELEMENT, PROFILE_ATTRIBUTE,
    RESOURCE_ATTRIBUTE,
};
use crate::registry::{register_holder, DefinitionRegistry};
use crate::resource::Resource;

/// Parsing defaults for one nesting level, linked to the enclosing level
#[derive(Debug)]
pub struct ScopeContext<'p> {
    defaults: ScopeDefaults,
    parent: Option<&'p ScopeContext<'p>>,
}

impl<'p> ScopeContext<'p> {
    pub fn new(defaults: ScopeDefaults, parent: Option<&'p ScopeContext<'p>>) -> Self {
        ScopeContext { defaults, parent }
    }

    pub fn defaults(&self) -> &ScopeDefaults {
        &self.defaults
    }

    pub fn parent(&self) -> Option<&'p ScopeContext<'p>> {
        self.parent
    }

    /// 0 for the document root scope
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth() + 1)
    }
}

/// What the engine does with a child element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Import,
    Alias,
    Component,
    NestedScope,
    Foreign,
    /// Default grammar, but nothing to register (`description`, ...)
    Unrecognized,
}

/// Classify a child element of a default-grammar scope
pub fn classify(parser: &dyn ElementParser, element: Element<'_>) -> ElementKind {
    if !parser.is_default_namespace(element) {
        ElementKind::Foreign
    } else if parser.node_name_equals(element, IMPORT_ELEMENT) {
        ElementKind::Import
    } else if parser.node_name_equals(element, ALIAS_ELEMENT) {
        ElementKind::Alias
    } else if parser.node_name_equals(element, COMPONENT_ELEMENT) || parser.node_name_equals(element, BEAN_ELEMENT) {
        ElementKind::Component
    } else if parser.node_name_equals(element, NESTED_SCOPE_ELEMENT) {
        ElementKind::NestedScope
    } else {
        ElementKind::Unrecognized
    }
}

/// Extension points around each accepted scope. No-ops by default.
pub trait RegistrationHooks {
    /// Runs before the scope's children are processed
    fn pre_process(&self, _root: Element<'_>, _ctx: &mut ReaderContext<'_>) {}

    /// Runs after the scope's children are processed
    fn post_process(&self, _root: Element<'_>, _ctx: &mut ReaderContext<'_>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl RegistrationHooks for NoHooks {}

pub(crate) struct DocumentRegistrar<'r, R: DefinitionRegistry> {
    reader: &'r mut XmlDefinitionReader<R>,
    resource: Resource,
    parser: Arc<dyn ElementParser>,
    hooks: Arc<dyn RegistrationHooks>,
}

impl<'r, R: DefinitionRegistry> DocumentRegistrar<'r, R> {
    pub(crate) fn new(reader: &'r mut XmlDefinitionReader<R>, resource: Resource) -> Self {
        let parser = reader.element_parser();
        let hooks = reader.hooks();
        DocumentRegistrar {
            reader,
            resource,
            parser,
            hooks,
        }
    }

    pub(crate) fn register_document(&mut self, document: &Document) {
        tracing::debug!(resource = %self.resource, "registering definitions");
        self.register_all(document.root_element(), None);
    }

    /// Process one scope: defaults, profile gate, hooks, children
    fn register_all(&mut self, root: Element<'_>, parent: Option<&ScopeContext<'_>>) {
        let defaults = self.parser.init_defaults(root, parent.map(|p| p.defaults()));
        let scope = ScopeContext::new(defaults, parent);
        self.reader
            .context(&self.resource)
            .fire_defaults_registered(scope.defaults(), root);

        if self.parser.is_default_namespace(root) && !self.profile_accepted(root) {
            return;
        }

        self.hooks.pre_process(root, &mut self.reader.context(&self.resource));
        self.parse_scope(root, &scope);
        self.hooks.post_process(root, &mut self.reader.context(&self.resource));
    }

    fn profile_accepted(&self, root: Element<'_>) -> bool {
        let profile_attr = root.attribute_or_empty(PROFILE_ATTRIBUTE);
        let profiles = tokenize(profile_attr, MULTI_VALUE_ATTRIBUTE_DELIMITERS);
        if profiles.is_empty() {
            return true;
        }
        let names: Vec<&str> = profiles.iter().map(String::as_str).collect();
        if self.reader.environment().accepts_profiles(&names) {
            return true;
        }
        tracing::debug!(
            profiles = profile_attr,
            resource = %self.resource,
            line = root.line(),
            "skipped scope: none of its profiles is active"
        );
        false
    }

    fn parse_scope(&mut self, root: Element<'_>, scope: &ScopeContext<'_>) {
        if !self.parser.is_default_namespace(root) {
            self.parser
                .parse_custom_element(root, &mut self.reader.context(&self.resource));
            return;
        }
        for child in root.children() {
            match classify(&*self.parser, child) {
                ElementKind::Import => self.import_resources(child),
                ElementKind::Alias => self.register_alias(child),
                ElementKind::Component => self.register_component(child, scope),
                ElementKind::NestedScope => self.register_all(child, Some(scope)),
                ElementKind::Foreign => self
                    .parser
                    .parse_custom_element(child, &mut self.reader.context(&self.resource)),
                ElementKind::Unrecognized => {
                    tracing::trace!(element = child.tag_name(), "nothing to register")
                }
            }
        }
    }

    fn import_resources(&mut self, element: Element<'_>) {
        let raw = element.attribute_or_empty(RESOURCE_ATTRIBUTE);
        if raw.trim().is_empty() {
            self.reader
                .context(&self.resource)
                .error("Resource location must not be empty", element);
            return;
        }

        let location = match self.reader.environment().resolve_required_placeholders(raw) {
            Ok(location) => location,
            Err(e) => {
                self.reader.context(&self.resource).error_with_cause(
                    format!("Could not resolve placeholders in resource location [{}]", raw),
                    element,
                    Box::new(e),
                );
                return;
            }
        };

        match resolve_import(&mut *self.reader, &location, &self.resource) {
            Ok(actual) => {
                tracing::debug!(location = %location, resources = actual.len(), "import processed");
                self.reader.context(&self.resource).fire_import_processed(
                    &location,
                    actual.into_iter().collect(),
                    element,
                );
            }
            Err(e) => {
                let message = e.to_string();
                self.reader
                    .context(&self.resource)
                    .error_with_cause(message, element, Box::new(e));
            }
        }
    }

    fn register_alias(&mut self, element: Element<'_>) {
        let name = element.attribute_or_empty(NAME_ATTRIBUTE);
        let alias = element.attribute_or_empty(ALIAS_ATTRIBUTE);
        let mut ctx = self.reader.context(&self.resource);

        let missing = match (name.trim().is_empty(), alias.trim().is_empty()) {
            (true, true) => Some("Name and alias must not be empty"),
            (true, false) => Some("Name must not be empty"),
            (false, true) => Some("Alias must not be empty"),
            (false, false) => None,
        };
        if let Some(message) = missing {
            ctx.error(message, element);
            return;
        }

        match ctx.registry_mut().register_alias(name, alias) {
            Ok(()) => ctx.fire_alias_registered(name, alias, element),
            Err(e) => ctx.error_with_cause(
                format!("Failed to register alias '{}' for component with name '{}'", alias, name),
                element,
                Box::new(e),
            ),
        }
    }

    fn register_component(&mut self, element: Element<'_>, scope: &ScopeContext<'_>) {
        let mut ctx = self.reader.context(&self.resource);
        let Some(holder) = self
            .parser
            .parse_definition_element(element, scope.defaults(), &mut ctx)
        else {
            return;
        };
        let holder = self.parser.decorate_if_required(element, holder, &mut ctx);

        let name = holder.name.clone();
        match register_holder(ctx.registry_mut(), holder.clone()) {
            Ok(()) => ctx.fire_component_registered(holder, element),
            Err(e) => ctx.error_with_cause(
                format!("Failed to register component definition with name '{}'", name),
                element,
                Box::new(e),
            ),
        }
    }
}
