//! Default grammar parser
//!
//! Parses `component` (or `bean`) elements into [`ComponentDefinition`]s
//! and `beans` attributes into [`ScopeDefaults`]. Problems are reported on
//! the [`ReaderContext`]; a rejected property or argument is dropped while
//! the rest of the definition is kept.

use crate::definition::{
    AutowireMode, ComponentDefinition, ConstructorArg, DefinitionHolder, PropertyValue, ScopeDefaults, Value,
};
use crate::dom::{ns, Element};
use crate::environment::tokenize;
use crate::reader::ReaderContext;
use crate::registry::register_holder;

use super::namespace::NamespaceHandlerResolver;
use super::{ElementParser, MULTI_VALUE_ATTRIBUTE_DELIMITERS, NAME_ATTRIBUTE};

const TRUE_VALUE: &str = "true";
const DEFAULT_VALUE: &str = "default";

const ID_ATTRIBUTE: &str = "id";
const CLASS_ATTRIBUTE: &str = "class";
const PARENT_ATTRIBUTE: &str = "parent";
const SCOPE_ATTRIBUTE: &str = "scope";
const SINGLETON_ATTRIBUTE: &str = "singleton";
const ABSTRACT_ATTRIBUTE: &str = "abstract";
const LAZY_INIT_ATTRIBUTE: &str = "lazy-init";
const AUTOWIRE_ATTRIBUTE: &str = "autowire";
const AUTOWIRE_CANDIDATE_ATTRIBUTE: &str = "autowire-candidate";
const PRIMARY_ATTRIBUTE: &str = "primary";
const DEPENDS_ON_ATTRIBUTE: &str = "depends-on";
const INIT_METHOD_ATTRIBUTE: &str = "init-method";
const DESTROY_METHOD_ATTRIBUTE: &str = "destroy-method";
const INDEX_ATTRIBUTE: &str = "index";
const REF_ATTRIBUTE: &str = "ref";
const VALUE_ATTRIBUTE: &str = "value";
const BEAN_REF_ATTRIBUTE: &str = "bean";

const DEFAULT_LAZY_INIT_ATTRIBUTE: &str = "default-lazy-init";
const DEFAULT_MERGE_ATTRIBUTE: &str = "default-merge";
const DEFAULT_AUTOWIRE_ATTRIBUTE: &str = "default-autowire";
const DEFAULT_AUTOWIRE_CANDIDATES_ATTRIBUTE: &str = "default-autowire-candidates";
const DEFAULT_INIT_METHOD_ATTRIBUTE: &str = "default-init-method";
const DEFAULT_DESTROY_METHOD_ATTRIBUTE: &str = "default-destroy-method";

const DESCRIPTION_ELEMENT: &str = "description";
const META_ELEMENT: &str = "meta";
const PROPERTY_ELEMENT: &str = "property";
const CONSTRUCTOR_ARG_ELEMENT: &str = "constructor-arg";
const REF_ELEMENT: &str = "ref";
const IDREF_ELEMENT: &str = "idref";
const VALUE_ELEMENT: &str = "value";
const NULL_ELEMENT: &str = "null";

/// Separator between a generated name's base and its counter
pub const GENERATED_NAME_SEPARATOR: &str = "#";

/// Namespaces whose unknown members are configuration errors rather than
/// ignorable metadata
const RESERVED_NAMESPACE_PREFIX: &str = "http://www.springframework.org/";

/// Parser for the default grammar
#[derive(Debug, Clone)]
pub struct DefaultElementParser {
    handlers: NamespaceHandlerResolver,
}

impl Default for DefaultElementParser {
    fn default() -> Self {
        Self::with_handlers(NamespaceHandlerResolver::with_defaults())
    }
}

impl DefaultElementParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handlers(handlers: NamespaceHandlerResolver) -> Self {
        DefaultElementParser { handlers }
    }

    pub fn handlers_mut(&mut self) -> &mut NamespaceHandlerResolver {
        &mut self.handlers
    }

    fn parse_component(
        &self,
        element: Element<'_>,
        name: &str,
        defaults: &ScopeDefaults,
        ctx: &mut ReaderContext<'_>,
    ) -> ComponentDefinition {
        let mut definition = ComponentDefinition {
            class_name: non_empty(element.attribute_or_empty(CLASS_ATTRIBUTE).trim()),
            parent_name: non_empty(element.attribute_or_empty(PARENT_ATTRIBUTE)),
            source: Some(ctx.resource().to_string()),
            ..ComponentDefinition::default()
        };

        if element.has_attribute(SINGLETON_ATTRIBUTE) {
            ctx.error("Old 1.x 'singleton' attribute in use - upgrade to 'scope' declaration", element);
        } else {
            definition.scope = element.attribute_or_empty(SCOPE_ATTRIBUTE).to_string();
        }
        definition.is_abstract = element.attribute_or_empty(ABSTRACT_ATTRIBUTE) == TRUE_VALUE;
        definition.lazy_init = flag(element.attribute_or_empty(LAZY_INIT_ATTRIBUTE), defaults.lazy_init);
        definition.primary = element.attribute_or_empty(PRIMARY_ATTRIBUTE) == TRUE_VALUE;

        let autowire = element.attribute_or_empty(AUTOWIRE_ATTRIBUTE);
        definition.autowire = if is_default_value(autowire) {
            defaults.autowire
        } else {
            AutowireMode::parse(autowire)
        };

        let candidate = element.attribute_or_empty(AUTOWIRE_CANDIDATE_ATTRIBUTE);
        definition.autowire_candidate = if is_default_value(candidate) {
            defaults.is_autowire_candidate(name)
        } else {
            candidate == TRUE_VALUE
        };

        definition.depends_on = tokenize(
            element.attribute_or_empty(DEPENDS_ON_ATTRIBUTE),
            MULTI_VALUE_ATTRIBUTE_DELIMITERS,
        );
        definition.init_method = element
            .attribute(INIT_METHOD_ATTRIBUTE)
            .map(str::to_string)
            .or_else(|| defaults.init_method.clone());
        definition.destroy_method = element
            .attribute(DESTROY_METHOD_ATTRIBUTE)
            .map(str::to_string)
            .or_else(|| defaults.destroy_method.clone());

        for child in element.children() {
            if !self.is_default_namespace(child) {
                continue;
            }
            match child.local_name() {
                DESCRIPTION_ELEMENT => definition.description = Some(child.text().to_string()),
                PROPERTY_ELEMENT => self.parse_property_element(child, &mut definition, ctx),
                CONSTRUCTOR_ARG_ELEMENT => self.parse_constructor_arg_element(child, &mut definition, ctx),
                META_ELEMENT => {}
                other => tracing::trace!(element = other, "ignoring unsupported component child"),
            }
        }
        definition
    }

    fn parse_property_element(
        &self,
        element: Element<'_>,
        definition: &mut ComponentDefinition,
        ctx: &mut ReaderContext<'_>,
    ) {
        let name = element.attribute_or_empty(NAME_ATTRIBUTE);
        if name.is_empty() {
            ctx.error("Tag 'property' must have a 'name' attribute", element);
            return;
        }
        if definition.property(name).is_some() {
            ctx.error(format!("Multiple 'property' definitions for property '{}'", name), element);
            return;
        }
        let label = format!("<property> element for property '{}'", name);
        if let Some(value) = self.parse_value(element, &label, ctx) {
            definition.properties.push(PropertyValue {
                name: name.to_string(),
                value,
            });
        }
    }

    fn parse_constructor_arg_element(
        &self,
        element: Element<'_>,
        definition: &mut ComponentDefinition,
        ctx: &mut ReaderContext<'_>,
    ) {
        let index = match element.attribute(INDEX_ATTRIBUTE).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(i) if i < 0 => {
                    ctx.error("'index' cannot be lower than 0", element);
                    return;
                }
                Ok(i) => Some(i as usize),
                Err(_) => {
                    ctx.error("Attribute 'index' of tag 'constructor-arg' must be an integer", element);
                    return;
                }
            },
        };
        if let Some(i) = index {
            if definition.constructor_args.iter().any(|arg| arg.index == Some(i)) {
                ctx.error(format!("Ambiguous constructor-arg entries for index {}", i), element);
                return;
            }
        }
        let Some(value) = self.parse_value(element, "<constructor-arg> element", ctx) else {
            return;
        };
        definition.constructor_args.push(ConstructorArg {
            index,
            name: non_empty(element.attribute_or_empty(NAME_ATTRIBUTE)),
            value,
        });
    }

    /// Value of a `property` or `constructor-arg`: a `ref` attribute, a
    /// `value` attribute, or exactly one sub-element
    fn parse_value(&self, element: Element<'_>, label: &str, ctx: &mut ReaderContext<'_>) -> Option<Value> {
        let mut sub_element = None;
        for child in element.children() {
            if self.node_name_equals(child, DESCRIPTION_ELEMENT) || self.node_name_equals(child, META_ELEMENT) {
                continue;
            }
            if sub_element.is_some() {
                ctx.error(format!("{} must not contain more than one sub-element", label), element);
            } else {
                sub_element = Some(child);
            }
        }

        let has_ref = element.has_attribute(REF_ATTRIBUTE);
        let has_value = element.has_attribute(VALUE_ATTRIBUTE);
        if (has_ref && has_value) || ((has_ref || has_value) && sub_element.is_some()) {
            ctx.error(
                format!(
                    "{} is only allowed to contain either 'ref' attribute OR 'value' attribute OR sub-element",
                    label
                ),
                element,
            );
        }

        if has_ref {
            let target = element.attribute_or_empty(REF_ATTRIBUTE);
            if target.trim().is_empty() {
                ctx.error(format!("{} contains empty 'ref' attribute", label), element);
                return None;
            }
            return Some(Value::Reference(target.to_string()));
        }
        if has_value {
            return Some(Value::Literal(element.attribute_or_empty(VALUE_ATTRIBUTE).to_string()));
        }
        match sub_element {
            Some(sub) => self.parse_sub_element(sub, ctx),
            None => {
                ctx.error(format!("{} must specify a ref or value", label), element);
                None
            }
        }
    }

    fn parse_sub_element(&self, element: Element<'_>, ctx: &mut ReaderContext<'_>) -> Option<Value> {
        if !self.is_default_namespace(element) {
            ctx.error(format!("Unknown property sub-element: <{}>", element.tag_name()), element);
            return None;
        }
        match element.local_name() {
            VALUE_ELEMENT => Some(Value::Literal(element.text().to_string())),
            NULL_ELEMENT => Some(Value::Null),
            REF_ELEMENT | IDREF_ELEMENT => {
                let target = element
                    .attribute(BEAN_REF_ATTRIBUTE)
                    .or_else(|| element.attribute(PARENT_ATTRIBUTE));
                match target {
                    None => {
                        ctx.error(
                            format!("'bean' or 'parent' is required for <{}> element", element.local_name()),
                            element,
                        );
                        None
                    }
                    Some(t) if t.trim().is_empty() => {
                        ctx.error(
                            format!("<{}> element contains empty target attribute", element.local_name()),
                            element,
                        );
                        None
                    }
                    Some(t) if element.local_name() == IDREF_ELEMENT => Some(Value::Literal(t.to_string())),
                    Some(t) => Some(Value::Reference(t.to_string())),
                }
            }
            other => {
                ctx.error(format!("Unknown property sub-element: <{}>", other), element);
                None
            }
        }
    }

    /// `class#N` with the lowest N not yet in use. Falls back to
    /// `parent$child` for class-less child definitions.
    fn generate_name(&self, definition: &ComponentDefinition, ctx: &ReaderContext<'_>) -> Option<String> {
        let base = match (&definition.class_name, &definition.parent_name) {
            (Some(class), _) => class.clone(),
            (None, Some(parent)) => format!("{}$child", parent),
            (None, None) => return None,
        };
        let registry = ctx.registry();
        let mut counter = 0usize;
        loop {
            let candidate = format!("{}{}{}", base, GENERATED_NAME_SEPARATOR, counter);
            if !registry.contains_definition(&candidate) && !registry.is_alias(&candidate) {
                return Some(candidate);
            }
            counter += 1;
        }
    }

    fn report_missing_handler(&self, namespace_uri: &str, element: Element<'_>, ctx: &mut ReaderContext<'_>) {
        if namespace_uri.starts_with(RESERVED_NAMESPACE_PREFIX) {
            ctx.error(
                format!(
                    "Unable to locate namespace handler for XML schema namespace [{}]",
                    namespace_uri
                ),
                element,
            );
        } else {
            tracing::trace!(namespace = namespace_uri, "no namespace handler found, ignoring");
        }
    }
}

impl ElementParser for DefaultElementParser {
    fn init_defaults(&self, element: Element<'_>, parent: Option<&ScopeDefaults>) -> ScopeDefaults {
        let inherited = parent.cloned().unwrap_or_default();
        let autowire = element.attribute_or_empty(DEFAULT_AUTOWIRE_ATTRIBUTE);
        ScopeDefaults {
            lazy_init: flag(
                element.attribute_or_empty(DEFAULT_LAZY_INIT_ATTRIBUTE),
                inherited.lazy_init,
            ),
            merge: flag(element.attribute_or_empty(DEFAULT_MERGE_ATTRIBUTE), inherited.merge),
            autowire: if is_default_value(autowire) {
                inherited.autowire
            } else {
                AutowireMode::parse(autowire)
            },
            autowire_candidates: element
                .attribute(DEFAULT_AUTOWIRE_CANDIDATES_ATTRIBUTE)
                .map(str::to_string)
                .or(inherited.autowire_candidates),
            init_method: element
                .attribute(DEFAULT_INIT_METHOD_ATTRIBUTE)
                .map(str::to_string)
                .or(inherited.init_method),
            destroy_method: element
                .attribute(DEFAULT_DESTROY_METHOD_ATTRIBUTE)
                .map(str::to_string)
                .or(inherited.destroy_method),
        }
    }

    fn parse_definition_element(
        &self,
        element: Element<'_>,
        defaults: &ScopeDefaults,
        ctx: &mut ReaderContext<'_>,
    ) -> Option<DefinitionHolder> {
        let mut aliases = tokenize(
            element.attribute_or_empty(NAME_ATTRIBUTE),
            MULTI_VALUE_ATTRIBUTE_DELIMITERS,
        );
        let mut name = element.attribute_or_empty(ID_ATTRIBUTE).trim().to_string();
        if name.is_empty() && !aliases.is_empty() {
            name = aliases.remove(0);
            tracing::trace!(%name, "no id specified, using first name as component name");
        }

        let definition = self.parse_component(element, &name, defaults, ctx);

        if name.is_empty() {
            let Some(generated) = self.generate_name(&definition, ctx) else {
                ctx.error(
                    "Unnamed component definition specifies neither 'class' nor 'parent' - can't generate a name",
                    element,
                );
                return None;
            };
            // the first instance of a class is also reachable by the plain class name
            if let Some(class) = &definition.class_name {
                let registry = ctx.registry();
                if generated.len() > class.len()
                    && generated.starts_with(class.as_str())
                    && !registry.contains_definition(class)
                    && !registry.is_alias(class)
                {
                    aliases.push(class.clone());
                }
            }
            tracing::trace!(name = %generated, "generated component name");
            name = generated;
        }

        Some(DefinitionHolder::new(name, definition).with_aliases(aliases))
    }

    fn decorate_if_required(
        &self,
        element: Element<'_>,
        mut holder: DefinitionHolder,
        ctx: &mut ReaderContext<'_>,
    ) -> DefinitionHolder {
        for attribute in element.attributes() {
            let Some(uri) = attribute.namespace.as_deref() else {
                continue;
            };
            if !is_decoratable(uri) {
                continue;
            }
            match self.handlers.resolve(uri) {
                Some(handler) => holder = handler.decorate_attribute(attribute, element, holder, ctx),
                None => self.report_missing_handler(uri, element, ctx),
            }
        }
        for child in element.children() {
            let Some(uri) = child.namespace_uri() else {
                continue;
            };
            if !is_decoratable(uri) {
                continue;
            }
            match self.handlers.resolve(uri) {
                Some(handler) => holder = handler.decorate_element(child, holder, ctx),
                None => self.report_missing_handler(uri, child, ctx),
            }
        }
        holder
    }

    fn parse_custom_element(&self, element: Element<'_>, ctx: &mut ReaderContext<'_>) {
        let Some(uri) = element.namespace_uri() else {
            ctx.error(
                format!("Unable to locate namespace handler for element <{}>", element.tag_name()),
                element,
            );
            return;
        };
        let Some(handler) = self.handlers.resolve(uri) else {
            ctx.error(
                format!("Unable to locate namespace handler for XML schema namespace [{}]", uri),
                element,
            );
            return;
        };
        let Some(holder) = handler.parse(element, ctx) else {
            return;
        };
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

fn is_default_value(value: &str) -> bool {
    value.is_empty() || value == DEFAULT_VALUE
}

/// Boolean attribute where `default` (or absence) inherits
fn flag(value: &str, inherited: bool) -> bool {
    if is_default_value(value) {
        inherited
    } else {
        value == TRUE_VALUE
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn is_decoratable(namespace_uri: &str) -> bool {
    !matches!(namespace_uri, ns::XSI | ns::XML | ns::XMLNS | super::BEANS_NAMESPACE_URI)
}
