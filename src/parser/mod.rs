//! Element-level parsing
//!
//! The registration engine never looks inside a component element. It hands
//! elements to an [`ElementParser`], which builds definitions, computes scope
//! defaults and routes foreign-namespace content to namespace handlers.
//!
//! - [`DefaultElementParser`]: the default grammar (`component` / `bean`)
//! - [`NamespaceHandler`]: extension point for foreign namespaces

pub mod default;
pub mod namespace;

use crate::definition::{DefinitionHolder, ScopeDefaults};
use crate::dom::Element;
use crate::reader::ReaderContext;

pub use default::DefaultElementParser;
pub use namespace::{NamespaceHandler, NamespaceHandlerResolver, PropertyNamespaceHandler};

/// Namespace URI of the default grammar
pub const BEANS_NAMESPACE_URI: &str = "http://www.springframework.org/schema/beans";

/// Delimiters for multi-value attributes such as `name` and `profile`
pub const MULTI_VALUE_ATTRIBUTE_DELIMITERS: &str = ",; \t\n\r";

/// Scope root tag
pub const NESTED_SCOPE_ELEMENT: &str = "beans";
pub const IMPORT_ELEMENT: &str = "import";
pub const ALIAS_ELEMENT: &str = "alias";
pub const COMPONENT_ELEMENT: &str = "component";
/// Alternative tag accepted for component definitions
pub const BEAN_ELEMENT: &str = "bean";

pub const PROFILE_ATTRIBUTE: &str = "profile";
pub const RESOURCE_ATTRIBUTE: &str = "resource";
pub const NAME_ATTRIBUTE: &str = "name";
pub const ALIAS_ATTRIBUTE: &str = "alias";

/// Builds definitions and scope defaults from elements
pub trait ElementParser {
    /// Whether the element belongs to the default grammar: no namespace, or
    /// the beans namespace
    fn is_default_namespace(&self, element: Element<'_>) -> bool {
        match element.namespace_uri() {
            None => true,
            Some(uri) => uri.is_empty() || uri == BEANS_NAMESPACE_URI,
        }
    }

    /// Whether the element's local name is `name`
    fn node_name_equals(&self, element: Element<'_>, name: &str) -> bool {
        element.local_name() == name || element.tag_name() == name
    }

    /// Defaults for the scope rooted at `element`; unset attributes inherit
    /// from `parent`
    fn init_defaults(&self, element: Element<'_>, parent: Option<&ScopeDefaults>) -> ScopeDefaults;

    /// Build a definition from a component element. `None` means the element
    /// was rejected; any problem has already been reported.
    fn parse_definition_element(
        &self,
        element: Element<'_>,
        defaults: &ScopeDefaults,
        ctx: &mut ReaderContext<'_>,
    ) -> Option<DefinitionHolder>;

    /// Apply foreign-namespace attributes and child elements to a definition
    fn decorate_if_required(
        &self,
        element: Element<'_>,
        holder: DefinitionHolder,
        ctx: &mut ReaderContext<'_>,
    ) -> DefinitionHolder;

    /// Handle an element outside the default grammar
    fn parse_custom_element(&self, element: Element<'_>, ctx: &mut ReaderContext<'_>);
}
