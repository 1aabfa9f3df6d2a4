//! Component definitions
//!
//! A [`ComponentDefinition`] is the declarative description of one component:
//! what to build, never the built instance. The registration engine treats it
//! as opaque and only reads the name and aliases carried by its
//! [`DefinitionHolder`].

use std::fmt;

/// Scope name for shared instances
pub const SCOPE_SINGLETON: &str = "singleton";

/// Scope name for per-lookup instances
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// Autowiring strategy named by `autowire` / `default-autowire`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireMode {
    #[default]
    No,
    ByName,
    ByType,
    Constructor,
}

impl AutowireMode {
    /// Parse an attribute value; unknown values mean no autowiring
    pub fn parse(value: &str) -> Self {
        match value {
            "byName" => AutowireMode::ByName,
            "byType" => AutowireMode::ByType,
            "constructor" => AutowireMode::Constructor,
            _ => AutowireMode::No,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AutowireMode::No => "no",
            AutowireMode::ByName => "byName",
            AutowireMode::ByType => "byType",
            AutowireMode::Constructor => "constructor",
        }
    }
}

impl fmt::Display for AutowireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property or constructor argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Literal string, converted by the container later
    Literal(String),
    /// Reference to another component by name
    Reference(String),
    /// Explicit null
    Null,
}

/// A named property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub name: String,
    pub value: Value,
}

/// A constructor argument, by index or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorArg {
    pub index: Option<usize>,
    pub name: Option<String>,
    pub value: Value,
}

/// Declarative description of one component
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentDefinition {
    pub class_name: Option<String>,
    pub parent_name: Option<String>,
    /// Empty means the container default (singleton)
    pub scope: String,
    pub is_abstract: bool,
    pub lazy_init: bool,
    pub primary: bool,
    pub autowire: AutowireMode,
    pub autowire_candidate: bool,
    pub depends_on: Vec<String>,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
    pub description: Option<String>,
    pub properties: Vec<PropertyValue>,
    pub constructor_args: Vec<ConstructorArg>,
    /// Human readable origin, e.g. the resource it was read from
    pub source: Option<String>,
}

impl ComponentDefinition {
    pub fn new(class_name: impl Into<String>) -> Self {
        ComponentDefinition {
            class_name: Some(class_name.into()),
            autowire_candidate: true,
            ..Self::default()
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_empty() || self.scope == SCOPE_SINGLETON
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Add or replace a property value
    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.properties.push(PropertyValue { name, value }),
        }
    }
}

/// A definition together with the name and aliases it registers under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionHolder {
    pub name: String,
    pub aliases: Vec<String>,
    pub definition: ComponentDefinition,
}

impl DefinitionHolder {
    pub fn new(name: impl Into<String>, definition: ComponentDefinition) -> Self {
        DefinitionHolder {
            name: name.into(),
            aliases: Vec::new(),
            definition,
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }
}

impl fmt::Display for DefinitionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component definition with name '{}'", self.name)?;
        if !self.aliases.is_empty() {
            write!(f, " and aliases [{}]", self.aliases.join(","))?;
        }
        if let Some(class) = &self.definition.class_name {
            write!(f, ": class [{}]", class)?;
        }
        Ok(())
    }
}

/// Parsing defaults effective within one nesting level of the document.
///
/// Values are fully resolved at scope entry (an unset attribute already holds
/// the enclosing scope's value), so lookups never walk the parent chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDefaults {
    pub lazy_init: bool,
    pub merge: bool,
    pub autowire: AutowireMode,
    /// Comma separated name patterns, e.g. `*Service,*Dao`
    pub autowire_candidates: Option<String>,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
}

impl Default for ScopeDefaults {
    fn default() -> Self {
        ScopeDefaults {
            lazy_init: false,
            merge: false,
            autowire: AutowireMode::No,
            autowire_candidates: None,
            init_method: None,
            destroy_method: None,
        }
    }
}

impl ScopeDefaults {
    /// Whether a component name matches the `autowire_candidates` patterns.
    /// No patterns means every component is a candidate.
    pub fn is_autowire_candidate(&self, name: &str) -> bool {
        let Some(patterns) = &self.autowire_candidates else {
            return true;
        };
        patterns
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .any(|pattern| simple_match(pattern, name))
    }
}

/// `*` wildcard matching, the only wildcard autowire candidate patterns use
fn simple_match(pattern: &str, text: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == text,
        Some((head, tail)) => {
            if !text.starts_with(head) {
                return false;
            }
            let rest = &text[head.len()..];
            if tail.is_empty() {
                return true;
            }
            (0..=rest.len())
                .filter(|i| rest.is_char_boundary(*i))
                .any(|i| simple_match(tail, &rest[i..]))
        }
    }
}
