//! Definition registry
//!
//! The registry is the flat namespace every document pass writes into,
//! whatever the nesting depth of the element a definition came from. Each
//! registration is accepted or rejected as a whole.

use indexmap::IndexMap;

use crate::definition::{ComponentDefinition, DefinitionHolder};
use crate::error::RegistryError;

/// Storage for definitions and name aliases
pub trait DefinitionRegistry {
    fn register_definition(&mut self, name: &str, definition: ComponentDefinition) -> Result<(), RegistryError>;

    fn register_alias(&mut self, name: &str, alias: &str) -> Result<(), RegistryError>;

    /// Remove an alias, returning whether it was registered
    fn remove_alias(&mut self, alias: &str) -> bool;

    fn contains_definition(&self, name: &str) -> bool;

    fn definition(&self, name: &str) -> Option<&ComponentDefinition>;

    fn definition_count(&self) -> usize;

    /// All aliases that (directly or transitively) resolve to `name`
    fn aliases(&self, name: &str) -> Vec<String>;

    fn is_alias(&self, name: &str) -> bool;
}

/// Register a holder's definition under its name, then each of its aliases.
///
/// Stops at the first rejected alias; the definition itself stays registered.
pub fn register_holder(
    registry: &mut dyn DefinitionRegistry,
    holder: DefinitionHolder,
) -> Result<(), RegistryError> {
    let DefinitionHolder {
        name,
        aliases,
        definition,
    } = holder;
    registry.register_definition(&name, definition)?;
    for alias in &aliases {
        registry.register_alias(&name, alias)?;
    }
    Ok(())
}

/// In-memory registry preserving registration order
#[derive(Debug, Clone)]
pub struct SimpleDefinitionRegistry {
    definitions: IndexMap<String, ComponentDefinition>,
    /// alias -> name
    aliases: IndexMap<String, String>,
    allow_overriding: bool,
}

impl Default for SimpleDefinitionRegistry {
    fn default() -> Self {
        SimpleDefinitionRegistry {
            definitions: IndexMap::new(),
            aliases: IndexMap::new(),
            allow_overriding: true,
        }
    }
}

impl SimpleDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a later definition (or alias) may replace an earlier one
    /// registered under the same name
    pub fn with_overriding(mut self, allow: bool) -> Self {
        self.allow_overriding = allow;
        self
    }

    /// Registered definition names in registration order
    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Follow aliases to the name they ultimately stand for
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        while let Some(target) = self.aliases.get(current) {
            current = target;
        }
        current
    }

    /// Whether `name` has `alias` registered for it, directly or via a chain
    fn has_alias(&self, name: &str, alias: &str) -> bool {
        self.aliases.iter().any(|(registered_alias, registered_name)| {
            registered_name == name
                && (registered_alias == alias || self.has_alias(registered_alias, alias))
        })
    }
}

impl DefinitionRegistry for SimpleDefinitionRegistry {
    fn register_definition(&mut self, name: &str, definition: ComponentDefinition) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.definitions.contains_key(name) {
            if !self.allow_overriding {
                return Err(RegistryError::DuplicateDefinition {
                    name: name.to_string(),
                });
            }
            tracing::debug!(name, "overriding definition");
        }
        if let Some(target) = self.aliases.get(name) {
            if !self.allow_overriding {
                return Err(RegistryError::AliasOverride {
                    alias: name.to_string(),
                    name: name.to_string(),
                    existing: target.clone(),
                });
            }
            self.aliases.shift_remove(name);
        }
        self.definitions.insert(name.to_string(), definition);
        Ok(())
    }

    fn register_alias(&mut self, name: &str, alias: &str) -> Result<(), RegistryError> {
        if name.trim().is_empty() || alias.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if alias == name {
            self.aliases.shift_remove(alias);
            return Ok(());
        }
        if let Some(existing) = self.aliases.get(alias) {
            if existing == name {
                return Ok(());
            }
            if !self.allow_overriding {
                return Err(RegistryError::AliasOverride {
                    alias: alias.to_string(),
                    name: name.to_string(),
                    existing: existing.clone(),
                });
            }
        }
        if self.has_alias(alias, name) {
            return Err(RegistryError::CircularAlias {
                name: name.to_string(),
                alias: alias.to_string(),
            });
        }
        self.aliases.insert(alias.to_string(), name.to_string());
        Ok(())
    }

    fn remove_alias(&mut self, alias: &str) -> bool {
        self.aliases.shift_remove(alias).is_some()
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn definition(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions
            .get(name)
            .or_else(|| self.definitions.get(self.canonical_name(name)))
    }

    fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    fn aliases(&self, name: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut frontier = vec![name.to_string()];
        while let Some(target) = frontier.pop() {
            for (alias, registered) in &self.aliases {
                if *registered == target && !found.contains(alias) {
                    found.push(alias.clone());
                    frontier.push(alias.clone());
                }
            }
        }
        found
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(class: &str) -> ComponentDefinition {
        ComponentDefinition::new(class)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = SimpleDefinitionRegistry::new();
        registry.register_definition("svc", def("app.Service")).unwrap();
        registry.register_alias("svc", "service").unwrap();
        assert!(registry.contains_definition("svc"));
        assert!(!registry.contains_definition("service"));
        assert_eq!(
            registry.definition("service").and_then(|d| d.class_name.as_deref()),
            Some("app.Service")
        );
        assert_eq!(registry.definition_count(), 1);
        assert!(registry.is_alias("service"));
    }

    #[test]
    fn test_duplicate_definition_policy() {
        let mut registry = SimpleDefinitionRegistry::new();
        registry.register_definition("svc", def("a.A")).unwrap();
        registry.register_definition("svc", def("b.B")).unwrap();
        assert_eq!(registry.definition("svc").unwrap().class_name.as_deref(), Some("b.B"));

        let mut strict = SimpleDefinitionRegistry::new().with_overriding(false);
        strict.register_definition("svc", def("a.A")).unwrap();
        assert_eq!(
            strict.register_definition("svc", def("b.B")),
            Err(RegistryError::DuplicateDefinition { name: "svc".to_string() })
        );
        assert_eq!(strict.definition("svc").unwrap().class_name.as_deref(), Some("a.A"));
    }

    #[test]
    fn test_alias_rules() {
        let mut registry = SimpleDefinitionRegistry::new().with_overriding(false);
        registry.register_alias("a", "b").unwrap();
        // same mapping again is a no-op
        registry.register_alias("a", "b").unwrap();
        assert!(matches!(
            registry.register_alias("c", "b"),
            Err(RegistryError::AliasOverride { .. })
        ));
        // b -> a, so a -> b would close a loop
        registry.register_alias("b", "x").unwrap();
        assert!(matches!(
            registry.register_alias("x", "a"),
            Err(RegistryError::CircularAlias { .. })
        ));
        // alias equal to name removes the alias
        registry.register_alias("b", "b").unwrap();
        assert!(!registry.is_alias("b"));
    }

    #[test]
    fn test_transitive_aliases() {
        let mut registry = SimpleDefinitionRegistry::new();
        registry.register_definition("svc", def("a.A")).unwrap();
        registry.register_alias("svc", "s1").unwrap();
        registry.register_alias("s1", "s2").unwrap();
        let mut aliases = registry.aliases("svc");
        aliases.sort();
        assert_eq!(aliases, vec!["s1", "s2"]);
        assert_eq!(registry.canonical_name("s2"), "svc");
        assert!(registry.remove_alias("s2"));
        assert!(!registry.remove_alias("s2"));
    }

    #[test]
    fn test_register_holder() {
        let mut registry = SimpleDefinitionRegistry::new();
        let holder = DefinitionHolder::new("svc", def("a.A")).with_aliases(vec!["x".to_string()]);
        register_holder(&mut registry, holder).unwrap();
        assert_eq!(registry.aliases("svc"), vec!["x"]);
        assert_eq!(registry.definition_names().collect::<Vec<_>>(), vec!["svc"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = SimpleDefinitionRegistry::new();
        assert_eq!(registry.register_definition(" ", def("a.A")), Err(RegistryError::EmptyName));
        assert_eq!(registry.register_alias("a", ""), Err(RegistryError::EmptyName));
    }
}
