//! Environment: properties, placeholders and profiles
//!
//! The registration engine asks its environment two things: substitute
//! `${...}` placeholders in an import location, and decide whether a scope's
//! `profile` list is active. [`StandardEnvironment`] answers both from an
//! in-memory property map, optionally backed by process environment
//! variables.

use std::collections::HashMap;

use crate::error::PlaceholderError;

/// Property naming the active profiles (comma separated)
pub const ACTIVE_PROFILES_PROPERTY: &str = "profiles.active";

/// Property naming the default profiles (comma separated)
pub const DEFAULT_PROFILES_PROPERTY: &str = "profiles.default";

/// Profile considered active when nothing else is
pub const RESERVED_DEFAULT_PROFILE: &str = "default";

const PLACEHOLDER_PREFIX: &str = "${";
const PLACEHOLDER_SUFFIX: &str = "}";
const SIMPLE_PREFIX: &str = "{";
const VALUE_SEPARATOR: char = ':';

/// Placeholder substitution and profile evaluation
pub trait Environment {
    /// Look up a raw property value
    fn property(&self, key: &str) -> Option<String>;

    /// Replace `${key}` / `${key:default}` placeholders, failing on any
    /// placeholder that has neither a value nor a default.
    fn resolve_required_placeholders(&self, text: &str) -> Result<String, PlaceholderError> {
        PlaceholderResolver::strict().replace(text, &|key| self.property(key))
    }

    /// Replace placeholders, leaving unresolvable ones untouched
    fn resolve_placeholders(&self, text: &str) -> String {
        PlaceholderResolver::lenient()
            .replace(text, &|key| self.property(key))
            .unwrap_or_else(|_| text.to_string())
    }

    /// Whether at least one of the given profiles is active. A profile
    /// prefixed with `!` is accepted when that profile is not active.
    fn accepts_profiles(&self, profiles: &[&str]) -> bool;
}

/// Property map plus active/default profile sets
#[derive(Debug, Clone)]
pub struct StandardEnvironment {
    properties: HashMap<String, String>,
    system_env: bool,
    active_profiles: Vec<String>,
    default_profiles: Vec<String>,
}

impl Default for StandardEnvironment {
    fn default() -> Self {
        StandardEnvironment {
            properties: HashMap::new(),
            system_env: false,
            active_profiles: Vec::new(),
            default_profiles: vec![RESERVED_DEFAULT_PROFILE.to_string()],
        }
    }
}

impl StandardEnvironment {
    /// Environment with no properties and the `default` profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment that falls back to process environment variables
    pub fn system() -> Self {
        StandardEnvironment {
            system_env: true,
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn with_active_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_active_profiles(profiles);
        self
    }

    pub fn set_active_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles = profiles.into_iter().map(Into::into).collect();
    }

    pub fn add_active_profile(&mut self, profile: impl Into<String>) {
        let profile = profile.into();
        if !self.active_profiles.contains(&profile) {
            self.active_profiles.push(profile);
        }
    }

    pub fn set_default_profiles<I, S>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_profiles = profiles.into_iter().map(Into::into).collect();
    }

    /// Explicitly set profiles, else those named by [`ACTIVE_PROFILES_PROPERTY`]
    pub fn active_profiles(&self) -> Vec<String> {
        if !self.active_profiles.is_empty() {
            return self.active_profiles.clone();
        }
        self.property(ACTIVE_PROFILES_PROPERTY)
            .map(|value| tokenize(&value, ","))
            .unwrap_or_default()
    }

    /// Profiles from [`DEFAULT_PROFILES_PROPERTY`], else the configured defaults
    pub fn default_profiles(&self) -> Vec<String> {
        self.property(DEFAULT_PROFILES_PROPERTY)
            .map(|value| tokenize(&value, ","))
            .unwrap_or_else(|| self.default_profiles.clone())
    }

    fn is_profile_active(&self, profile: &str) -> bool {
        let active = self.active_profiles();
        if active.is_empty() {
            self.default_profiles().iter().any(|p| p == profile)
        } else {
            active.iter().any(|p| p == profile)
        }
    }
}

impl Environment for StandardEnvironment {
    fn property(&self, key: &str) -> Option<String> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        if !self.system_env {
            return None;
        }
        // profiles.active -> PROFILES_ACTIVE, as environment variables are named
        std::env::var(key).ok().or_else(|| {
            let mangled: String = key
                .chars()
                .map(|c| if c == '.' || c == '-' { '_' } else { c.to_ascii_uppercase() })
                .collect();
            std::env::var(mangled).ok()
        })
    }

    fn accepts_profiles(&self, profiles: &[&str]) -> bool {
        profiles.iter().any(|profile| match profile.strip_prefix('!') {
            Some(negated) if !negated.trim().is_empty() => !self.is_profile_active(negated),
            None if !profile.trim().is_empty() => self.is_profile_active(profile),
            _ => {
                tracing::warn!(profile, "ignoring invalid profile: must contain text");
                false
            }
        })
    }
}

/// Split on any of the delimiter characters, trimming tokens and dropping
/// empty ones.
pub fn tokenize(value: &str, delimiters: &str) -> Vec<String> {
    value
        .split(|c: char| delimiters.contains(c))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// `${...}` placeholder substitution with defaults, nesting and cycle detection
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderResolver {
    ignore_unresolvable: bool,
}

impl PlaceholderResolver {
    /// Fail on unresolvable placeholders
    pub fn strict() -> Self {
        PlaceholderResolver {
            ignore_unresolvable: false,
        }
    }

    /// Leave unresolvable placeholders in place
    pub fn lenient() -> Self {
        PlaceholderResolver {
            ignore_unresolvable: true,
        }
    }

    pub fn replace(
        &self,
        value: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<String, PlaceholderError> {
        let mut visiting = Vec::new();
        self.parse(value, lookup, &mut visiting)
    }

    fn parse(
        &self,
        value: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
        visiting: &mut Vec<String>,
    ) -> Result<String, PlaceholderError> {
        let mut result = value.to_string();
        let mut start = result.find(PLACEHOLDER_PREFIX);

        while let Some(begin) = start {
            let Some(end) = find_placeholder_end(&result, begin) else {
                break;
            };
            let original = result[begin + PLACEHOLDER_PREFIX.len()..end].to_string();
            if visiting.contains(&original) {
                return Err(PlaceholderError::Circular {
                    placeholder: original,
                });
            }
            visiting.push(original.clone());

            // Keys may themselves contain placeholders
            let key = self.parse(&original, lookup, visiting)?;
            let mut resolved = lookup(&key);
            if resolved.is_none() {
                if let Some((actual_key, default)) = key.split_once(VALUE_SEPARATOR) {
                    resolved = lookup(actual_key).or_else(|| Some(default.to_string()));
                }
            }

            match resolved {
                Some(raw) => {
                    let replacement = self.parse(&raw, lookup, visiting)?;
                    result.replace_range(begin..end + PLACEHOLDER_SUFFIX.len(), &replacement);
                    let resume = begin + replacement.len();
                    start = result[resume..].find(PLACEHOLDER_PREFIX).map(|i| resume + i);
                }
                None if self.ignore_unresolvable => {
                    let resume = end + PLACEHOLDER_SUFFIX.len();
                    start = result[resume..].find(PLACEHOLDER_PREFIX).map(|i| resume + i);
                }
                None => {
                    return Err(PlaceholderError::Unresolvable {
                        placeholder: key,
                        value: value.to_string(),
                    });
                }
            }
            visiting.retain(|v| v != &original);
        }
        Ok(result)
    }
}

/// Index of the suffix closing the placeholder opened at `start`
fn find_placeholder_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut index = start + PLACEHOLDER_PREFIX.len();
    let mut nested = 0usize;
    while index < bytes.len() {
        let rest = &bytes[index..];
        if rest.starts_with(PLACEHOLDER_SUFFIX.as_bytes()) {
            if nested > 0 {
                nested -= 1;
                index += PLACEHOLDER_SUFFIX.len();
            } else {
                return Some(index);
            }
        } else if rest.starts_with(SIMPLE_PREFIX.as_bytes()) {
            nested += 1;
            index += SIMPLE_PREFIX.len();
        } else {
            index += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> StandardEnvironment {
        StandardEnvironment::new()
            .with_property("env", "prod")
            .with_property("conf.dir", "conf/${env}")
            .with_property("key", "env")
    }

    #[test]
    fn test_simple_placeholder() {
        assert_eq!(
            env().resolve_required_placeholders("${conf.dir}/beans.xml").unwrap(),
            "conf/prod/beans.xml"
        );
    }

    #[test]
    fn test_default_value() {
        assert_eq!(
            env().resolve_required_placeholders("${missing:fallback}.xml").unwrap(),
            "fallback.xml"
        );
        assert_eq!(env().resolve_required_placeholders("${env:dev}").unwrap(), "prod");
    }

    #[test]
    fn test_nested_key() {
        assert_eq!(env().resolve_required_placeholders("${${key}}").unwrap(), "prod");
    }

    #[test]
    fn test_unresolvable() {
        let err = env().resolve_required_placeholders("a-${nope}.xml").unwrap_err();
        assert_eq!(
            err,
            PlaceholderError::Unresolvable {
                placeholder: "nope".to_string(),
                value: "a-${nope}.xml".to_string(),
            }
        );
        assert_eq!(env().resolve_placeholders("a-${nope}-${env}"), "a-${nope}-prod");
    }

    #[test]
    fn test_circular() {
        let env = StandardEnvironment::new()
            .with_property("a", "${b}")
            .with_property("b", "${a}");
        assert!(matches!(
            env.resolve_required_placeholders("${a}"),
            Err(PlaceholderError::Circular { .. })
        ));
    }

    #[test]
    fn test_no_placeholders_untouched() {
        assert_eq!(env().resolve_required_placeholders("plain/{x}.xml").unwrap(), "plain/{x}.xml");
        assert_eq!(env().resolve_required_placeholders("${unterminated").unwrap(), "${unterminated");
    }

    #[test]
    fn test_default_profile_active_when_none_set() {
        let env = StandardEnvironment::new();
        assert!(env.accepts_profiles(&["default"]));
        assert!(!env.accepts_profiles(&["dev"]));
    }

    #[test]
    fn test_active_profiles() {
        let env = StandardEnvironment::new().with_active_profiles(["dev", "cloud"]);
        assert!(env.accepts_profiles(&["prod", "dev"]));
        assert!(!env.accepts_profiles(&["default"]));
        assert!(env.accepts_profiles(&["!prod"]));
        assert!(!env.accepts_profiles(&["!dev"]));
        assert!(!env.accepts_profiles(&["!"]));
    }

    #[test]
    fn test_active_profiles_from_property() {
        let env = StandardEnvironment::new().with_property(ACTIVE_PROFILES_PROPERTY, "qa, staging");
        assert_eq!(env.active_profiles(), vec!["qa", "staging"]);
        assert!(env.accepts_profiles(&["staging"]));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize(" dev,prod ;; qa ", ",; "), vec!["dev", "prod", "qa"]);
        assert!(tokenize(" , ", ",; ").is_empty());
    }
}
