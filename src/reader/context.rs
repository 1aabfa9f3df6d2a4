//! Reader context, problems and notifications
//!
//! A [`ReaderContext`] is the window through which element-level code sees
//! one document pass: the resource being read, the registry being
//! populated, the environment, the problem list and the event listener.
//! It is created per call from split borrows of the reader, so collaborators
//! never hold on to reader state between elements.

use std::error::Error as StdError;
use std::fmt;

use crate::definition::{DefinitionHolder, ScopeDefaults};
use crate::dom::Element;
use crate::environment::Environment;
use crate::registry::DefinitionRegistry;
use crate::resource::Resource;

/// Boxed cause attached to a problem
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Where a problem or event originated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Description of the resource being read
    pub resource: String,
    /// Qualified tag name of the offending element
    pub element: Option<String>,
    /// 1-based line of the element's start tag
    pub line: Option<usize>,
}

impl Location {
    pub fn of_resource(resource: &Resource) -> Self {
        Location {
            resource: resource.to_string(),
            element: None,
            line: None,
        }
    }

    pub fn of_element(resource: &Resource, element: Element<'_>) -> Self {
        Location {
            resource: resource.to_string(),
            element: Some(element.tag_name().to_string()),
            line: Some(element.line()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource)?;
        if let Some(line) = self.line {
            write!(f, " line {}", line)?;
        }
        if let Some(element) = &self.element {
            write!(f, " <{}>", element)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal configuration problem found while reading a document
#[derive(Debug, thiserror::Error)]
#[error("Configuration problem: {message}\nOffending resource: {location}")]
pub struct Problem {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    #[source]
    pub cause: Option<Cause>,
}

impl Problem {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Notification that a scope's defaults were established
#[derive(Debug, Clone)]
pub struct DefaultsEvent {
    pub defaults: ScopeDefaults,
    pub source: Location,
}

/// Notification that an `import` element was processed
#[derive(Debug, Clone)]
pub struct ImportEvent {
    /// Location after placeholder resolution
    pub location: String,
    /// Resources actually loaded, without duplicates
    pub resources: Vec<Resource>,
    pub source: Location,
}

/// Notification that an alias was registered
#[derive(Debug, Clone)]
pub struct AliasEvent {
    pub name: String,
    pub alias: String,
    pub source: Location,
}

/// Notification that a component definition was registered
#[derive(Debug, Clone)]
pub struct ComponentEvent {
    pub holder: DefinitionHolder,
    pub source: Location,
}

/// Receiver of registration notifications. All methods default to no-ops.
pub trait ReaderEventListener {
    fn defaults_registered(&mut self, _event: &DefaultsEvent) {}

    fn import_processed(&mut self, _event: &ImportEvent) {}

    fn alias_registered(&mut self, _event: &AliasEvent) {}

    fn component_registered(&mut self, _event: &ComponentEvent) {}
}

/// Listener that reports every notification as a tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventListener;

impl ReaderEventListener for LoggingEventListener {
    fn defaults_registered(&mut self, event: &DefaultsEvent) {
        tracing::trace!(source = %event.source, defaults = ?event.defaults, "scope defaults registered");
    }

    fn import_processed(&mut self, event: &ImportEvent) {
        tracing::debug!(
            location = %event.location,
            resources = event.resources.len(),
            source = %event.source,
            "import processed"
        );
    }

    fn alias_registered(&mut self, event: &AliasEvent) {
        tracing::debug!(name = %event.name, alias = %event.alias, "alias registered");
    }

    fn component_registered(&mut self, event: &ComponentEvent) {
        tracing::debug!(name = %event.holder.name, source = %event.source, "component registered");
    }
}

/// Per-call view of one document pass
pub struct ReaderContext<'a> {
    pub(crate) resource: &'a Resource,
    pub(crate) registry: &'a mut dyn DefinitionRegistry,
    pub(crate) environment: &'a dyn Environment,
    pub(crate) problems: &'a mut Vec<Problem>,
    pub(crate) listener: &'a mut dyn ReaderEventListener,
}

impl<'a> ReaderContext<'a> {
    /// Resource currently being read
    pub fn resource(&self) -> &Resource {
        self.resource
    }

    pub fn registry(&self) -> &dyn DefinitionRegistry {
        &*self.registry
    }

    pub fn registry_mut(&mut self) -> &mut dyn DefinitionRegistry {
        &mut *self.registry
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment
    }

    /// Location of an element within the current resource
    pub fn location(&self, element: Element<'_>) -> Location {
        Location::of_element(self.resource, element)
    }

    pub fn error(&mut self, message: impl Into<String>, element: Element<'_>) {
        self.report(Severity::Error, message.into(), element, None);
    }

    pub fn error_with_cause(&mut self, message: impl Into<String>, element: Element<'_>, cause: Cause) {
        self.report(Severity::Error, message.into(), element, Some(cause));
    }

    pub fn warning(&mut self, message: impl Into<String>, element: Element<'_>) {
        self.report(Severity::Warning, message.into(), element, None);
    }

    fn report(&mut self, severity: Severity, message: String, element: Element<'_>, cause: Option<Cause>) {
        let location = self.location(element);
        match severity {
            Severity::Error => tracing::warn!(%location, "{}", message),
            Severity::Warning => tracing::debug!(%location, "{}", message),
        }
        self.problems.push(Problem {
            severity,
            message,
            location,
            cause,
        });
    }

    pub fn fire_defaults_registered(&mut self, defaults: &ScopeDefaults, element: Element<'_>) {
        let event = DefaultsEvent {
            defaults: defaults.clone(),
            source: self.location(element),
        };
        self.listener.defaults_registered(&event);
    }

    pub fn fire_import_processed(&mut self, location: &str, resources: Vec<Resource>, element: Element<'_>) {
        let event = ImportEvent {
            location: location.to_string(),
            resources,
            source: self.location(element),
        };
        self.listener.import_processed(&event);
    }

    pub fn fire_alias_registered(&mut self, name: &str, alias: &str, element: Element<'_>) {
        let event = AliasEvent {
            name: name.to_string(),
            alias: alias.to_string(),
            source: self.location(element),
        };
        self.listener.alias_registered(&event);
    }

    pub fn fire_component_registered(&mut self, holder: DefinitionHolder, element: Element<'_>) {
        let event = ComponentEvent {
            holder,
            source: self.location(element),
        };
        self.listener.component_registered(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let location = Location {
            resource: "class path resource [beans.xml]".to_string(),
            element: Some("alias".to_string()),
            line: Some(4),
        };
        assert_eq!(location.to_string(), "class path resource [beans.xml] line 4 <alias>");
        let bare = Location::of_resource(&Resource::classpath("beans.xml"));
        assert_eq!(bare.to_string(), "class path resource [beans.xml]");
    }

    #[test]
    fn test_problem_display_and_source() {
        let problem = Problem {
            severity: Severity::Error,
            message: "Alias must not be empty".to_string(),
            location: Location::of_resource(&Resource::classpath("beans.xml")),
            cause: Some(Box::new(std::io::Error::new(std::io::ErrorKind::Other, "boom"))),
        };
        assert!(problem.is_error());
        assert_eq!(
            problem.to_string(),
            "Configuration problem: Alias must not be empty\nOffending resource: class path resource [beans.xml]"
        );
        assert!(StdError::source(&problem).is_some());
    }
}
