//! XML definition reader
//!
//! Entry point for loading definition documents into a registry. The reader
//! owns its collaborators and the registry; every document it loads,
//! including imported ones, goes through [`XmlDefinitionReader::load_resource`],
//! which keeps the stack of documents in flight to catch import cycles.

use std::sync::Arc;

use indexmap::IndexSet;

use super::context::{Location, LoggingEventListener, Problem, ReaderContext, ReaderEventListener, Severity};
use super::document_reader::{DocumentRegistrar, NoHooks, RegistrationHooks};
use super::import::DefinitionLoader;
use super::loader::{DocumentLoader, XmlDocumentLoader};
use crate::core::validation::{ValidationMode, ValidationModeDetector};
use crate::dom::ParseOptions;
use crate::environment::{Environment, StandardEnvironment};
use crate::error::DefinitionStoreError;
use crate::parser::{DefaultElementParser, ElementParser};
use crate::registry::DefinitionRegistry;
use crate::resolver::{EntityResolver, ResourceEntityResolver};
use crate::resource::{default_fetcher, FileSystemResourceLoader, Resource, ResourceLoader};

/// Reader configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// `Auto` detects per document; anything else is used as is
    pub validation_mode: ValidationMode,
    pub namespace_aware: bool,
    /// Reject malformed markup instead of recovering
    pub strict: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            validation_mode: ValidationMode::Auto,
            namespace_aware: true,
            strict: true,
        }
    }
}

impl ReaderOptions {
    pub fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = mode;
        self
    }

    pub fn with_namespace_aware(mut self, namespace_aware: bool) -> Self {
        self.namespace_aware = namespace_aware;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            namespace_aware: self.namespace_aware,
            strict: self.strict,
        }
    }
}

/// Loads XML definition documents into a [`DefinitionRegistry`]
pub struct XmlDefinitionReader<R: DefinitionRegistry> {
    registry: R,
    resource_loader: Arc<dyn ResourceLoader>,
    environment: Box<dyn Environment>,
    entity_resolver: Arc<dyn EntityResolver>,
    custom_entity_resolver: bool,
    document_loader: Box<dyn DocumentLoader>,
    parser: Arc<dyn ElementParser>,
    hooks: Arc<dyn RegistrationHooks>,
    listener: Box<dyn ReaderEventListener>,
    options: ReaderOptions,
    detector: ValidationModeDetector,
    problems: Vec<Problem>,
    /// Documents currently being loaded, outermost first
    loading: Vec<Resource>,
}

impl<R: DefinitionRegistry> XmlDefinitionReader<R> {
    /// Reader over the working directory with the process environment
    pub fn new(registry: R) -> Self {
        let loader = FileSystemResourceLoader::current_dir()
            .unwrap_or_else(|_| FileSystemResourceLoader::new("."))
            .with_fetcher(default_fetcher());
        let resource_loader: Arc<dyn ResourceLoader> = Arc::new(loader);
        XmlDefinitionReader {
            registry,
            entity_resolver: Arc::new(ResourceEntityResolver::new(resource_loader.clone())),
            custom_entity_resolver: false,
            resource_loader,
            environment: Box::new(StandardEnvironment::system()),
            document_loader: Box::new(XmlDocumentLoader),
            parser: Arc::new(DefaultElementParser::new()),
            hooks: Arc::new(NoHooks),
            listener: Box::new(LoggingEventListener),
            options: ReaderOptions::default(),
            detector: ValidationModeDetector::new(),
            problems: Vec::new(),
            loading: Vec::new(),
        }
    }

    /// Replace the resource loader. Unless a custom entity resolver was
    /// set, the default one follows the new loader.
    pub fn with_resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        if !self.custom_entity_resolver {
            self.entity_resolver = Arc::new(ResourceEntityResolver::new(loader.clone()));
        }
        self.resource_loader = loader;
        self
    }

    pub fn with_environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Box::new(environment);
        self
    }

    pub fn with_entity_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.entity_resolver = resolver;
        self.custom_entity_resolver = true;
        self
    }

    pub fn with_document_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.document_loader = Box::new(loader);
        self
    }

    pub fn with_element_parser(mut self, parser: Arc<dyn ElementParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RegistrationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_listener(mut self, listener: impl ReaderEventListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn with_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn into_registry(self) -> R {
        self.registry
    }

    pub fn environment(&self) -> &dyn Environment {
        &*self.environment
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Problems reported so far, in document order
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn take_problems(&mut self) -> Vec<Problem> {
        std::mem::take(&mut self.problems)
    }

    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(Problem::is_error)
    }

    pub(crate) fn element_parser(&self) -> Arc<dyn ElementParser> {
        Arc::clone(&self.parser)
    }

    pub(crate) fn hooks(&self) -> Arc<dyn RegistrationHooks> {
        Arc::clone(&self.hooks)
    }

    pub(crate) fn context<'a>(&'a mut self, resource: &'a Resource) -> ReaderContext<'a> {
        ReaderContext {
            resource,
            registry: &mut self.registry,
            environment: &*self.environment,
            problems: &mut self.problems,
            listener: &mut *self.listener,
        }
    }

    /// Load every resource a location expands to. Each loaded resource is
    /// added to `actual` when given. Returns the number of new definitions.
    pub fn load_definitions(
        &mut self,
        location: &str,
        mut actual: Option<&mut IndexSet<Resource>>,
    ) -> Result<usize, DefinitionStoreError> {
        let resources = self.resource_loader.resolve(location)?;
        tracing::trace!(location, resources = resources.len(), "resolved definition location");
        let mut count = 0;
        for resource in resources {
            count += self.load_resource(&resource)?;
            if let Some(actual) = actual.as_mut() {
                actual.insert(resource);
            }
        }
        Ok(count)
    }

    /// Load one resource. Returns the number of new definitions.
    pub fn load_resource(&mut self, resource: &Resource) -> Result<usize, DefinitionStoreError> {
        tracing::trace!(%resource, "loading XML definitions");
        let bytes = self.resource_loader.open(resource)?;
        self.load_bytes(resource, bytes)
    }

    /// Register definitions from bytes already in memory, read as if they
    /// came from `resource` (relative imports resolve against it)
    pub fn load_bytes(&mut self, resource: &Resource, bytes: Vec<u8>) -> Result<usize, DefinitionStoreError> {
        if self.loading.contains(resource) {
            return Err(DefinitionStoreError::CyclicImport {
                resource: resource.to_string(),
            });
        }
        self.loading.push(resource.clone());
        let result = self.register_bytes(resource, bytes);
        self.loading.pop();
        result
    }

    fn register_bytes(&mut self, resource: &Resource, bytes: Vec<u8>) -> Result<usize, DefinitionStoreError> {
        let description = resource.to_string();
        let mode = self.validation_mode_for(&bytes);
        let loaded = self
            .document_loader
            .load_document(
                bytes,
                &description,
                &*self.entity_resolver,
                mode,
                self.options.parse_options(),
            )
            .map_err(|source| DefinitionStoreError::Document {
                resource: description.clone(),
                source,
            })?;

        for system_id in loaded.unresolved {
            self.problems.push(Problem {
                severity: Severity::Warning,
                message: format!(
                    "Could not resolve grammar [{}], document loaded without checking it",
                    system_id
                ),
                location: Location::of_resource(resource),
                cause: None,
            });
        }

        let before = self.registry.definition_count();
        DocumentRegistrar::new(self, resource.clone()).register_document(&loaded.document);
        let count = self.registry.definition_count().saturating_sub(before);
        tracing::debug!(count, resource = %description, "loaded definitions");
        Ok(count)
    }

    /// Configured mode, or the detected one. An inconclusive detection
    /// means XSD.
    fn validation_mode_for(&self, bytes: &[u8]) -> ValidationMode {
        if self.options.validation_mode != ValidationMode::Auto {
            return self.options.validation_mode;
        }
        match self.detector.detect_bytes(bytes) {
            ValidationMode::Auto => ValidationMode::Xsd,
            detected => detected,
        }
    }
}

impl<R: DefinitionRegistry> DefinitionLoader for XmlDefinitionReader<R> {
    fn resource_loader(&self) -> &dyn ResourceLoader {
        &*self.resource_loader
    }

    fn load_definitions(
        &mut self,
        location: &str,
        actual: Option<&mut IndexSet<Resource>>,
    ) -> Result<usize, DefinitionStoreError> {
        XmlDefinitionReader::load_definitions(self, location, actual)
    }

    fn load_resource(&mut self, resource: &Resource) -> Result<usize, DefinitionStoreError> {
        XmlDefinitionReader::load_resource(self, resource)
    }
}
