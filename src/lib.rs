//! RustyBeans - XML component definition reader
//!
//! Loads component definitions from XML documents into a registry:
//! - Resources: file, class path and URL locations, with wildcard expansion
//! - Validation mode detection: DTD vs XSD from the document head
//! - Entity resolution: local DTD / schema tables, the resource loader, then
//!   a remote fetch
//! - Registration: nested scopes with profile gating, imports, aliases,
//!   components and foreign-namespace extensions
//!
//! ```no_run
//! use rustybeans::{SimpleDefinitionRegistry, XmlDefinitionReader};
//!
//! let mut reader = XmlDefinitionReader::new(SimpleDefinitionRegistry::new());
//! let count = reader.load_definitions("conf/app.xml", None)?;
//! println!("{} definitions", count);
//! for problem in reader.problems() {
//!     eprintln!("{}", problem);
//! }
//! # Ok::<(), rustybeans::DefinitionStoreError>(())
//! ```

pub mod core;
pub mod definition;
pub mod dom;
pub mod environment;
pub mod error;
pub mod parser;
pub mod reader;
pub mod registry;
pub mod resolver;
pub mod resource;

pub use crate::core::validation::{ValidationMode, ValidationModeDetector};
pub use definition::{ComponentDefinition, DefinitionHolder, ScopeDefaults, Value};
pub use environment::{Environment, StandardEnvironment};
pub use error::{
    DefinitionStoreError, DocumentError, ImportError, PlaceholderError, RegistryError, ResourceError,
};
pub use parser::{DefaultElementParser, ElementParser, NamespaceHandler, NamespaceHandlerResolver};
pub use reader::{
    Problem, ReaderContext, ReaderEventListener, ReaderOptions, RegistrationHooks, Severity, XmlDefinitionReader,
};
pub use registry::{DefinitionRegistry, SimpleDefinitionRegistry};
pub use resolver::{DelegatingEntityResolver, EntityResolver, InputSource, ResourceEntityResolver};
pub use resource::{FileSystemResourceLoader, Resource, ResourceLoader, StaticResourceLoader};
