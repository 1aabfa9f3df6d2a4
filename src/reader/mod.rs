//! Definition reading
//!
//! From a location string to registered definitions:
//! - [`XmlDefinitionReader`]: owns the registry and collaborators, tracks
//!   documents in flight
//! - [`DocumentLoader`]: bytes to element tree, with grammar lookup
//! - document registration: the per-document walk over scopes, imports,
//!   aliases and components
//! - [`resolve_import`]: absolute and relative `import` locations
//! - [`ReaderContext`]: problem reporting and registration events

pub mod context;
pub mod definition_reader;
pub mod document_reader;
pub mod import;
pub mod loader;

pub use context::{
    AliasEvent, Cause, ComponentEvent, DefaultsEvent, ImportEvent, Location, LoggingEventListener, Problem,
    ReaderContext, ReaderEventListener, Severity,
};
pub use definition_reader::{ReaderOptions, XmlDefinitionReader};
pub use document_reader::{classify, ElementKind, NoHooks, RegistrationHooks, ScopeContext};
pub use import::{resolve_import, DefinitionLoader};
pub use loader::{DocumentLoader, LoadedDocument, XmlDocumentLoader};
