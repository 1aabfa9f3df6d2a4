//! Error types
//!
//! Hard failures surface as one of the enums below. Per-element configuration
//! problems found while walking a document are not errors in this sense: they
//! are collected as [`Problem`](crate::reader::Problem) values and the walk
//! continues with the next sibling.

use std::io;

use thiserror::Error;

/// Failure to locate, open or fetch a resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{description} cannot be opened because it does not exist")]
    NotFound { description: String },

    #[error("I/O error on {description}: {source}")]
    Io {
        description: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid resource location [{location}]: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("could not fetch [{url}]: {message}")]
    Fetch { url: String, message: String },
}

impl ResourceError {
    pub(crate) fn io(description: impl Into<String>, source: io::Error) -> Self {
        ResourceError::Io {
            description: description.into(),
            source,
        }
    }
}

/// Rejection by a [`DefinitionRegistry`](crate::registry::DefinitionRegistry).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("definition name must not be empty")]
    EmptyName,

    #[error("cannot register definition '{name}': there is already a definition bound under that name")]
    DuplicateDefinition { name: String },

    #[error("cannot define alias '{alias}' for name '{name}': it is already registered for name '{existing}'")]
    AliasOverride {
        alias: String,
        name: String,
        existing: String,
    },

    #[error("cannot register alias '{alias}' for name '{name}': circular reference ('{name}' is a direct or indirect alias for '{alias}' already)")]
    CircularAlias { name: String, alias: String },
}

/// Failure to substitute `${...}` placeholders.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    #[error("could not resolve placeholder '{placeholder}' in value \"{value}\"")]
    Unresolvable { placeholder: String, value: String },

    #[error("circular placeholder reference '{placeholder}' in property definitions")]
    Circular { placeholder: String },
}

/// Failure to turn raw bytes into a [`Document`](crate::dom::Document).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document encoding error: {0}")]
    Encoding(String),

    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: usize, message: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("document root element <{actual}> must match DOCTYPE root <{declared}>")]
    DoctypeMismatch { declared: String, actual: String },

    #[error("grammar [{system_id}] rejected: {message}")]
    Grammar { system_id: String, message: String },

    #[error(transparent)]
    Entity(#[from] ResourceError),
}

/// A document or resource could not be loaded into the registry.
#[derive(Debug, Error)]
pub enum DefinitionStoreError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("I/O error reading XML document from {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid XML document from {resource}: {source}")]
    Document {
        resource: String,
        #[source]
        source: DocumentError,
    },

    #[error("detected cyclic loading of {resource} - check your import definitions")]
    CyclicImport { resource: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failure of a single `import` element.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to resolve current resource location")]
    CurrentLocation(#[source] io::Error),

    #[error("failed to import definitions from URL location [{location}]")]
    Absolute {
        location: String,
        #[source]
        source: DefinitionStoreError,
    },

    #[error("failed to import definitions from relative location [{location}]")]
    Relative {
        location: String,
        #[source]
        source: DefinitionStoreError,
    },
}
