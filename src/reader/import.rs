//! Import resolution
//!
//! An `import` location is either absolute (a URL or class path locator),
//! loaded as given, or relative to the importing document. A relative
//! location that does not exist next to the importing document is joined
//! onto that document's URL and loaded through the same multi-resource path
//! as an absolute one.

use std::io;

use indexmap::IndexSet;

use crate::error::{DefinitionStoreError, ImportError};
use crate::resource::{apply_relative_path, LocationKind, Resource, ResourceLoader, ResourceRef};

/// The loading side of a definition reader, as seen by imports
pub trait DefinitionLoader {
    fn resource_loader(&self) -> &dyn ResourceLoader;

    /// Load every resource a location (or pattern) expands to, recording
    /// each in `actual`. Returns the number of definitions found.
    fn load_definitions(
        &mut self,
        location: &str,
        actual: Option<&mut IndexSet<Resource>>,
    ) -> Result<usize, DefinitionStoreError>;

    /// Load a single resource
    fn load_resource(&mut self, resource: &Resource) -> Result<usize, DefinitionStoreError>;
}

/// Resolve and load one import, returning the resources actually loaded
pub fn resolve_import<L>(
    loader: &mut L,
    location: &str,
    declaring: &Resource,
) -> Result<IndexSet<Resource>, ImportError>
where
    L: DefinitionLoader + ?Sized,
{
    let reference = ResourceRef::classify(location);
    let mut actual = IndexSet::new();

    match reference.kind() {
        LocationKind::Absolute => {
            let count = loader
                .load_definitions(reference.location(), Some(&mut actual))
                .map_err(|source| ImportError::Absolute {
                    location: location.to_string(),
                    source,
                })?;
            tracing::trace!(count, location, "imported definitions from URL location");
        }
        LocationKind::Relative => {
            let relative = declaring
                .create_relative(reference.location())
                .map_err(|e| ImportError::CurrentLocation(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
            let into_error = |source| ImportError::Relative {
                location: location.to_string(),
                source,
            };

            let count = if loader.resource_loader().exists(&relative) {
                let count = loader.load_resource(&relative).map_err(into_error)?;
                actual.insert(relative);
                count
            } else {
                let base = loader
                    .resource_loader()
                    .url(declaring)
                    .map_err(ImportError::CurrentLocation)?;
                let joined = apply_relative_path(base.as_str(), reference.location());
                tracing::trace!(location, %joined, "relative import not found next to importing document");
                loader
                    .load_definitions(&joined, Some(&mut actual))
                    .map_err(into_error)?
            };
            tracing::trace!(count, location, "imported definitions from relative location");
        }
    }

    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceError;
    use crate::resource::StaticResourceLoader;

    /// Loader that records what it was asked to load
    struct Recorder {
        resources: StaticResourceLoader,
        loaded: Vec<Resource>,
    }

    impl Recorder {
        fn new(resources: StaticResourceLoader) -> Self {
            Recorder {
                resources,
                loaded: Vec::new(),
            }
        }
    }

    impl DefinitionLoader for Recorder {
        fn resource_loader(&self) -> &dyn ResourceLoader {
            &self.resources
        }

        fn load_definitions(
            &mut self,
            location: &str,
            mut actual: Option<&mut IndexSet<Resource>>,
        ) -> Result<usize, DefinitionStoreError> {
            let mut count = 0;
            for resource in self.resources.resolve(location)? {
                count += self.load_resource(&resource)?;
                if let Some(actual) = actual.as_mut() {
                    actual.insert(resource);
                }
            }
            Ok(count)
        }

        fn load_resource(&mut self, resource: &Resource) -> Result<usize, DefinitionStoreError> {
            if !self.resources.exists(resource) {
                return Err(ResourceError::NotFound {
                    description: resource.to_string(),
                }
                .into());
            }
            self.loaded.push(resource.clone());
            Ok(1)
        }
    }

    fn fixture() -> Recorder {
        Recorder::new(
            StaticResourceLoader::new()
                .with_document("conf/main.xml", "<beans/>")
                .with_document("conf/dao.xml", "<beans/>")
                .with_document("conf/extra/a.xml", "<beans/>")
                .with_document("conf/extra/b.xml", "<beans/>")
                .with_document("shared/common.xml", "<beans/>"),
        )
    }

    #[test]
    fn test_relative_sibling() {
        let mut loader = fixture();
        let actual = resolve_import(&mut loader, "dao.xml", &Resource::classpath("conf/main.xml")).unwrap();
        assert_eq!(actual.into_iter().collect::<Vec<_>>(), vec![Resource::classpath("conf/dao.xml")]);
    }

    #[test]
    fn test_absolute_classpath_pattern() {
        let mut loader = fixture();
        let actual =
            resolve_import(&mut loader, "classpath*:conf/extra/*.xml", &Resource::classpath("conf/main.xml")).unwrap();
        assert_eq!(actual.len(), 2);
        assert_eq!(loader.loaded.len(), 2);
    }

    #[test]
    fn test_relative_pattern_falls_back_to_joined_url() {
        let mut loader = fixture();
        let actual = resolve_import(&mut loader, "extra/*.xml", &Resource::classpath("conf/main.xml")).unwrap();
        let mut names: Vec<String> = actual.iter().map(|r| r.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "class path resource [conf/extra/a.xml]",
                "class path resource [conf/extra/b.xml]"
            ]
        );
    }

    #[test]
    fn test_relative_parent_directory() {
        let mut loader = fixture();
        let actual =
            resolve_import(&mut loader, "../shared/common.xml", &Resource::classpath("conf/main.xml")).unwrap();
        assert!(actual.contains(&Resource::classpath("shared/common.xml")));
    }

    #[test]
    fn test_missing_relative_is_one_error() {
        let mut loader = fixture();
        let err = resolve_import(&mut loader, "missing.xml", &Resource::classpath("conf/main.xml")).unwrap_err();
        assert!(matches!(err, ImportError::Relative { ref location, .. } if location == "missing.xml"));
        assert!(loader.loaded.is_empty());
    }

    #[test]
    fn test_missing_absolute() {
        let mut loader = fixture();
        let err = resolve_import(&mut loader, "classpath:nope.xml", &Resource::classpath("conf/main.xml")).unwrap_err();
        assert!(matches!(err, ImportError::Absolute { .. }));
    }
}
