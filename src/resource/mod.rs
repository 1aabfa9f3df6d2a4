//! Resources and resource loading
//!
//! A [`Resource`] names a document without opening it. A [`ResourceLoader`]
//! turns location strings into resources and answers the questions the
//! import resolver asks: does it exist, what is its URL, what are its bytes,
//! and which resources does a wildcard location expand to.

pub mod fetch;
pub mod loader;
pub mod location;

use std::fmt;
use std::io;
use std::path::PathBuf;

use url::Url;

use crate::error::ResourceError;

pub use fetch::{default_fetcher, NoRemoteFetch, RemoteFetcher};
pub use loader::{FileSystemResourceLoader, StaticResourceLoader};
pub use location::{
    apply_relative_path, clean_path, is_pattern, LocationKind, ResourceRef, CLASSPATH_ALL_URL_PREFIX,
    CLASSPATH_URL_PREFIX,
};

/// Identity of a loadable document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// File system path
    File(PathBuf),
    /// Path relative to the loader's class path roots, no leading slash
    Classpath(String),
    /// Any other absolute URL (http, https, ...)
    Url(Url),
}

impl Resource {
    /// Create a class path resource, normalizing the path
    pub fn classpath(path: &str) -> Self {
        Resource::Classpath(clean_path(path.trim_start_matches('/')))
    }

    /// Resolve a path relative to this resource's folder
    pub fn create_relative(&self, relative: &str) -> Result<Resource, ResourceError> {
        match self {
            Resource::File(path) => {
                let joined = apply_relative_path(&path.to_string_lossy(), relative);
                Ok(Resource::File(PathBuf::from(clean_path(&joined))))
            }
            Resource::Classpath(path) => Ok(Resource::classpath(&apply_relative_path(path, relative))),
            Resource::Url(url) => url
                .join(relative.trim_start_matches('/'))
                .map(Resource::Url)
                .map_err(|e| ResourceError::InvalidLocation {
                    location: relative.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Last path segment, if any
    pub fn filename(&self) -> Option<String> {
        let path = match self {
            Resource::File(path) => return path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Resource::Classpath(path) => path.as_str(),
            Resource::Url(url) => url.path(),
        };
        path.rsplit('/').next().filter(|s| !s.is_empty()).map(str::to_string)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::File(path) => write!(f, "file [{}]", path.display()),
            Resource::Classpath(path) => write!(f, "class path resource [{}]", path),
            Resource::Url(url) => write!(f, "URL [{}]", url),
        }
    }
}

/// Strategy for locating and reading resources
pub trait ResourceLoader {
    /// Map a single (non-pattern) location to a resource
    fn get_resource(&self, location: &str) -> Result<Resource, ResourceError>;

    /// Whether the resource can be opened
    fn exists(&self, resource: &Resource) -> bool;

    /// Read the resource's bytes
    fn open(&self, resource: &Resource) -> Result<Vec<u8>, ResourceError>;

    /// The resource's absolute URL
    fn url(&self, resource: &Resource) -> io::Result<Url>;

    /// Expand a location that may contain wildcards or a `classpath*:`
    /// prefix into the matching resources. Plain locations yield exactly one.
    fn resolve(&self, location: &str) -> Result<Vec<Resource>, ResourceError> {
        Ok(vec![self.get_resource(location)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_relative_file() {
        let res = Resource::File(PathBuf::from("/app/conf/beans.xml"));
        assert_eq!(
            res.create_relative("../shared/db.xml").unwrap(),
            Resource::File(PathBuf::from("/app/shared/db.xml"))
        );
    }

    #[test]
    fn test_create_relative_classpath() {
        let res = Resource::classpath("/conf/beans.xml");
        assert_eq!(res, Resource::Classpath("conf/beans.xml".to_string()));
        assert_eq!(
            res.create_relative("db.xml").unwrap(),
            Resource::Classpath("conf/db.xml".to_string())
        );
    }

    #[test]
    fn test_create_relative_url() {
        let res = Resource::Url(Url::parse("https://example.com/conf/beans.xml").unwrap());
        let relative = res.create_relative("/db.xml").unwrap();
        assert_eq!(relative.to_string(), "URL [https://example.com/conf/db.xml]");
    }

    #[test]
    fn test_filename_and_display() {
        let res = Resource::classpath("conf/beans.xml");
        assert_eq!(res.filename().as_deref(), Some("beans.xml"));
        assert_eq!(res.to_string(), "class path resource [conf/beans.xml]");
        assert_eq!(Resource::File(PathBuf::from("/a/b.xml")).filename().as_deref(), Some("b.xml"));
    }
}
