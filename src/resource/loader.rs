//! Resource loader implementations
//!
//! - [`FileSystemResourceLoader`]: plain paths relative to a base directory,
//!   `classpath:` paths searched across a list of root directories, and
//!   remote URLs through a [`RemoteFetcher`]
//! - [`StaticResourceLoader`]: documents held in memory, addressed by
//!   class path style names

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use url::Url;

use super::fetch::RemoteFetcher;
use super::location::{clean_path, is_pattern, CLASSPATH_ALL_URL_PREFIX, CLASSPATH_URL_PREFIX};
use super::{Resource, ResourceLoader};
use crate::error::ResourceError;

/// Scheme used to give in-memory documents a URL
pub const MEMORY_URL_SCHEME: &str = "memory";

/// Loader backed by the local file system
pub struct FileSystemResourceLoader {
    base_dir: PathBuf,
    classpath_roots: Vec<PathBuf>,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
}

impl FileSystemResourceLoader {
    /// Loader resolving relative paths against `base_dir`; `base_dir` is
    /// also the first class path root.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        FileSystemResourceLoader {
            classpath_roots: vec![base_dir.clone()],
            base_dir,
            fetcher: None,
        }
    }

    /// Loader rooted at the process working directory
    pub fn current_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Append a class path root, searched after the existing ones
    pub fn with_classpath_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.classpath_roots.push(root.into());
        self
    }

    /// Enable remote URL resources
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// First class path root containing `path`
    fn locate(&self, path: &str) -> Option<PathBuf> {
        self.classpath_roots
            .iter()
            .map(|root| root.join(path))
            .find(|candidate| candidate.is_file())
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn glob_files(&self, pattern: &Path) -> Result<Vec<Resource>, ResourceError> {
        let pattern_str = pattern.to_string_lossy();
        let paths = glob::glob(&pattern_str).map_err(|e| ResourceError::InvalidLocation {
            location: pattern_str.to_string(),
            reason: e.to_string(),
        })?;
        let mut found = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => found.push(Resource::File(path)),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "skipping unreadable pattern match"),
            }
        }
        Ok(found)
    }
}

impl ResourceLoader for FileSystemResourceLoader {
    fn get_resource(&self, location: &str) -> Result<Resource, ResourceError> {
        if let Some(path) = location.strip_prefix(CLASSPATH_URL_PREFIX) {
            return Ok(Resource::classpath(path));
        }
        if let Ok(url) = Url::parse(location) {
            if url.scheme().len() > 1 {
                if url.scheme() == "file" {
                    return url
                        .to_file_path()
                        .map(Resource::File)
                        .map_err(|()| ResourceError::InvalidLocation {
                            location: location.to_string(),
                            reason: "not a local file URL".to_string(),
                        });
                }
                return Ok(Resource::Url(url));
            }
        }
        let path = PathBuf::from(clean_path(location));
        Ok(Resource::File(self.absolute(&path)))
    }

    fn exists(&self, resource: &Resource) -> bool {
        match resource {
            Resource::File(path) => path.is_file(),
            Resource::Classpath(path) => self.locate(path).is_some(),
            Resource::Url(_) => self.fetcher.is_some(),
        }
    }

    fn open(&self, resource: &Resource) -> Result<Vec<u8>, ResourceError> {
        let read = |path: &Path| {
            fs::read(path).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ResourceError::NotFound {
                    description: resource.to_string(),
                },
                _ => ResourceError::io(resource.to_string(), e),
            })
        };
        match resource {
            Resource::File(path) => read(path),
            Resource::Classpath(path) => match self.locate(path) {
                Some(found) => read(&found),
                None => Err(ResourceError::NotFound {
                    description: resource.to_string(),
                }),
            },
            Resource::Url(url) => match &self.fetcher {
                Some(fetcher) => fetcher.fetch(url.as_str()),
                None => Err(ResourceError::Fetch {
                    url: url.to_string(),
                    message: "no remote fetcher configured".to_string(),
                }),
            },
        }
    }

    fn url(&self, resource: &Resource) -> io::Result<Url> {
        let file_url = |path: &Path| {
            Url::from_file_path(self.absolute(path)).map_err(|()| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} cannot be resolved to URL", resource),
                )
            })
        };
        match resource {
            Resource::File(path) => file_url(path),
            Resource::Classpath(path) => match self.locate(path) {
                Some(found) => file_url(&found),
                None => Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} cannot be resolved to URL because it does not exist", resource),
                )),
            },
            Resource::Url(url) => Ok(url.clone()),
        }
    }

    fn resolve(&self, location: &str) -> Result<Vec<Resource>, ResourceError> {
        if let Some(path) = location.strip_prefix(CLASSPATH_ALL_URL_PREFIX) {
            let path = clean_path(path.trim_start_matches('/'));
            let mut found = Vec::new();
            for root in &self.classpath_roots {
                if is_pattern(&path) {
                    found.extend(self.glob_files(&root.join(&path))?);
                } else {
                    let candidate = root.join(&path);
                    if candidate.is_file() {
                        found.push(Resource::File(candidate));
                    }
                }
            }
            return Ok(found);
        }

        if !is_pattern(location) {
            return Ok(vec![self.get_resource(location)?]);
        }

        if let Some(path) = location.strip_prefix(CLASSPATH_URL_PREFIX) {
            let path = clean_path(path.trim_start_matches('/'));
            for root in &self.classpath_roots {
                let matches = self.glob_files(&root.join(&path))?;
                if !matches.is_empty() {
                    return Ok(matches);
                }
            }
            return Ok(Vec::new());
        }

        let path = match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => {
                url.to_file_path().map_err(|()| ResourceError::InvalidLocation {
                    location: location.to_string(),
                    reason: "not a local file URL".to_string(),
                })?
            }
            _ => self.absolute(Path::new(location)),
        };
        self.glob_files(&path)
    }
}

/// Loader over documents registered in memory
#[derive(Debug, Default, Clone)]
pub struct StaticResourceLoader {
    documents: IndexMap<String, Vec<u8>>,
}

impl StaticResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under a class path style name
    pub fn with_document(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&mut self, name: &str, content: impl Into<Vec<u8>>) {
        let key = clean_path(name.trim_start_matches('/'));
        self.documents.insert(key, content.into());
    }

    fn key<'r>(&self, resource: &'r Resource) -> Option<&'r str> {
        match resource {
            Resource::Classpath(path) => Some(path.as_str()),
            _ => None,
        }
    }
}

impl ResourceLoader for StaticResourceLoader {
    fn get_resource(&self, location: &str) -> Result<Resource, ResourceError> {
        let location = location
            .strip_prefix(CLASSPATH_ALL_URL_PREFIX)
            .or_else(|| location.strip_prefix(CLASSPATH_URL_PREFIX))
            .unwrap_or(location);
        match Url::parse(location) {
            Ok(url) if url.scheme() == MEMORY_URL_SCHEME => Ok(Resource::classpath(url.path())),
            Ok(url) if url.scheme().len() > 1 => Ok(Resource::Url(url)),
            _ => Ok(Resource::classpath(location)),
        }
    }

    fn exists(&self, resource: &Resource) -> bool {
        self.key(resource)
            .is_some_and(|key| self.documents.contains_key(key))
    }

    fn open(&self, resource: &Resource) -> Result<Vec<u8>, ResourceError> {
        self.key(resource)
            .and_then(|key| self.documents.get(key))
            .cloned()
            .ok_or_else(|| ResourceError::NotFound {
                description: resource.to_string(),
            })
    }

    fn url(&self, resource: &Resource) -> io::Result<Url> {
        match resource {
            Resource::Classpath(path) => Url::parse(&format!("{}:///{}", MEMORY_URL_SCHEME, path))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e)),
            Resource::Url(url) => Ok(url.clone()),
            Resource::File(path) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("file [{}] is not held in memory", path.display()),
            )),
        }
    }

    fn resolve(&self, location: &str) -> Result<Vec<Resource>, ResourceError> {
        if !is_pattern(location) {
            let resource = self.get_resource(location)?;
            // classpath*: on a plain path yields nothing when absent
            if location.starts_with(CLASSPATH_ALL_URL_PREFIX) && !self.exists(&resource) {
                return Ok(Vec::new());
            }
            return Ok(vec![resource]);
        }
        let path = location
            .strip_prefix(CLASSPATH_ALL_URL_PREFIX)
            .or_else(|| location.strip_prefix(CLASSPATH_URL_PREFIX))
            .unwrap_or(location);
        let path = path
            .strip_prefix(MEMORY_URL_SCHEME)
            .and_then(|rest| rest.strip_prefix("://"))
            .unwrap_or(path);
        let pattern = glob::Pattern::new(&clean_path(path.trim_start_matches('/'))).map_err(|e| {
            ResourceError::InvalidLocation {
                location: location.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(self
            .documents
            .keys()
            .filter(|key| pattern.matches(key))
            .map(|key| Resource::Classpath(key.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_loader_roundtrip() {
        let loader = StaticResourceLoader::new().with_document("conf/beans.xml", "<beans/>");
        let res = loader.get_resource("classpath:/conf/beans.xml").unwrap();
        assert!(loader.exists(&res));
        assert_eq!(loader.open(&res).unwrap(), b"<beans/>");
        assert_eq!(loader.url(&res).unwrap().as_str(), "memory:///conf/beans.xml");
    }

    #[test]
    fn test_static_loader_memory_url_maps_back() {
        let loader = StaticResourceLoader::new().with_document("conf/db.xml", "<beans/>");
        let res = loader.get_resource("memory:///conf/db.xml").unwrap();
        assert_eq!(res, Resource::Classpath("conf/db.xml".to_string()));
        assert!(loader.exists(&res));
    }

    #[test]
    fn test_static_loader_pattern() {
        let loader = StaticResourceLoader::new()
            .with_document("conf/a.xml", "<beans/>")
            .with_document("conf/b.xml", "<beans/>")
            .with_document("other/c.xml", "<beans/>");
        let found = loader.resolve("classpath*:conf/*.xml").unwrap();
        assert_eq!(
            found,
            vec![Resource::classpath("conf/a.xml"), Resource::classpath("conf/b.xml")]
        );
        assert!(loader.resolve("classpath*:conf/missing.xml").unwrap().is_empty());
    }

    #[test]
    fn test_static_loader_missing() {
        let loader = StaticResourceLoader::new();
        let res = loader.get_resource("nope.xml").unwrap();
        assert!(!loader.exists(&res));
        assert!(matches!(loader.open(&res), Err(ResourceError::NotFound { .. })));
    }

    #[test]
    fn test_file_loader_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("conf")).unwrap();
        fs::write(dir.path().join("conf/beans.xml"), "<beans/>").unwrap();

        let loader = FileSystemResourceLoader::new(dir.path());
        let res = loader.get_resource("conf/beans.xml").unwrap();
        assert_eq!(res, Resource::File(dir.path().join("conf/beans.xml")));
        assert!(loader.exists(&res));
        assert_eq!(loader.open(&res).unwrap(), b"<beans/>");

        let url = loader.url(&res).unwrap();
        assert_eq!(url.scheme(), "file");
        assert_eq!(loader.get_resource(url.as_str()).unwrap(), res);
    }

    #[test]
    fn test_file_loader_classpath_roots() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("db.xml"), "<beans/>").unwrap();
        fs::write(first.path().join("x-1.xml"), "<beans/>").unwrap();
        fs::write(second.path().join("x-2.xml"), "<beans/>").unwrap();

        let loader = FileSystemResourceLoader::new(first.path()).with_classpath_root(second.path());
        let res = loader.get_resource("classpath:db.xml").unwrap();
        assert!(loader.exists(&res));
        assert!(loader.url(&res).unwrap().path().ends_with("/db.xml"));

        let all = loader.resolve("classpath*:x-*.xml").unwrap();
        assert_eq!(all.len(), 2);

        let missing = loader.get_resource("classpath:none.xml").unwrap();
        assert!(!loader.exists(&missing));
        assert_eq!(loader.url(&missing).unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_file_loader_url_without_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileSystemResourceLoader::new(dir.path());
        let res = loader.get_resource("https://example.com/beans.xml").unwrap();
        assert!(matches!(res, Resource::Url(_)));
        assert!(!loader.exists(&res));
        assert!(matches!(loader.open(&res), Err(ResourceError::Fetch { .. })));
    }
}
