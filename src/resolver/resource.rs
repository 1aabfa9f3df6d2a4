//! Loader-backed entity resolver
//!
//! Resolution order for one identifier:
//! 1. the local DTD / schema tables
//! 2. the resource loader, for system ids that are relative paths or URLs
//!    under the working root
//! 3. for `.dtd` / `.xsd` ids, a remote fetch with `http:` upgraded to
//!    `https:`; a failed fetch resolves to nothing

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use memchr::memchr_iter;
use url::Url;

use super::delegating::DelegatingEntityResolver;
use super::{EntityResolver, InputSource, DTD_SUFFIX, XSD_SUFFIX};
use crate::error::ResourceError;
use crate::resource::{default_fetcher, RemoteFetcher, ResourceLoader};

const DEFAULT_CACHE_CAPACITY: usize = 32;

pub struct ResourceEntityResolver {
    base: DelegatingEntityResolver,
    loader: Arc<dyn ResourceLoader>,
    fetcher: Arc<dyn RemoteFetcher>,
    working_root: Option<Url>,
    /// Remote bodies by fetched URL
    cache: Mutex<LruCache<String, Vec<u8>>>,
}

impl ResourceEntityResolver {
    /// Resolver over `loader`, rooted at the process working directory
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        let working_root = std::env::current_dir()
            .ok()
            .and_then(|dir| Url::from_directory_path(dir).ok());
        ResourceEntityResolver {
            base: DelegatingEntityResolver::default(),
            loader,
            fetcher: default_fetcher(),
            working_root,
            cache: Mutex::new(LruCache::new(cache_capacity(DEFAULT_CACHE_CAPACITY))),
        }
    }

    pub fn with_base(mut self, base: DelegatingEntityResolver) -> Self {
        self.base = base;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Directory URL whose prefix is stripped from system ids before they go
    /// to the loader. `None` disables stripping.
    pub fn with_working_root(mut self, root: Option<Url>) -> Self {
        self.working_root = root;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = Mutex::new(LruCache::new(cache_capacity(capacity)));
        self
    }

    /// Loader-relative path for a system id. `None` when the id is a URL
    /// outside the working root. An id that does not decode to a URL is
    /// used as given.
    fn resource_path(&self, system_id: &str) -> Option<String> {
        let Some(decoded) = decode_system_id(system_id).filter(|d| Url::parse(d).is_ok()) else {
            return Some(system_id.to_string());
        };
        let root = self.working_root.as_ref()?;
        decoded.strip_prefix(root.as_str()).map(str::to_string)
    }

    fn resolve_remote(&self, public_id: Option<&str>, system_id: &str) -> Option<InputSource> {
        let url = match system_id.strip_prefix("http:") {
            Some(rest) => format!("https:{}", rest),
            None => system_id.to_string(),
        };

        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&url)
            .cloned();
        if let Some(bytes) = cached {
            tracing::trace!(%url, "serving XML entity from cache");
            return Some(InputSource::new(public_id, Some(system_id), bytes));
        }

        match self.fetcher.fetch(&url) {
            Ok(bytes) => {
                tracing::debug!(%url, "found XML entity remotely");
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .put(url, bytes.clone());
                Some(InputSource::new(public_id, Some(system_id), bytes))
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "could not resolve XML entity remotely, falling back to parser default");
                None
            }
        }
    }
}

impl EntityResolver for ResourceEntityResolver {
    fn resolve_entity(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Option<InputSource>, ResourceError> {
        if let Some(source) = self.base.resolve_entity(public_id, system_id)? {
            return Ok(Some(source));
        }
        let Some(system_id) = system_id else {
            return Ok(None);
        };

        if let Some(path) = self.resource_path(system_id) {
            if let Ok(resource) = self.loader.get_resource(&path) {
                if self.loader.exists(&resource) {
                    tracing::trace!(system_id, %resource, "found XML entity through resource loader");
                    let bytes = self.loader.open(&resource)?;
                    return Ok(Some(InputSource::new(public_id, Some(system_id), bytes)));
                }
            }
            tracing::trace!(system_id, path = %path, "XML entity not found through resource loader");
        }

        if system_id.ends_with(DTD_SUFFIX) || system_id.ends_with(XSD_SUFFIX) {
            return Ok(self.resolve_remote(public_id, system_id));
        }
        Ok(None)
    }
}

fn cache_capacity(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Form-decode a system id (`+` is a space). `None` on a malformed `%`
/// escape or non UTF-8 output.
fn decode_system_id(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let well_formed = memchr_iter(b'%', bytes).all(|i| {
        bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return None;
    }
    urlencoding::decode(&value.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DtdResolver, SchemaResolver};
    use crate::resource::StaticResourceLoader;

    #[derive(Default)]
    struct FakeFetcher {
        body: Option<Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl RemoteFetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.body.clone().ok_or_else(|| ResourceError::Fetch {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn resolver(fetcher: Arc<FakeFetcher>) -> ResourceEntityResolver {
        let loader = StaticResourceLoader::new()
            .with_document("schemas/app.xsd", "<xsd:schema/>")
            .with_document("my schemas/app.dtd", "<!ELEMENT app ANY>");
        ResourceEntityResolver::new(Arc::new(loader))
            .with_fetcher(fetcher)
            .with_working_root(Url::parse("file:///work/").ok())
    }

    #[test]
    fn test_decode_system_id() {
        assert_eq!(decode_system_id("a%20b+c").as_deref(), Some("a b c"));
        assert_eq!(decode_system_id("a%2Bb").as_deref(), Some("a+b"));
        assert_eq!(decode_system_id("bad%zz"), None);
        assert_eq!(decode_system_id("cut%2"), None);
    }

    #[test]
    fn test_system_id_decoded_once() {
        let loader = StaticResourceLoader::new()
            .with_document("my%20schemas/app.dtd", "encoded")
            .with_document("my schemas/app.dtd", "spaced");
        let r = ResourceEntityResolver::new(Arc::new(loader))
            .with_fetcher(Arc::new(FakeFetcher::default()))
            .with_working_root(Url::parse("file:///work/").ok());
        let source = r
            .resolve_entity(None, Some("file:///work/my%2520schemas/app.dtd"))
            .unwrap()
            .unwrap();
        assert_eq!(source.bytes, b"encoded");
    }

    #[test]
    fn test_malformed_escape_uses_raw_id() {
        let loader = StaticResourceLoader::new().with_document("schemas/a%zz.xsd", "raw");
        let r = ResourceEntityResolver::new(Arc::new(loader))
            .with_fetcher(Arc::new(FakeFetcher::default()))
            .with_working_root(Url::parse("file:///work/").ok());
        let source = r.resolve_entity(None, Some("schemas/a%zz.xsd")).unwrap().unwrap();
        assert_eq!(source.bytes, b"raw");
    }

    #[test]
    fn test_base_tables_consulted_first() {
        let fetcher = Arc::new(FakeFetcher::default());
        let mut dtd = DtdResolver::new();
        dtd.register("app.dtd", "local");
        let r = resolver(fetcher.clone()).with_base(DelegatingEntityResolver::new(dtd, SchemaResolver::new()));
        let source = r
            .resolve_entity(None, Some("http://example.com/app.dtd"))
            .unwrap()
            .unwrap();
        assert_eq!(source.bytes, b"local");
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_relative_system_id_through_loader() {
        let r = resolver(Arc::new(FakeFetcher::default()));
        let source = r.resolve_entity(Some("-//APP//EN"), Some("schemas/app.xsd")).unwrap().unwrap();
        assert_eq!(source.bytes, b"<xsd:schema/>");
        assert_eq!(source.public_id.as_deref(), Some("-//APP//EN"));
        assert_eq!(source.system_id.as_deref(), Some("schemas/app.xsd"));
    }

    #[test]
    fn test_working_root_prefix_stripped() {
        let r = resolver(Arc::new(FakeFetcher::default()));
        let source = r
            .resolve_entity(None, Some("file:///work/schemas/app.xsd"))
            .unwrap()
            .unwrap();
        assert_eq!(source.bytes, b"<xsd:schema/>");

        let encoded = r
            .resolve_entity(None, Some("file:///work/my%20schemas/app.dtd"))
            .unwrap()
            .unwrap();
        assert_eq!(encoded.bytes, b"<!ELEMENT app ANY>");
    }

    #[test]
    fn test_remote_fetch_upgrades_to_https_and_caches() {
        let fetcher = Arc::new(FakeFetcher {
            body: Some(b"<xsd:schema/>".to_vec()),
            ..FakeFetcher::default()
        });
        let r = resolver(fetcher.clone());
        for _ in 0..2 {
            let source = r
                .resolve_entity(None, Some("http://example.com/schema/remote.xsd"))
                .unwrap()
                .unwrap();
            assert_eq!(source.system_id.as_deref(), Some("http://example.com/schema/remote.xsd"));
        }
        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            vec!["https://example.com/schema/remote.xsd".to_string()]
        );
    }

    #[test]
    fn test_fetch_failure_resolves_to_none() {
        let fetcher = Arc::new(FakeFetcher::default());
        let r = resolver(fetcher.clone());
        assert!(r
            .resolve_entity(None, Some("https://example.com/missing.dtd"))
            .unwrap()
            .is_none());
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_other_suffix_never_fetched() {
        let fetcher = Arc::new(FakeFetcher::default());
        let r = resolver(fetcher.clone());
        assert!(r
            .resolve_entity(None, Some("http://example.com/entities.ent"))
            .unwrap()
            .is_none());
        assert!(r.resolve_entity(None, None).unwrap().is_none());
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }
}
