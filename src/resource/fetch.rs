//! Remote fetching
//!
//! Network access is a blocking call on the invoking thread. With the
//! `remote-fetch` feature (default) [`HttpFetcher`] does it through
//! reqwest's blocking client; without it every fetch fails and callers fall
//! back to local resolution only.

use std::sync::Arc;

use crate::error::ResourceError;

/// Blocking fetch of a URL's body
pub trait RemoteFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Fetcher used when remote access is compiled out or disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemoteFetch;

impl RemoteFetcher for NoRemoteFetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        Err(ResourceError::Fetch {
            url: url.to_string(),
            message: "remote fetching is disabled".to_string(),
        })
    }
}

/// HTTP(S) fetcher on reqwest's blocking client
#[cfg(feature = "remote-fetch")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote-fetch")]
impl HttpFetcher {
    pub fn new() -> Result<Self, ResourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("rustybeans/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResourceError::Fetch {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(HttpFetcher { client })
    }
}

#[cfg(feature = "remote-fetch")]
impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let fetch_error = |message: String| ResourceError::Fetch {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP status {}", status)));
        }
        let body = response.bytes().map_err(|e| fetch_error(e.to_string()))?;
        tracing::debug!(url, bytes = body.len(), "fetched remote resource");
        Ok(body.to_vec())
    }
}

/// The fetcher configured by the enabled cargo features
pub fn default_fetcher() -> Arc<dyn RemoteFetcher> {
    #[cfg(feature = "remote-fetch")]
    {
        match HttpFetcher::new() {
            Ok(fetcher) => return Arc::new(fetcher),
            Err(e) => tracing::warn!(error = %e, "HTTP client unavailable, remote fetching disabled"),
        }
    }
    Arc::new(NoRemoteFetch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_remote_fetch() {
        let err = NoRemoteFetch.fetch("https://example.com/a.xsd").unwrap_err();
        assert!(matches!(err, ResourceError::Fetch { .. }));
        assert!(err.to_string().contains("https://example.com/a.xsd"));
    }
}
