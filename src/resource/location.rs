//! Location strings
//!
//! Classification of import locations into absolute and relative references,
//! plus the path arithmetic used to resolve relative ones. Classification is
//! purely syntactic: nothing is opened or probed.

use url::Url;

/// Prefix for a single class path resource
pub const CLASSPATH_URL_PREFIX: &str = "classpath:";

/// Prefix for all class path resources matching a path or pattern
pub const CLASSPATH_ALL_URL_PREFIX: &str = "classpath*:";

const FOLDER_SEPARATOR: char = '/';

/// How a location is to be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// Loadable as-is
    Absolute,
    /// Resolved against the declaring document
    Relative,
}

/// A location string plus its resolution kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    location: String,
    kind: LocationKind,
}

impl ResourceRef {
    /// Classify a location once, from its syntax alone
    pub fn classify(location: impl Into<String>) -> Self {
        let location = location.into();
        let kind = if is_url(&location) || is_absolute_uri(&location) {
            LocationKind::Absolute
        } else {
            LocationKind::Relative
        };
        ResourceRef { location, kind }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn is_absolute(&self) -> bool {
        self.kind == LocationKind::Absolute
    }
}

/// Whether the location is a class path pseudo-URL or a fetchable URL
pub fn is_url(location: &str) -> bool {
    if location.starts_with(CLASSPATH_ALL_URL_PREFIX) || location.starts_with(CLASSPATH_URL_PREFIX) {
        return true;
    }
    match Url::parse(location) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "file" | "ftp" | "jar"),
        Err(_) => false,
    }
}

/// Whether the location parses as a URI with a scheme. Spaces are escaped
/// first; any parse failure counts as "not absolute".
pub fn is_absolute_uri(location: &str) -> bool {
    let escaped = location.replace(' ', "%20");
    match Url::parse(&escaped) {
        // Url only represents absolute URLs; rule out Windows drive letters
        Ok(url) => url.scheme().len() > 1,
        Err(_) => false,
    }
}

/// Whether the location contains wildcard characters
pub fn is_pattern(location: &str) -> bool {
    let path = location
        .strip_prefix(CLASSPATH_ALL_URL_PREFIX)
        .or_else(|| location.strip_prefix(CLASSPATH_URL_PREFIX))
        .unwrap_or(location);
    path.contains(['*', '?', '['])
}

/// Resolve `relative` against the folder containing `path`.
///
/// `apply_relative_path("file:/app/conf/beans.xml", "db.xml")` gives
/// `"file:/app/conf/db.xml"`. A path without any separator yields `relative`
/// unchanged.
pub fn apply_relative_path(path: &str, relative: &str) -> String {
    match path.rfind(FOLDER_SEPARATOR) {
        Some(index) => {
            let mut joined = String::with_capacity(index + 1 + relative.len());
            joined.push_str(&path[..index]);
            if !relative.starts_with(FOLDER_SEPARATOR) {
                joined.push(FOLDER_SEPARATOR);
            }
            joined.push_str(relative);
            joined
        }
        None => relative.to_string(),
    }
}

/// Normalize a path, collapsing `.` and `name/..` segments.
///
/// Leading `..` segments that cannot be collapsed are kept. A prefix up to
/// the first ':' (such as `file:`) is preserved untouched.
pub fn clean_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let (prefix, rest) = match normalized.find(':') {
        Some(i) if !normalized[..i].contains('/') => normalized.split_at(i + 1),
        _ => ("", normalized.as_str()),
    };
    let absolute = rest.starts_with(FOLDER_SEPARATOR);

    let mut segments: Vec<&str> = Vec::new();
    let mut leading_up = 0usize;
    for segment in rest.split(FOLDER_SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    leading_up += 1;
                }
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    cleaned.push_str(prefix);
    if absolute {
        cleaned.push(FOLDER_SEPARATOR);
    }
    let ups = std::iter::repeat("..").take(if absolute { 0 } else { leading_up });
    let parts: Vec<&str> = ups.chain(segments).collect();
    cleaned.push_str(&parts.join("/"));
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_absolute() {
        for location in [
            "classpath:conf/beans.xml",
            "classpath*:conf/*.xml",
            "file:/etc/app/beans.xml",
            "https://example.com/beans.xml",
            "urn:config:beans",
        ] {
            assert!(ResourceRef::classify(location).is_absolute(), "{}", location);
        }
    }

    #[test]
    fn test_classify_relative() {
        for location in ["beans.xml", "conf/beans.xml", "../shared/db.xml", "/abs/path.xml", "C:/x.xml"] {
            let reference = ResourceRef::classify(location);
            assert_eq!(reference.kind(), LocationKind::Relative, "{}", location);
            assert_eq!(reference.location(), location);
        }
    }

    #[test]
    fn test_space_in_uri() {
        assert!(is_absolute_uri("file:/my docs/beans.xml"));
        assert!(!is_absolute_uri("my docs/beans.xml"));
    }

    #[test]
    fn test_is_pattern() {
        assert!(is_pattern("conf/*.xml"));
        assert!(is_pattern("classpath*:conf/beans-?.xml"));
        assert!(!is_pattern("classpath*:conf/beans.xml"));
        assert!(!is_pattern("conf/beans.xml"));
    }

    #[test]
    fn test_apply_relative_path() {
        assert_eq!(
            apply_relative_path("file:/app/conf/beans.xml", "db.xml"),
            "file:/app/conf/db.xml"
        );
        assert_eq!(apply_relative_path("conf/beans.xml", "/db.xml"), "conf/db.xml");
        assert_eq!(apply_relative_path("beans.xml", "db.xml"), "db.xml");
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("conf/./sub/../beans.xml"), "conf/beans.xml");
        assert_eq!(clean_path("../shared/db.xml"), "../shared/db.xml");
        assert_eq!(clean_path("/app//conf/../beans.xml"), "/app/beans.xml");
        assert_eq!(clean_path("file:/app/conf/../beans.xml"), "file:/app/beans.xml");
        assert_eq!(clean_path("conf\\beans.xml"), "conf/beans.xml");
    }
}
