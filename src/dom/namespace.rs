//! Namespace Resolution
//!
//! Stack-based namespace resolver used while building the element tree.
//! Bindings declared on an element are visible to it and its descendants and
//! disappear when the element closes.

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";
}

/// Namespace binding (prefix -> URI); the default namespace has prefix ""
#[derive(Debug, Clone)]
struct NsBinding {
    prefix: String,
    uri: String,
    depth: u16,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u16,
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceResolver {
    /// Create a resolver with the `xml` and `xmlns` prefixes pre-bound
    pub fn new() -> Self {
        let mut bindings = Vec::with_capacity(16);
        bindings.push(NsBinding {
            prefix: "xml".to_string(),
            uri: ns::XML.to_string(),
            depth: 0,
        });
        bindings.push(NsBinding {
            prefix: "xmlns".to_string(),
            uri: ns::XMLNS.to_string(),
            depth: 0,
        });
        NamespaceResolver { bindings, depth: 0 }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding for the current scope. An empty URI on the default
    /// namespace undeclares it (`xmlns=""`).
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        if prefix == "xml" || prefix == "xmlns" {
            return;
        }
        self.bindings.push(NsBinding {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
            depth: self.depth,
        });
    }

    /// Resolve a prefix ("" for the default namespace) to its URI
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Resolve the namespace of an element name: unprefixed names take the
    /// default namespace.
    pub fn resolve_element(&self, qname: &str) -> Option<&str> {
        match qname.split_once(':') {
            Some((prefix, _)) => self.resolve(prefix),
            None => self.resolve(""),
        }
    }

    /// Resolve the namespace of an attribute name: unprefixed attributes are
    /// in no namespace.
    pub fn resolve_attribute(&self, qname: &str) -> Option<&str> {
        qname
            .split_once(':')
            .and_then(|(prefix, _)| self.resolve(prefix))
    }

    /// Get current depth
    pub fn depth(&self) -> u16 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespaces() {
        let resolver = NamespaceResolver::new();
        assert_eq!(resolver.resolve("xml"), Some(ns::XML));
        assert_eq!(resolver.resolve(""), None);
    }

    #[test]
    fn test_scope_pop() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare("p", "http://www.springframework.org/schema/p");
        assert_eq!(
            resolver.resolve_attribute("p:name"),
            Some("http://www.springframework.org/schema/p")
        );
        resolver.pop_scope();
        assert_eq!(resolver.resolve("p"), None);
    }

    #[test]
    fn test_shadow_and_undeclare_default() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare("", "urn:outer");
        resolver.push_scope();
        resolver.declare("", "");
        assert_eq!(resolver.resolve_element("beans"), None);
        resolver.pop_scope();
        assert_eq!(resolver.resolve_element("beans"), Some("urn:outer"));
        assert_eq!(resolver.resolve_attribute("id"), None);
    }
}
