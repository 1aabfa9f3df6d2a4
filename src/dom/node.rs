//! Element node storage
//!
//! Uses NodeId (u32) for compact, cache-friendly node references. Only
//! elements live in the arena; character data is folded into the owning
//! element's `text`, since configuration documents never interleave
//! meaningful text with child elements.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// An attribute after namespace resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified name as written (`p:name`)
    pub name: String,
    /// Namespace URI bound to the prefix; unprefixed attributes have none
    pub namespace: Option<String>,
    /// Unescaped value
    pub value: String,
}

impl XmlAttribute {
    /// Name without prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Prefix, if the name is qualified
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// An element in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Qualified tag name as written
    pub name: String,
    /// Namespace URI of the element, if any
    pub namespace: Option<String>,
    /// Attributes, excluding `xmlns` declarations
    pub attributes: Vec<XmlAttribute>,
    /// Concatenated character data directly inside this element
    pub text: String,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Byte offset of the start tag in the source text
    pub position: usize,
    /// Depth in document tree (root element is 0)
    pub depth: u16,
}

impl XmlNode {
    /// Create an unlinked element node
    pub fn element(name: String, parent: Option<NodeId>, position: usize, depth: u16) -> Self {
        XmlNode {
            name,
            namespace: None,
            attributes: Vec::new(),
            text: String::new(),
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
            position,
            depth,
        }
    }

    /// Check if this node has child elements
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Strip the prefix from a qualified name
#[inline]
pub(crate) fn local_part(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element("beans".to_string(), None, 0, 0);
        assert_eq!(elem.name, "beans");
        assert!(elem.parent.is_none());
        assert!(!elem.has_children());
    }

    #[test]
    fn test_attribute_names() {
        let attr = XmlAttribute {
            name: "p:name".to_string(),
            namespace: Some("http://www.springframework.org/schema/p".to_string()),
            value: "x".to_string(),
        };
        assert_eq!(attr.local_name(), "name");
        assert_eq!(attr.prefix(), Some("p"));
        assert_eq!(local_part("plain"), "plain");
    }
}
