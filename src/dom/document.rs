//! XML Document - Arena-based element tree
//!
//! Efficient DOM storage with:
//! - Arena allocation for element nodes
//! - NodeId indices for traversal
//! - Namespace URIs resolved once, at build time
//! - Byte offsets kept for line-accurate diagnostics
//!
//! Tokenizing is done by quick-xml; this module only assembles its events.

use std::fmt;

use memchr::memchr_iter;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::namespace::NamespaceResolver;
use super::node::{local_part, NodeId, XmlAttribute, XmlNode};
use crate::core::dtd::{parse_doctype, DoctypeDecl};
use crate::error::DocumentError;

/// Options controlling tree construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Resolve `xmlns` bindings; when off every node is un-namespaced
    pub namespace_aware: bool,
    /// Reject mismatched end tags, multiple roots, unclosed elements and
    /// undecodable entities instead of recovering
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            namespace_aware: true,
            strict: true,
        }
    }
}

/// An XML document stored in arena format
#[derive(Debug, Clone)]
pub struct Document {
    /// Original text (for line computation)
    source: String,
    /// Arena of element nodes
    nodes: Vec<XmlNode>,
    /// Root element node ID
    root: NodeId,
    /// DOCTYPE declaration, if present
    doctype: Option<DoctypeDecl>,
}

impl Document {
    /// Parse a document from UTF-8 text
    pub fn parse(source: impl Into<String>, options: ParseOptions) -> Result<Self, DocumentError> {
        let source = source.into();
        let (nodes, doctype) = build(&source, options)?;
        if nodes.is_empty() {
            return Err(DocumentError::NoRootElement);
        }
        Ok(Document {
            source,
            nodes,
            root: 0,
            doctype,
        })
    }

    /// Get the root element
    pub fn root_element(&self) -> Element<'_> {
        Element {
            doc: self,
            id: self.root,
        }
    }

    /// Get the DOCTYPE declaration, if any
    pub fn doctype(&self) -> Option<&DoctypeDecl> {
        self.doctype.as_ref()
    }

    /// Get an element by ID
    pub fn element(&self, id: NodeId) -> Option<Element<'_>> {
        self.nodes
            .get(id as usize)
            .map(|_| Element { doc: self, id })
    }

    /// Get total number of element nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// 1-based line number of a byte offset
    pub fn line_of(&self, position: usize) -> usize {
        let end = position.min(self.source.len());
        memchr_iter(b'\n', &self.source.as_bytes()[..end]).count() + 1
    }

    fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id as usize]
    }
}

/// Build the element arena from quick-xml events
fn build(
    source: &str,
    options: ParseOptions,
) -> Result<(Vec<XmlNode>, Option<DoctypeDecl>), DocumentError> {
    let mut reader = Reader::from_str(source);
    {
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = options.strict;
        config.check_comments = options.strict;
    }

    let mut nodes: Vec<XmlNode> = Vec::with_capacity(64);
    let mut stack: Vec<NodeId> = Vec::with_capacity(16);
    let mut namespaces = NamespaceResolver::new();
    let mut doctype = None;
    let mut root_closed = false;

    loop {
        let event = reader.read_event().map_err(|e| DocumentError::Malformed {
            position: reader.buffer_position() as usize,
            message: e.to_string(),
        })?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                if stack.is_empty() && (root_closed || !nodes.is_empty()) {
                    if options.strict {
                        return Err(DocumentError::Malformed {
                            position: end,
                            message: "document has multiple root elements".to_string(),
                        });
                    }
                    // Lenient: ignore trailing roots, keep reading for the DOCTYPE-free tail
                    skip_subtree(&mut reader, empty)?;
                    continue;
                }

                let position = end.saturating_sub(e.len() + 2);
                let id = open_element(e, position, &mut nodes, &stack, &mut namespaces, options)?;
                if empty {
                    namespaces.pop_scope();
                    if stack.is_empty() {
                        root_closed = true;
                    }
                } else {
                    stack.push(id);
                }
            }

            Event::End(_) => {
                if stack.pop().is_some() {
                    namespaces.pop_scope();
                    if stack.is_empty() {
                        root_closed = true;
                    }
                }
            }

            Event::Text(ref t) => {
                if let Some(&top) = stack.last() {
                    let text = match t.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(e) if options.strict => {
                            return Err(DocumentError::Malformed {
                                position: end,
                                message: e.to_string(),
                            })
                        }
                        Err(_) => String::from_utf8_lossy(t).into_owned(),
                    };
                    nodes[top as usize].text.push_str(&text);
                }
            }

            Event::CData(ref c) => {
                if let Some(&top) = stack.last() {
                    nodes[top as usize]
                        .text
                        .push_str(&String::from_utf8_lossy(c));
                }
            }

            Event::DocType(ref t) => {
                doctype = parse_doctype(&String::from_utf8_lossy(t));
            }

            Event::Eof => break,

            _ => {}
        }
    }

    if options.strict && !stack.is_empty() {
        let open = &nodes[*stack.last().unwrap_or(&0) as usize].name;
        return Err(DocumentError::Malformed {
            position: source.len(),
            message: format!("unclosed element <{}>", open),
        });
    }

    Ok((nodes, doctype))
}

/// Append a new element, linking it under the current parent
fn open_element(
    start: &BytesStart<'_>,
    position: usize,
    nodes: &mut Vec<XmlNode>,
    stack: &[NodeId],
    namespaces: &mut NamespaceResolver,
    options: ParseOptions,
) -> Result<NodeId, DocumentError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let parent = stack.last().copied();
    let depth = u16::try_from(stack.len())
        .ok()
        .filter(|depth| *depth < u16::MAX)
        .ok_or_else(|| DocumentError::Malformed {
            position,
            message: format!("element nesting exceeds {} levels", u16::MAX - 1),
        })?;

    let mut raw_attributes = Vec::new();
    let mut attributes = start.attributes();
    attributes.with_checks(options.strict);
    for attr in attributes {
        let attr = attr.map_err(|e| DocumentError::Malformed {
            position,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::Malformed {
                position,
                message: e.to_string(),
            })?
            .into_owned();
        raw_attributes.push((key, value));
    }

    namespaces.push_scope();
    let mut node = XmlNode::element(name, parent, position, depth);

    if options.namespace_aware {
        for (key, value) in &raw_attributes {
            if key == "xmlns" {
                namespaces.declare("", value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                namespaces.declare(prefix, value);
            }
        }
        node.namespace = namespaces.resolve_element(&node.name).map(str::to_string);
    }

    for (key, value) in raw_attributes {
        let is_declaration = key == "xmlns" || key.starts_with("xmlns:");
        if options.namespace_aware && is_declaration {
            continue;
        }
        let namespace = if options.namespace_aware {
            namespaces.resolve_attribute(&key).map(str::to_string)
        } else {
            None
        };
        node.attributes.push(XmlAttribute {
            name: key,
            namespace,
            value,
        });
    }

    let id = NodeId::try_from(nodes.len()).map_err(|_| DocumentError::Malformed {
        position,
        message: "too many elements".to_string(),
    })?;
    nodes.push(node);
    if let Some(parent_id) = parent {
        link_child(nodes, parent_id, id);
    }
    Ok(id)
}

fn link_child(nodes: &mut [XmlNode], parent: NodeId, child: NodeId) {
    match nodes[parent as usize].last_child {
        Some(last) => nodes[last as usize].next_sibling = Some(child),
        None => nodes[parent as usize].first_child = Some(child),
    }
    nodes[parent as usize].last_child = Some(child);
}

/// Consume events up to the end of an element whose start was just read
fn skip_subtree(reader: &mut Reader<&[u8]>, empty: bool) -> Result<(), DocumentError> {
    if empty {
        return Ok(());
    }
    let mut depth = 1usize;
    while depth > 0 {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocumentError::Malformed {
                    position: reader.buffer_position() as usize,
                    message: e.to_string(),
                })
            }
        }
    }
    Ok(())
}

// ============================================================================
// Element handle
// ============================================================================

/// Borrowed handle to one element of a [`Document`]
#[derive(Clone, Copy)]
pub struct Element<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl<'d> Element<'d> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Qualified tag name as written
    pub fn tag_name(&self) -> &'d str {
        &self.doc.node(self.id).name
    }

    /// Tag name without prefix
    pub fn local_name(&self) -> &'d str {
        local_part(self.tag_name())
    }

    /// Namespace URI, `None` for un-namespaced elements
    pub fn namespace_uri(&self) -> Option<&'d str> {
        self.doc.node(self.id).namespace.as_deref()
    }

    /// Attribute value by qualified name
    pub fn attribute(&self, name: &str) -> Option<&'d str> {
        self.attributes()
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by qualified name, empty when absent
    pub fn attribute_or_empty(&self, name: &str) -> &'d str {
        self.attribute(name).unwrap_or("")
    }

    /// Attribute value by namespace URI and local name
    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&'d str> {
        self.attributes()
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name() == local_name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attributes(&self) -> &'d [XmlAttribute] {
        &self.doc.node(self.id).attributes
    }

    /// Character data directly inside this element
    pub fn text(&self) -> &'d str {
        &self.doc.node(self.id).text
    }

    pub fn parent(&self) -> Option<Element<'d>> {
        self.doc
            .node(self.id)
            .parent
            .map(|id| Element { doc: self.doc, id })
    }

    /// Iterate over child elements in document order
    pub fn children(&self) -> ChildIter<'d> {
        ChildIter {
            doc: self.doc,
            next: self.doc.node(self.id).first_child,
        }
    }

    pub fn depth(&self) -> u16 {
        self.doc.node(self.id).depth
    }

    /// 1-based line of the start tag
    pub fn line(&self) -> usize {
        self.doc.line_of(self.doc.node(self.id).position)
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("name", &self.tag_name())
            .field("namespace", &self.namespace_uri())
            .finish()
    }
}

impl fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.tag_name())
    }
}

/// Iterator over child elements
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = Element<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(Element {
            doc: self.doc,
            id: current,
        })
    }
}
