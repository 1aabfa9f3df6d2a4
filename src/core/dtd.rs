//! DOCTYPE declarations
//!
//! Only the external identifier matters here: the root element name, and the
//! public/system identifiers that the entity resolver is asked to locate.
//! The internal subset, if any, is skipped. A resolved external subset is
//! only searched for element declarations.

use memchr::memmem;

const ELEMENT_DECL: &str = "<!ELEMENT";

/// Parsed `<!DOCTYPE name PUBLIC "pub" "sys">` / `<!DOCTYPE name SYSTEM "sys">`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctypeDecl {
    pub root_name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl DoctypeDecl {
    /// Whether the declaration references an external subset
    pub fn has_external_subset(&self) -> bool {
        self.system_id.is_some()
    }
}

/// Parse the body of a DOCTYPE declaration.
///
/// Accepts the content with or without the leading `<!DOCTYPE` keyword.
/// Returns `None` when no root name is present.
pub fn parse_doctype(content: &str) -> Option<DoctypeDecl> {
    let mut rest = content.trim();
    rest = rest.strip_prefix("<!").unwrap_or(rest);
    rest = rest.strip_prefix("DOCTYPE").unwrap_or(rest).trim_start();

    let name_end = rest
        .find(|c: char| c.is_whitespace() || c == '[' || c == '>')
        .unwrap_or(rest.len());
    if name_end == 0 {
        return None;
    }
    let root_name = rest[..name_end].to_string();
    rest = rest[name_end..].trim_start();

    let (public_id, system_id) = if let Some(after) = rest.strip_prefix("PUBLIC") {
        let (public_id, after) = quoted(after);
        let (system_id, _) = quoted(after);
        (public_id, system_id)
    } else if let Some(after) = rest.strip_prefix("SYSTEM") {
        (None, quoted(after).0)
    } else {
        (None, None)
    };

    Some(DoctypeDecl {
        root_name,
        public_id,
        system_id,
    })
}

/// Whether a DTD declares an element named `name` (`<!ELEMENT name ...>`)
pub fn declares_element(dtd: &str, name: &str) -> bool {
    memmem::find_iter(dtd.as_bytes(), ELEMENT_DECL.as_bytes()).any(|start| {
        let rest = &dtd[start + ELEMENT_DECL.len()..];
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() {
            return false;
        }
        trimmed
            .strip_prefix(name)
            .and_then(|after| after.chars().next())
            .is_some_and(|c| c.is_whitespace() || c == '(' || c == '>')
    })
}

/// Read one quoted literal, returning it and the remaining text.
fn quoted(input: &str) -> (Option<String>, &str) {
    let input = input.trim_start();
    let Some(quote) = input.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return (None, input);
    };
    let body = &input[1..];
    match body.find(quote) {
        Some(end) => (Some(body[..end].to_string()), &body[end + 1..]),
        None => (None, input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_doctype() {
        let decl = parse_doctype(
            r#"beans PUBLIC "-//SPRING//DTD BEAN 2.0//EN" "https://www.springframework.org/dtd/spring-beans-2.0.dtd""#,
        )
        .unwrap();
        assert_eq!(decl.root_name, "beans");
        assert_eq!(decl.public_id.as_deref(), Some("-//SPRING//DTD BEAN 2.0//EN"));
        assert_eq!(
            decl.system_id.as_deref(),
            Some("https://www.springframework.org/dtd/spring-beans-2.0.dtd")
        );
        assert!(decl.has_external_subset());
    }

    #[test]
    fn test_system_doctype_with_keyword() {
        let decl = parse_doctype("<!DOCTYPE beans SYSTEM 'beans.dtd'").unwrap();
        assert_eq!(decl.root_name, "beans");
        assert_eq!(decl.public_id, None);
        assert_eq!(decl.system_id.as_deref(), Some("beans.dtd"));
    }

    #[test]
    fn test_internal_subset_only() {
        let decl = parse_doctype("beans [ <!ELEMENT beans ANY> ]").unwrap();
        assert_eq!(decl.root_name, "beans");
        assert!(!decl.has_external_subset());
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(parse_doctype("   "), None);
        assert_eq!(parse_doctype("DOCTYPE [ ]"), None);
    }

    #[test]
    fn test_declares_element() {
        let dtd = "<!-- beans -->\n<!ELEMENT beans (description?, bean*)>\n<!ELEMENT\tbean EMPTY>\n<!ELEMENT beansx ANY>";
        assert!(declares_element(dtd, "beans"));
        assert!(declares_element(dtd, "bean"));
        assert!(!declares_element(dtd, "bea"));
        assert!(!declares_element(dtd, "description"));
        assert!(!declares_element("<!ELEMENTbeans ANY>", "beans"));
    }
}
