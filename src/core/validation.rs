//! Validation Mode Detection
//!
//! Decides whether a configuration document declares its grammar through a
//! DOCTYPE (DTD validation) or through namespace/schema declarations (XSD
//! validation). The detector reads line by line and stops at the first line
//! carrying real content: a DOCTYPE always precedes the root element, so once
//! a start tag has been seen without one the answer is XSD.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::str::FromStr;

use memchr::memchr_iter;

use super::encoding::{decode_document, XmlEncoding};
use super::scanner::CommentScanner;

const DOCTYPE: &str = "DOCTYPE";

/// Grammar used to validate a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    /// Validation disabled
    None,
    /// Detect from the document content
    Auto,
    /// DOCTYPE / DTD based validation
    Dtd,
    /// XML Schema based validation
    Xsd,
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationMode::None => "none",
            ValidationMode::Auto => "auto",
            ValidationMode::Dtd => "dtd",
            ValidationMode::Xsd => "xsd",
        })
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ValidationMode::None),
            "auto" => Ok(ValidationMode::Auto),
            "dtd" => Ok(ValidationMode::Dtd),
            "xsd" => Ok(ValidationMode::Xsd),
            other => Err(format!("unknown validation mode '{}'", other)),
        }
    }
}

/// Streaming, single-pass classifier for raw document text
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationModeDetector;

impl ValidationModeDetector {
    pub fn new() -> Self {
        ValidationModeDetector
    }

    /// Detect the validation mode of a raw document.
    ///
    /// The reader is consumed and dropped. Text that cannot be decoded yields
    /// [`ValidationMode::Auto`] so the caller can decide; only genuine read
    /// failures are returned as errors.
    pub fn detect<R: Read>(&self, input: R) -> io::Result<ValidationMode> {
        let mut reader = BufReader::new(input);
        let utf16 = XmlEncoding::detect(reader.fill_buf()?).is_utf16();

        let mut scanner = CommentScanner::new();

        if utf16 {
            // Two-byte code units cannot be split on '\n' bytes; decode whole.
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            let text = match decode_document(bytes) {
                Ok(text) => text,
                Err(_) => return Ok(ValidationMode::Auto),
            };
            for line in text.lines() {
                if let Some(mode) = classify_line(&mut scanner, line) {
                    return Ok(mode);
                }
            }
            return Ok(ValidationMode::Xsd);
        }

        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(ValidationMode::Xsd);
            }
            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(['\r', '\n']),
                Err(_) => return Ok(ValidationMode::Auto),
            };
            if let Some(mode) = classify_line(&mut scanner, line) {
                return Ok(mode);
            }
        }
    }

    /// Convenience wrapper over [`detect`](Self::detect) for in-memory text.
    pub fn detect_bytes(&self, input: &[u8]) -> ValidationMode {
        // Reading from a slice cannot fail
        self.detect(input).unwrap_or(ValidationMode::Auto)
    }
}

/// Classify one line, or `None` when the line carries no decision.
/// A line that ends inside a comment is skipped whole.
fn classify_line(scanner: &mut CommentScanner, line: &str) -> Option<ValidationMode> {
    let content = scanner.consume_comment_tokens(line);
    if scanner.in_comment() || content.trim().is_empty() {
        return None;
    }
    if content.contains(DOCTYPE) {
        return Some(ValidationMode::Dtd);
    }
    if has_opening_tag(&content) {
        return Some(ValidationMode::Xsd);
    }
    None
}

/// A '<' directly followed by a letter starts an element; '<?' and '<!' do not.
fn has_opening_tag(content: &str) -> bool {
    memchr_iter(b'<', content.as_bytes()).any(|i| {
        content[i + 1..]
            .chars()
            .next()
            .is_some_and(char::is_alphabetic)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> ValidationMode {
        ValidationModeDetector::new().detect_bytes(text.as_bytes())
    }

    #[test]
    fn test_comment_then_declaration_then_root_is_xsd() {
        assert_eq!(detect("<!-- c --><?xml?><beans>"), ValidationMode::Xsd);
    }

    #[test]
    fn test_doctype_is_dtd() {
        let doc = "<?xml version=\"1.0\"?>\n\
                   <!DOCTYPE beans PUBLIC \"-//SPRING//DTD BEAN//EN\" \"https://www.springframework.org/dtd/spring-beans.dtd\">\n\
                   <beans/>\n";
        assert_eq!(detect(doc), ValidationMode::Dtd);
    }

    #[test]
    fn test_comment_spanning_lines_then_root() {
        assert_eq!(detect("<!-- unterminated\nstill comment --><beans>"), ValidationMode::Xsd);
    }

    #[test]
    fn test_doctype_inside_comment_ignored() {
        let doc = "<!--\n<!DOCTYPE beans>\n-->\n<beans xmlns=\"urn:x\"/>\n";
        assert_eq!(detect(doc), ValidationMode::Xsd);
    }

    #[test]
    fn test_line_ending_inside_comment_skipped() {
        assert_eq!(detect("<!DOCTYPE beans> <!-- note\n-->\n<beans/>\n"), ValidationMode::Xsd);
        assert_eq!(detect("<beans> <!-- open\n-->\n<!DOCTYPE beans>\n"), ValidationMode::Dtd);
    }

    #[test]
    fn test_doctype_after_root_not_seen() {
        let doc = "<beans>\n<!DOCTYPE beans>\n</beans>\n";
        assert_eq!(detect(doc), ValidationMode::Xsd);
    }

    #[test]
    fn test_empty_document_defaults_to_xsd() {
        assert_eq!(detect(""), ValidationMode::Xsd);
        assert_eq!(detect("\n   \n<!-- only a comment -->\n"), ValidationMode::Xsd);
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(detect("<?xml version=\"1.0\"?>\r\n<!DOCTYPE beans>\r\n"), ValidationMode::Dtd);
    }

    #[test]
    fn test_invalid_utf8_is_auto() {
        let bytes = [b'<', b'?', b'x', b'\n', 0xFF, 0xFE, 0xFD, b'\n'];
        assert_eq!(ValidationModeDetector::new().detect_bytes(&bytes), ValidationMode::Auto);
    }

    #[test]
    fn test_utf16_document() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<!DOCTYPE beans>\n<beans/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(ValidationModeDetector::new().detect_bytes(&bytes), ValidationMode::Dtd);
    }

    #[test]
    fn test_opening_tag_requires_letter() {
        assert!(has_opening_tag("<beans>"));
        assert!(has_opening_tag("<?xml?><beans>"));
        assert!(!has_opening_tag("<?xml version=\"1.0\"?>"));
        assert!(!has_opening_tag("a < 1"));
        assert!(!has_opening_tag("<"));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("DTD".parse::<ValidationMode>(), Ok(ValidationMode::Dtd));
        assert_eq!(ValidationMode::Xsd.to_string(), "xsd");
        assert!("schema".parse::<ValidationMode>().is_err());
    }
}
