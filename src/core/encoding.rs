//! Document encoding detection and decoding
//!
//! Configuration documents are read as raw bytes. Before anything looks at
//! their text, the byte order mark (or the null-byte pattern of an unmarked
//! UTF-16 document) picks the decoder, and the result is always a UTF-8
//! `String`. Undecodable input is an error, never silently replaced.

use crate::error::DocumentError;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Encodings recognised from the leading bytes of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            // No BOM: '<' next to a null byte gives the byte order away
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }

    /// Whether this encoding uses two-byte code units
    #[inline]
    pub fn is_utf16(self) -> bool {
        !matches!(self, XmlEncoding::Utf8)
    }
}

/// Decode a complete document into UTF-8 text, dropping any byte order mark.
pub fn decode_document(input: Vec<u8>) -> Result<String, DocumentError> {
    match XmlEncoding::detect(&input) {
        XmlEncoding::Utf8 => {
            let bytes = if input.starts_with(&UTF8_BOM) {
                input[UTF8_BOM.len()..].to_vec()
            } else {
                input
            };
            String::from_utf8(bytes)
                .map_err(|e| DocumentError::Encoding(format!("invalid UTF-8: {}", e)))
        }
        XmlEncoding::Utf16Le => decode_utf16(&input, [0xFF, 0xFE], u16::from_le_bytes, "LE"),
        XmlEncoding::Utf16Be => decode_utf16(&input, [0xFE, 0xFF], u16::from_be_bytes, "BE"),
    }
}

fn decode_utf16(
    input: &[u8],
    bom: [u8; 2],
    unit: fn([u8; 2]) -> u16,
    order: &str,
) -> Result<String, DocumentError> {
    let start = if input.starts_with(&bom) { 2 } else { 0 };
    let bytes = &input[start..];

    if bytes.len() % 2 != 0 {
        return Err(DocumentError::Encoding(format!(
            "invalid UTF-16 {}: odd number of bytes",
            order
        )));
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&code_units)
        .map_err(|e| DocumentError::Encoding(format!("invalid UTF-16 {}: {}", order, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8() {
        assert_eq!(XmlEncoding::detect(b"<beans/>"), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::detect(&[0xEF, 0xBB, 0xBF, b'<']), XmlEncoding::Utf8);
    }

    #[test]
    fn test_detect_utf16() {
        assert_eq!(XmlEncoding::detect(&[0xFF, 0xFE, b'<', 0x00]), XmlEncoding::Utf16Le);
        assert_eq!(XmlEncoding::detect(&[0x00, b'<', 0x00, b'b']), XmlEncoding::Utf16Be);
        assert!(XmlEncoding::Utf16Le.is_utf16());
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let text = decode_document(vec![0xEF, 0xBB, 0xBF, b'<', b'a', b'/', b'>']).unwrap();
        assert_eq!(text, "<a/>");
    }

    #[test]
    fn test_decode_utf16_le() {
        let bytes = vec![0xFF, 0xFE, b'<', 0x00, b'a', 0x00, b'/', 0x00, b'>', 0x00];
        assert_eq!(decode_document(bytes).unwrap(), "<a/>");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode_document(vec![b'<', 0xC3, 0x28]).unwrap_err();
        assert!(matches!(err, DocumentError::Encoding(_)));
    }

    #[test]
    fn test_decode_rejects_odd_utf16() {
        let err = decode_document(vec![0xFE, 0xFF, 0x00, b'<', 0x00]).unwrap_err();
        assert!(err.to_string().contains("odd number of bytes"));
    }
}
