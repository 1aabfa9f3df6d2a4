//! Comment-aware line scanning
//!
//! Strips `<!-- ... -->` blocks from lines of XML text while remembering,
//! across calls, whether the scan position is currently inside a comment.
//! Comments routinely span several lines, so the single `in_comment` bit is
//! the only state carried from one line to the next.
//!
//! Token search uses memchr's SIMD-accelerated `memmem` finder.

use std::borrow::Cow;

use memchr::memmem;

/// Block comment opener
pub const COMMENT_OPEN: &str = "<!--";

/// Block comment terminator
pub const COMMENT_CLOSE: &str = "-->";

/// Line scanner that tracks block comments across line boundaries
#[derive(Debug, Default, Clone)]
pub struct CommentScanner {
    in_comment: bool,
}

impl CommentScanner {
    /// Create a scanner positioned outside any comment
    #[inline]
    pub fn new() -> Self {
        CommentScanner { in_comment: false }
    }

    /// Whether the end of the last consumed line was inside a comment
    #[inline]
    pub fn in_comment(&self) -> bool {
        self.in_comment
    }

    /// Return the parts of `line` that lie outside block comments.
    ///
    /// Text before an opener is kept, text between an opener and its
    /// terminator is dropped, and scanning resumes after the terminator until
    /// the line is exhausted. A line that opens a comment without closing it
    /// leaves the scanner inside the comment for the next call.
    pub fn consume_comment_tokens<'a>(&mut self, line: &'a str) -> Cow<'a, str> {
        if !self.in_comment && find(line, COMMENT_OPEN).is_none() {
            return Cow::Borrowed(line);
        }

        let mut kept = String::with_capacity(line.len());
        let mut rest = line;
        loop {
            if self.in_comment {
                match find(rest, COMMENT_CLOSE) {
                    Some(end) => {
                        self.in_comment = false;
                        rest = &rest[end + COMMENT_CLOSE.len()..];
                    }
                    None => break,
                }
            } else {
                match find(rest, COMMENT_OPEN) {
                    Some(start) => {
                        kept.push_str(&rest[..start]);
                        self.in_comment = true;
                        rest = &rest[start + COMMENT_OPEN.len()..];
                    }
                    None => {
                        kept.push_str(rest);
                        break;
                    }
                }
            }
        }
        Cow::Owned(kept)
    }
}

#[inline]
fn find(haystack: &str, needle: &str) -> Option<usize> {
    memmem::find(haystack.as_bytes(), needle.as_bytes())
}
