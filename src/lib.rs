#![allow(clippy::module_inception)]

use std::sync::Arc;

pub mod errors;
pub mod lexer;
pub mod macros;

extern crate regex;

pub use lexer::lexer::{lex, lex_with_options, LexOptions};
pub use lexer::rules::Mode;
pub use lexer::tokens::{Fields, Token, TokenKind};

/// A codepoint offset into a passage, paired with the passage's `place`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position(pub usize, pub Arc<str>);

impl Position {
    pub fn null() -> Self {
        Position(0, Arc::from("<null>"))
    }
}

/// Finds the line containing the codepoint `position` of `content`.
///
/// Returns the 1-based line number, the line's text (including its line break)
/// and the codepoint column inside that line.
pub fn get_line_at_position(content: &str, position: usize) -> Option<(usize, String, usize)> {
    let mut start = 0;
    let mut line_number = 1;

    for line in content.split_inclusive('\n') {
        let end = start + line.chars().count();

        if (start..end).contains(&position) {
            return Some((line_number, line.to_string(), position - start));
        }

        start = end;
        line_number += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    const CONTENT: &str = "Hello, world!\nThis is a test file.\n\nTesting { }\n";

    #[test]
    fn test_get_line_at_position() {
        let (line_number, line, line_pos) = super::get_line_at_position(CONTENT, 10).unwrap();
        assert_eq!(line_number, 1);
        assert_eq!(line, "Hello, world!\n");
        assert_eq!(line_pos, 10);

        let (line_number, line, line_pos) = super::get_line_at_position(CONTENT, 44).unwrap();
        assert_eq!(line_number, 4);
        assert_eq!(line, "Testing { }\n");
        assert_eq!(line_pos, 8);
    }

    #[test]
    fn test_get_line_at_position_counts_codepoints() {
        let (line_number, line, line_pos) = super::get_line_at_position("ça\nvà", 4).unwrap();
        assert_eq!(line_number, 2);
        assert_eq!(line, "và");
        assert_eq!(line_pos, 1);
    }

    #[test]
    fn test_get_line_past_end() {
        assert!(super::get_line_at_position("abc", 3).is_none());
    }
}
