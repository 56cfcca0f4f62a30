//! Utility macros for the lexer.
//!
//! This module defines helper macros used by the rule table:
//!
//! - `MK_LEXEME!` - Creates a Lexeme consuming exactly the matched text
//! - `MK_DEFAULT_HANDLER!` - Creates a rule handler for simple tokens
//!
//! These macros reduce boilerplate in the rule table.

/// Creates a Lexeme that consumes the matched text, optionally filling in
/// payload fields.
///
/// # Arguments
///
/// * `$matched` - The `Matched` handed to the handler
/// * `$field: $value` - Payload fields to set (each wrapped in `Some`)
///
/// # Example
///
/// ```ignore
/// let lexeme = MK_LEXEME!(matched, depth: 2);
/// ```
#[macro_export]
macro_rules! MK_LEXEME {
    ($matched:expr) => {
        $crate::lexer::rules::Lexeme::new($matched.text().len())
    };
    ($matched:expr, $($field:ident: $value:expr),+ $(,)?) => {
        $crate::lexer::rules::Lexeme {
            fields: $crate::lexer::tokens::Fields {
                $($field: Some($value),)+
                ..Default::default()
            },
            ..$crate::lexer::rules::Lexeme::new($matched.text().len())
        }
    };
}

/// Creates a handler for rules whose token needs at most one payload field.
///
/// # Forms
///
/// * `MK_DEFAULT_HANDLER!()` - no payload
/// * `MK_DEFAULT_HANDLER!(operator: "is not")` - a fixed operator spelling
/// * `MK_DEFAULT_HANDLER!(operator)` - the matched text, lowercased, as the operator
/// * `MK_DEFAULT_HANDLER!(name: 1)` - capture group 1 as the name
///
/// # Example
///
/// ```ignore
/// Rule::new(TokenKind::Comma, Pattern::plain(","), MK_DEFAULT_HANDLER!())
/// ```
#[macro_export]
macro_rules! MK_DEFAULT_HANDLER {
    () => {
        |matched: &$crate::lexer::patterns::Matched<'_>| $crate::MK_LEXEME!(matched)
    };
    (operator: $operator:literal) => {
        |matched: &$crate::lexer::patterns::Matched<'_>| {
            $crate::MK_LEXEME!(matched, operator: String::from($operator))
        }
    };
    (operator) => {
        |matched: &$crate::lexer::patterns::Matched<'_>| {
            $crate::MK_LEXEME!(matched, operator: matched.text().to_lowercase())
        }
    };
    (name: $group:literal) => {
        |matched: &$crate::lexer::patterns::Matched<'_>| {
            $crate::MK_LEXEME!(matched, name: matched.group($group).unwrap_or_default().to_string())
        }
    };
}
