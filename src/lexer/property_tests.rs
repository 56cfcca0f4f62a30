//! Property-based tests for the lexer.
//!
//! These tests use `proptest` to check tree invariants over generated passages:
//!
//! 1. **Lossless** - the root's children concatenate back to the source
//! 2. **Ranges nest** - every child lies inside its parent, siblings in order
//! 3. **`token_at` is total** - every offset inside the source finds a token
//! 4. **No open fronts survive** - unmatched fronts end up as text
//! 5. **Deterministic** - lexing the same source twice gives equal trees
//! 6. **Demotion is stable** - text left by an unclosed opener lexes back to
//!    text, with no open fronts and no pair of the opener's kind

use proptest::prelude::*;

use super::{
    lexer::{lex, lex_with_options, LexOptions},
    rules::Mode,
    tokens::{Token, TokenKind},
};

// ============================================================================
// Generators
// ============================================================================

/// Markup-heavy fragments, so generated passages exercise pairing and nesting
/// rather than mostly plain text.
const FRAGMENTS: &[&str] = &[
    "**", "*", "//", "''", "~~", "^^", "__", "[", "]", "[=", "|a>[", "]<a|", "{", "}",
    "(set:", "(if:", "(", ")", "$x", "_y", "?h", "\"", "'", "\\", "`", "``", "[[", "]]",
    "->", "<-", "# ", "* ", "0. ", "---", "<b>", "</b>", "<!--", "-->", "<<", ">>", "\n",
    " ", "is not", "to", "of", "its", "=>", "3", "2s", "red", "#fff", "é", "word",
];

fn passage() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..40)
        .prop_map(|fragments| fragments.concat())
}

/// Openers that are never closed, with the closer that would complete them
/// and the kind the completed pair would have.
const UNCLOSED: &[(&str, &str, TokenKind)] = &[
    ("**", "**", TokenKind::Strong),
    ("//", "//", TokenKind::Italic),
    ("''", "''", TokenKind::Bold),
    ("~~", "~~", TokenKind::Strike),
    ("^^", "^^", TokenKind::Sup),
    ("__", "__", TokenKind::Underline),
    ("[", "]", TokenKind::Hook),
    ("|h>[", "]", TokenKind::Hook),
    ("{", "}", TokenKind::Collapsed),
    ("(a:", ")", TokenKind::Macro),
    ("`", "`", TokenKind::Verbatim),
];

/// A passage of `x`, an opener, then a body with every occurrence of the
/// opener's closer removed.
fn unclosed_passage() -> impl Strategy<Value = (String, &'static str, TokenKind)> {
    (
        prop::sample::select(UNCLOSED),
        prop::collection::vec(prop::sample::select(FRAGMENTS), 0..20),
    )
        .prop_map(|((opener, closer, paired), fragments)| {
            let mut body = fragments.concat();
            while body.contains(closer) {
                body = body.replace(closer, "");
            }
            if opener.ends_with('[') {
                body = body.trim_start_matches('=').to_string();
            }
            (format!("x{}{}", opener, body), opener, paired)
        })
}

const FRONT_KINDS: &[TokenKind] = &[
    TokenKind::HookFront,
    TokenKind::HookPrependedFront,
    TokenKind::CollapsedFront,
    TokenKind::MacroFront,
    TokenKind::GroupingFront,
    TokenKind::VerbatimOpener,
    TokenKind::SingleStringOpener,
    TokenKind::DoubleStringOpener,
];

fn all_tokens(token: &Token) -> Vec<&Token> {
    let mut tokens = vec![token];
    let mut index = 0;
    while index < tokens.len() {
        let current = tokens[index];
        tokens.extend(current.children.iter().map(|child| child.as_ref()));
        index += 1;
    }
    tokens
}

fn proptest_config() -> ProptestConfig {
    let default = ProptestConfig::default();
    ProptestConfig {
        cases: default.cases.max(256),
        ..default
    }
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn lexer_never_panics(input in "\\PC{0,200}") {
        let _tree = lex(&input);
    }

    #[test]
    fn lexing_is_lossless(input in passage()) {
        let tree = lex(&input);

        let text: String = tree.children.iter().map(|child| child.text.as_str()).collect();
        prop_assert_eq!(&text, &input);
        prop_assert_eq!(&tree.text, &input);
    }

    #[test]
    fn macro_mode_is_lossless(input in passage()) {
        let tree = lex_with_options(&input, &LexOptions::default().start_mode(Mode::Macro));

        let text: String = tree.children.iter().map(|child| child.text.as_str()).collect();
        prop_assert_eq!(&text, &input);
    }

    #[test]
    fn children_cover_inner_text(input in passage()) {
        let tree = lex(&input);

        for token in all_tokens(&tree) {
            if token.children.is_empty() {
                continue;
            }
            let text: String = token.children.iter().map(|child| child.text.as_str()).collect();
            prop_assert_eq!(
                &text,
                &token.inner_text,
                "children of {} at {}",
                token.kind,
                token.start
            );
        }
    }

    #[test]
    fn ranges_nest(input in passage()) {
        let tree = lex(&input);

        for token in all_tokens(&tree) {
            prop_assert_eq!(token.end - token.start, token.text.chars().count());

            let mut previous_end = token.start;
            for child in &token.children {
                prop_assert!(
                    child.start >= previous_end,
                    "{} at {} overlaps its sibling",
                    child.kind,
                    child.start
                );
                prop_assert!(
                    child.end <= token.end,
                    "{} at {} leaves its parent",
                    child.kind,
                    child.start
                );
                previous_end = child.end;
            }
        }
    }

    #[test]
    fn token_at_is_total(input in passage()) {
        let tree = lex(&input);

        for offset in 0..input.chars().count() {
            prop_assert!(tree.token_at(offset).is_some(), "nothing at offset {}", offset);
        }
    }

    #[test]
    fn no_open_fronts_survive(input in passage()) {
        let tree = lex(&input);

        for token in all_tokens(&tree) {
            prop_assert!(
                !token.is_one_of(FRONT_KINDS),
                "unmatched {} at {}",
                token.kind,
                token.start
            );
        }
    }

    #[test]
    fn lexing_is_deterministic(input in passage()) {
        prop_assert_eq!(lex(&input), lex(&input));
    }

    #[test]
    fn demoted_openers_lex_back_to_text((input, opener, paired) in unclosed_passage()) {
        let tree = lex(&input);

        let first = &tree.children[0];
        prop_assert_eq!(first.kind, TokenKind::Text);
        let prefix = format!("x{}", opener);
        prop_assert!(first.text.starts_with(&prefix), "first child {:?}", first.text);

        for child in tree.children.iter().filter(|child| child.kind == TokenKind::Text) {
            let relexed = lex(&child.text);
            for token in all_tokens(&relexed) {
                prop_assert!(!token.is_one_of(FRONT_KINDS), "{} in {:?}", token.kind, child.text);
                prop_assert!(token.kind != paired, "{} in {:?}", token.kind, child.text);
            }
        }
    }
}
