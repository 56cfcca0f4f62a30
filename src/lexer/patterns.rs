//! Lexical terminals.
//!
//! Each terminal is either a literal compared with a prefix test, or a
//! case-insensitive regex anchored at the scan position. The regex engine has
//! no lookaround, so lookahead groups are attached to a pattern separately and
//! tested against the text just after the match.

use lazy_static::lazy_static;
use regex::{Captures, Regex, RegexBuilder};

/// Whitespace inside a line, excluding line terminators.
pub const WS: &str = r"[ \f\t\v\x{a0}\x{1680}\x{180e}\x{2000}-\x{200a}\x{202f}\x{205f}\x{3000}\x{feff}]";

/// Zero-width end of line (or end of input).
pub const EOL: &str = r"(?m:$)";

/// Letters usable in macro and hook names.
pub const ANY_LETTER: &str = r"[\p{L}\p{N}\p{M}_\-]";

/// Variable and property names: word characters, at least one of them not a digit.
pub const NAME: &str = r"[\p{L}\p{N}\p{M}_]*[\p{L}\p{M}_][\p{L}\p{N}\p{M}_]*";

pub const COLOUR_NAMES: &[&str] = &[
    "red", "orange", "yellow", "lime", "green", "cyan", "aqua", "blue", "navy", "purple",
    "fuchsia", "magenta", "white", "black", "grey", "gray", "transparent",
];

pub const DATATYPES: &[&str] = &[
    "array", "boolean", "bool", "changer", "colour", "color", "command", "datamap", "dm",
    "dataset", "ds", "datatype", "gradient", "lambda", "macro", "number", "num", "string",
    "str", "integer", "int", "even", "odd", "empty", "whitespace", "lowercase", "uppercase",
    "newline", "any",
];

pub fn either(alternatives: &[&str]) -> String {
    format!("(?:{})", alternatives.join("|"))
}

pub fn opt(pattern: &str) -> String {
    format!("(?:{})?", pattern)
}

pub fn many(pattern: &str) -> String {
    format!("(?:{})*", pattern)
}

pub fn some(pattern: &str) -> String {
    format!("(?:{})+", pattern)
}

pub fn not_chars(chars: &str) -> String {
    format!("[^{}]", chars)
}

pub fn word(pattern: &str) -> String {
    format!(r"(?:{})\b", pattern)
}

// Literal terminals.
pub const BR: &str = "\n";
pub const HOOK_BACK: &str = "]";
pub const COLLAPSED_FRONT: &str = "{";
pub const COLLAPSED_BACK: &str = "}";
pub const BOLD: &str = "''";
pub const ITALIC: &str = "//";
pub const STRONG: &str = "**";
pub const EM: &str = "*";
pub const STRIKE: &str = "~~";
pub const SUP: &str = "^^";
pub const UNDERLINE: &str = "__";
pub const GROUPING_FRONT: &str = "(";
pub const GROUPING_BACK: &str = ")";
pub const COMMA: &str = ",";
pub const SPREAD: &str = "...";
pub const ADDITION: &str = "+";
pub const SUBTRACTION: &str = "-";
pub const MULTIPLICATION: &str = "*";
pub const DIVISION: &str = "/";
pub const SINGLE_QUOTE: &str = "'";
pub const DOUBLE_QUOTE: &str = "\"";

// Regex terminals that need no assembly.
pub const HOOK_FRONT: &str = r"\[";
pub const COMMENT: &str = r"(?s:<!--.*?-->)";
pub const SCRIPT_STYLE_TAG: &str = r"<(script|style)(?:\s[^>]*)?>";
pub const TAG: &str = r"</?[a-z][\w\-]*(?:\s[^>]*)?/?>";
pub const LEGACY_MACRO: &str = r"<<[^>\s]+(?:[^>]|>[^>])*>>";
pub const VERBATIM: &str = r"`+";
pub const POSSESSIVE: &str = r"'s";
pub const CSS_TIME: &str = r"([0-9]+(?:\.[0-9]+)?|\.[0-9]+)(ms|s)\b";
pub const NUMBER: &str = r"[0-9]+(?:\.[0-9]+)?(?:e[+\-]?[0-9]+)?";
pub const TYPE_SIGNATURE: &str = r"-type\b";
pub const INEQUALITY: &str = r"(?:<=|>=|<|>)";
pub const INCORRECT_OPERATOR: &str = r"(?:=>|=<|==|!=|<>|><|=)";
pub const ESCAPED_STRING_CHAR: &str = r"(?s:\\.)";

lazy_static! {
    pub static ref HR: String = format!("{}-{{3,}}{}{}", many(WS), many(WS), EOL);
    pub static ref HEADING: String = format!("(#{{1,6}}){}({}*)", many(WS), not_chars(r"\n"));
    pub static ref BULLETED: String = format!(r"(\*+){}({}*)", some(WS), not_chars(r"\n"));
    pub static ref NUMBERED: String = format!(r"((?:0\.)+){}({}*)", some(WS), not_chars(r"\n"));
    pub static ref ALIGN: String = format!(
        "{ws}({}){ws}{}",
        either(&["<=+>", "<=+", "=+><=+", "=+>"]),
        EOL,
        ws = many(WS)
    );
    pub static ref COLUMN: String = format!(
        "{ws}({}){ws}{}",
        either(&[r"\|+=+\|*", r"=+\|+"]),
        EOL,
        ws = many(WS)
    );

    pub static ref URL: String = format!(
        "{}:(?://)?{}+",
        either(&["https?", "mailto", "javascript", "ftp", "data"]),
        not_chars(r#"\s<>'"\[\]()"#)
    );
    pub static ref ESCAPED_LINE: String = either(&[r"\\\n", r"\n\\"]);
    pub static ref TWINE_LINK: String = format!(r"\[\[({}+)\]\]", not_chars(r"\]"));
    pub static ref UNCLOSED_HOOK: String =
        format!(r"{}\[=", opt(&format!(r"\|({}+)>", ANY_LETTER)));
    pub static ref HOOK_PREPENDED_FRONT: String = format!(r"\|({}+)>\[", ANY_LETTER);
    pub static ref HOOK_APPENDED_BACK: String = format!(r"\]<({}+)\|", ANY_LETTER);

    pub static ref MACRO_FRONT: String = format!(r"\(({}+):", ANY_LETTER);
    pub static ref VARIABLE: String = format!(r"\$({})", NAME);
    pub static ref TEMP_VARIABLE: String = format!(r"_({})", NAME);
    pub static ref HOOK_NAME: String = format!(r"\?({})", NAME);
    pub static ref PROPERTY: String = format!(r"'s{}({})", some(WS), NAME);
    pub static ref ITS_PROPERTY: String = format!(r"its{}({})", some(WS), NAME);
    pub static ref ITS_OPERATOR: String = word("its");
    pub static ref BELONGING_IT_PROPERTY: String =
        format!(r"({}){ws}of{ws}it\b", NAME, ws = some(WS));
    pub static ref BELONGING_PROPERTY: String = format!(r"({}){}of\b", NAME, some(WS));
    pub static ref BELONGING_OPERATOR: String = word("of");
    pub static ref WHITESPACE: String = some(&either(&[WS, r"\n"]));

    pub static ref COLOUR: String = either(&[
        r"#(?:[0-9a-f]{8}|[0-9a-f]{6}|[0-9a-f]{3,4})\b",
        word(&COLOUR_NAMES.join("|")).as_str(),
    ]);
    pub static ref BOOLEAN: String = word("true|false");
    pub static ref DATATYPE: String = word(&DATATYPES.join("|"));
    pub static ref IDENTIFIER: String = word("it|time|visits|visit|exits|exit");

    pub static ref IS_NOT: String = format!(r"is{}not\b", some(WS));
    pub static ref IS_IN: String = format!(r"is{}in\b", some(WS));
    pub static ref IS_A: String = format!(r"is{}an?\b", some(WS));
    pub static ref IS: String = word("is");
    pub static ref CONTAINS: String = word("contains");
    pub static ref AND: String = word("and");
    pub static ref OR: String = word("or");
    pub static ref NOT: String = word("not");
    pub static ref TO: String = word("to");
    pub static ref INTO: String = word("into");
    pub static ref WHERE: String = word("where");
    pub static ref WHEN: String = word("when");
    pub static ref VIA: String = word("via");
    pub static ref MAKING: String = word("making");
    pub static ref EACH: String = word("each");
    pub static ref BIND: String = word("2?bind");
}

fn compile(source: &str) -> Regex {
    RegexBuilder::new(&format!("^(?:{})", source))
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|error| panic!("invalid lexer pattern {:?}: {}", source, error))
}

/// A lookahead group: the text following a match must (or must not) begin
/// with `regex`.
#[derive(Debug, Clone)]
pub struct Lookahead {
    regex: Regex,
    negated: bool,
}

impl Lookahead {
    fn allows(&self, following: &str) -> bool {
        self.regex.is_match(following) != self.negated
    }
}

#[derive(Debug, Clone)]
pub enum Pattern {
    /// A fixed string, tested with a plain prefix comparison.
    Plain(&'static str),
    Regex {
        regex: Regex,
        lookahead: Option<Lookahead>,
    },
}

impl Pattern {
    pub fn plain(literal: &'static str) -> Pattern {
        Pattern::Plain(literal)
    }

    pub fn regex(source: &str) -> Pattern {
        Pattern::Regex {
            regex: compile(source),
            lookahead: None,
        }
    }

    pub fn followed_by(self, source: &str) -> Pattern {
        self.with_lookahead(source, false)
    }

    pub fn not_followed_by(self, source: &str) -> Pattern {
        self.with_lookahead(source, true)
    }

    fn with_lookahead(self, source: &str, negated: bool) -> Pattern {
        match self {
            Pattern::Plain(literal) => Pattern::Regex {
                regex: compile(&regex::escape(literal)),
                lookahead: Some(Lookahead {
                    regex: compile(source),
                    negated,
                }),
            },
            Pattern::Regex { regex, .. } => Pattern::Regex {
                regex,
                lookahead: Some(Lookahead {
                    regex: compile(source),
                    negated,
                }),
            },
        }
    }

    /// Matches at the very start of `remaining`. Empty matches never count.
    pub fn find<'a>(&self, remaining: &'a str) -> Option<Matched<'a>> {
        match self {
            Pattern::Plain(literal) => {
                if literal.is_empty() || !remaining.starts_with(literal) {
                    return None;
                }

                Some(Matched {
                    captures: None,
                    text: &remaining[..literal.len()],
                    remaining,
                })
            }
            Pattern::Regex { regex, lookahead } => {
                // Rejection is the common case, and is_match is much cheaper than captures.
                if !regex.is_match(remaining) {
                    return None;
                }

                let captures = regex.captures(remaining)?;
                let end = captures.get(0)?.end();
                if end == 0 {
                    return None;
                }

                if let Some(lookahead) = lookahead {
                    if !lookahead.allows(&remaining[end..]) {
                        return None;
                    }
                }

                Some(Matched {
                    text: &remaining[..end],
                    captures: Some(captures),
                    remaining,
                })
            }
        }
    }
}

/// A successful pattern match, handed to a rule's handler.
pub struct Matched<'a> {
    captures: Option<Captures<'a>>,
    text: &'a str,
    remaining: &'a str,
}

impl<'a> Matched<'a> {
    /// The matched text.
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn group(&self, index: usize) -> Option<&'a str> {
        self.captures
            .as_ref()
            .and_then(|captures| captures.get(index))
            .map(|group| group.as_str())
    }

    /// Byte range of a capture group inside the matched text.
    pub fn group_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        self.captures
            .as_ref()
            .and_then(|captures| captures.get(index))
            .map(|group| group.range())
    }

    /// The whole unscanned source from the match position onwards.
    pub fn remaining(&self) -> &'a str {
        self.remaining
    }
}
