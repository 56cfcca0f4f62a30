//! The rule table and the modes that group rules together.
//!
//! Rules are registered once through a `RuleBuilder` (see
//! `create_rule_lookups`) and frozen into the process-wide `RULES` registry.
//! Within a mode, rules are tried in registration order.

use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::HashMap, fmt::Display, ops::Range, str::FromStr};

use crate::{
    errors::errors::{Error, ErrorImpl},
    MK_DEFAULT_HANDLER, MK_LEXEME, Position,
};

use super::{
    patterns::{self, Matched, Pattern},
    tokens::{Fields, Token, TokenKind},
};

lazy_static! {
    pub static ref RULES: Rules = Rules::build();

    pub static ref COLOUR_LOOKUP: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("red", "#e61919");
        map.insert("orange", "#e68019");
        map.insert("yellow", "#e5e619");
        map.insert("lime", "#80e619");
        map.insert("green", "#19e619");
        map.insert("cyan", "#19e5e6");
        map.insert("aqua", "#19e5e6");
        map.insert("blue", "#197fe6");
        map.insert("navy", "#1919e6");
        map.insert("purple", "#7f19e6");
        map.insert("fuchsia", "#e619e5");
        map.insert("magenta", "#e619e5");
        map.insert("white", "#ffffff");
        map.insert("black", "#000000");
        map.insert("grey", "#888888");
        map.insert("gray", "#888888");
        map.insert("transparent", "transparent");
        map
    };

    static ref SCRIPT_CLOSER: Regex =
        Regex::new(r"(?i)</script\s*>").expect("valid closing tag pattern");
    static ref STYLE_CLOSER: Regex =
        Regex::new(r"(?i)</style\s*>").expect("valid closing tag pattern");
}

/// A named group of rules that are live together.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Mode {
    /// Passage prose: block and inline markup.
    Start,
    /// The inside of a macro call or parenthesised group.
    Macro,
    /// The inside of a string literal.
    String,
    /// The inside of a verbatim span, where only verbatim delimiters are live.
    Verbatim,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Start => "start",
            Mode::Macro => "macro",
            Mode::String => "string",
            Mode::Verbatim => "verbatim",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "start" => Ok(Mode::Start),
            "macro" => Ok(Mode::Macro),
            "string" => Ok(Mode::String),
            "verbatim" => Ok(Mode::Verbatim),
            _ => Err(Error::new(
                ErrorImpl::UnknownMode {
                    name: name.to_string(),
                },
                Position::null(),
            )),
        }
    }
}

/// What a handler produced from a match.
///
/// `length` may exceed the matched text when the handler consumes trailing
/// source itself. `inner` is the byte range, within the consumed text, that
/// gets lexed into the token's children.
#[derive(Debug, Clone, Default)]
pub struct Lexeme {
    pub length: usize,
    pub inner: Option<Range<usize>>,
    pub arity: usize,
    pub fields: Fields,
    pub error: Option<ErrorImpl>,
}

impl Lexeme {
    pub fn new(length: usize) -> Lexeme {
        Lexeme {
            length,
            ..Default::default()
        }
    }

    fn with_inner(mut self, inner: Range<usize>) -> Lexeme {
        if !inner.is_empty() {
            self.inner = Some(inner);
        }
        self
    }
}

/// What precedes the scan position, as seen by a rule's constraint.
#[derive(Debug, Clone, Copy)]
pub enum Preceding<'a> {
    /// Nothing has been scanned and this is the start of a line.
    StartOfLine,
    /// Nothing has been scanned, but the text continues a line (such as a
    /// heading's contents).
    MidLine,
    Token(&'a Token),
}

pub type RuleHandler = fn(&Matched<'_>) -> Lexeme;
pub type Constraint = fn(Preceding<'_>) -> bool;

#[derive(Clone)]
pub struct Rule {
    pub kind: TokenKind,
    pub pattern: Pattern,
    pub handler: RuleHandler,
    pub constraint: Option<Constraint>,
    pub cannot_follow_text: bool,
    /// Whether a token of this rule may open a pair.
    pub front: bool,
    /// Front kind -> resolved kind, for rules that close a pair.
    pub matches: &'static [(TokenKind, TokenKind)],
    /// Open fronts (by kind or alias) that a closer may not search past.
    pub cannot_cross: &'static [TokenKind],
    /// The mode live inside this token: while it is the innermost open
    /// front, and when lexing its inner text.
    pub inner_mode: Option<Mode>,
    /// Secondary kind used when other rules test `cannot_cross`.
    pub aka: Option<TokenKind>,
    /// A literal every match must contain after its start. Once it no longer
    /// occurs in the rest of the source, the rule is skipped without running
    /// its pattern.
    pub closer: Option<&'static str>,
}

impl Rule {
    pub fn new(kind: TokenKind, pattern: Pattern, handler: RuleHandler) -> Rule {
        Rule {
            kind,
            pattern,
            handler,
            constraint: None,
            cannot_follow_text: false,
            front: false,
            matches: &[],
            cannot_cross: &[],
            inner_mode: None,
            aka: None,
            closer: None,
        }
    }

    pub fn front(mut self, inner_mode: Mode) -> Rule {
        self.front = true;
        self.inner_mode = Some(inner_mode);
        self
    }

    pub fn inner(mut self, inner_mode: Mode) -> Rule {
        self.inner_mode = Some(inner_mode);
        self
    }

    pub fn matches(mut self, matches: &'static [(TokenKind, TokenKind)]) -> Rule {
        self.matches = matches;
        self
    }

    pub fn cannot_cross(mut self, kinds: &'static [TokenKind]) -> Rule {
        self.cannot_cross = kinds;
        self
    }

    pub fn aka(mut self, kind: TokenKind) -> Rule {
        self.aka = Some(kind);
        self
    }

    pub fn closer(mut self, closer: &'static str) -> Rule {
        self.closer = Some(closer);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Rule {
        self.constraint = Some(constraint);
        self
    }

    pub fn cannot_follow_text(mut self) -> Rule {
        self.cannot_follow_text = true;
        self
    }

    /// The resolved kind if an open front of `kind`/`arity` (or its alias)
    /// closes with this rule.
    pub fn resolves(
        &self,
        kind: TokenKind,
        aka: Option<TokenKind>,
        arity: usize,
        own_arity: usize,
    ) -> Option<TokenKind> {
        if arity != own_arity {
            return None;
        }

        self.matches
            .iter()
            .find(|(front, _)| *front == kind || Some(*front) == aka)
            .map(|(_, resolved)| *resolved)
    }

    pub fn cannot_cross_kind(&self, kind: TokenKind, aka: Option<TokenKind>) -> bool {
        self.cannot_cross.contains(&kind)
            || aka.map_or(false, |aka| self.cannot_cross.contains(&aka))
    }
}

/// The frozen rule registry: the rules of each mode, in the order they are tried.
pub struct Rules {
    modes: HashMap<Mode, Vec<Rule>>,
}

impl Rules {
    pub fn build() -> Rules {
        let mut builder = RuleBuilder::new();
        create_rule_lookups(&mut builder);
        builder.build()
    }

    pub fn rules_for(&self, mode: Mode) -> &[Rule] {
        self.modes.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct RuleBuilder {
    modes: HashMap<Mode, Vec<Rule>>,
}

impl RuleBuilder {
    pub fn new() -> RuleBuilder {
        RuleBuilder {
            modes: HashMap::new(),
        }
    }

    pub fn add(&mut self, modes: &[Mode], rule: Rule) {
        for mode in modes {
            self.modes.entry(*mode).or_default().push(rule.clone());
        }
    }

    /// Block rules live in start mode and may only begin a line.
    pub fn block(&mut self, rule: Rule) {
        self.add(&[Mode::Start], rule.constraint(at_line_start).cannot_follow_text());
    }

    pub fn inline(&mut self, rule: Rule) {
        self.add(&[Mode::Start], rule);
    }

    pub fn expression(&mut self, rule: Rule) {
        self.add(&[Mode::Macro], rule);
    }

    /// Rules live both in prose and inside expressions.
    pub fn shared(&mut self, rule: Rule) {
        self.add(&[Mode::Start, Mode::Macro], rule);
    }

    pub fn string(&mut self, rule: Rule) {
        self.add(&[Mode::String], rule);
    }

    pub fn verbatim(&mut self, rule: Rule) {
        self.add(&[Mode::Start, Mode::Verbatim], rule);
    }

    pub fn build(self) -> Rules {
        Rules { modes: self.modes }
    }
}

impl Default for RuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn at_line_start(preceding: Preceding<'_>) -> bool {
    match preceding {
        Preceding::StartOfLine => true,
        Preceding::MidLine => false,
        Preceding::Token(token) => token.kind == TokenKind::Br || token.kind.is_block(),
    }
}

const STRING_OPENERS: &[TokenKind] =
    &[TokenKind::SingleStringOpener, TokenKind::DoubleStringOpener];

const EMPHASIS_CANNOT_CROSS: &[TokenKind] = &[
    TokenKind::HookFront,
    TokenKind::HookPrependedFront,
    TokenKind::CollapsedFront,
    TokenKind::MacroFront,
    TokenKind::GroupingFront,
    TokenKind::SingleStringOpener,
    TokenKind::DoubleStringOpener,
    TokenKind::Verbatim,
];

const HOOK_CANNOT_CROSS: &[TokenKind] = &[
    TokenKind::MacroFront,
    TokenKind::GroupingFront,
    TokenKind::SingleStringOpener,
    TokenKind::DoubleStringOpener,
    TokenKind::Verbatim,
];

const GROUPING_CANNOT_CROSS: &[TokenKind] = &[
    TokenKind::HookFront,
    TokenKind::HookPrependedFront,
    TokenKind::CollapsedFront,
    TokenKind::SingleStringOpener,
    TokenKind::DoubleStringOpener,
    TokenKind::Verbatim,
];

pub fn create_rule_lookups(builder: &mut RuleBuilder) {
    // Block
    builder.block(Rule::new(TokenKind::Hr, Pattern::regex(&patterns::HR), MK_DEFAULT_HANDLER!()));
    builder.block(
        Rule::new(TokenKind::Heading, Pattern::regex(&patterns::HEADING), heading_handler)
            .inner(Mode::Start),
    );
    builder.block(
        Rule::new(TokenKind::Bulleted, Pattern::regex(&patterns::BULLETED), bulleted_handler)
            .inner(Mode::Start),
    );
    builder.block(
        Rule::new(TokenKind::Numbered, Pattern::regex(&patterns::NUMBERED), numbered_handler)
            .inner(Mode::Start),
    );
    builder.block(Rule::new(TokenKind::Align, Pattern::regex(&patterns::ALIGN), align_handler));
    builder.block(Rule::new(TokenKind::Column, Pattern::regex(&patterns::COLUMN), column_handler));

    // Inline
    builder.inline(
        Rule::new(TokenKind::Comment, Pattern::regex(patterns::COMMENT), MK_DEFAULT_HANDLER!())
            .closer("-->"),
    );
    builder.inline(
        Rule::new(
            TokenKind::ScriptStyleTag,
            Pattern::regex(patterns::SCRIPT_STYLE_TAG),
            script_style_handler,
        )
        .closer(">"),
    );
    builder.inline(
        Rule::new(TokenKind::Tag, Pattern::regex(patterns::TAG), MK_DEFAULT_HANDLER!())
            .closer(">"),
    );
    builder.inline(Rule::new(
        TokenKind::Url,
        Pattern::regex(&patterns::URL),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.inline(Rule::new(
        TokenKind::EscapedLine,
        Pattern::regex(&patterns::ESCAPED_LINE),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.inline(Rule::new(TokenKind::Br, Pattern::plain(patterns::BR), MK_DEFAULT_HANDLER!()));
    builder.inline(legacy_macro());
    builder.verbatim(
        Rule::new(TokenKind::VerbatimOpener, Pattern::regex(patterns::VERBATIM), verbatim_handler)
            .front(Mode::Verbatim)
            .matches(&[(TokenKind::VerbatimOpener, TokenKind::Verbatim)])
            .aka(TokenKind::Verbatim),
    );
    builder.shared(
        Rule::new(TokenKind::TwineLink, Pattern::regex(&patterns::TWINE_LINK), twine_link_handler)
            .inner(Mode::Start)
            .closer("]]"),
    );
    builder.inline(Rule::new(
        TokenKind::UnclosedHook,
        Pattern::regex(&patterns::UNCLOSED_HOOK),
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.inline(
        Rule::new(
            TokenKind::HookPrependedFront,
            Pattern::regex(&patterns::HOOK_PREPENDED_FRONT),
            MK_DEFAULT_HANDLER!(name: 1),
        )
        .front(Mode::Start),
    );
    builder.shared(
        Rule::new(
            TokenKind::HookFront,
            Pattern::regex(patterns::HOOK_FRONT).not_followed_by("="),
            MK_DEFAULT_HANDLER!(),
        )
        .front(Mode::Start),
    );
    builder.inline(
        Rule::new(
            TokenKind::HookAppendedBack,
            Pattern::regex(&patterns::HOOK_APPENDED_BACK),
            MK_DEFAULT_HANDLER!(name: 1),
        )
        .matches(&[(TokenKind::HookFront, TokenKind::Hook)])
        .cannot_cross(HOOK_CANNOT_CROSS),
    );
    builder.shared(
        Rule::new(TokenKind::HookBack, Pattern::plain(patterns::HOOK_BACK), MK_DEFAULT_HANDLER!())
            .matches(&[
                (TokenKind::HookFront, TokenKind::Hook),
                (TokenKind::HookPrependedFront, TokenKind::Hook),
            ])
            .cannot_cross(HOOK_CANNOT_CROSS),
    );
    builder.inline(
        Rule::new(
            TokenKind::CollapsedFront,
            Pattern::plain(patterns::COLLAPSED_FRONT),
            MK_DEFAULT_HANDLER!(),
        )
        .front(Mode::Start),
    );
    builder.inline(
        Rule::new(
            TokenKind::CollapsedBack,
            Pattern::plain(patterns::COLLAPSED_BACK),
            MK_DEFAULT_HANDLER!(),
        )
        .matches(&[(TokenKind::CollapsedFront, TokenKind::Collapsed)])
        .cannot_cross(HOOK_CANNOT_CROSS),
    );
    builder.inline(emphasis(
        TokenKind::Bold,
        patterns::BOLD,
        &[(TokenKind::Bold, TokenKind::Bold)],
    ));
    builder.inline(emphasis(
        TokenKind::Italic,
        patterns::ITALIC,
        &[(TokenKind::Italic, TokenKind::Italic)],
    ));
    builder.inline(emphasis(
        TokenKind::Strong,
        patterns::STRONG,
        &[(TokenKind::Strong, TokenKind::Strong)],
    ));
    builder.inline(emphasis(TokenKind::Em, patterns::EM, &[(TokenKind::Em, TokenKind::Em)]));
    builder.inline(emphasis(
        TokenKind::Strike,
        patterns::STRIKE,
        &[(TokenKind::Strike, TokenKind::Strike)],
    ));
    builder.inline(emphasis(TokenKind::Sup, patterns::SUP, &[(TokenKind::Sup, TokenKind::Sup)]));
    builder.inline(emphasis(
        TokenKind::Underline,
        patterns::UNDERLINE,
        &[(TokenKind::Underline, TokenKind::Underline)],
    ));

    // Expressions
    builder.expression(Rule::new(
        TokenKind::Whitespace,
        Pattern::regex(&patterns::WHITESPACE),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.expression(legacy_macro());
    builder.shared(
        Rule::new(
            TokenKind::MacroFront,
            Pattern::regex(&patterns::MACRO_FRONT),
            MK_DEFAULT_HANDLER!(name: 1),
        )
        .front(Mode::Macro),
    );
    builder.expression(
        Rule::new(
            TokenKind::GroupingFront,
            Pattern::plain(patterns::GROUPING_FRONT),
            MK_DEFAULT_HANDLER!(),
        )
        .front(Mode::Macro),
    );
    builder.expression(
        Rule::new(
            TokenKind::GroupingBack,
            Pattern::plain(patterns::GROUPING_BACK),
            MK_DEFAULT_HANDLER!(),
        )
        .matches(&[
            (TokenKind::MacroFront, TokenKind::Macro),
            (TokenKind::GroupingFront, TokenKind::Grouping),
        ])
        .cannot_cross(GROUPING_CANNOT_CROSS),
    );
    builder.expression(Rule::new(
        TokenKind::Comma,
        Pattern::plain(patterns::COMMA),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.expression(Rule::new(
        TokenKind::Spread,
        Pattern::plain(patterns::SPREAD),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.expression(Rule::new(
        TokenKind::TypeSignature,
        Pattern::regex(patterns::TYPE_SIGNATURE),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.expression(Rule::new(
        TokenKind::Property,
        Pattern::regex(&patterns::PROPERTY),
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.expression(Rule::new(
        TokenKind::PossessiveOperator,
        Pattern::regex(patterns::POSSESSIVE).followed_by(patterns::WS),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.shared(Rule::new(
        TokenKind::Variable,
        Pattern::regex(&patterns::VARIABLE),
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.expression(Rule::new(
        TokenKind::TempVariable,
        Pattern::regex(&patterns::TEMP_VARIABLE),
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.expression(Rule::new(
        TokenKind::HookName,
        Pattern::regex(&patterns::HOOK_NAME),
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.expression(word_rule(
        TokenKind::ItsProperty,
        &patterns::ITS_PROPERTY,
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.expression(word_rule(
        TokenKind::ItsOperator,
        &patterns::ITS_OPERATOR,
        MK_DEFAULT_HANDLER!(),
    ));
    builder.expression(word_rule(
        TokenKind::BelongingItProperty,
        &patterns::BELONGING_IT_PROPERTY,
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.expression(word_rule(
        TokenKind::BelongingProperty,
        &patterns::BELONGING_PROPERTY,
        MK_DEFAULT_HANDLER!(name: 1),
    ));
    builder.expression(word_rule(
        TokenKind::BelongingOperator,
        &patterns::BELONGING_OPERATOR,
        MK_DEFAULT_HANDLER!(),
    ));
    builder.expression(word_rule(TokenKind::Bind, &patterns::BIND, MK_DEFAULT_HANDLER!(operator)));
    builder.expression(word_rule(TokenKind::CssTime, patterns::CSS_TIME, css_time_handler));
    builder.expression(word_rule(TokenKind::Number, patterns::NUMBER, number_handler));
    builder.expression(word_rule(TokenKind::Colour, &patterns::COLOUR, colour_handler));
    builder.expression(word_rule(TokenKind::Boolean, &patterns::BOOLEAN, lowercase_name_handler));
    builder.expression(word_rule(TokenKind::Datatype, &patterns::DATATYPE, lowercase_name_handler));
    builder.expression(word_rule(
        TokenKind::Identifier,
        &patterns::IDENTIFIER,
        lowercase_name_handler,
    ));
    builder.expression(word_rule(
        TokenKind::IsNot,
        &patterns::IS_NOT,
        MK_DEFAULT_HANDLER!(operator: "is not"),
    ));
    builder.expression(word_rule(
        TokenKind::IsIn,
        &patterns::IS_IN,
        MK_DEFAULT_HANDLER!(operator: "is in"),
    ));
    builder.expression(word_rule(
        TokenKind::IsA,
        &patterns::IS_A,
        MK_DEFAULT_HANDLER!(operator: "is a"),
    ));
    builder.expression(word_rule(
        TokenKind::Is,
        &patterns::IS,
        MK_DEFAULT_HANDLER!(operator: "is"),
    ));
    builder.expression(word_rule(
        TokenKind::Contains,
        &patterns::CONTAINS,
        MK_DEFAULT_HANDLER!(operator: "contains"),
    ));
    builder.expression(word_rule(
        TokenKind::And,
        &patterns::AND,
        MK_DEFAULT_HANDLER!(operator: "and"),
    ));
    builder.expression(word_rule(
        TokenKind::Or,
        &patterns::OR,
        MK_DEFAULT_HANDLER!(operator: "or"),
    ));
    builder.expression(word_rule(
        TokenKind::Not,
        &patterns::NOT,
        MK_DEFAULT_HANDLER!(operator: "not"),
    ));
    builder.expression(word_rule(
        TokenKind::Into,
        &patterns::INTO,
        MK_DEFAULT_HANDLER!(operator: "into"),
    ));
    builder.expression(word_rule(
        TokenKind::To,
        &patterns::TO,
        MK_DEFAULT_HANDLER!(operator: "to"),
    ));
    builder.expression(word_rule(
        TokenKind::Where,
        &patterns::WHERE,
        MK_DEFAULT_HANDLER!(operator: "where"),
    ));
    builder.expression(word_rule(
        TokenKind::When,
        &patterns::WHEN,
        MK_DEFAULT_HANDLER!(operator: "when"),
    ));
    builder.expression(word_rule(
        TokenKind::Via,
        &patterns::VIA,
        MK_DEFAULT_HANDLER!(operator: "via"),
    ));
    builder.expression(word_rule(
        TokenKind::Making,
        &patterns::MAKING,
        MK_DEFAULT_HANDLER!(operator: "making"),
    ));
    builder.expression(word_rule(
        TokenKind::Each,
        &patterns::EACH,
        MK_DEFAULT_HANDLER!(operator: "each"),
    ));
    builder.expression(Rule::new(
        TokenKind::Error,
        Pattern::regex(patterns::INCORRECT_OPERATOR),
        incorrect_operator_handler,
    ));
    builder.expression(Rule::new(
        TokenKind::Inequality,
        Pattern::regex(patterns::INEQUALITY),
        MK_DEFAULT_HANDLER!(operator),
    ));
    builder.expression(operator_rule(
        TokenKind::Addition,
        patterns::ADDITION,
        MK_DEFAULT_HANDLER!(operator: "+"),
    ));
    builder.expression(operator_rule(
        TokenKind::Subtraction,
        patterns::SUBTRACTION,
        MK_DEFAULT_HANDLER!(operator: "-"),
    ));
    builder.expression(operator_rule(
        TokenKind::Multiplication,
        patterns::MULTIPLICATION,
        MK_DEFAULT_HANDLER!(operator: "*"),
    ));
    builder.expression(operator_rule(
        TokenKind::Division,
        patterns::DIVISION,
        MK_DEFAULT_HANDLER!(operator: "/"),
    ));
    builder.expression(
        Rule::new(
            TokenKind::SingleStringOpener,
            Pattern::plain(patterns::SINGLE_QUOTE),
            MK_DEFAULT_HANDLER!(),
        )
        .front(Mode::String),
    );
    builder.expression(
        Rule::new(
            TokenKind::DoubleStringOpener,
            Pattern::plain(patterns::DOUBLE_QUOTE),
            MK_DEFAULT_HANDLER!(),
        )
        .front(Mode::String),
    );

    // String interiors
    builder.string(Rule::new(
        TokenKind::EscapedStringChar,
        Pattern::regex(patterns::ESCAPED_STRING_CHAR),
        MK_DEFAULT_HANDLER!(),
    ));
    builder.string(
        Rule::new(
            TokenKind::SingleStringCloser,
            Pattern::plain(patterns::SINGLE_QUOTE),
            MK_DEFAULT_HANDLER!(),
        )
        .matches(&[(TokenKind::SingleStringOpener, TokenKind::String)])
        .cannot_cross(STRING_OPENERS),
    );
    builder.string(
        Rule::new(
            TokenKind::DoubleStringCloser,
            Pattern::plain(patterns::DOUBLE_QUOTE),
            MK_DEFAULT_HANDLER!(),
        )
        .matches(&[(TokenKind::DoubleStringOpener, TokenKind::String)])
        .cannot_cross(STRING_OPENERS),
    );
}

/// `<<name ...>>` calls from other story formats become error tokens.
fn legacy_macro() -> Rule {
    Rule::new(TokenKind::Error, Pattern::regex(patterns::LEGACY_MACRO), legacy_macro_handler)
        .closer(">>")
}

fn operator_rule(kind: TokenKind, literal: &'static str, handler: RuleHandler) -> Rule {
    Rule::new(kind, Pattern::plain(literal), handler)
}

/// A symmetric emphasis marker: the same token opens and closes the pair.
fn emphasis(
    kind: TokenKind,
    literal: &'static str,
    matches: &'static [(TokenKind, TokenKind)],
) -> Rule {
    Rule::new(kind, Pattern::plain(literal), MK_DEFAULT_HANDLER!())
        .front(Mode::Start)
        .matches(matches)
        .cannot_cross(EMPHASIS_CANNOT_CROSS)
}

/// Keyword-like rules must not start in the middle of a word.
fn word_rule(kind: TokenKind, source: &str, handler: RuleHandler) -> Rule {
    Rule::new(kind, Pattern::regex(source), handler).cannot_follow_text()
}

fn heading_handler(matched: &Matched<'_>) -> Lexeme {
    let depth = matched.group(1).map_or(0, str::len);
    let inner = matched.group_range(2).unwrap_or_default();
    MK_LEXEME!(matched, depth: depth).with_inner(inner)
}

fn bulleted_handler(matched: &Matched<'_>) -> Lexeme {
    let depth = matched.group(1).map_or(0, str::len);
    let inner = matched.group_range(2).unwrap_or_default();
    MK_LEXEME!(matched, depth: depth).with_inner(inner)
}

fn numbered_handler(matched: &Matched<'_>) -> Lexeme {
    let depth = matched.group(1).map_or(0, |markers| markers.len() / 2);
    let inner = matched.group_range(2).unwrap_or_default();
    MK_LEXEME!(matched, depth: depth).with_inner(inner)
}

fn align_handler(matched: &Matched<'_>) -> Lexeme {
    let arrow = matched.group(1).unwrap_or_default();
    let align = if arrow.starts_with('<') && arrow.ends_with('>') {
        "justify"
    } else if arrow.starts_with('<') {
        "left"
    } else if arrow.contains("><") {
        "center"
    } else {
        "right"
    };
    MK_LEXEME!(matched, align: align.to_string())
}

fn column_handler(matched: &Matched<'_>) -> Lexeme {
    let marker = matched.group(1).unwrap_or_default();
    let left = marker.chars().take_while(|c| *c == '|').count();
    let right = marker.chars().rev().take_while(|c| *c == '|').count();
    let column = match (left > 0, right > 0) {
        (true, true) => "center",
        (true, false) => "left",
        _ => "right",
    };
    MK_LEXEME!(matched, column: column.to_string(), width: left + right)
}

/// Script and style elements swallow everything up to their closing tag.
fn script_style_handler(matched: &Matched<'_>) -> Lexeme {
    let opening = matched.text().len();
    let rest = &matched.remaining()[opening..];
    let closer: &Regex = match matched.group(1).map(str::to_lowercase).as_deref() {
        Some("style") => &*STYLE_CLOSER,
        _ => &*SCRIPT_CLOSER,
    };
    let length = closer.find(rest).map_or(matched.remaining().len(), |close| opening + close.end());
    Lexeme::new(length)
}

fn legacy_macro_handler(matched: &Matched<'_>) -> Lexeme {
    error_lexeme(
        matched,
        ErrorImpl::LegacyMacroCall {
            call: matched.text().to_string(),
        },
    )
}

fn incorrect_operator_handler(matched: &Matched<'_>) -> Lexeme {
    error_lexeme(
        matched,
        ErrorImpl::IncorrectOperator {
            operator: matched.text().to_string(),
        },
    )
}

fn error_lexeme(matched: &Matched<'_>, error: ErrorImpl) -> Lexeme {
    Lexeme {
        error: Some(error.clone()),
        ..MK_LEXEME!(matched, message: error.message())
    }
}

/// The delimiter's length is its arity: only an equally long run closes it.
fn verbatim_handler(matched: &Matched<'_>) -> Lexeme {
    Lexeme {
        arity: matched.text().len(),
        ..MK_LEXEME!(matched)
    }
}

/// `[[text->passage]]`, `[[passage<-text]]` and `[[passage]]`.
///
/// The rightmost `->` and the leftmost `<-` separate the link text from the
/// passage name.
fn twine_link_handler(matched: &Matched<'_>) -> Lexeme {
    let body = matched.group(1).unwrap_or_default();
    let offset = matched.group_range(1).map_or(0, |range| range.start);

    let (passage, inner) = if let Some(arrow) = body.rfind("->") {
        (&body[arrow + 2..], offset..offset + arrow)
    } else if let Some(arrow) = body.find("<-") {
        (&body[..arrow], offset + arrow + 2..offset + body.len())
    } else {
        (body, offset..offset + body.len())
    };

    MK_LEXEME!(matched, passage: passage.to_string()).with_inner(inner)
}

fn css_time_handler(matched: &Matched<'_>) -> Lexeme {
    let amount: f64 = matched.group(1).and_then(|amount| amount.parse().ok()).unwrap_or(0.0);
    let unit = matched.group(2).map(str::to_lowercase).unwrap_or_default();
    let millis = if unit == "s" { amount * 1000.0 } else { amount };
    MK_LEXEME!(matched, value: millis)
}

fn number_handler(matched: &Matched<'_>) -> Lexeme {
    match matched.text().parse::<f64>() {
        Ok(value) => MK_LEXEME!(matched, value: value),
        Err(_) => MK_LEXEME!(matched),
    }
}

fn colour_handler(matched: &Matched<'_>) -> Lexeme {
    MK_LEXEME!(matched, colour: resolve_colour(matched.text()))
}

fn lowercase_name_handler(matched: &Matched<'_>) -> Lexeme {
    MK_LEXEME!(matched, name: matched.text().to_lowercase())
}

/// Named colours become their hex value; short hex forms are expanded.
pub fn resolve_colour(text: &str) -> String {
    let lower = text.to_lowercase();
    if let Some(hex) = lower.strip_prefix('#') {
        if hex.len() == 3 || hex.len() == 4 {
            return hex.chars().fold(String::from("#"), |mut expanded, digit| {
                expanded.push(digit);
                expanded.push(digit);
                expanded
            });
        }
        return lower;
    }

    COLOUR_LOOKUP.get(lower.as_str()).map_or(lower.clone(), |hex| hex.to_string())
}
