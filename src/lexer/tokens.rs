use serde::Serialize;
use std::{fmt::Display, sync::Arc};

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Root,
    Text,
    Error,

    // Block
    Hr,
    Heading,
    Bulleted,
    Numbered,
    Align,
    Column,

    // Inline
    Br,
    EscapedLine,
    Comment,
    Tag,
    ScriptStyleTag,
    Url,
    VerbatimOpener,
    Verbatim,
    TwineLink,
    UnclosedHook,
    HookFront,
    HookPrependedFront,
    HookBack,
    HookAppendedBack,
    Hook,
    CollapsedFront,
    CollapsedBack,
    Collapsed,
    Bold,
    Italic,
    Strong,
    Em,
    Strike,
    Sup,
    Underline,

    // Expressions
    Whitespace,
    MacroFront,
    GroupingFront,
    GroupingBack,
    Macro,
    Grouping,
    Variable,
    TempVariable,
    HookName,
    Property,
    PossessiveOperator,
    ItsProperty,
    ItsOperator,
    BelongingItProperty,
    BelongingProperty,
    BelongingOperator,
    CssTime,
    Number,
    Colour,
    Boolean,
    Datatype,
    Identifier,

    Comma,
    Spread,
    TypeSignature,
    To,
    Into,
    Where,
    When,
    Via,
    Making,
    Each,
    Bind,
    And,
    Or,
    Not,
    IsNot,
    IsIn,
    IsA,
    Is,
    Contains,
    Inequality,
    Addition,
    Subtraction,
    Multiplication,
    Division,

    // Strings
    SingleStringOpener,
    DoubleStringOpener,
    SingleStringCloser,
    DoubleStringCloser,
    EscapedStringChar,
    String,
}

impl TokenKind {
    /// Kinds produced by block rules, which may only begin a line.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            TokenKind::Hr
                | TokenKind::Heading
                | TokenKind::Bulleted
                | TokenKind::Numbered
                | TokenKind::Align
                | TokenKind::Column
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Type-specific payload. Each kind fills in only the fields it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
}

impl Fields {
    /// Fills every field `self` lacks from `other`.
    pub fn merge_missing(&mut self, other: Fields) {
        self.name = self.name.take().or(other.name);
        self.value = self.value.or(other.value);
        self.colour = self.colour.take().or(other.colour);
        self.operator = self.operator.take().or(other.operator);
        self.depth = self.depth.or(other.depth);
        self.message = self.message.take().or(other.message);
        self.passage = self.passage.take().or(other.passage);
        self.align = self.align.take().or(other.align);
        self.column = self.column.take().or(other.column);
        self.width = self.width.or(other.width);
    }
}

/// A node of the token tree.
///
/// `start` and `end` are codepoint offsets into the source passed to `lex`,
/// and `text` is exactly the source in that range. `inner_text` is the part
/// of `text` that was lexed into `children` (for example a hook's contents
/// without its brackets).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub inner_text: String,
    pub children: Vec<Arc<Token>>,
    pub place: Arc<str>,
    #[serde(flatten)]
    pub fields: Fields,
    #[serde(skip)]
    pub(crate) error: Option<ErrorImpl>,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, text: String, place: Arc<str>) -> Token {
        Token {
            kind,
            start,
            end: start + text.chars().count(),
            text,
            inner_text: String::new(),
            children: vec![],
            place,
            fields: Fields::default(),
            error: None,
        }
    }

    pub fn is_one_of(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// The deepest token whose range contains `offset`, or `None` when the
    /// offset is outside this token.
    pub fn token_at(&self, offset: usize) -> Option<&Token> {
        self.path_at(offset).first().copied()
    }

    /// Every token containing `offset`, from the deepest up to `self`.
    ///
    /// A token whose children leave a gap around `offset` (such as the
    /// delimiters of a heading) ends the descent itself.
    pub fn path_at(&self, offset: usize) -> Vec<&Token> {
        let mut path = vec![];
        if !self.contains(offset) {
            return path;
        }

        let mut current = self;
        loop {
            path.push(current);
            match current.children.iter().find(|child| child.contains(offset)) {
                Some(child) => current = child.as_ref(),
                None => break,
            }
        }

        path.reverse();
        path
    }

    /// All childless tokens at or below this one, in source order. A token
    /// without children is its own only leaf.
    pub fn leaves(&self) -> Vec<&Token> {
        let mut leaves = vec![];
        let mut pending = vec![self];

        while let Some(token) = pending.pop() {
            if token.children.is_empty() {
                leaves.push(token);
            } else {
                pending.extend(token.children.iter().rev().map(|c| c.as_ref()));
            }
        }

        leaves
    }

    /// True iff `predicate` holds for every leaf below this token.
    pub fn every_leaf<F: Fn(&Token) -> bool>(&self, predicate: F) -> bool {
        self.leaves().into_iter().all(predicate)
    }

    /// A shallow copy: the children vector is new, but its entries are shared
    /// with `self`.
    pub fn copy(&self) -> Token {
        Token {
            children: self.children.iter().map(Arc::clone).collect(),
            ..self.clone()
        }
    }

    /// Every error token below this one, as positioned diagnostics.
    pub fn errors(&self) -> Vec<Error> {
        let mut errors = vec![];
        let mut pending = vec![self];

        while let Some(token) = pending.pop() {
            if let Some(error) = &token.error {
                let position = Position(token.start, Arc::clone(&token.place));
                errors.push(Error::new(error.clone(), position));
            }
            pending.extend(token.children.iter().rev().map(|c| c.as_ref()));
        }

        errors
    }

    /// Turns this token into plain text covering the same range.
    pub(crate) fn demote(&mut self) {
        self.kind = TokenKind::Text;
        self.inner_text.clear();
        self.children.clear();
        self.fields = Fields::default();
        self.error = None;
    }

    fn fmt_outline(&self, f: &mut std::fmt::Formatter<'_>, indent: usize) -> std::fmt::Result {
        write!(f, "{}{} {}..{}", "  ".repeat(indent), self.kind, self.start, self.end)?;
        if self.children.is_empty() {
            write!(f, " {:?}", self.text)?;
        }
        if let Some(name) = &self.fields.name {
            write!(f, " name={}", name)?;
        }
        if let Some(message) = &self.fields.message {
            write!(f, " message={:?}", message)?;
        }
        writeln!(f)?;

        for child in &self.children {
            child.fmt_outline(f, indent + 1)?;
        }

        Ok(())
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_outline(f, 0)
    }
}
