use std::{collections::HashMap, sync::Arc};

use log::{debug, trace, warn};

use super::{
    rules::{Lexeme, Mode, Preceding, Rule, RULES},
    tokens::{Token, TokenKind},
};

/// Settings for a single `lex` call.
#[derive(Debug, Clone)]
pub struct LexOptions {
    /// Opaque source identifier copied onto every token.
    pub place: String,
    /// The mode the scan begins in.
    pub start_mode: Mode,
    /// When false, pairs are matched but not folded into composite tokens,
    /// and inner text is not lexed.
    pub fold: bool,
    /// Bound on nesting: inner-text recursion depth plus open fronts.
    pub max_depth: usize,
}

impl Default for LexOptions {
    fn default() -> Self {
        LexOptions {
            place: String::new(),
            start_mode: Mode::Start,
            fold: true,
            max_depth: 128,
        }
    }
}

impl LexOptions {
    pub fn place(mut self, place: &str) -> Self {
        self.place = place.to_string();
        self
    }

    pub fn start_mode(mut self, mode: Mode) -> Self {
        self.start_mode = mode;
        self
    }

    pub fn fold(mut self, fold: bool) -> Self {
        self.fold = fold;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// A token under construction, remembering the rule that made it so that
/// its pairing metadata is at hand while it sits on the front stack.
struct Node {
    token: Token,
    rule: Option<&'static Rule>,
    arity: usize,
}

impl Node {
    fn text(token: Token) -> Node {
        Node {
            token,
            rule: None,
            arity: 0,
        }
    }

    fn demote(&mut self) {
        trace!("demoting unmatched {} at {}", self.token.kind, self.token.start);
        self.token.demote();
        self.rule = None;
    }
}

pub struct Lexer<'s> {
    source: &'s str,
    /// Codepoint offset of `source` within the passage.
    offset: usize,
    mode: Mode,
    options: &'s LexOptions,
    place: Arc<str>,
    depth: usize,
    line_start: bool,
    tokens: Vec<Node>,
    front_stack: Vec<usize>,
    pos: usize,
    char_pos: usize,
    first_unmatched: (usize, usize),
    /// Byte position of the next occurrence of each rule closer at or after
    /// the cursor, or `None` once it no longer occurs.
    closers: HashMap<&'static str, Option<usize>>,
}

impl<'s> Lexer<'s> {
    pub fn new(
        source: &'s str,
        offset: usize,
        mode: Mode,
        options: &'s LexOptions,
        place: Arc<str>,
        depth: usize,
        line_start: bool,
    ) -> Lexer<'s> {
        Lexer {
            source,
            offset,
            mode,
            options,
            place,
            depth,
            line_start,
            tokens: vec![],
            front_stack: vec![],
            pos: 0,
            char_pos: 0,
            first_unmatched: (0, 0),
            closers: HashMap::new(),
        }
    }

    pub fn remainder(&self) -> &'s str {
        &self.source[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn advance_n(&mut self, bytes: usize) {
        self.char_pos += self.source[self.pos..self.pos + bytes].chars().count();
        self.pos += bytes;
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.remainder().chars().next() {
            self.pos += c.len_utf8();
            self.char_pos += 1;
        }
    }

    fn has_pending_text(&self) -> bool {
        self.first_unmatched.0 < self.pos
    }

    fn nesting(&self) -> usize {
        self.depth + self.front_stack.len()
    }

    /// Whether `closer` occurs in the source at or after the cursor. Each
    /// lookup scans only past the previously found occurrence.
    fn closer_ahead(&mut self, closer: &'static str) -> bool {
        let pos = self.pos;
        match self.closers.get(closer) {
            Some(None) => return false,
            Some(Some(at)) if *at >= pos => return true,
            _ => {}
        }

        let next = self.source[pos..].find(closer).map(|at| pos + at);
        self.closers.insert(closer, next);
        next.is_some()
    }

    /// The innermost open front decides the live rules.
    fn active_mode(&self) -> Mode {
        self.front_stack
            .last()
            .and_then(|&index| self.tokens[index].rule)
            .and_then(|rule| rule.inner_mode)
            .unwrap_or(self.mode)
    }

    fn preceding(&self) -> Preceding<'_> {
        match self.tokens.last() {
            Some(node) => Preceding::Token(&node.token),
            None if self.line_start => Preceding::StartOfLine,
            None => Preceding::MidLine,
        }
    }

    fn push(&mut self, node: Node) {
        self.tokens.push(node);
    }

    fn flush_text(&mut self) {
        if self.has_pending_text() {
            let (byte, char) = self.first_unmatched;
            let text = self.source[byte..self.pos].to_string();
            let token =
                Token::new(TokenKind::Text, self.offset + char, text, Arc::clone(&self.place));
            self.push(Node::text(token));
        }
        self.first_unmatched = (self.pos, self.char_pos);
    }

    /// Searches the front stack, innermost first, for a front that `rule`
    /// closes. Returns its stack position and the kind the pair resolves to.
    fn find_front(&self, rule: &Rule, arity: usize) -> Option<(usize, TokenKind)> {
        for (stack_pos, &index) in self.front_stack.iter().enumerate().rev() {
            let node = &self.tokens[index];
            let aka = node.rule.and_then(|front| front.aka);

            if let Some(resolved) = rule.resolves(node.token.kind, aka, node.arity, arity) {
                return Some((stack_pos, resolved));
            }
            if rule.cannot_cross_kind(node.token.kind, aka) {
                return None;
            }
        }

        None
    }

    fn try_rules(&mut self) -> bool {
        let mode = self.active_mode();
        let remaining = self.remainder();

        for rule in RULES.rules_for(mode) {
            if let Some(constraint) = rule.constraint {
                if !constraint(self.preceding()) {
                    continue;
                }
            }
            if rule.cannot_follow_text && self.has_pending_text() {
                continue;
            }
            if let Some(closer) = rule.closer {
                if !self.closer_ahead(closer) {
                    continue;
                }
            }

            let Some(matched) = rule.pattern.find(remaining) else {
                continue;
            };
            let lexeme = (rule.handler)(&matched);
            if lexeme.length == 0 || lexeme.length > remaining.len() {
                continue;
            }

            let partner = if rule.matches.is_empty() {
                None
            } else {
                self.find_front(rule, lexeme.arity)
            };

            if partner.is_none() {
                if !rule.matches.is_empty() && !rule.front {
                    continue;
                }
                if rule.front && self.nesting() >= self.options.max_depth {
                    warn!(
                        "not opening {} at {}: nesting limit {} reached",
                        rule.kind,
                        self.offset + self.char_pos,
                        self.options.max_depth
                    );
                    continue;
                }
            }

            self.accept(rule, lexeme, partner);
            return true;
        }

        false
    }

    fn accept(
        &mut self,
        rule: &'static Rule,
        lexeme: Lexeme,
        partner: Option<(usize, TokenKind)>,
    ) {
        self.flush_text();

        let text = &self.remainder()[..lexeme.length];
        let mut token = Token::new(
            rule.kind,
            self.offset + self.char_pos,
            text.to_string(),
            Arc::clone(&self.place),
        );
        token.fields = lexeme.fields;
        token.error = lexeme.error;

        if let Some(inner) = lexeme.inner {
            if self.options.fold {
                let inner_text = &text[inner.clone()];
                let inner_start = token.start + text[..inner.start].chars().count();
                token.inner_text = inner_text.to_string();
                let inner_mode = rule.inner_mode.unwrap_or(Mode::Start);
                token.children = self.lex_inner(inner_text, inner_start, inner_mode);
            }
        }

        self.advance_n(lexeme.length);
        self.first_unmatched = (self.pos, self.char_pos);
        self.push(Node {
            token,
            rule: Some(rule),
            arity: lexeme.arity,
        });

        match partner {
            Some((stack_pos, resolved)) if self.options.fold => self.fold(stack_pos, resolved),
            Some((stack_pos, _)) => self.close_without_folding(stack_pos),
            None if rule.front => {
                let index = self.tokens.len() - 1;
                self.front_stack.push(index);
            }
            None => {}
        }
    }

    fn lex_inner(&self, inner_text: &str, start: usize, mode: Mode) -> Vec<Arc<Token>> {
        if self.depth + 1 >= self.options.max_depth {
            warn!(
                "not lexing inner text at {}: nesting limit {} reached",
                start, self.options.max_depth
            );
            let token =
                Token::new(TokenKind::Text, start, inner_text.to_string(), Arc::clone(&self.place));
            return vec![Arc::new(token)];
        }

        let place = Arc::clone(&self.place);
        tokenize(inner_text, start, mode, self.options, place, self.depth + 1, false)
            .into_iter()
            .map(Arc::new)
            .collect()
    }

    /// Merges the newest token with the front at `stack_pos` and everything
    /// between them.
    fn fold(&mut self, stack_pos: usize, resolved: TokenKind) {
        let front_index = self.front_stack[stack_pos];
        let abandoned = self.front_stack.split_off(stack_pos + 1);
        self.front_stack.truncate(stack_pos);

        let Some(mut back) = self.tokens.pop() else {
            return;
        };
        let between: Vec<Node> = self.tokens.drain(front_index + 1..).collect();
        let Some(front) = self.tokens.pop() else {
            return;
        };

        let children: Vec<Token> = between
            .into_iter()
            .enumerate()
            .map(|(i, mut node)| {
                if abandoned.contains(&(front_index + 1 + i)) {
                    node.demote();
                }
                node.token
            })
            .collect();
        let children: Vec<Arc<Token>> =
            coalesce_text(children).into_iter().map(Arc::new).collect();
        let inner_text: String = children.iter().map(|child| child.text.as_str()).collect();

        trace!(
            "folding {} at {} with {} at {} into {}",
            front.token.kind,
            front.token.start,
            back.token.kind,
            back.token.start,
            resolved
        );

        back.token.kind = resolved;
        back.token.start = front.token.start;
        back.token.text = format!("{}{}{}", front.token.text, inner_text, back.token.text);
        back.token.inner_text = inner_text;
        back.token.children = children;
        back.token.fields.merge_missing(front.token.fields);
        back.rule = None;
        back.arity = 0;
        self.push(back);
    }

    /// The unfolded counterpart of `fold`: the pair stays flat, and the
    /// front and anything opened after it leave the stack.
    fn close_without_folding(&mut self, stack_pos: usize) {
        let abandoned = self.front_stack.split_off(stack_pos + 1);
        self.front_stack.truncate(stack_pos);
        for index in abandoned {
            self.tokens[index].demote();
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_text();

        for index in std::mem::take(&mut self.front_stack) {
            self.tokens[index].demote();
        }

        coalesce_text(self.tokens.into_iter().map(|node| node.token).collect())
    }
}

/// Joins runs of adjacent childless text tokens into one.
fn coalesce_text(tokens: Vec<Token>) -> Vec<Token> {
    let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        if let Some(last) = merged.last_mut() {
            if last.kind == TokenKind::Text
                && token.kind == TokenKind::Text
                && last.children.is_empty()
                && token.children.is_empty()
            {
                last.text.push_str(&token.text);
                last.end = token.end;
                continue;
            }
        }
        merged.push(token);
    }

    merged
}

/// Scans `source` into a list of sibling tokens. `offset` is the codepoint
/// position of `source` within the passage, and `depth` how many inner texts
/// enclose it.
pub fn tokenize(
    source: &str,
    offset: usize,
    mode: Mode,
    options: &LexOptions,
    place: Arc<str>,
    depth: usize,
    line_start: bool,
) -> Vec<Token> {
    let mut lex = Lexer::new(source, offset, mode, options, place, depth, line_start);

    while !lex.at_eof() {
        if !lex.try_rules() {
            lex.advance_char();
        }
    }

    lex.finish()
}

/// Lexes a passage with the default options.
pub fn lex(source: &str) -> Token {
    lex_with_options(source, &LexOptions::default())
}

/// Lexes a passage into a token tree rooted at a `Root` token spanning the
/// whole source. Never fails: malformed markup degrades to text.
pub fn lex_with_options(source: &str, options: &LexOptions) -> Token {
    debug!(
        "lexing {} characters of {:?} in {} mode (fold: {})",
        source.chars().count(),
        options.place,
        options.start_mode,
        options.fold
    );

    let place: Arc<str> = Arc::from(options.place.as_str());
    let children =
        tokenize(source, 0, options.start_mode, options, Arc::clone(&place), 0, true);

    let mut root = Token::new(TokenKind::Root, 0, source.to_string(), place);
    root.inner_text = source.to_string();
    root.children = children.into_iter().map(Arc::new).collect();

    debug!("lexed {:?} into {} top-level tokens", options.place, root.children.len());
    root
}
