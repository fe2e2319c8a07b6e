//! Recursive-descent parser over the token stream (spec.md §4.3).
//!
//! Builds the immutable AST. Enforces the three resource limits at every
//! Alternation/Sequence/Group/CharClass entry (depth) and before every node
//! allocation (count), plus a hard cap on pattern length checked up front.

use crate::ast::*;
use crate::errors::{LimitKind, PcreError, Result};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind, TokenStream};

#[derive(Debug, Clone, Copy)]
pub struct ParserLimits {
    pub max_pattern_length: usize,
    pub max_recursion_depth: usize,
    pub max_nodes: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_pattern_length: 100_000,
            max_recursion_depth: 200,
            max_nodes: 10_000,
        }
    }
}

pub struct Parser<'a> {
    stream: TokenStream<Lexer<'a>>,
    depth: usize,
    limits: ParserLimits,
    node_count: usize,
    next_group_index: u32,
}

/// Parse a pattern body into the inner (non-`Regex`-wrapped) AST. The
/// caller (the facade's `Pattern` front door) wraps the result in
/// `Node::Regex` together with the delimiter and flags.
pub fn parse_pattern(body: &str, flags: &str, limits: ParserLimits) -> Result<Node> {
    if body.len() > limits.max_pattern_length {
        return Err(PcreError::ResourceLimitExceeded {
            which: LimitKind::Length,
        });
    }
    let extended = flags.contains('x');
    let lexer = Lexer::new(body, extended);
    let stream = TokenStream::new(lexer);
    let mut parser = Parser {
        stream,
        depth: 0,
        limits,
        node_count: 0,
        next_group_index: 1,
    };
    let root = parser.parse_alternation()?;
    let eof = parser.stream.consume()?;
    if !matches!(eof.kind, TokenKind::EndOfInput) {
        let message = match eof.kind {
            TokenKind::GroupClose => "unmatched ')'".to_string(),
            TokenKind::Alternation => "alternation lacks right-hand side".to_string(),
            _ => "unexpected trailing input".to_string(),
        };
        return Err(PcreError::Parse {
            message,
            offset: eof.span.start,
        });
    }
    Ok(root)
}

impl<'a> Parser<'a> {
    fn enter_depth(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.limits.max_recursion_depth {
            return Err(PcreError::ResourceLimitExceeded {
                which: LimitKind::Recursion,
            });
        }
        Ok(())
    }

    fn leave_depth(&mut self) {
        self.depth -= 1;
    }

    fn alloc(&mut self, node: Node) -> Result<Node> {
        self.node_count += 1;
        if self.node_count > self.limits.max_nodes {
            return Err(PcreError::ResourceLimitExceeded {
                which: LimitKind::Nodes,
            });
        }
        Ok(node)
    }

    fn expect_group_close(&mut self) -> Result<Token> {
        let tok = self.stream.consume()?;
        if !matches!(tok.kind, TokenKind::GroupClose) {
            return Err(PcreError::Parse {
                message: "expected ')'".to_string(),
                offset: tok.span.start,
            });
        }
        Ok(tok)
    }

    // ---- Alternation := Sequence ('|' Sequence)* ----

    fn parse_alternation(&mut self) -> Result<Node> {
        self.enter_depth()?;
        if matches!(self.stream.peek(0)?.kind, TokenKind::Alternation) {
            let tok = self.stream.peek(0)?.clone();
            return Err(PcreError::Parse {
                message: "alternation lacks left-hand side".to_string(),
                offset: tok.span.start,
            });
        }
        let mut branches = vec![self.parse_sequence()?];
        while matches!(self.stream.peek(0)?.kind, TokenKind::Alternation) {
            let pipe = self.stream.consume()?;
            if matches!(
                self.stream.peek(0)?.kind,
                TokenKind::EndOfInput | TokenKind::GroupClose
            ) {
                return Err(PcreError::Parse {
                    message: "alternation lacks right-hand side".to_string(),
                    offset: pipe.span.start,
                });
            }
            branches.push(self.parse_sequence()?);
        }
        self.leave_depth();
        if branches.len() == 1 {
            Ok(branches.into_iter().next().unwrap())
        } else {
            let span = Span::new(branches[0].span().start, branches.last().unwrap().span().end);
            self.alloc(Node::Alternation(Alternation { span, branches }))
        }
    }

    // ---- Sequence := QuantifiedAtom* ----

    fn parse_sequence(&mut self) -> Result<Node> {
        self.enter_depth()?;
        let children = self.parse_sequence_items()?;
        self.leave_depth();
        Ok(Self::wrap_sequence(children))
    }

    fn wrap_sequence(children: Vec<Node>) -> Node {
        match children.len() {
            0 => Node::Literal(Literal {
                span: Span::new(0, 0),
                value: String::new(),
            }),
            1 => children.into_iter().next().unwrap(),
            _ => {
                let span = Span::new(children[0].span().start, children.last().unwrap().span().end);
                Node::Sequence(Sequence { span, children })
            }
        }
    }

    fn at_sequence_end(&mut self) -> Result<bool> {
        Ok(matches!(
            self.stream.peek(0)?.kind,
            TokenKind::Alternation | TokenKind::GroupClose | TokenKind::EndOfInput
        ))
    }

    fn parse_sequence_items(&mut self) -> Result<Vec<Node>> {
        let mut children = Vec::new();
        while !self.at_sequence_end()? {
            let atom = self.parse_quantified_atom()?;
            if let Node::Group(g) = &atom {
                if let GroupKind::InlineFlags { standalone: true } = g.kind {
                    let mut g2 = g.clone();
                    let rest = self.parse_sequence_items()?;
                    g2.child = Box::new(Self::wrap_sequence(rest));
                    children.push(Node::Group(g2));
                    return Ok(children);
                }
            }
            children.push(atom);
        }
        Ok(children)
    }

    fn parse_quantified_atom(&mut self) -> Result<Node> {
        let atom = self.parse_atom()?;
        let quant = if let TokenKind::Quantifier {
            min,
            max,
            lazy,
            possessive,
        } = &self.stream.peek(0)?.kind
        {
            Some((*min, *max, *lazy, *possessive))
        } else {
            None
        };
        if let Some((min, max, lazy, possessive)) = quant {
            let tok = self.stream.consume()?;
            let mode = if possessive {
                QuantifierMode::Possessive
            } else if lazy {
                QuantifierMode::Lazy
            } else {
                QuantifierMode::Greedy
            };
            let span = Span::new(atom.span().start, tok.span.end);
            return self.alloc(Node::Quantifier(Quantifier {
                span,
                child: Box::new(atom),
                min,
                max,
                mode,
                canonical_text: tok.text,
            }));
        }
        Ok(atom)
    }

    // ---- Atom ----

    fn parse_atom(&mut self) -> Result<Node> {
        let tok = self.stream.peek(0)?.clone();
        match &tok.kind {
            TokenKind::Literal => {
                self.stream.consume()?;
                self.alloc(Node::Literal(Literal {
                    span: tok.span,
                    value: tok.text,
                }))
            }
            TokenKind::Dot => {
                self.stream.consume()?;
                self.alloc(Node::Dot(Dot { span: tok.span }))
            }
            TokenKind::Anchor => {
                self.stream.consume()?;
                let kind = match tok.text.as_str() {
                    "^" => AnchorKind::Caret,
                    "$" => AnchorKind::Dollar,
                    "\\A" => AnchorKind::StringStart,
                    "\\Z" => AnchorKind::StringEndBeforeNewline,
                    "\\z" => AnchorKind::StringEnd,
                    _ => {
                        return Err(PcreError::InternalInvariantViolated(format!(
                            "unrecognized anchor text {:?}",
                            tok.text
                        )))
                    }
                };
                self.alloc(Node::Anchor(Anchor { span: tok.span, kind }))
            }
            TokenKind::AssertionEscape => {
                self.stream.consume()?;
                let kind = match tok.text.as_str() {
                    "\\b" => AssertionKind::WordBoundary,
                    "\\B" => AssertionKind::NotWordBoundary,
                    "\\G" => AssertionKind::ContinuationPoint,
                    _ => {
                        return Err(PcreError::InternalInvariantViolated(format!(
                            "unrecognized assertion text {:?}",
                            tok.text
                        )))
                    }
                };
                self.alloc(Node::Assertion(Assertion { span: tok.span, kind }))
            }
            TokenKind::CharTypeEscape => {
                self.stream.consume()?;
                let letter = tok.text.chars().nth(1).unwrap();
                let kind = CharTypeKind::from_letter(letter).ok_or_else(|| PcreError::Parse {
                    message: format!("unrecognized char type \\{letter}"),
                    offset: tok.span.start,
                })?;
                self.alloc(Node::CharType(CharType { span: tok.span, kind }))
            }
            TokenKind::Keep => {
                self.stream.consume()?;
                self.alloc(Node::Keep(Keep { span: tok.span }))
            }
            TokenKind::BackrefNumeric => {
                self.stream.consume()?;
                self.build_backref_numeric(tok)
            }
            TokenKind::BackrefNamed => {
                self.stream.consume()?;
                self.build_backref_named(tok)
            }
            TokenKind::Subroutine => {
                self.stream.consume()?;
                self.build_subroutine(tok)
            }
            TokenKind::UnicodeEscape => {
                self.stream.consume()?;
                self.build_unicode_escape(tok)
            }
            TokenKind::UnicodeProperty => {
                self.stream.consume()?;
                self.build_unicode_prop(tok)
            }
            TokenKind::Octal => {
                self.stream.consume()?;
                let value = decode_o_octal(&tok.text).ok_or_else(|| PcreError::Parse {
                    message: "malformed \\o{...} escape".to_string(),
                    offset: tok.span.start,
                })?;
                self.alloc(Node::Octal(Octal { span: tok.span, value }))
            }
            TokenKind::OctalLegacy => {
                self.stream.consume()?;
                let digits = &tok.text[1..];
                let value = if digits.is_empty() {
                    0
                } else {
                    u32::from_str_radix(digits, 8).unwrap_or(0)
                };
                self.alloc(Node::OctalLegacy(OctalLegacy { span: tok.span, value }))
            }
            TokenKind::Comment => {
                self.stream.consume()?;
                let text = tok.text["(?#".len()..tok.text.len() - 1].to_string();
                self.alloc(Node::Comment(Comment { span: tok.span, text }))
            }
            TokenKind::PcreVerb => {
                self.stream.consume()?;
                self.build_pcre_verb(tok)
            }
            TokenKind::CharClassOpen => {
                self.stream.consume()?;
                self.parse_char_class(tok)
            }
            TokenKind::GroupOpen => {
                self.stream.consume()?;
                self.parse_capturing_group(tok)
            }
            TokenKind::GroupModifierOpen => {
                self.stream.consume()?;
                self.parse_modifier_group(tok)
            }
            TokenKind::PosixClass => Err(PcreError::Parse {
                message: "POSIX class is only valid inside a character class".to_string(),
                offset: tok.span.start,
            }),
            TokenKind::RangeDash => {
                self.stream.consume()?;
                self.alloc(Node::Literal(Literal {
                    span: tok.span,
                    value: "-".to_string(),
                }))
            }
            TokenKind::Quantifier { .. } => Err(PcreError::Parse {
                message: "quantifier has no target".to_string(),
                offset: tok.span.start,
            }),
            TokenKind::Alternation | TokenKind::GroupClose | TokenKind::CharClassClose => {
                Err(PcreError::Parse {
                    message: "unexpected end of atom".to_string(),
                    offset: tok.span.start,
                })
            }
            TokenKind::EndOfInput => Err(PcreError::Parse {
                message: "unexpected end of input".to_string(),
                offset: tok.span.start,
            }),
        }
    }

    // ---- Groups ----

    fn parse_capturing_group(&mut self, open: Token) -> Result<Node> {
        self.enter_depth()?;
        let index = self.next_group_index;
        self.next_group_index += 1;
        let body = self.parse_alternation()?;
        let close = self.expect_group_close()?;
        self.leave_depth();
        self.alloc(Node::Group(Group {
            span: Span::new(open.span.start, close.span.end),
            kind: GroupKind::Capturing { index },
            child: Box::new(body),
            name_syntax: None,
            flags_set: None,
            flags_unset: None,
        }))
    }

    fn parse_modifier_group(&mut self, open: Token) -> Result<Node> {
        let text = open.text.as_str();
        if text.starts_with("(?(") {
            return self.parse_conditional(open);
        }
        if text == "(?:" {
            return self.group_simple(open, GroupKind::NonCapturing);
        }
        if text == "(?>" {
            return self.group_simple(open, GroupKind::Atomic);
        }
        if text == "(?|" {
            return self.group_branch_reset(open);
        }
        if text == "(?=" {
            return self.group_lookaround(open, GroupKind::Lookahead { negative: false });
        }
        if text == "(?!" {
            return self.group_lookaround(open, GroupKind::Lookahead { negative: true });
        }
        if text == "(?<=" {
            return self.group_lookaround(open, GroupKind::Lookbehind { negative: false });
        }
        if text == "(?<!" {
            return self.group_lookaround(open, GroupKind::Lookbehind { negative: true });
        }
        if text.starts_with("(?<") && text.ends_with('>') {
            let name = text[3..text.len() - 1].to_string();
            return self.group_named(open, name, NameSyntax::Standard);
        }
        if text.starts_with("(?'") && text.ends_with('\'') {
            let name = text[3..text.len() - 1].to_string();
            return self.group_named(open, name, NameSyntax::Quoted);
        }
        if text.starts_with("(?P<") && text.ends_with('>') {
            let name = text[4..text.len() - 1].to_string();
            return self.group_named(open, name, NameSyntax::Python);
        }
        self.group_inline_flags(open)
    }

    fn group_simple(&mut self, open: Token, kind: GroupKind) -> Result<Node> {
        self.enter_depth()?;
        let body = self.parse_alternation()?;
        let close = self.expect_group_close()?;
        self.leave_depth();
        self.alloc(Node::Group(Group {
            span: Span::new(open.span.start, close.span.end),
            kind,
            child: Box::new(body),
            name_syntax: None,
            flags_set: None,
            flags_unset: None,
        }))
    }

    fn group_lookaround(&mut self, open: Token, kind: GroupKind) -> Result<Node> {
        self.group_simple(open, kind)
    }

    fn group_named(&mut self, open: Token, name: String, syntax: NameSyntax) -> Result<Node> {
        self.enter_depth()?;
        let index = self.next_group_index;
        self.next_group_index += 1;
        let body = self.parse_alternation()?;
        let close = self.expect_group_close()?;
        self.leave_depth();
        self.alloc(Node::Group(Group {
            span: Span::new(open.span.start, close.span.end),
            kind: GroupKind::Named { index, name },
            child: Box::new(body),
            name_syntax: Some(syntax),
            flags_set: None,
            flags_unset: None,
        }))
    }

    fn group_branch_reset(&mut self, open: Token) -> Result<Node> {
        self.enter_depth()?;
        let start_index = self.next_group_index;
        let mut max_index = start_index;
        let mut branches = Vec::new();
        loop {
            self.next_group_index = start_index;
            branches.push(self.parse_sequence()?);
            if self.next_group_index > max_index {
                max_index = self.next_group_index;
            }
            if matches!(self.stream.peek(0)?.kind, TokenKind::Alternation) {
                self.stream.consume()?;
                continue;
            }
            break;
        }
        self.next_group_index = max_index;
        let close = self.expect_group_close()?;
        self.leave_depth();
        let body = if branches.len() == 1 {
            branches.into_iter().next().unwrap()
        } else {
            let span = Span::new(branches[0].span().start, branches.last().unwrap().span().end);
            Node::Alternation(Alternation { span, branches })
        };
        self.alloc(Node::Group(Group {
            span: Span::new(open.span.start, close.span.end),
            kind: GroupKind::BranchReset,
            child: Box::new(body),
            name_syntax: None,
            flags_set: None,
            flags_unset: None,
        }))
    }

    fn group_inline_flags(&mut self, open: Token) -> Result<Node> {
        let text = &open.text;
        let scoped = text.ends_with(':');
        let inner = &text[2..text.len() - 1];
        let (set_part, unset_part) = match inner.find('-') {
            Some(idx) => (inner[..idx].to_string(), Some(inner[idx + 1..].to_string())),
            None => (inner.to_string(), None),
        };
        if scoped {
            self.enter_depth()?;
            let body = self.parse_alternation()?;
            let close = self.expect_group_close()?;
            self.leave_depth();
            self.alloc(Node::Group(Group {
                span: Span::new(open.span.start, close.span.end),
                kind: GroupKind::InlineFlags { standalone: false },
                child: Box::new(body),
                name_syntax: None,
                flags_set: Some(set_part),
                flags_unset: unset_part,
            }))
        } else {
            self.alloc(Node::Group(Group {
                span: open.span,
                kind: GroupKind::InlineFlags { standalone: true },
                child: Box::new(Node::Sequence(Sequence {
                    span: Span::new(open.span.end, open.span.end),
                    children: Vec::new(),
                })),
                name_syntax: None,
                flags_set: Some(set_part),
                flags_unset: unset_part,
            }))
        }
    }

    // ---- Conditional ----

    fn parse_conditional(&mut self, open: Token) -> Result<Node> {
        self.enter_depth()?;
        let assertion = &open.text["(?(".len()..];
        let condition = if assertion.starts_with('?') {
            // PCRE reuses the conditional's own delimiter as the
            // lookaround's opening paren, so the body and its single
            // closing paren are parsed exactly as an ordinary lookaround.
            let kind = match assertion {
                "?=" => GroupKind::Lookahead { negative: false },
                "?!" => GroupKind::Lookahead { negative: true },
                "?<=" => GroupKind::Lookbehind { negative: false },
                "?<!" => GroupKind::Lookbehind { negative: true },
                _ => {
                    return Err(PcreError::Parse {
                        message: "malformed lookaround condition".to_string(),
                        offset: open.span.start,
                    })
                }
            };
            self.enter_depth()?;
            let body = self.parse_alternation()?;
            let close = self.expect_group_close()?;
            self.leave_depth();
            let node = Node::Group(Group {
                span: Span::new(open.span.start, close.span.end),
                kind,
                child: Box::new(body),
                name_syntax: None,
                flags_set: None,
                flags_unset: None,
            });
            Condition::Lookaround(Box::new(node))
        } else {
            let inner = &assertion[..assertion.len() - 1];
            parse_condition_content(inner, open.span)?
        };
        let yes = self.parse_sequence()?;
        let no = if matches!(self.stream.peek(0)?.kind, TokenKind::Alternation) {
            self.stream.consume()?;
            Some(Box::new(self.parse_sequence()?))
        } else {
            None
        };
        let close = self.expect_group_close()?;
        self.leave_depth();
        self.alloc(Node::Conditional(Conditional {
            span: Span::new(open.span.start, close.span.end),
            condition,
            yes: Box::new(yes),
            no,
        }))
    }

    // ---- Character classes ----

    fn parse_char_class(&mut self, open: Token) -> Result<Node> {
        self.enter_depth()?;
        let negated = open.text.ends_with('^');
        let mut items = Vec::new();
        let mut close_end = open.span.end;
        loop {
            let tok = self.stream.peek(0)?.clone();
            match &tok.kind {
                TokenKind::CharClassClose => {
                    let close = self.stream.consume()?;
                    close_end = close.span.end;
                    break;
                }
                TokenKind::EndOfInput => {
                    return Err(PcreError::Lex {
                        message: "unterminated character class".to_string(),
                        offset: open.span.start,
                    })
                }
                TokenKind::PosixClass => {
                    self.stream.consume()?;
                    items.push(self.posix_item(&tok)?);
                }
                TokenKind::CharTypeEscape => {
                    self.stream.consume()?;
                    let letter = tok.text.chars().nth(1).unwrap();
                    let kind = CharTypeKind::from_letter(letter).ok_or_else(|| PcreError::Parse {
                        message: format!("unrecognized char type \\{letter}"),
                        offset: tok.span.start,
                    })?;
                    items.push(ClassItem::CharType(CharType { span: tok.span, kind }));
                }
                TokenKind::UnicodeProperty => {
                    self.stream.consume()?;
                    if let Node::UnicodeProp(up) = self.build_unicode_prop(tok)? {
                        items.push(ClassItem::UnicodeProp(up));
                    }
                }
                TokenKind::UnicodeEscape => {
                    self.stream.consume()?;
                    let cp = decode_unicode_escape(&tok.text).ok_or_else(|| PcreError::Parse {
                        message: "malformed unicode escape".to_string(),
                        offset: tok.span.start,
                    })?;
                    let ch = char::from_u32(cp).unwrap_or('\u{FFFD}');
                    items.push(self.maybe_range(ch, tok.span)?);
                }
                TokenKind::Octal => {
                    self.stream.consume()?;
                    let value = decode_o_octal(&tok.text).unwrap_or(0);
                    let ch = char::from_u32(value).unwrap_or('\u{FFFD}');
                    items.push(self.maybe_range(ch, tok.span)?);
                }
                TokenKind::OctalLegacy => {
                    self.stream.consume()?;
                    let digits = &tok.text[1..];
                    let value = if digits.is_empty() {
                        0
                    } else {
                        u32::from_str_radix(digits, 8).unwrap_or(0)
                    };
                    let ch = char::from_u32(value).unwrap_or('\u{FFFD}');
                    items.push(self.maybe_range(ch, tok.span)?);
                }
                TokenKind::Literal => {
                    self.stream.consume()?;
                    let ch = tok.text.chars().next().unwrap_or('\0');
                    items.push(self.maybe_range(ch, tok.span)?);
                }
                TokenKind::RangeDash => {
                    self.stream.consume()?;
                    items.push(ClassItem::Literal(ClassLiteral {
                        span: tok.span,
                        value: '-',
                    }));
                }
                other => {
                    return Err(PcreError::Parse {
                        message: format!("unexpected token in character class: {other:?}"),
                        offset: tok.span.start,
                    })
                }
            }
        }
        self.leave_depth();
        if items.is_empty() {
            return Err(PcreError::Parse {
                message: "empty character class".to_string(),
                offset: open.span.start,
            });
        }
        self.alloc(Node::CharClass(CharClass {
            span: Span::new(open.span.start, close_end),
            negated,
            items,
        }))
    }

    fn maybe_range(&mut self, ch: char, span: Span) -> Result<ClassItem> {
        if matches!(self.stream.peek(0)?.kind, TokenKind::RangeDash) {
            self.stream.consume()?;
            let end_tok = self.stream.consume()?;
            let end_ch = self.literal_like_char(&end_tok)?;
            return Ok(ClassItem::Range(Range {
                span: Span::new(span.start, end_tok.span.end),
                start: ch,
                end: end_ch,
                hyphenated: true,
            }));
        }
        Ok(ClassItem::Literal(ClassLiteral { span, value: ch }))
    }

    fn literal_like_char(&self, tok: &Token) -> Result<char> {
        match &tok.kind {
            TokenKind::Literal => Ok(tok.text.chars().next().unwrap_or('\0')),
            TokenKind::UnicodeEscape => decode_unicode_escape(&tok.text)
                .and_then(char::from_u32)
                .ok_or_else(|| PcreError::Parse {
                    message: "malformed unicode escape in range".to_string(),
                    offset: tok.span.start,
                }),
            TokenKind::Octal => decode_o_octal(&tok.text)
                .and_then(char::from_u32)
                .ok_or_else(|| PcreError::Parse {
                    message: "malformed octal escape in range".to_string(),
                    offset: tok.span.start,
                }),
            TokenKind::OctalLegacy => {
                let digits = &tok.text[1..];
                let v = if digits.is_empty() {
                    0
                } else {
                    u32::from_str_radix(digits, 8).unwrap_or(0)
                };
                char::from_u32(v).ok_or_else(|| PcreError::Parse {
                    message: "malformed octal escape in range".to_string(),
                    offset: tok.span.start,
                })
            }
            _ => Err(PcreError::Parse {
                message: "expected range endpoint".to_string(),
                offset: tok.span.start,
            }),
        }
    }

    fn posix_item(&self, tok: &Token) -> Result<ClassItem> {
        let inner = &tok.text[2..tok.text.len() - 2]; // strip "[:" and ":]"
        let (negated, name) = if let Some(stripped) = inner.strip_prefix('^') {
            (true, stripped.to_string())
        } else {
            (false, inner.to_string())
        };
        Ok(ClassItem::Posix(PosixClass {
            span: tok.span,
            name,
            negated,
        }))
    }

    // ---- Backreferences, subroutines, escapes, verbs ----

    fn build_backref_numeric(&mut self, tok: Token) -> Result<Node> {
        let (index, relative) = if let Some(rest) = tok.text.strip_prefix("\\g") {
            let inner = rest.trim_start_matches('{').trim_end_matches('}');
            let relative = inner.starts_with('-') || inner.starts_with('+');
            let cleaned = inner.trim_start_matches('+');
            let n: i32 = cleaned.parse().map_err(|_| PcreError::Parse {
                message: "malformed \\g backreference".to_string(),
                offset: tok.span.start,
            })?;
            (n, relative)
        } else {
            let digits = &tok.text[1..];
            let n: i32 = digits.parse().map_err(|_| PcreError::Parse {
                message: "malformed numeric backreference".to_string(),
                offset: tok.span.start,
            })?;
            (n, false)
        };
        self.alloc(Node::Backref(Backref {
            span: tok.span,
            index: Some(index),
            name: None,
            relative,
        }))
    }

    fn build_backref_named(&mut self, tok: Token) -> Result<Node> {
        let name = if let Some(rest) = tok.text.strip_prefix("(?P=") {
            rest.trim_end_matches(')').to_string()
        } else if let Some(rest) = tok.text.strip_prefix("\\k") {
            rest[1..rest.len() - 1].to_string()
        } else if let Some(rest) = tok.text.strip_prefix("\\g{") {
            rest.trim_end_matches('}').to_string()
        } else if let Some(rest) = tok.text.strip_prefix("\\g'") {
            rest.trim_end_matches('\'').to_string()
        } else {
            return Err(PcreError::InternalInvariantViolated(format!(
                "unrecognized named-backref text {:?}",
                tok.text
            )));
        };
        self.alloc(Node::Backref(Backref {
            span: tok.span,
            index: None,
            name: Some(name),
            relative: false,
        }))
    }

    fn build_subroutine(&mut self, tok: Token) -> Result<Node> {
        let text = tok.text.as_str();
        let (reference, form) = if text == "(?R)" {
            (SubroutineRef::WholePattern, SubroutineForm::RecurseWhole)
        } else if let Some(rest) = text.strip_prefix("(?P>") {
            let name = rest.trim_end_matches(')').to_string();
            (SubroutineRef::Named(name), SubroutineForm::RecursePython)
        } else if let Some(rest) = text.strip_prefix("(?&") {
            let name = rest.trim_end_matches(')').to_string();
            (SubroutineRef::Named(name), SubroutineForm::RecurseNamed)
        } else {
            let inner = &text[2..text.len() - 1];
            let n: i32 = inner.parse().map_err(|_| PcreError::Parse {
                message: "malformed numbered subroutine call".to_string(),
                offset: tok.span.start,
            })?;
            (SubroutineRef::Numbered(n), SubroutineForm::RecurseNumbered)
        };
        self.alloc(Node::Subroutine(Subroutine {
            span: tok.span,
            reference,
            form,
        }))
    }

    fn build_unicode_escape(&mut self, tok: Token) -> Result<Node> {
        let code_point = decode_unicode_escape(&tok.text).ok_or_else(|| PcreError::Parse {
            message: "malformed unicode escape".to_string(),
            offset: tok.span.start,
        })?;
        self.alloc(Node::UnicodeEscape(UnicodeEscape {
            span: tok.span,
            code_point,
        }))
    }

    fn build_unicode_prop(&mut self, tok: Token) -> Result<Node> {
        let negated = tok.text.starts_with("\\P");
        let rest = &tok.text[2..];
        let property = if let Some(inner) = rest.strip_prefix('{') {
            inner.trim_end_matches('}').to_string()
        } else {
            rest.to_string()
        };
        self.alloc(Node::UnicodeProp(UnicodeProp {
            span: tok.span,
            property,
            negated,
        }))
    }

    fn build_pcre_verb(&mut self, tok: Token) -> Result<Node> {
        let inner = &tok.text[2..tok.text.len() - 1]; // strip "(*" and ")"
        let (name, argument) = match inner.find(':') {
            Some(idx) => (inner[..idx].to_string(), Some(inner[idx + 1..].to_string())),
            None => (inner.to_string(), None),
        };
        self.alloc(Node::PcreVerb(PcreVerb {
            span: tok.span,
            name,
            argument,
        }))
    }
}

fn parse_condition_content(inner: &str, span: Span) -> Result<Condition> {
    if inner == "DEFINE" {
        return Ok(Condition::Define);
    }
    if inner == "R" || (inner.starts_with('R') && inner[1..].chars().all(|c| c.is_alphanumeric() || c == '&')) {
        return Ok(Condition::Recursion);
    }
    if inner.len() >= 2 && inner.starts_with('<') && inner.ends_with('>') {
        return Ok(Condition::GroupName(inner[1..inner.len() - 1].to_string()));
    }
    if inner.len() >= 2 && inner.starts_with('\'') && inner.ends_with('\'') {
        return Ok(Condition::GroupName(inner[1..inner.len() - 1].to_string()));
    }
    if !inner.is_empty()
        && inner
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
    {
        let n: i32 = inner.parse().map_err(|_| PcreError::Parse {
            message: "malformed conditional group number".to_string(),
            offset: span.start,
        })?;
        return Ok(Condition::GroupNumber(n));
    }
    if !inner.is_empty() {
        return Ok(Condition::GroupName(inner.to_string()));
    }
    Err(PcreError::Parse {
        message: "empty conditional".to_string(),
        offset: span.start,
    })
}

/// Decodes `\xHH`, `\x{HHHH}`, `\u{HHHH}` into a code point.
fn decode_unicode_escape(text: &str) -> Option<u32> {
    if let Some(rest) = text.strip_prefix("\\x{") {
        let hex = rest.trim_end_matches('}');
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(rest) = text.strip_prefix("\\u{") {
        let hex = rest.trim_end_matches('}');
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(rest) = text.strip_prefix("\\x") {
        if rest.is_empty() {
            Some(0)
        } else {
            u32::from_str_radix(rest, 16).ok()
        }
    } else {
        None
    }
}

/// Decodes `\o{NNN}`.
fn decode_o_octal(text: &str) -> Option<u32> {
    let rest = text.strip_prefix("\\o{")?;
    let digits = rest.trim_end_matches('}');
    u32::from_str_radix(digits, 8).ok()
}
