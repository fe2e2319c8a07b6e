//! Typed tokens and the bounded-lookahead token stream (spec.md §4.1/§4.2).

/// Byte range `[start, end)` into the pattern body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end >= start);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Kinds of tokens the lexer produces.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TokenKind {
    Literal,
    Dot,
    CharTypeEscape,
    Anchor,
    AssertionEscape,
    Keep,
    GroupOpen,
    GroupModifierOpen,
    GroupClose,
    Alternation,
    /// `min`, `max` (None = unbounded) captured alongside the raw text.
    Quantifier { min: u32, max: Option<u32>, lazy: bool, possessive: bool },
    CharClassOpen,
    CharClassClose,
    RangeDash,
    PosixClass,
    BackrefNumeric,
    BackrefNamed,
    Subroutine,
    UnicodeEscape,
    UnicodeProperty,
    Octal,
    OctalLegacy,
    Comment,
    PcreVerb,
    EndOfInput,
}

/// A single lexical token: kind, byte range, and the exact source slice
/// (needed so the compiler can reproduce the original text verbatim where
/// required).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: String) -> Self {
        Self { kind, span, text }
    }
}

/// A lazily-produced, finite sequence of tokens with at most two tokens of
/// lookahead buffered at a time. Never materializes the whole stream.
pub struct TokenStream<I: Iterator<Item = crate::errors::Result<Token>>> {
    inner: I,
    buf: std::collections::VecDeque<Token>,
    done: bool,
}

impl<I: Iterator<Item = crate::errors::Result<Token>>> TokenStream<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            buf: std::collections::VecDeque::with_capacity(3),
            done: false,
        }
    }

    fn fill(&mut self, upto: usize) -> crate::errors::Result<()> {
        while self.buf.len() <= upto && !self.done {
            match self.inner.next() {
                Some(Ok(tok)) => {
                    let is_eof = matches!(tok.kind, TokenKind::EndOfInput);
                    self.buf.push_back(tok);
                    if is_eof {
                        self.done = true;
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    self.done = true;
                }
            }
        }
        Ok(())
    }

    /// Peek `n` tokens ahead (0 = next token). `n` must be 0, 1, or 2.
    pub fn peek(&mut self, n: usize) -> crate::errors::Result<&Token> {
        debug_assert!(n <= 2, "lookahead is bounded to two tokens");
        self.fill(n)?;
        Ok(self.buf.get(n).unwrap_or_else(|| self.buf.back().unwrap()))
    }

    pub fn consume(&mut self) -> crate::errors::Result<Token> {
        self.fill(0)?;
        Ok(self.buf.pop_front().expect("fill(0) guarantees an entry"))
    }

    /// Current position in the stream, for mark/rewind in narrow disambiguation spots.
    pub fn mark(&self) -> usize {
        0 // tokens already consumed are gone; mark/rewind is done at the Cursor level (see lexer)
    }
}
