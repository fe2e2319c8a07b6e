//! Byte-level (char-indexed) scanner producing a token sequence
//! (spec.md §4.1). Tracks character-class context, `\Q...\E` quote mode,
//! and `x`-mode free spacing.

use crate::errors::{PcreError, Result};
use crate::token::{Span, Token, TokenKind};

/// Scanning context the lexer is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    CharClass,
    Quote,
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    extended: bool,
    mode: Mode,
    /// True at the first position of the current character class (possibly
    /// right after `^`), where `]` and leading `-` are literal.
    class_is_first: bool,
    emitted_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, extended: bool) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            extended,
            mode: Mode::Normal,
            class_is_first: false,
            emitted_eof: false,
        }
    }

    fn byte_offset(&self, idx: usize) -> usize {
        self.chars.get(idx).map(|(b, _)| *b).unwrap_or(self.src.len())
    }

    fn peek_char(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|(_, c)| *c)
    }

    fn take_char(&mut self) -> Option<char> {
        let c = self.peek_char(0);
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn starts_with(&self, s: &str) -> bool {
        let start = self.byte_offset(self.pos);
        self.src[start..].starts_with(s)
    }

    fn span_from(&self, start_idx: usize) -> Span {
        Span::new(self.byte_offset(start_idx), self.byte_offset(self.pos))
    }

    fn text_from(&self, start_idx: usize) -> String {
        let s = self.byte_offset(start_idx);
        let e = self.byte_offset(self.pos);
        self.src[s..e].to_string()
    }

    fn skip_ws_and_comments(&mut self) {
        if self.mode != Mode::Normal || !self.extended {
            return;
        }
        loop {
            match self.peek_char(0) {
                Some(c) if c.is_whitespace() => {
                    self.pos += 1;
                }
                Some('#') => {
                    while let Some(c) = self.peek_char(0) {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn err(&self, message: impl Into<String>, at_idx: usize) -> PcreError {
        PcreError::Lex {
            message: message.into(),
            offset: self.byte_offset(at_idx),
        }
    }

    /// Scan forward collecting chars (not consuming) until `stop` or EOF;
    /// used for small fixed-shape lookaheads (group names, verb bodies).
    fn scan_until(&self, mut from: usize, stop: char) -> Option<(String, usize)> {
        let mut s = String::new();
        while let Some(c) = self.chars.get(from).map(|(_, c)| *c) {
            if c == stop {
                return Some((s, from));
            }
            s.push(c);
            from += 1;
        }
        None
    }

    fn next_token(&mut self) -> Result<Token> {
        if self.mode == Mode::Quote {
            return self.next_in_quote();
        }
        self.skip_ws_and_comments();
        let start = self.pos;
        let Some(c) = self.peek_char(0) else {
            self.emitted_eof = true;
            return Ok(Token::new(TokenKind::EndOfInput, Span::new(self.byte_offset(start), self.byte_offset(start)), String::new()));
        };

        if self.mode == Mode::CharClass {
            return self.next_in_class(c, start);
        }

        match c {
            '.' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Dot, self.span_from(start), self.text_from(start)))
            }
            '^' | '$' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Anchor, self.span_from(start), self.text_from(start)))
            }
            '|' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Alternation, self.span_from(start), self.text_from(start)))
            }
            ')' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::GroupClose, self.span_from(start), self.text_from(start)))
            }
            '[' => self.lex_class_open(start),
            '(' => self.lex_group_open(start),
            '*' | '+' | '?' => self.lex_simple_quantifier(c, start),
            '{' => self.lex_brace_quantifier(start),
            '\\' => self.lex_escape(start),
            _ => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Literal, self.span_from(start), self.text_from(start)))
            }
        }
    }

    fn next_in_quote(&mut self) -> Result<Token> {
        let start = self.pos;
        if self.starts_with("\\E") {
            self.pos += 2;
            self.mode = Mode::Normal;
            return self.next_token();
        }
        match self.take_char() {
            Some(c) => Ok(Token::new(TokenKind::Literal, self.span_from(start), c.to_string())),
            None => Err(self.err("unterminated \\Q...\\E quote", start)),
        }
    }

    fn next_in_class(&mut self, c: char, start: usize) -> Result<Token> {
        if c == ']' && !self.class_is_first {
            self.pos += 1;
            self.mode = Mode::Normal;
            return Ok(Token::new(TokenKind::CharClassClose, self.span_from(start), self.text_from(start)));
        }
        self.class_is_first = false;

        // POSIX class [:name:]
        if c == '[' && self.peek_char(1) == Some(':') {
            if let Some((_name, close_colon_idx)) = self.scan_until(self.pos + 2, ':') {
                if self.chars.get(close_colon_idx + 1).map(|(_, c)| *c) == Some(']') {
                    self.pos = close_colon_idx + 2;
                    return Ok(Token::new(TokenKind::PosixClass, self.span_from(start), self.text_from(start)));
                }
            }
        }

        if c == '\\' {
            return self.lex_escape(start);
        }

        if c == '-' {
            // literal if at start or immediately before closing ']'
            let next_is_close = self.peek_char(1) == Some(']');
            self.pos += 1;
            if next_is_close {
                return Ok(Token::new(TokenKind::Literal, self.span_from(start), self.text_from(start)));
            }
            return Ok(Token::new(TokenKind::RangeDash, self.span_from(start), self.text_from(start)));
        }

        self.pos += 1;
        Ok(Token::new(TokenKind::Literal, self.span_from(start), self.text_from(start)))
    }

    fn lex_class_open(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // '['
        self.mode = Mode::CharClass;
        self.class_is_first = true;
        if self.peek_char(0) == Some('^') {
            self.pos += 1;
        }
        Ok(Token::new(TokenKind::CharClassOpen, self.span_from(start), self.text_from(start)))
    }

    fn lex_simple_quantifier(&mut self, c: char, start: usize) -> Result<Token> {
        self.pos += 1;
        let (min, max) = match c {
            '*' => (0, None),
            '+' => (1, None),
            '?' => (0, Some(1)),
            _ => unreachable!(),
        };
        let (lazy, possessive) = self.lex_quantifier_suffix();
        Ok(Token::new(
            TokenKind::Quantifier { min, max, lazy, possessive },
            self.span_from(start),
            self.text_from(start),
        ))
    }

    fn lex_quantifier_suffix(&mut self) -> (bool, bool) {
        match self.peek_char(0) {
            Some('?') => {
                self.pos += 1;
                (true, false)
            }
            Some('+') => {
                self.pos += 1;
                (false, true)
            }
            _ => (false, false),
        }
    }

    /// `{n}`, `{n,}`, `{n,m}` only when the body matches `\{\d+(,\d*)?\}`;
    /// otherwise `{` is a literal (spec.md §4.3).
    fn lex_brace_quantifier(&mut self, start: usize) -> Result<Token> {
        let mut j = self.pos + 1;
        let digits_start = j;
        while matches!(self.chars.get(j).map(|(_, c)| *c), Some(d) if d.is_ascii_digit()) {
            j += 1;
        }
        if j == digits_start {
            // no leading digits -> literal '{'
            self.pos += 1;
            return Ok(Token::new(TokenKind::Literal, self.span_from(start), self.text_from(start)));
        }
        let min_str: String = self.chars[digits_start..j].iter().map(|(_, c)| *c).collect();
        let mut max_str: Option<String> = None;
        if self.chars.get(j).map(|(_, c)| *c) == Some(',') {
            j += 1;
            let max_start = j;
            while matches!(self.chars.get(j).map(|(_, c)| *c), Some(d) if d.is_ascii_digit()) {
                j += 1;
            }
            max_str = Some(self.chars[max_start..j].iter().map(|(_, c)| *c).collect());
        }
        if self.chars.get(j).map(|(_, c)| *c) != Some('}') {
            self.pos += 1;
            return Ok(Token::new(TokenKind::Literal, self.span_from(start), self.text_from(start)));
        }
        self.pos = j + 1;
        let min: u32 = min_str.parse().unwrap_or(0);
        let max: Option<u32> = match max_str {
            None => Some(min),
            Some(s) if s.is_empty() => None,
            Some(s) => s.parse().ok(),
        };
        let (lazy, possessive) = self.lex_quantifier_suffix();
        Ok(Token::new(
            TokenKind::Quantifier { min, max, lazy, possessive },
            self.span_from(start),
            self.text_from(start),
        ))
    }

    fn lex_group_open(&mut self, start: usize) -> Result<Token> {
        if self.peek_char(1) != Some('?') {
            self.pos += 1;
            return Ok(Token::new(TokenKind::GroupOpen, self.span_from(start), self.text_from(start)));
        }
        // '(?' prefix: classify the fixed-shape modifier. `(*VERB)` is
        // intercepted by the caller before `next_token` dispatch ever
        // reaches here, since it doesn't share the `(?` prefix.
        if self.starts_with("(?#") {
            return self.lex_comment(start);
        }
        if let Some(tok) = self.try_lex_subroutine_or_python_backref(start)? {
            return Ok(tok);
        }
        self.pos += 2; // consume '(?'
        match self.peek_char(0) {
            Some(':') => {
                self.pos += 1;
                self.make_group_modifier(start)
            }
            Some('>') => {
                self.pos += 1;
                self.make_group_modifier(start)
            }
            Some('|') => {
                self.pos += 1;
                self.make_group_modifier(start)
            }
            Some('=') | Some('!') => {
                self.pos += 1;
                self.make_group_modifier(start)
            }
            Some('<') => {
                match self.peek_char(1) {
                    Some('=') | Some('!') => {
                        self.pos += 2;
                        self.make_group_modifier(start)
                    }
                    _ => {
                        self.pos += 1; // consume '<'
                        self.scan_name_then('>', start)
                    }
                }
            }
            Some('\'') => {
                self.pos += 1;
                self.scan_name_then('\'', start)
            }
            Some('(') => {
                // conditional
                self.pos += 1;
                self.lex_conditional_prefix(start)
            }
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => {
                self.lex_paren_subroutine_numbered(start)
            }
            Some('&') => {
                self.pos += 1;
                self.scan_name_then(')', start).map(|t| {
                    Token::new(TokenKind::Subroutine, t.span, t.text)
                })
            }
            Some(c) if c.is_alphabetic() => self.lex_inline_flags(start),
            _ => Err(self.err("unrecognized group modifier", start)),
        }
    }

    fn make_group_modifier(&mut self, start: usize) -> Result<Token> {
        Ok(Token::new(TokenKind::GroupModifierOpen, self.span_from(start), self.text_from(start)))
    }

    fn scan_name_then(&mut self, close: char, start: usize) -> Result<Token> {
        let name_start = self.pos;
        while matches!(self.peek_char(0), Some(c) if c != close) {
            self.pos += 1;
        }
        if self.peek_char(0) != Some(close) {
            return Err(self.err("unterminated group name", name_start));
        }
        self.pos += 1; // consume close delimiter
        Ok(Token::new(TokenKind::GroupModifierOpen, self.span_from(start), self.text_from(start)))
    }

    fn lex_comment(&mut self, start: usize) -> Result<Token> {
        self.pos += 3; // '(?#'
        while let Some(c) = self.peek_char(0) {
            if c == ')' {
                self.pos += 1;
                return Ok(Token::new(TokenKind::Comment, self.span_from(start), self.text_from(start)));
            }
            self.pos += 1;
        }
        Err(self.err("unterminated (?#...) comment", start))
    }

    fn try_lex_subroutine_or_python_backref(&mut self, start: usize) -> Result<Option<Token>> {
        if self.starts_with("(?R)") {
            self.pos += 4;
            return Ok(Some(Token::new(TokenKind::Subroutine, self.span_from(start), self.text_from(start))));
        }
        if self.starts_with("(?P=") {
            self.pos += 4;
            let name_start = self.pos;
            while matches!(self.peek_char(0), Some(c) if c != ')') {
                self.pos += 1;
            }
            if self.peek_char(0) != Some(')') {
                return Err(self.err("unterminated (?P=name) backreference", name_start));
            }
            self.pos += 1;
            return Ok(Some(Token::new(TokenKind::BackrefNamed, self.span_from(start), self.text_from(start))));
        }
        if self.starts_with("(?P>") {
            self.pos += 4;
            let name_start = self.pos;
            while matches!(self.peek_char(0), Some(c) if c != ')') {
                self.pos += 1;
            }
            if self.peek_char(0) != Some(')') {
                return Err(self.err("unterminated (?P>name) subroutine call", name_start));
            }
            self.pos += 1;
            return Ok(Some(Token::new(TokenKind::Subroutine, self.span_from(start), self.text_from(start))));
        }
        if self.starts_with("(?P<") {
            self.pos += 3; // leave '<' for scan_name_then via normal path
            return Ok(Some(self.scan_name_then('>', start)?));
        }
        Ok(None)
    }

    fn lex_paren_subroutine_numbered(&mut self, start: usize) -> Result<Token> {
        // pos is right after '(?'
        if self.peek_char(0) == Some('-') || self.peek_char(0) == Some('+') {
            self.pos += 1;
        }
        while matches!(self.peek_char(0), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_char(0) != Some(')') {
            return Err(self.err("malformed numbered subroutine call", start));
        }
        self.pos += 1;
        Ok(Token::new(TokenKind::Subroutine, self.span_from(start), self.text_from(start)))
    }

    fn lex_inline_flags(&mut self, start: usize) -> Result<Token> {
        while matches!(self.peek_char(0), Some(c) if c.is_alphabetic() || c == '-') {
            self.pos += 1;
        }
        match self.peek_char(0) {
            Some(':') => {
                self.pos += 1;
                Ok(Token::new(TokenKind::GroupModifierOpen, self.span_from(start), self.text_from(start)))
            }
            Some(')') => {
                self.pos += 1;
                // standalone flags: complete construct, no nested body to parse
                Ok(Token::new(TokenKind::GroupModifierOpen, self.span_from(start), self.text_from(start)))
            }
            _ => Err(self.err("malformed inline flag group", start)),
        }
    }

    fn lex_conditional_prefix(&mut self, start: usize) -> Result<Token> {
        // pos is right after '(?('
        match self.peek_char(0) {
            Some('?') => {
                // Lookaround condition. PCRE reuses the conditional's own
                // delimiter as the assertion's opening paren, so what
                // follows is `?=`/`?!`/`?<=`/`?<!` with no leading '(' of
                // its own. Synthesize the usual lookaround prefix text so
                // the parser's ordinary group dispatch handles it
                // unchanged; `span` still indexes the real source.
                self.pos += 1; // consume '?'
                if self.starts_with("<=") {
                    self.pos += 2;
                    return Ok(Token::new(
                        TokenKind::GroupModifierOpen,
                        self.span_from(start),
                        "(?(?<=".to_string(),
                    ));
                }
                if self.starts_with("<!") {
                    self.pos += 2;
                    return Ok(Token::new(
                        TokenKind::GroupModifierOpen,
                        self.span_from(start),
                        "(?(?<!".to_string(),
                    ));
                }
                match self.peek_char(0) {
                    Some('=') => {
                        self.pos += 1;
                        Ok(Token::new(
                            TokenKind::GroupModifierOpen,
                            self.span_from(start),
                            "(?(?=".to_string(),
                        ))
                    }
                    Some('!') => {
                        self.pos += 1;
                        Ok(Token::new(
                            TokenKind::GroupModifierOpen,
                            self.span_from(start),
                            "(?(?!".to_string(),
                        ))
                    }
                    _ => Err(self.err("malformed lookaround condition", start)),
                }
            }
            _ => {
                let cond_start = self.pos;
                while matches!(self.peek_char(0), Some(c) if c != ')') {
                    self.pos += 1;
                }
                if self.peek_char(0) != Some(')') {
                    return Err(self.err("unterminated conditional", cond_start));
                }
                self.pos += 1; // close condition's ')'
                Ok(Token::new(TokenKind::GroupModifierOpen, self.span_from(start), self.text_from(start)))
            }
        }
    }

    /// `(*VERB)` / `(*VERB:arg)`.
    fn lex_pcre_verb(&mut self, start: usize) -> Result<Token> {
        self.pos += 2; // '(*'
        while let Some(c) = self.peek_char(0) {
            if c == ')' {
                self.pos += 1;
                return Ok(Token::new(TokenKind::PcreVerb, self.span_from(start), self.text_from(start)));
            }
            self.pos += 1;
        }
        Err(self.err("unterminated (*VERB) construct", start))
    }

    fn lex_escape(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // '\'
        let Some(c) = self.peek_char(0) else {
            return Err(self.err("incomplete escape sequence", start));
        };

        if self.mode == Mode::Normal && c == 'Q' {
            self.pos += 1;
            self.mode = Mode::Quote;
            return self.next_token();
        }

        match c {
            'b' if self.mode == Mode::Normal => {
                self.pos += 1;
                Ok(Token::new(TokenKind::AssertionEscape, self.span_from(start), self.text_from(start)))
            }
            'B' | 'G' if self.mode == Mode::Normal => {
                self.pos += 1;
                Ok(Token::new(TokenKind::AssertionEscape, self.span_from(start), self.text_from(start)))
            }
            'A' | 'Z' | 'z' if self.mode == Mode::Normal => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Anchor, self.span_from(start), self.text_from(start)))
            }
            'K' if self.mode == Mode::Normal => {
                self.pos += 1;
                Ok(Token::new(TokenKind::Keep, self.span_from(start), self.text_from(start)))
            }
            'd' | 'D' | 's' | 'S' | 'w' | 'W' | 'h' | 'H' | 'v' | 'V' | 'R' | 'N' => {
                self.pos += 1;
                Ok(Token::new(TokenKind::CharTypeEscape, self.span_from(start), self.text_from(start)))
            }
            'p' | 'P' => self.lex_unicode_property(start),
            'x' => self.lex_hex_escape(start),
            'u' => self.lex_u_escape(start),
            'o' => self.lex_o_escape(start),
            '0' => self.lex_legacy_octal(start),
            '1'..='9' => self.lex_numeric_backref(start),
            'g' => self.lex_g_escape(start),
            'k' => self.lex_k_backref(start),
            _ => {
                // identity escape: the next char literally.
                self.pos += 1;
                Ok(Token::new(TokenKind::Literal, self.span_from(start), c.to_string()))
            }
        }
    }

    fn lex_unicode_property(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // p/P
        if self.peek_char(0) == Some('{') {
            self.pos += 1;
            let body_start = self.pos;
            while matches!(self.peek_char(0), Some(c) if c != '}') {
                self.pos += 1;
            }
            if self.peek_char(0) != Some('}') {
                return Err(self.err("unterminated \\p{...}", body_start));
            }
            self.pos += 1;
        } else if self.peek_char(0).is_some() {
            self.pos += 1; // single-letter short form \pL
        } else {
            return Err(self.err("incomplete \\p escape", start));
        }
        Ok(Token::new(TokenKind::UnicodeProperty, self.span_from(start), self.text_from(start)))
    }

    fn lex_hex_escape(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // 'x'
        if self.peek_char(0) == Some('{') {
            self.pos += 1;
            let body_start = self.pos;
            while matches!(self.peek_char(0), Some(c) if c != '}') {
                self.pos += 1;
            }
            if self.peek_char(0) != Some('}') {
                return Err(self.err("unterminated \\x{...}", body_start));
            }
            self.pos += 1;
        } else {
            for _ in 0..2 {
                if matches!(self.peek_char(0), Some(c) if c.is_ascii_hexdigit()) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        Ok(Token::new(TokenKind::UnicodeEscape, self.span_from(start), self.text_from(start)))
    }

    fn lex_u_escape(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // 'u'
        if self.peek_char(0) == Some('{') {
            self.pos += 1;
            let body_start = self.pos;
            while matches!(self.peek_char(0), Some(c) if c != '}') {
                self.pos += 1;
            }
            if self.peek_char(0) != Some('}') {
                return Err(self.err("unterminated \\u{...}", body_start));
            }
            self.pos += 1;
        }
        Ok(Token::new(TokenKind::UnicodeEscape, self.span_from(start), self.text_from(start)))
    }

    fn lex_o_escape(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // 'o'
        if self.peek_char(0) != Some('{') {
            return Err(self.err("expected '{' after \\o", start));
        }
        self.pos += 1;
        let body_start = self.pos;
        while matches!(self.peek_char(0), Some(c) if c != '}') {
            self.pos += 1;
        }
        if self.peek_char(0) != Some('}') {
            return Err(self.err("unterminated \\o{...}", body_start));
        }
        self.pos += 1;
        Ok(Token::new(TokenKind::Octal, self.span_from(start), self.text_from(start)))
    }

    fn lex_legacy_octal(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // '0'
        for _ in 0..2 {
            if matches!(self.peek_char(0), Some(c) if ('0'..='7').contains(&c)) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(Token::new(TokenKind::OctalLegacy, self.span_from(start), self.text_from(start)))
    }

    fn lex_numeric_backref(&mut self, start: usize) -> Result<Token> {
        while matches!(self.peek_char(0), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        Ok(Token::new(TokenKind::BackrefNumeric, self.span_from(start), self.text_from(start)))
    }

    fn lex_g_escape(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // 'g'
        match self.peek_char(0) {
            Some('{') => {
                self.pos += 1;
                let body_start = self.pos;
                let sign = matches!(self.peek_char(0), Some('-') | Some('+'));
                if sign {
                    self.pos += 1;
                }
                let digits_start = self.pos;
                while matches!(self.peek_char(0), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let is_numeric = self.pos > digits_start;
                if !is_numeric {
                    // named form \g{name}
                    while matches!(self.peek_char(0), Some(c) if c != '}') {
                        self.pos += 1;
                    }
                }
                if self.peek_char(0) != Some('}') {
                    return Err(self.err("unterminated \\g{...}", body_start));
                }
                self.pos += 1;
                Ok(Token::new(
                    if is_numeric { TokenKind::BackrefNumeric } else { TokenKind::BackrefNamed },
                    self.span_from(start),
                    self.text_from(start),
                ))
            }
            Some('\'') => {
                self.pos += 1;
                while matches!(self.peek_char(0), Some(c) if c != '\'') {
                    self.pos += 1;
                }
                if self.peek_char(0) != Some('\'') {
                    return Err(self.err("unterminated \\g'name'", start));
                }
                self.pos += 1;
                Ok(Token::new(TokenKind::BackrefNamed, self.span_from(start), self.text_from(start)))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                if c == '-' {
                    self.pos += 1;
                }
                while matches!(self.peek_char(0), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
                Ok(Token::new(TokenKind::BackrefNumeric, self.span_from(start), self.text_from(start)))
            }
            _ => Err(self.err("malformed \\g backreference", start)),
        }
    }

    fn lex_k_backref(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // 'k'
        let (open, close) = match self.peek_char(0) {
            Some('<') => ('<', '>'),
            Some('\'') => ('\'', '\''),
            Some('{') => ('{', '}'),
            _ => return Err(self.err("malformed \\k backreference", start)),
        };
        let _ = open;
        self.pos += 1;
        while matches!(self.peek_char(0), Some(c) if c != close) {
            self.pos += 1;
        }
        if self.peek_char(0) != Some(close) {
            return Err(self.err("unterminated \\k backreference", start));
        }
        self.pos += 1;
        Ok(Token::new(TokenKind::BackrefNamed, self.span_from(start), self.text_from(start)))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted_eof {
            return None;
        }
        if self.mode == Mode::Normal && self.starts_with("(*") {
            let start = self.pos;
            return Some(self.lex_pcre_verb(start));
        }
        Some(self.next_token())
    }
}
