//! Syntax highlighting (spec.md §4.9): tokenizes the AST into styled spans
//! covering every variant, then renders them for a console (ANSI) or a web
//! page (HTML `<span class="...">`). Comment text is emitted verbatim,
//! never reformatted.

use crate::ast::*;
use crate::compiler::compile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightClass {
    Literal,
    Escape,
    CharClass,
    Quantifier,
    Group,
    Alternation,
    Anchor,
    Backref,
    Comment,
    Flag,
    Verb,
}

#[derive(Debug, Clone)]
pub struct HighlightToken {
    pub text: String,
    pub class: HighlightClass,
}

pub fn highlight(node: &Node) -> Vec<HighlightToken> {
    let mut tokens = Vec::new();
    emit(node, &mut tokens);
    tokens
}

fn push(tokens: &mut Vec<HighlightToken>, text: impl Into<String>, class: HighlightClass) {
    tokens.push(HighlightToken { text: text.into(), class });
}

fn emit(node: &Node, tokens: &mut Vec<HighlightToken>) {
    match node {
        Node::Regex(r) => emit(&r.child, tokens),
        Node::Sequence(s) => {
            for child in &s.children {
                emit(child, tokens);
            }
        }
        Node::Alternation(a) => {
            for (i, branch) in a.branches.iter().enumerate() {
                if i > 0 {
                    push(tokens, "|", HighlightClass::Alternation);
                }
                emit(branch, tokens);
            }
        }
        Node::Group(g) => emit_group(g, tokens),
        Node::Quantifier(q) => {
            emit(&q.child, tokens);
            let suffix = match q.mode {
                QuantifierMode::Greedy => "",
                QuantifierMode::Lazy => "?",
                QuantifierMode::Possessive => "+",
            };
            push(tokens, format!("{}{suffix}", render_quantifier_range(q.min, q.max)), HighlightClass::Quantifier);
        }
        Node::Conditional(c) => emit_conditional(c, tokens),
        Node::Literal(_) => push(tokens, compile(node), HighlightClass::Literal),
        Node::Dot(_) => push(tokens, ".", HighlightClass::Escape),
        Node::CharType(c) => push(tokens, format!("\\{}", c.kind.letter()), HighlightClass::Escape),
        Node::CharClass(cc) => push(tokens, compile_char_class_text(cc), HighlightClass::CharClass),
        Node::Range(_) | Node::PosixClass(_) => push(tokens, compile(node), HighlightClass::CharClass),
        Node::Anchor(_) => push(tokens, compile(node), HighlightClass::Anchor),
        Node::Assertion(_) => push(tokens, compile(node), HighlightClass::Anchor),
        Node::Keep(_) => push(tokens, "\\K", HighlightClass::Anchor),
        Node::Backref(_) | Node::Subroutine(_) => push(tokens, compile(node), HighlightClass::Backref),
        Node::UnicodeEscape(_) | Node::UnicodeProp(_) | Node::Octal(_) | Node::OctalLegacy(_) => {
            push(tokens, compile(node), HighlightClass::Escape)
        }
        Node::Comment(c) => push(tokens, format!("(?#{})", c.text), HighlightClass::Comment),
        Node::PcreVerb(_) => push(tokens, compile(node), HighlightClass::Verb),
    }
}

fn compile_char_class_text(cc: &CharClass) -> String {
    compile(&Node::CharClass(cc.clone()))
}

fn emit_group(g: &Group, tokens: &mut Vec<HighlightToken>) {
    let (open, close) = group_delimiters(g);
    push(tokens, open, HighlightClass::Group);
    emit(&g.child, tokens);
    push(tokens, close, HighlightClass::Group);
}

fn group_delimiters(g: &Group) -> (String, &'static str) {
    let open = match &g.kind {
        GroupKind::Capturing { .. } => "(".to_string(),
        GroupKind::NonCapturing => "(?:".to_string(),
        GroupKind::Named { name, .. } => match g.name_syntax {
            Some(NameSyntax::Python) => format!("(?P<{name}>"),
            Some(NameSyntax::Quoted) => format!("(?'{name}'"),
            _ => format!("(?<{name}>"),
        },
        GroupKind::Atomic => "(?>".to_string(),
        GroupKind::Lookahead { negative } => format!("(?{}", if *negative { "!" } else { "=" }),
        GroupKind::Lookbehind { negative } => format!("(?<{}", if *negative { "!" } else { "=" }),
        GroupKind::BranchReset => "(?|".to_string(),
        GroupKind::InlineFlags { .. } => "(?".to_string(),
    };
    (open, ")")
}

fn emit_conditional(c: &Conditional, tokens: &mut Vec<HighlightToken>) {
    push(tokens, "(?(", HighlightClass::Group);
    match &c.condition {
        Condition::GroupNumber(n) => push(tokens, n.to_string(), HighlightClass::Backref),
        Condition::GroupName(name) => push(tokens, format!("<{name}>"), HighlightClass::Backref),
        Condition::Recursion => push(tokens, "R", HighlightClass::Backref),
        Condition::Define => push(tokens, "DEFINE", HighlightClass::Flag),
        Condition::Lookaround(node) => emit(node, tokens),
    }
    push(tokens, ")", HighlightClass::Group);
    emit(&c.yes, tokens);
    if let Some(no) = &c.no {
        push(tokens, "|", HighlightClass::Alternation);
        emit(no, tokens);
    }
}

fn render_quantifier_range(min: u32, max: Option<u32>) -> String {
    match (min, max) {
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        (0, Some(1)) => "?".to_string(),
        (n, Some(m)) if n == m => format!("{{{n}}}"),
        (n, None) => format!("{{{n},}}"),
        (n, Some(m)) => format!("{{{n},{m}}}"),
    }
}

pub fn render_ansi(tokens: &[HighlightToken]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push_str(ansi_code(t.class));
        out.push_str(&t.text);
        out.push_str("\x1b[0m");
    }
    out
}

fn ansi_code(class: HighlightClass) -> &'static str {
    match class {
        HighlightClass::Literal => "\x1b[0m",
        HighlightClass::Escape => "\x1b[36m",
        HighlightClass::CharClass => "\x1b[32m",
        HighlightClass::Quantifier => "\x1b[33m",
        HighlightClass::Group => "\x1b[35m",
        HighlightClass::Alternation => "\x1b[35m",
        HighlightClass::Anchor => "\x1b[34m",
        HighlightClass::Backref => "\x1b[31m",
        HighlightClass::Comment => "\x1b[90m",
        HighlightClass::Flag => "\x1b[33m",
        HighlightClass::Verb => "\x1b[31m",
    }
}

pub fn render_html(tokens: &[HighlightToken]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push_str(&format!("<span class=\"{}\">{}</span>", html_class(t.class), html_escape(&t.text)));
    }
    out
}

fn html_class(class: HighlightClass) -> &'static str {
    match class {
        HighlightClass::Literal => "pcre-literal",
        HighlightClass::Escape => "pcre-escape",
        HighlightClass::CharClass => "pcre-char-class",
        HighlightClass::Quantifier => "pcre-quantifier",
        HighlightClass::Group => "pcre-group",
        HighlightClass::Alternation => "pcre-alternation",
        HighlightClass::Anchor => "pcre-anchor",
        HighlightClass::Backref => "pcre-backref",
        HighlightClass::Comment => "pcre-comment",
        HighlightClass::Flag => "pcre-flag",
        HighlightClass::Verb => "pcre-verb",
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn highlight_body(body: &str) -> Vec<HighlightToken> {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        highlight(&ast)
    }

    #[test]
    fn covers_literal_and_quantifier() {
        let tokens = highlight_body("a+");
        assert!(tokens.iter().any(|t| t.class == HighlightClass::Literal));
        assert!(tokens.iter().any(|t| t.class == HighlightClass::Quantifier && t.text == "+"));
    }

    #[test]
    fn covers_groups_and_alternation() {
        let tokens = highlight_body("(a|b)");
        assert!(tokens.iter().any(|t| t.class == HighlightClass::Group));
        assert!(tokens.iter().any(|t| t.class == HighlightClass::Alternation));
    }

    #[test]
    fn preserves_comment_text() {
        let tokens = highlight_body("a(?#note)b");
        assert!(tokens.iter().any(|t| t.class == HighlightClass::Comment && t.text == "(?#note)"));
    }

    #[test]
    fn ansi_render_resets_after_each_token() {
        let tokens = highlight_body("a");
        let rendered = render_ansi(&tokens);
        assert!(rendered.ends_with("\x1b[0m"));
    }

    #[test]
    fn html_render_escapes_and_classes() {
        let tokens = highlight_body("<");
        let rendered = render_html(&tokens);
        assert!(rendered.contains("pcre-literal"));
        assert!(rendered.contains("&lt;"));
    }
}
