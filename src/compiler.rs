//! AST → PCRE2 pattern text (spec.md §4.4). `compile` always round-trips:
//! `parse(compile(ast))` produces a tree equivalent to `ast` (the exact
//! textual spelling may differ — a relative backref might come back as
//! `\g{+1}` even if written `\g+1`, a named group keeps its syntax via
//! `name_syntax`, etc.). `pretty` additionally canonicalizes whitespace for
//! `x`-flag patterns, laying one sub-pattern per line, while leaving
//! `(?#...)` comment text untouched (Open Question: pretty-print,
//! SPEC_FULL.md §5).

use crate::ast::*;
use crate::errors::Result;

/// Render `node` (the body of a pattern, not `Node::Regex` itself) as
/// minimal PCRE2 text.
pub fn compile(node: &Node) -> String {
    match node {
        Node::Regex(r) => {
            let close = closing_delimiter(r.delimiter);
            format!("{}{}{close}{}", r.delimiter, compile(&r.child), r.flags)
        }
        Node::Sequence(s) => s.children.iter().map(compile).collect(),
        Node::Alternation(a) => a.branches.iter().map(compile).collect::<Vec<_>>().join("|"),
        Node::Group(g) => compile_group(g),
        Node::Quantifier(q) => {
            let base = compile(&q.child);
            let range = render_quantifier(q.min, q.max);
            let suffix = match q.mode {
                QuantifierMode::Greedy => "",
                QuantifierMode::Lazy => "?",
                QuantifierMode::Possessive => "+",
            };
            format!("{base}{range}{suffix}")
        }
        Node::Conditional(c) => compile_conditional(c),
        Node::Literal(l) => escape_literal(&l.value),
        Node::Dot(_) => ".".to_string(),
        Node::CharType(c) => format!("\\{}", c.kind.letter()),
        Node::CharClass(cc) => compile_char_class(cc),
        Node::Range(r) => format!("{}-{}", escape_class_char(r.start), escape_class_char(r.end)),
        Node::PosixClass(p) => format!("[:{}{}:]", if p.negated { "^" } else { "" }, p.name),
        Node::Anchor(a) => match a.kind {
            AnchorKind::Caret => "^".to_string(),
            AnchorKind::Dollar => "$".to_string(),
            AnchorKind::StringStart => "\\A".to_string(),
            AnchorKind::StringEndBeforeNewline => "\\Z".to_string(),
            AnchorKind::StringEnd => "\\z".to_string(),
        },
        Node::Assertion(a) => match a.kind {
            AssertionKind::WordBoundary => "\\b".to_string(),
            AssertionKind::NotWordBoundary => "\\B".to_string(),
            AssertionKind::ContinuationPoint => "\\G".to_string(),
            AssertionKind::Define => String::new(),
        },
        Node::Keep(_) => "\\K".to_string(),
        Node::Backref(b) => compile_backref(b),
        Node::Subroutine(s) => compile_subroutine(s),
        Node::UnicodeEscape(u) => format!("\\x{{{:x}}}", u.code_point),
        Node::UnicodeProp(u) => format!("\\{}{{{}}}", if u.negated { "P" } else { "p" }, u.property),
        Node::Octal(o) => format!("\\o{{{:o}}}", o.value),
        Node::OctalLegacy(o) => format!("\\{:o}", o.value),
        Node::Comment(c) => format!("(?#{})", c.text),
        Node::PcreVerb(v) => match &v.argument {
            Some(arg) => format!("(*{}:{arg})", v.name),
            None => format!("(*{})", v.name),
        },
    }
}

fn compile_group(g: &Group) -> String {
    let inner = compile(&g.child);
    match &g.kind {
        GroupKind::Capturing { .. } => format!("({inner})"),
        GroupKind::NonCapturing => format!("(?:{inner})"),
        GroupKind::Named { name, .. } => match g.name_syntax {
            Some(NameSyntax::Python) => format!("(?P<{name}>{inner})"),
            Some(NameSyntax::Quoted) => format!("(?'{name}'{inner})"),
            _ => format!("(?<{name}>{inner})"),
        },
        GroupKind::Atomic => format!("(?>{inner})"),
        GroupKind::Lookahead { negative } => {
            format!("(?{}{inner})", if *negative { "!" } else { "=" })
        }
        GroupKind::Lookbehind { negative } => {
            format!("(?<{}{inner})", if *negative { "!" } else { "=" })
        }
        GroupKind::BranchReset => format!("(?|{inner})"),
        GroupKind::InlineFlags { standalone } => {
            let flags = render_flags(&g.flags_set, &g.flags_unset);
            if *standalone {
                format!("(?{flags}){inner}")
            } else {
                format!("(?{flags}:{inner})")
            }
        }
    }
}

fn compile_conditional(c: &Conditional) -> String {
    let cond = match &c.condition {
        Condition::GroupNumber(n) => n.to_string(),
        Condition::GroupName(name) => format!("<{name}>"),
        Condition::Recursion => "R".to_string(),
        Condition::Define => "DEFINE".to_string(),
        Condition::Lookaround(node) => {
            let text = compile(node);
            // Strip the lookaround's own enclosing parens: the conditional
            // supplies its own via "(?(" ... ")".
            text[1..text.len() - 1].to_string()
        }
    };
    let yes = compile(&c.yes);
    let no = c.no.as_ref().map(|n| format!("|{}", compile(n))).unwrap_or_default();
    format!("(?({cond}){yes}{no})")
}

fn compile_backref(b: &Backref) -> String {
    if let Some(name) = &b.name {
        return format!("\\k<{name}>");
    }
    let index = b.index.unwrap_or(0);
    if b.relative {
        format!("\\g{{{index:+}}}")
    } else {
        format!("\\{index}")
    }
}

fn compile_subroutine(s: &Subroutine) -> String {
    match &s.reference {
        SubroutineRef::WholePattern => "(?R)".to_string(),
        SubroutineRef::Numbered(n) => format!("(?{n})"),
        SubroutineRef::Named(name) => match s.form {
            SubroutineForm::RecursePython => format!("(?P>{name})"),
            _ => format!("(?&{name})"),
        },
    }
}

fn compile_char_class(cc: &CharClass) -> String {
    let mut out = String::from("[");
    if cc.negated {
        out.push('^');
    }
    for item in &cc.items {
        out.push_str(&compile_class_item(item));
    }
    out.push(']');
    out
}

fn compile_class_item(item: &ClassItem) -> String {
    match item {
        ClassItem::Literal(l) => escape_class_char(l.value),
        ClassItem::Range(r) => format!("{}-{}", escape_class_char(r.start), escape_class_char(r.end)),
        ClassItem::CharType(c) => format!("\\{}", c.kind.letter()),
        ClassItem::Posix(p) => format!("[:{}{}:]", if p.negated { "^" } else { "" }, p.name),
        ClassItem::UnicodeProp(u) => format!("\\{}{{{}}}", if u.negated { "P" } else { "p" }, u.property),
        ClassItem::UnicodeEscape(u) => format!("\\x{{{:x}}}", u.code_point),
    }
}

fn render_quantifier(min: u32, max: Option<u32>) -> String {
    match (min, max) {
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        (0, Some(1)) => "?".to_string(),
        (n, Some(m)) if n == m => format!("{{{n}}}"),
        (n, None) => format!("{{{n},}}"),
        (n, Some(m)) => format!("{{{n},{m}}}"),
    }
}

fn render_flags(set: &Option<String>, unset: &Option<String>) -> String {
    let mut s = set.clone().unwrap_or_default();
    if let Some(unset) = unset {
        s.push('-');
        s.push_str(unset);
    }
    s
}

fn closing_delimiter(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    }
}

fn escape_literal(value: &str) -> String {
    value.chars().map(escape_literal_char).collect()
}

fn escape_literal_char(c: char) -> String {
    match c {
        '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' | '/' => {
            format!("\\{c}")
        }
        c if c.is_control() => format!("\\x{{{:x}}}", c as u32),
        _ => c.to_string(),
    }
}

fn escape_class_char(c: char) -> String {
    match c {
        ']' | '\\' | '^' | '-' => format!("\\{c}"),
        c if c.is_control() => format!("\\x{{{:x}}}", c as u32),
        _ => c.to_string(),
    }
}

/// Pretty-printed form: one sub-pattern per line, indented by nesting
/// depth, with `x`-flag-style free spacing. Comment text is copied
/// verbatim (Open Question #4: whitespace is canonicalized, comments are not).
pub fn pretty(node: &Node) -> Result<String> {
    let mut out = String::new();
    pretty_at(node, 0, &mut out);
    Ok(out)
}

fn indent(depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
}

fn pretty_at(node: &Node, depth: usize, out: &mut String) {
    match node {
        Node::Regex(r) => pretty_at(&r.child, depth, out),
        Node::Sequence(s) => {
            for child in &s.children {
                indent(depth, out);
                pretty_at(child, depth, out);
                out.push('\n');
            }
            if !out.is_empty() && out.ends_with('\n') {
                out.pop();
            }
        }
        Node::Alternation(a) => {
            for (i, branch) in a.branches.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                    indent(depth, out);
                    out.push_str("| ");
                }
                pretty_at(branch, depth, out);
            }
        }
        Node::Group(g) => {
            out.push_str(&compile_group_open(g));
            out.push('\n');
            pretty_at(&g.child, depth + 1, out);
            out.push('\n');
            indent(depth, out);
            out.push(')');
        }
        Node::Comment(c) => out.push_str(&format!("(?#{})", c.text)),
        other => out.push_str(&compile(other)),
    }
}

fn compile_group_open(g: &Group) -> String {
    match &g.kind {
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
        GroupKind::InlineFlags { standalone } => {
            let flags = render_flags(&g.flags_set, &g.flags_unset);
            if *standalone {
                format!("(?{flags})")
            } else {
                format!("(?{flags}:")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn roundtrip(body: &str) {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        let text = compile(&ast);
        let reparsed = parse_pattern(&text, "", ParserLimits::default()).unwrap();
        assert_eq!(ast, reparsed, "round-trip mismatch for {body:?}: compiled to {text:?}");
    }

    #[test]
    fn roundtrips_literals_and_quantifiers() {
        roundtrip("abc");
        roundtrip("a*b+c?");
        roundtrip("a{2,5}");
        roundtrip("a{3}");
    }

    #[test]
    fn roundtrips_groups() {
        roundtrip("(abc)");
        roundtrip("(?:abc)");
        roundtrip("(?<name>abc)");
        roundtrip("(?P<name>abc)");
        roundtrip("(?'name'abc)");
        roundtrip("(?>abc)");
        roundtrip("(?=abc)");
        roundtrip("(?!abc)");
        roundtrip("(?<=abc)");
        roundtrip("(?<!abc)");
    }

    #[test]
    fn roundtrips_char_classes() {
        roundtrip("[a-z0-9_]");
        roundtrip("[^a-z]");
        roundtrip("[[:alpha:]]");
    }

    #[test]
    fn roundtrips_alternation_and_backrefs() {
        roundtrip("(a)|(b)\\1\\2");
        roundtrip("(?<x>a)\\k<x>");
    }

    #[test]
    fn roundtrips_conditional() {
        roundtrip("(?(1)a|b)");
        roundtrip("(?(?=a)b|c)");
    }

    #[test]
    fn escapes_metacharacters_in_literals() {
        let ast = parse_pattern("a\\.b", "", ParserLimits::default()).unwrap();
        assert_eq!(compile(&ast), "a\\.b");
    }
}
