//! Plain-English explanations of a pattern (spec.md §4.9). HTML output
//! escapes literal bytes pulled straight from the pattern text, since those
//! bytes are untrusted input being embedded in markup.

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainFormat {
    Text,
    Html,
}

pub fn explain(node: &Node, format: ExplainFormat) -> String {
    explain_node(node, format)
}

fn quote(s: &str, format: ExplainFormat) -> String {
    let escaped = match format {
        ExplainFormat::Text => s.to_string(),
        ExplainFormat::Html => html_escape(s),
    };
    format!("\"{escaped}\"")
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn explain_node(node: &Node, format: ExplainFormat) -> String {
    match node {
        Node::Regex(r) => explain_node(&r.child, format),
        Node::Sequence(s) => s
            .children
            .iter()
            .map(|c| explain_node(c, format))
            .collect::<Vec<_>>()
            .join(", followed by "),
        Node::Alternation(a) => {
            let branches: Vec<String> = a.branches.iter().map(|b| explain_node(b, format)).collect();
            format!("either {}", branches.join(", or "))
        }
        Node::Group(g) => explain_group(g, format),
        Node::Quantifier(q) => {
            format!("{} {}", explain_repetition(q), explain_node(&q.child, format))
        }
        Node::Conditional(c) => explain_conditional(c, format),
        Node::Literal(l) => format!("the text {}", quote(&l.value, format)),
        Node::Dot(_) => "any character".to_string(),
        Node::CharType(c) => explain_char_type(c.kind).to_string(),
        Node::CharClass(cc) => explain_char_class(cc, format),
        Node::Range(r) => format!("a character from {} to {}", quote(&r.start.to_string(), format), quote(&r.end.to_string(), format)),
        Node::PosixClass(p) => {
            format!("a character {}in the POSIX class \"{}\"", if p.negated { "not " } else { "" }, p.name)
        }
        Node::Anchor(a) => explain_anchor(a.kind).to_string(),
        Node::Assertion(a) => explain_assertion(a.kind).to_string(),
        Node::Keep(_) => "a reset of the reported match start (\\K)".to_string(),
        Node::Backref(b) => explain_backref(b),
        Node::Subroutine(s) => explain_subroutine(s),
        Node::UnicodeEscape(u) => format!("the code point U+{:04X}", u.code_point),
        Node::UnicodeProp(u) => {
            format!("a character {}matching the Unicode property \\p{{{}}}", if u.negated { "not " } else { "" }, u.property)
        }
        Node::Octal(o) => format!("the character with octal value {:o}", o.value),
        Node::OctalLegacy(o) => format!("the legacy-octal character {:o}", o.value),
        Node::Comment(c) => format!("(comment: {})", quote(&c.text, format)),
        Node::PcreVerb(v) => match &v.argument {
            Some(arg) => format!("the control verb (*{}:{arg})", v.name),
            None => format!("the control verb (*{})", v.name),
        },
    }
}

fn explain_repetition(q: &Quantifier) -> String {
    let reps = match (q.min, q.max) {
        (0, None) => "zero or more of".to_string(),
        (1, None) => "one or more of".to_string(),
        (0, Some(1)) => "optionally".to_string(),
        (n, Some(m)) if n == m => format!("exactly {n} of"),
        (n, None) => format!("{n} or more of"),
        (n, Some(m)) => format!("between {n} and {m} of"),
    };
    match q.mode {
        QuantifierMode::Greedy => reps,
        QuantifierMode::Lazy => format!("{reps} (as few as possible)"),
        QuantifierMode::Possessive => format!("{reps} (no backtracking)"),
    }
}

fn explain_group(g: &Group, format: ExplainFormat) -> String {
    let inner = explain_node(&g.child, format);
    match &g.kind {
        GroupKind::Capturing { index } => format!("capture group {index}: {inner}"),
        GroupKind::NonCapturing => inner,
        GroupKind::Named { name, .. } => format!("capture group \"{name}\": {inner}"),
        GroupKind::Atomic => format!("(no backtracking into) {inner}"),
        GroupKind::Lookahead { negative } => {
            format!("a position {}followed by {inner}", if *negative { "not " } else { "" })
        }
        GroupKind::Lookbehind { negative } => {
            format!("a position {}preceded by {inner}", if *negative { "not " } else { "" })
        }
        GroupKind::BranchReset => format!("one of (shared group numbers): {inner}"),
        GroupKind::InlineFlags { .. } => format!("flags applied to: {inner}"),
    }
}

fn explain_conditional(c: &Conditional, format: ExplainFormat) -> String {
    let cond = match &c.condition {
        Condition::GroupNumber(n) => format!("group {n} matched"),
        Condition::GroupName(name) => format!("group \"{name}\" matched"),
        Condition::Lookaround(n) => explain_node(n, format),
        Condition::Recursion => "this pattern is being recursed into".to_string(),
        Condition::Define => "never (a DEFINE block)".to_string(),
    };
    let yes = explain_node(&c.yes, format);
    match &c.no {
        Some(no) => format!("if {cond}, then {yes}; otherwise {}", explain_node(no, format)),
        None => format!("if {cond}, then {yes}"),
    }
}

fn explain_char_type(kind: CharTypeKind) -> &'static str {
    use CharTypeKind::*;
    match kind {
        Digit => "a digit",
        NotDigit => "a non-digit",
        Space => "a whitespace character",
        NotSpace => "a non-whitespace character",
        Word => "a word character",
        NotWord => "a non-word character",
        HorizSpace => "a horizontal whitespace character",
        NotHorizSpace => "a non-horizontal-whitespace character",
        VertSpace => "a vertical whitespace character",
        NotVertSpace => "a non-vertical-whitespace character",
        NewlineSeq => "a newline sequence",
        NotNewline => "a character that isn't part of a newline sequence",
    }
}

fn explain_char_class(cc: &CharClass, format: ExplainFormat) -> String {
    let members: Vec<String> = cc.items.iter().map(|item| explain_class_item(item, format)).collect();
    format!("a character {}in the set: {}", if cc.negated { "not " } else { "" }, members.join(", "))
}

fn explain_class_item(item: &ClassItem, format: ExplainFormat) -> String {
    match item {
        ClassItem::Literal(l) => quote(&l.value.to_string(), format),
        ClassItem::Range(r) => format!("{}-{}", quote(&r.start.to_string(), format), quote(&r.end.to_string(), format)),
        ClassItem::CharType(c) => explain_char_type(c.kind).to_string(),
        ClassItem::Posix(p) => format!("POSIX \"{}\"", p.name),
        ClassItem::UnicodeProp(u) => format!("\\p{{{}}}", u.property),
        ClassItem::UnicodeEscape(u) => format!("U+{:04X}", u.code_point),
    }
}

fn explain_anchor(kind: AnchorKind) -> &'static str {
    match kind {
        AnchorKind::Caret => "the start of the line",
        AnchorKind::Dollar => "the end of the line",
        AnchorKind::StringStart => "the start of the subject string",
        AnchorKind::StringEndBeforeNewline => "the end of the subject string (or before a trailing newline)",
        AnchorKind::StringEnd => "the absolute end of the subject string",
    }
}

fn explain_assertion(kind: AssertionKind) -> &'static str {
    match kind {
        AssertionKind::WordBoundary => "a word boundary",
        AssertionKind::NotWordBoundary => "a position that is not a word boundary",
        AssertionKind::ContinuationPoint => "the point where the previous match ended",
        AssertionKind::Define => "nothing (a DEFINE marker)",
    }
}

fn explain_backref(b: &Backref) -> String {
    match (&b.name, b.index) {
        (Some(name), _) => format!("whatever capture group \"{name}\" matched"),
        (None, Some(index)) if b.relative => format!("whatever the group {index:+} relative to here matched"),
        (None, Some(index)) => format!("whatever capture group {index} matched"),
        (None, None) => "whatever the referenced group matched".to_string(),
    }
}

fn explain_subroutine(s: &Subroutine) -> String {
    match &s.reference {
        SubroutineRef::WholePattern => "the whole pattern, recursively".to_string(),
        SubroutineRef::Numbered(n) => format!("group {n}'s pattern again"),
        SubroutineRef::Named(name) => format!("group \"{name}\"'s pattern again"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn explain_body(body: &str, format: ExplainFormat) -> String {
        let ast = parse_pattern(body, "", ParserLimits::default()).unwrap();
        explain(&ast, format)
    }

    #[test]
    fn explains_literal() {
        assert_eq!(explain_body("abc", ExplainFormat::Text), "the text \"a\", followed by the text \"b\", followed by the text \"c\"");
    }

    #[test]
    fn explains_quantified_digit() {
        let text = explain_body("\\d+", ExplainFormat::Text);
        assert!(text.contains("one or more of"));
        assert!(text.contains("a digit"));
    }

    #[test]
    fn html_escapes_untrusted_literal_bytes() {
        let ast = parse_pattern("<b>", "", ParserLimits::default()).unwrap();
        let text = explain(&ast, ExplainFormat::Html);
        assert!(text.contains("&lt;"));
        assert!(text.contains("&gt;"));
        assert!(!text.contains("\"<\""));
        assert!(!text.contains("\">\""));
    }

    #[test]
    fn explains_named_group_and_backref() {
        let text = explain_body("(?<x>a)\\k<x>", ExplainFormat::Text);
        assert!(text.contains("capture group \"x\""));
        assert!(text.contains("whatever capture group \"x\" matched"));
    }
}
