//! The immutable AST (spec.md §3.3): 23 node variants plus the `GroupKind`
//! and `QuantifierMode` enums. Built once by the parser; rewrites produce
//! new trees, never mutate existing ones.

use crate::token::Span;
use serde::{Deserialize, Serialize};

/// Repetition mode of a `Quantifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantifierMode {
    Greedy,
    Lazy,
    Possessive,
}

/// The syntactic kind of a parenthesized group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GroupKind {
    Capturing { index: u32 },
    NonCapturing,
    Named { index: u32, name: String },
    Atomic,
    Lookahead { negative: bool },
    Lookbehind { negative: bool },
    BranchReset,
    InlineFlags { standalone: bool },
}

/// How a named group's syntax was spelled in the source, so the compiler
/// can reproduce it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSyntax {
    /// `(?<name>...)`
    Standard,
    /// `(?P<name>...)`
    Python,
    /// `(?'name'...)`
    Quoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Caret,
    Dollar,
    StringStart,
    StringEndBeforeNewline,
    StringEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    WordBoundary,
    NotWordBoundary,
    ContinuationPoint,
    Define,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharTypeKind {
    Digit,
    NotDigit,
    Space,
    NotSpace,
    Word,
    NotWord,
    HorizSpace,
    NotHorizSpace,
    VertSpace,
    NotVertSpace,
    NewlineSeq,
    NotNewline,
}

impl CharTypeKind {
    pub fn letter(self) -> char {
        match self {
            CharTypeKind::Digit => 'd',
            CharTypeKind::NotDigit => 'D',
            CharTypeKind::Space => 's',
            CharTypeKind::NotSpace => 'S',
            CharTypeKind::Word => 'w',
            CharTypeKind::NotWord => 'W',
            CharTypeKind::HorizSpace => 'h',
            CharTypeKind::NotHorizSpace => 'H',
            CharTypeKind::VertSpace => 'v',
            CharTypeKind::NotVertSpace => 'V',
            CharTypeKind::NewlineSeq => 'R',
            CharTypeKind::NotNewline => 'N',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        use CharTypeKind::*;
        Some(match c {
            'd' => Digit,
            'D' => NotDigit,
            's' => Space,
            'S' => NotSpace,
            'w' => Word,
            'W' => NotWord,
            'h' => HorizSpace,
            'H' => NotHorizSpace,
            'v' => VertSpace,
            'V' => NotVertSpace,
            'R' => NewlineSeq,
            'N' => NotNewline,
            _ => return None,
        })
    }

    /// Is this char-type's negation itself a char-type letter (true for the
    /// `\d`/`\s`/`\w` family, false for `\h \v \R \N` which have no single
    /// negated-letter counterpart token but are still representable).
    pub fn negated(self) -> Self {
        use CharTypeKind::*;
        match self {
            Digit => NotDigit,
            NotDigit => Digit,
            Space => NotSpace,
            NotSpace => Space,
            Word => NotWord,
            NotWord => Word,
            HorizSpace => NotHorizSpace,
            NotHorizSpace => HorizSpace,
            VertSpace => NotVertSpace,
            NotVertSpace => VertSpace,
            NewlineSeq => NotNewline,
            NotNewline => NewlineSeq,
        }
    }
}

/// Reference target of a `\g{...}`, `(?R)`, `(?N)`, `(?&name)` subroutine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubroutineRef {
    WholePattern,
    Numbered(i32),
    Named(String),
}

/// The original textual form of a subroutine call, preserved for round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubroutineForm {
    /// `(?R)`
    RecurseWhole,
    /// `(?N)` / `(?-N)` / `(?+N)`
    RecurseNumbered,
    /// `(?&name)`
    RecurseNamed,
    /// `(?P>name)`
    RecursePython,
}

/// The condition of a `Conditional` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// May be negative/relative, e.g. `(?(-1)...)`.
    GroupNumber(i32),
    GroupName(String),
    Lookaround(Box<Node>),
    Recursion,
    Define,
}

// ---- Leaf payload structs (one per variant carrying extra state) ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regex {
    pub span: Span,
    pub child: Box<Node>,
    pub flags: String,
    pub delimiter: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub span: Span,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternation {
    pub span: Span,
    pub branches: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub span: Span,
    pub kind: GroupKind,
    pub child: Box<Node>,
    pub name_syntax: Option<NameSyntax>,
    pub flags_set: Option<String>,
    pub flags_unset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantifier {
    pub span: Span,
    pub child: Box<Node>,
    pub min: u32,
    /// `None` = unbounded (`*`, `+`, `{n,}`).
    pub max: Option<u32>,
    pub mode: QuantifierMode,
    pub canonical_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub span: Span,
    pub condition: Condition,
    pub yes: Box<Node>,
    pub no: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub span: Span,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharType {
    pub span: Span,
    pub kind: CharTypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharClass {
    pub span: Span,
    pub negated: bool,
    pub items: Vec<ClassItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClassItem {
    Literal(ClassLiteral),
    Range(Range),
    CharType(CharType),
    Posix(PosixClass),
    UnicodeProp(UnicodeProp),
    UnicodeEscape(UnicodeEscape),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLiteral {
    pub span: Span,
    pub value: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub span: Span,
    pub start: char,
    pub end: char,
    pub hyphenated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixClass {
    pub span: Span,
    pub name: String,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub span: Span,
    pub kind: AnchorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub span: Span,
    pub kind: AssertionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keep {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backref {
    pub span: Span,
    pub index: Option<i32>,
    pub name: Option<String>,
    pub relative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subroutine {
    pub span: Span,
    pub reference: SubroutineRef,
    pub form: SubroutineForm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicodeEscape {
    pub span: Span,
    pub code_point: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicodeProp {
    pub span: Span,
    pub property: String,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Octal {
    pub span: Span,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OctalLegacy {
    pub span: Span,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcreVerb {
    pub span: Span,
    pub name: String,
    pub argument: Option<String>,
}

/// The closed tagged-variant AST. Every analyzer matches exhaustively over
/// this enum (DESIGN NOTES §9: "a closed tagged variant with exhaustive
/// match per analyzer").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Regex(Regex),
    Sequence(Sequence),
    Alternation(Alternation),
    Group(Group),
    Quantifier(Quantifier),
    Conditional(Conditional),
    Literal(Literal),
    Dot(Dot),
    CharType(CharType),
    CharClass(CharClass),
    Range(Range),
    PosixClass(PosixClass),
    Anchor(Anchor),
    Assertion(Assertion),
    Keep(Keep),
    Backref(Backref),
    Subroutine(Subroutine),
    UnicodeEscape(UnicodeEscape),
    UnicodeProp(UnicodeProp),
    Octal(Octal),
    OctalLegacy(OctalLegacy),
    Comment(Comment),
    PcreVerb(PcreVerb),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Regex(n) => n.span,
            Node::Sequence(n) => n.span,
            Node::Alternation(n) => n.span,
            Node::Group(n) => n.span,
            Node::Quantifier(n) => n.span,
            Node::Conditional(n) => n.span,
            Node::Literal(n) => n.span,
            Node::Dot(n) => n.span,
            Node::CharType(n) => n.span,
            Node::CharClass(n) => n.span,
            Node::Range(n) => n.span,
            Node::PosixClass(n) => n.span,
            Node::Anchor(n) => n.span,
            Node::Assertion(n) => n.span,
            Node::Keep(n) => n.span,
            Node::Backref(n) => n.span,
            Node::Subroutine(n) => n.span,
            Node::UnicodeEscape(n) => n.span,
            Node::UnicodeProp(n) => n.span,
            Node::Octal(n) => n.span,
            Node::OctalLegacy(n) => n.span,
            Node::Comment(n) => n.span,
            Node::PcreVerb(n) => n.span,
        }
    }

    /// Direct children in source order (the traversal primitive's building block).
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Regex(n) => vec![&n.child],
            Node::Sequence(n) => n.children.iter().collect(),
            Node::Alternation(n) => n.branches.iter().collect(),
            Node::Group(n) => vec![&n.child],
            Node::Quantifier(n) => vec![&n.child],
            Node::Conditional(n) => {
                let mut v = Vec::new();
                if let Condition::Lookaround(la) = &n.condition {
                    v.push(la.as_ref());
                }
                v.push(&n.yes);
                if let Some(no) = &n.no {
                    v.push(no.as_ref());
                }
                v
            }
            // `CharClass` items are `ClassItem`, not `Node` — they have no
            // children in this traversal.
            _ => Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// A short, stable label used by lints/explanations ("literal", "group", ...).
    pub fn label(&self) -> &'static str {
        match self {
            Node::Regex(_) => "regex",
            Node::Sequence(_) => "sequence",
            Node::Alternation(_) => "alternation",
            Node::Group(_) => "group",
            Node::Quantifier(_) => "quantifier",
            Node::Conditional(_) => "conditional",
            Node::Literal(_) => "literal",
            Node::Dot(_) => "dot",
            Node::CharType(_) => "char_type",
            Node::CharClass(_) => "char_class",
            Node::Range(_) => "range",
            Node::PosixClass(_) => "posix_class",
            Node::Anchor(_) => "anchor",
            Node::Assertion(_) => "assertion",
            Node::Keep(_) => "keep",
            Node::Backref(_) => "backref",
            Node::Subroutine(_) => "subroutine",
            Node::UnicodeEscape(_) => "unicode_escape",
            Node::UnicodeProp(_) => "unicode_prop",
            Node::Octal(_) => "octal",
            Node::OctalLegacy(_) => "octal_legacy",
            Node::Comment(_) => "comment",
            Node::PcreVerb(_) => "pcre_verb",
        }
    }
}
