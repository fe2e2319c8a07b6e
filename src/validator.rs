//! Semantic well-formedness checks (spec.md §4.5). A single traversal
//! accumulates group bookkeeping, backref/subroutine call sites, and
//! lookaround/quantifier nesting state; a second pass resolves references
//! that can only be checked once the whole tree is known (backrefs to
//! groups defined later in the pattern, forward conditionals).

use crate::ast::*;
use crate::unicode;
use crate::visitor::{walk, Visitor};
use std::collections::{HashMap, HashSet};

/// Letters PCRE2 recognizes in a flags string (spec.md §6 / Open Question 1).
const RECOGNIZED_FLAGS: &str = "imsxuUJADXr";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    pub offset: usize,
}

impl ValidationError {
    fn new(code: &str, message: impl Into<String>, offset: usize) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

struct BackrefSite {
    offset: usize,
    index: Option<i32>,
    name: Option<String>,
    relative: bool,
    groups_opened_before: u32,
}

struct ConditionSite {
    offset: usize,
    condition: Condition,
    groups_opened_before: u32,
}

struct Collector {
    strict: bool,
    allow_duplicate_names: bool,
    groups_opened: u32,
    group_indices: HashSet<u32>,
    named_groups: HashMap<String, u32>,
    branch_reset_depth: usize,
    lookbehind_depth: usize,
    unbounded_stack: Vec<bool>,
    backrefs: Vec<BackrefSite>,
    conditions: Vec<ConditionSite>,
    errors: Vec<ValidationError>,
}

impl Visitor for Collector {
    fn enter(&mut self, node: &Node, _depth: usize) -> bool {
        match node {
            Node::Group(g) => self.enter_group(g),
            Node::Keep(_) => {
                if self.lookbehind_depth > 0 {
                    self.errors.push(ValidationError::new(
                        "KEEP_IN_LOOKBEHIND",
                        "\\K is not allowed inside a lookbehind",
                        node.span().start,
                    ));
                }
            }
            Node::Quantifier(q) => {
                let unbounded = q.max.is_none();
                if let Some(max) = q.max {
                    if q.min > max {
                        self.errors.push(ValidationError::new(
                            "QUANTIFIER_RANGE",
                            format!("quantifier minimum {} exceeds maximum {max}", q.min),
                            node.span().start,
                        ));
                    }
                }
                if self.strict && unbounded && self.unbounded_stack.iter().any(|&b| b) {
                    self.errors.push(ValidationError::new(
                        "NESTED_UNBOUNDED_QUANTIFIER",
                        "an unbounded quantifier repeats a subtree that itself repeats unboundedly",
                        node.span().start,
                    ));
                }
                self.unbounded_stack.push(unbounded);
            }
            Node::Backref(b) => {
                self.backrefs.push(BackrefSite {
                    offset: node.span().start,
                    index: b.index,
                    name: b.name.clone(),
                    relative: b.relative,
                    groups_opened_before: self.groups_opened,
                });
            }
            Node::Conditional(c) => {
                self.conditions.push(ConditionSite {
                    offset: node.span().start,
                    condition: c.condition.clone(),
                    groups_opened_before: self.groups_opened,
                });
            }
            Node::CharClass(cc) => self.check_char_class(cc, node.span().start),
            Node::Range(r) => self.check_range(r, node.span().start),
            Node::PosixClass(p) => self.check_posix(p, node.span().start),
            Node::UnicodeProp(u) => self.check_unicode_prop(u, node.span().start),
            Node::UnicodeEscape(u) => self.check_unicode_escape(u, node.span().start),
            _ => {}
        }
        true
    }

    fn leave(&mut self, node: &Node, _depth: usize) {
        match node {
            Node::Group(g) => self.leave_group(g),
            Node::Quantifier(_) => {
                self.unbounded_stack.pop();
            }
            _ => {}
        }
    }
}

impl Collector {
    fn enter_group(&mut self, g: &Group) {
        match &g.kind {
            GroupKind::Capturing { index } => {
                self.groups_opened += 1;
                self.group_indices.insert(*index);
            }
            GroupKind::Named { index, name } => {
                self.groups_opened += 1;
                self.group_indices.insert(*index);
                if self.named_groups.contains_key(name)
                    && !self.allow_duplicate_names
                    && self.branch_reset_depth == 0
                {
                    self.errors.push(ValidationError::new(
                        "DUPLICATE_GROUP_NAME",
                        format!("group name '{name}' is already in use"),
                        g.span.start,
                    ));
                }
                self.named_groups.insert(name.clone(), *index);
            }
            GroupKind::BranchReset => self.branch_reset_depth += 1,
            GroupKind::Lookbehind { .. } => {
                self.lookbehind_depth += 1;
                if let Some(offset) = first_unbounded_quantifier_offset(&g.child) {
                    self.errors.push(ValidationError::new(
                        "LOOKBEHIND_VARIABLE_UNBOUNDED",
                        "lookbehind branches must have a bounded length",
                        offset,
                    ));
                }
            }
            _ => {}
        }
    }

    fn leave_group(&mut self, g: &Group) {
        match &g.kind {
            GroupKind::BranchReset => self.branch_reset_depth -= 1,
            GroupKind::Lookbehind { .. } => self.lookbehind_depth -= 1,
            _ => {}
        }
    }

    fn check_char_class(&mut self, cc: &CharClass, offset: usize) {
        for item in &cc.items {
            match item {
                ClassItem::Range(r) => self.check_range(r, offset),
                ClassItem::Posix(p) => self.check_posix(p, offset),
                ClassItem::UnicodeProp(u) => self.check_unicode_prop(u, offset),
                ClassItem::UnicodeEscape(u) => self.check_unicode_escape(u, offset),
                _ => {}
            }
        }
    }

    fn check_range(&mut self, r: &Range, offset: usize) {
        if (r.start as u32) > (r.end as u32) {
            self.errors.push(ValidationError::new(
                "INVALID_RANGE",
                format!("range '{}-{}' is out of order", r.start, r.end),
                offset,
            ));
        }
    }

    fn check_posix(&mut self, p: &PosixClass, offset: usize) {
        if p.negated {
            self.errors.push(ValidationError::new(
                "POSIX_NEGATION_UNSUPPORTED",
                format!("[:^{}:] is not a valid POSIX class form", p.name),
                offset,
            ));
        }
        if !unicode::is_known_posix_class(&p.name) {
            self.errors.push(ValidationError::new(
                "UNKNOWN_POSIX_CLASS",
                format!("unknown POSIX class '{}'", p.name),
                offset,
            ));
        }
    }

    fn check_unicode_prop(&mut self, u: &UnicodeProp, offset: usize) {
        if !unicode::is_known_unicode_property(&u.property) {
            self.errors.push(ValidationError::new(
                "UNKNOWN_UNICODE_PROPERTY",
                format!("unknown Unicode property '{}'", u.property),
                offset,
            ));
        }
    }

    fn check_unicode_escape(&mut self, u: &UnicodeEscape, offset: usize) {
        if !unicode::is_valid_code_point(u.code_point) {
            self.errors.push(ValidationError::new(
                "CODE_POINT_OUT_OF_RANGE",
                format!("code point U+{:X} exceeds U+10FFFF", u.code_point),
                offset,
            ));
        }
    }
}

/// The byte offset of the first unbounded quantifier inside `node`, if any —
/// used to anchor `LOOKBEHIND_VARIABLE_UNBOUNDED` at the offending `*`/`+`
/// rather than at the lookbehind group's opening `(`.
fn first_unbounded_quantifier_offset(node: &Node) -> Option<usize> {
    crate::visitor::collect_where(node, |n| matches!(n, Node::Quantifier(q) if q.max.is_none()))
        .into_iter()
        .next()
        .map(|n| match n {
            Node::Quantifier(q) => q.span.start,
            _ => unreachable!(),
        })
}

/// Run every check of spec.md §4.5 over `ast` and return the accumulated
/// errors. `strict` additionally flags nested unbounded quantifiers
/// (otherwise left to the ReDoS analyzer, per spec).
pub fn validate(ast: &Node, flags: &str, strict: bool) -> ValidationResult {
    let mut errors = Vec::new();
    for c in flags.chars() {
        if !RECOGNIZED_FLAGS.contains(c) {
            errors.push(ValidationError::new(
                "UNKNOWN_FLAG",
                format!("unrecognized flag '{c}'"),
                0,
            ));
        }
    }

    let mut collector = Collector {
        strict,
        allow_duplicate_names: flags.contains('J'),
        groups_opened: 0,
        group_indices: HashSet::new(),
        named_groups: HashMap::new(),
        branch_reset_depth: 0,
        lookbehind_depth: 0,
        unbounded_stack: Vec::new(),
        backrefs: Vec::new(),
        conditions: Vec::new(),
        errors: Vec::new(),
    };
    walk(ast, &mut collector);
    errors.append(&mut collector.errors);

    for site in &collector.backrefs {
        resolve_backref(site, &collector.named_groups, &collector.group_indices, &mut errors);
    }
    for site in &collector.conditions {
        resolve_condition(
            site,
            &site.condition,
            &collector.named_groups,
            &collector.group_indices,
            &mut errors,
        );
    }

    ValidationResult { errors }
}

fn resolve_backref(
    site: &BackrefSite,
    named_groups: &HashMap<String, u32>,
    group_indices: &HashSet<u32>,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(name) = &site.name {
        if !named_groups.contains_key(name) {
            errors.push(ValidationError::new(
                "UNRESOLVED_BACKREF",
                format!("backreference to undefined group '{name}'"),
                site.offset,
            ));
        }
        return;
    }
    let Some(index) = site.index else { return };
    if index == 0 {
        errors.push(ValidationError::new(
            "UNRESOLVED_BACKREF",
            "\\0 is never a valid backreference",
            site.offset,
        ));
        return;
    }
    let absolute = if site.relative {
        site.groups_opened_before as i64 + index as i64
    } else {
        index as i64
    };
    if absolute < 1 || !group_indices.contains(&(absolute as u32)) {
        errors.push(ValidationError::new(
            "UNRESOLVED_BACKREF",
            format!("backreference to non-existent group {index}"),
            site.offset,
        ));
    }
}

fn resolve_condition(
    site: &ConditionSite,
    condition: &Condition,
    named_groups: &HashMap<String, u32>,
    group_indices: &HashSet<u32>,
    errors: &mut Vec<ValidationError>,
) {
    match condition {
        Condition::GroupNumber(n) => {
            let absolute = if *n < 0 {
                site.groups_opened_before as i64 + *n as i64
            } else {
                *n as i64
            };
            if absolute < 1 || !group_indices.contains(&(absolute as u32)) {
                errors.push(ValidationError::new(
                    "UNRESOLVED_CONDITION",
                    format!("conditional refers to non-existent group {n}"),
                    site.offset,
                ));
            }
        }
        Condition::GroupName(name) => {
            if !named_groups.contains_key(name) {
                errors.push(ValidationError::new(
                    "UNRESOLVED_CONDITION",
                    format!("conditional refers to undefined group '{name}'"),
                    site.offset,
                ));
            }
        }
        Condition::Lookaround(_) | Condition::Recursion | Condition::Define => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_pattern, ParserLimits};

    fn check(body: &str, flags: &str) -> ValidationResult {
        let ast = parse_pattern(body, flags, ParserLimits::default()).unwrap();
        validate(&ast, flags, false)
    }

    #[test]
    fn accepts_well_formed_pattern() {
        let result = check("(a)(b)\\1\\2", "");
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn rejects_unresolved_backref() {
        let result = check("(a)\\2", "");
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].code, "UNRESOLVED_BACKREF");
    }

    #[test]
    fn rejects_zero_backref() {
        let ast = crate::parser::parse_pattern("(a)", "", ParserLimits::default()).unwrap();
        let mut ast = ast;
        if let Node::Sequence(s) = &mut ast {
            s.children.push(Node::Backref(Backref {
                span: crate::token::Span::new(0, 0),
                index: Some(0),
                name: None,
                relative: false,
            }));
        }
        let result = validate(&ast, "", false);
        assert!(result.errors.iter().any(|e| e.code == "UNRESOLVED_BACKREF"));
    }

    #[test]
    fn rejects_duplicate_group_names() {
        let result = check("(?<x>a)(?<x>b)", "");
        assert!(result.errors.iter().any(|e| e.code == "DUPLICATE_GROUP_NAME"));
    }

    #[test]
    fn allows_duplicate_names_under_j_flag() {
        let result = check("(?<x>a)(?<x>b)", "J");
        assert!(!result.errors.iter().any(|e| e.code == "DUPLICATE_GROUP_NAME"));
    }

    #[test]
    fn allows_duplicate_names_in_branch_reset() {
        let result = check("(?|(?<x>a)|(?<x>b))", "");
        assert!(!result.errors.iter().any(|e| e.code == "DUPLICATE_GROUP_NAME"));
    }

    #[test]
    fn rejects_unbounded_lookbehind() {
        let result = check("(?<=a*)b", "");
        let error = result
            .errors
            .iter()
            .find(|e| e.code == "LOOKBEHIND_VARIABLE_UNBOUNDED")
            .expect("unbounded lookbehind should be rejected");
        assert_eq!(error.offset, 5);
    }

    #[test]
    fn rejects_keep_inside_lookbehind() {
        let result = check("(?<=a\\K)", "");
        assert!(result.errors.iter().any(|e| e.code == "KEEP_IN_LOOKBEHIND"));
    }

    #[test]
    fn rejects_unknown_posix_class() {
        let result = check("[[:bogus:]]", "");
        assert!(result.errors.iter().any(|e| e.code == "UNKNOWN_POSIX_CLASS"));
    }

    #[test]
    fn rejects_negated_posix_syntax() {
        let result = check("[[:^word:]]", "");
        assert!(result.errors.iter().any(|e| e.code == "POSIX_NEGATION_UNSUPPORTED"));
    }

    #[test]
    fn flags_nested_unbounded_quantifier_only_in_strict_mode() {
        let ast = parse_pattern("(a+)*", "", ParserLimits::default()).unwrap();
        let lenient = validate(&ast, "", false);
        assert!(!lenient.errors.iter().any(|e| e.code == "NESTED_UNBOUNDED_QUANTIFIER"));
        let strict = validate(&ast, "", true);
        assert!(strict.errors.iter().any(|e| e.code == "NESTED_UNBOUNDED_QUANTIFIER"));
    }

    #[test]
    fn rejects_unknown_flag() {
        let result = check("a", "q");
        assert!(result.errors.iter().any(|e| e.code == "UNKNOWN_FLAG"));
    }
}
