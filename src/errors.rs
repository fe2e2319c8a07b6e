//! Error types for the PCRE2 static-analysis pipeline.
//!
//! Every public operation returns one of these kinds rather than panicking.
//! Lexer/parser errors halt the pipeline; validation errors are carried
//! alongside a still-returned AST (see `validator::ValidationResult`).

use thiserror::Error;

/// Which configured resource limit fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Length,
    Recursion,
    Nodes,
    Time,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LimitKind::Length => "length",
            LimitKind::Recursion => "recursion",
            LimitKind::Nodes => "nodes",
            LimitKind::Time => "time",
        };
        write!(f, "{s}")
    }
}

/// Top-level error type returned by the lexer, parser, validator, and
/// automata subsystem.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PcreError {
    #[error("lexical error at byte {offset}: {message}")]
    Lex { message: String, offset: usize },

    #[error("parse error at byte {offset}: {message}")]
    Parse { message: String, offset: usize },

    #[error("{which} limit exceeded")]
    ResourceLimitExceeded { which: LimitKind },

    #[error("validation error {code} at byte {offset}: {message}")]
    Validation {
        code: String,
        message: String,
        offset: usize,
    },

    #[error("automata cannot represent this pattern: {reason}")]
    Complexity { reason: String },

    #[error("analysis timed out")]
    Timeout,

    #[error("internal invariant violated: {0}")]
    InternalInvariantViolated(String),
}

impl PcreError {
    /// Stable `{code, message, offset}` diagnostic shape (spec.md §6).
    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            PcreError::Lex { message, offset } => Diagnostic {
                code: "LEX_ERROR".into(),
                message: message.clone(),
                offset: *offset,
            },
            PcreError::Parse { message, offset } => Diagnostic {
                code: "PARSE_ERROR".into(),
                message: message.clone(),
                offset: *offset,
            },
            PcreError::ResourceLimitExceeded { which } => Diagnostic {
                code: format!("RESOURCE_LIMIT_{}", which.to_string().to_uppercase()),
                message: format!("{which} limit exceeded"),
                offset: 0,
            },
            PcreError::Validation {
                code,
                message,
                offset,
            } => Diagnostic {
                code: code.clone(),
                message: message.clone(),
                offset: *offset,
            },
            PcreError::Complexity { reason } => Diagnostic {
                code: "COMPLEXITY_ERROR".into(),
                message: reason.clone(),
                offset: 0,
            },
            PcreError::Timeout => Diagnostic {
                code: "TIMEOUT".into(),
                message: "analysis timed out".into(),
                offset: 0,
            },
            PcreError::InternalInvariantViolated(msg) => Diagnostic {
                code: "INTERNAL_INVARIANT_VIOLATED".into(),
                message: msg.clone(),
                offset: 0,
            },
        }
    }

    /// A caret snippet: the source line containing `offset`, with an arrow
    /// pointing at the failing column.
    pub fn caret_snippet(&self, body: &str) -> String {
        let offset = self.diagnostic().offset;
        caret_snippet_at(body, offset)
    }
}

/// `{code, message, offset}` — the stable, serializable diagnostic shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub offset: usize,
}

/// Render `body`'s line containing byte `offset` with a caret underneath.
pub fn caret_snippet_at(body: &str, offset: usize) -> String {
    let offset = offset.min(body.len());
    let line_start = body[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = body[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(body.len());
    let line = &body[line_start..line_end];
    let col = offset - line_start;
    format!("{line}\n{}^", " ".repeat(col))
}

pub type Result<T> = std::result::Result<T, PcreError>;
