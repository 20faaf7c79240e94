//! Error types shared by every compiler pass.
//!
//! Every framec error carries a [`Span`] indicating where in the source text
//! it occurred, plus a textual message. Per the language's non-goals,
//! framec does not compute line/column diagnostics or source snippets — the
//! message text alone is what surfaces to a user. The span is retained
//! anyway because the lexer and parser invariants are defined in terms of
//! it (see the crate-level tests in `framec-syntax`).
//!
//! # Example
//!
//! ```
//! use framec_base::{CompileError, ErrorKind, ErrorList, Span};
//!
//! let mut errors = ErrorList::new();
//! errors.push(CompileError::new(
//!     ErrorKind::Type,
//!     "cannot convert integer 256 to U8",
//!     Span::new(10, 13),
//! ));
//! assert!(errors.has_errors());
//! ```

use crate::span::Span;
use std::fmt;

/// Which pass raised an error, matching the taxonomy in the language spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unterminated string, unknown byte.
    Lex,
    /// Unexpected token, malformed declarator.
    Parse,
    /// Undeclared identifier, use-before-assignment, redeclaration, unknown
    /// struct/function name.
    Name,
    /// Operand mismatch, bad dereference/index/field access, integer out of
    /// range, return-type mismatch, break/continue outside loop.
    Type,
    /// Wrong argument count, duplicate or unknown named argument.
    Arity,
    /// An invariant that should have been enforced by an earlier pass was
    /// violated. Reserved for [`Emitter`](../framec_codegen/struct.Emitter.html)
    /// assertions; never produced by user-facing passes.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Lex => "lex error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Name => "name error",
            ErrorKind::Type => "type error",
            ErrorKind::Arity => "arity error",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// A single compiler diagnostic.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    /// Human-readable, textual-only description (no line/column rendering).
    pub message: String,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CompileError {}

/// An accumulator for the errors raised by one pass.
///
/// Each pass (lexer, parser, resolver) owns one of these and appends to it
/// as it walks its input; the pass never panics on malformed input or stops
/// early on the first error, so callers see every problem a single pass can
/// find in one run. [`ErrorList::has_errors`] is the gate the spec requires
/// a downstream pass to check before it proceeds.
#[derive(Debug, Clone, Default)]
pub struct ErrorList {
    errors: Vec<CompileError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompileError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<CompileError> {
        self.errors
    }

    /// Appends every error from `other`, draining it.
    pub fn extend(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }
}

impl IntoIterator for ErrorList {
    type Item = CompileError;
    type IntoIter = std::vec::IntoIter<CompileError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display_omits_span() {
        let err = CompileError::new(ErrorKind::Type, "bad operand", Span::new(5, 10));
        let display = format!("{}", err);
        assert_eq!(display, "type error: bad operand");
    }

    #[test]
    fn error_list_starts_empty() {
        let errors = ErrorList::new();
        assert!(!errors.has_errors());
        assert!(errors.is_empty());
    }

    #[test]
    fn error_list_tracks_pushed_errors() {
        let mut errors = ErrorList::new();
        errors.push(CompileError::new(ErrorKind::Lex, "bad byte", Span::new(0, 1)));
        assert!(errors.has_errors());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn error_list_extend_merges_two_lists() {
        let mut a = ErrorList::new();
        a.push(CompileError::new(ErrorKind::Parse, "oops", Span::new(0, 1)));
        let mut b = ErrorList::new();
        b.push(CompileError::new(ErrorKind::Name, "oops2", Span::new(1, 2)));
        a.extend(b);
        assert_eq!(a.len(), 2);
    }
}
