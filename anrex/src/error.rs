//! Error types for the annotated-regex compiler
//!
//! All compile failures are detected synchronously during the scan and abort
//! the compile attempt; there is no recovery and no partial output. Every
//! error carries a 1-based source line number and a bounded snippet of the
//! source around the failure point.

use crate::optimizer::OptimizerError;
use thiserror::Error;

/// Characters of source shown on either side of a failure point.
const CONTEXT_RADIUS: usize = 10;

/// The main error type for the compiler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A backslash introduced a sequence the dialect does not define
    #[error("unrecognized escape sequence '\\{escape}' at line {line}")]
    UnrecognizedEscape {
        /// The character following the backslash
        escape: char,
        /// 1-based source line of the failure
        line: usize,
        /// Source snippet around the failure
        context: String,
    },

    /// A `${name}` substitution named a variable that was never declared
    #[error("undeclared variable '{name}' at line {line}")]
    UndeclaredVariable {
        /// The name that failed to resolve
        name: String,
        /// Every variable name known at the failure point
        known: Vec<String>,
        /// 1-based source line of the failure
        line: usize,
        /// Source snippet around the failure
        context: String,
    },

    /// An unescaped `}` with no open declaration, or an unterminated
    /// `${name` / `{?P<name` reaching end of source
    #[error("unmatched brace at line {line}")]
    UnmatchedBrace {
        /// 1-based source line of the failure
        line: usize,
        /// Source snippet around the failure
        context: String,
    },

    /// A `FLAG=` comment named a flag the compiler does not recognize
    #[error("unrecognized flag '{flag}' at line {line}")]
    UnrecognizedFlag {
        /// The flag token as written
        flag: String,
        /// 1-based source line of the failure
        line: usize,
        /// Source snippet around the failure
        context: String,
    },

    /// The external optimizer could not be launched, failed, or timed out
    #[error("optimizer unavailable at line {line}: {reason}")]
    OptimizerUnavailable {
        /// Human-readable cause from the optimizer round-trip
        reason: String,
        /// 1-based source line of the group close that triggered the call
        line: usize,
        /// Source snippet around the failure
        context: String,
    },
}

impl CompileError {
    pub(crate) fn unrecognized_escape(src: &[char], offset: usize, escape: char) -> Self {
        CompileError::UnrecognizedEscape {
            escape,
            line: line_at(src, offset),
            context: context_at(src, offset),
        }
    }

    pub(crate) fn undeclared_variable(
        src: &[char],
        offset: usize,
        name: String,
        known: Vec<String>,
    ) -> Self {
        CompileError::UndeclaredVariable {
            name,
            known,
            line: line_at(src, offset),
            context: context_at(src, offset),
        }
    }

    pub(crate) fn unmatched_brace(src: &[char], offset: usize) -> Self {
        CompileError::UnmatchedBrace {
            line: line_at(src, offset),
            context: context_at(src, offset),
        }
    }

    pub(crate) fn unrecognized_flag(src: &[char], offset: usize, flag: String) -> Self {
        CompileError::UnrecognizedFlag {
            flag,
            line: line_at(src, offset),
            context: context_at(src, offset),
        }
    }

    pub(crate) fn optimizer_unavailable(src: &[char], offset: usize, cause: OptimizerError) -> Self {
        CompileError::OptimizerUnavailable {
            reason: cause.to_string(),
            line: line_at(src, offset),
            context: context_at(src, offset),
        }
    }

    /// 1-based source line of the failure
    pub fn line(&self) -> usize {
        match self {
            CompileError::UnrecognizedEscape { line, .. }
            | CompileError::UndeclaredVariable { line, .. }
            | CompileError::UnmatchedBrace { line, .. }
            | CompileError::UnrecognizedFlag { line, .. }
            | CompileError::OptimizerUnavailable { line, .. } => *line,
        }
    }

    /// Source snippet around the failure point
    pub fn context(&self) -> &str {
        match self {
            CompileError::UnrecognizedEscape { context, .. }
            | CompileError::UndeclaredVariable { context, .. }
            | CompileError::UnmatchedBrace { context, .. }
            | CompileError::UnrecognizedFlag { context, .. }
            | CompileError::OptimizerUnavailable { context, .. } => context,
        }
    }

    /// Build the record handed to the diagnostic sink.
    pub fn diagnostic(&self) -> Diagnostic {
        let message = match self {
            CompileError::UndeclaredVariable { known, .. } if known.is_empty() => {
                format!("{self}; no variables declared")
            }
            CompileError::UndeclaredVariable { known, .. } => {
                format!("{self}; declared variables: {}", known.join(", "))
            }
            _ => self.to_string(),
        };
        Diagnostic {
            message,
            context: self.context().to_string(),
            line: self.line(),
        }
    }
}

/// A presentation-ready failure record
///
/// The compiler produces these, the surrounding application decides how to
/// display them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong, including any detail lists
    pub message: String,
    /// Bounded substring of the source around the failure point
    pub context: String,
    /// 1-based source line number
    pub line: usize,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// 1-based line number of `offset`, counting newlines from the start of source.
pub(crate) fn line_at(src: &[char], offset: usize) -> usize {
    let end = offset.min(src.len().saturating_sub(1));
    1 + src
        .iter()
        .take(end + 1)
        .filter(|&&c| c == '\n')
        .count()
}

/// Bounded snippet of source around `offset`.
pub(crate) fn context_at(src: &[char], offset: usize) -> String {
    let start = offset.saturating_sub(CONTEXT_RADIUS);
    let end = (offset + CONTEXT_RADIUS).min(src.len());
    src[start..end].iter().collect()
}

/// Result type alias for compile operations
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_line_at_counts_newlines() {
        let src = chars("ab\ncd\nef");
        assert_eq!(line_at(&src, 0), 1);
        assert_eq!(line_at(&src, 3), 2);
        assert_eq!(line_at(&src, 7), 3);
    }

    #[test]
    fn test_line_at_clamps_past_end() {
        let src = chars("a\nb");
        assert_eq!(line_at(&src, 99), 2);
        assert_eq!(line_at(&[], 0), 1);
    }

    #[test]
    fn test_context_at_is_bounded() {
        let src = chars("0123456789abcdefghijklmnop");
        assert_eq!(context_at(&src, 13), "3456789abcdefghijklm");
        assert_eq!(context_at(&src, 0), "0123456789");
    }

    #[test]
    fn test_unrecognized_escape_display() {
        let src = chars("ab\\qcd");
        let err = CompileError::unrecognized_escape(&src, 3, 'q');
        assert_eq!(
            err.to_string(),
            "unrecognized escape sequence '\\q' at line 1"
        );
    }

    #[test]
    fn test_diagnostic_lists_known_variables() {
        let src = chars("${x}");
        let err = CompileError::undeclared_variable(
            &src,
            3,
            "x".to_string(),
            vec!["a".to_string(), "b".to_string()],
        );
        let diag = err.diagnostic();
        assert!(diag.message.contains("declared variables: a, b"));
        assert_eq!(diag.line, 1);
    }

    #[test]
    fn test_diagnostic_with_no_known_variables() {
        let src = chars("${missing}");
        let err =
            CompileError::undeclared_variable(&src, 9, "missing".to_string(), Vec::new());
        assert!(err.diagnostic().message.contains("no variables declared"));
    }

    #[test]
    fn test_diagnostic_display() {
        let src = chars("a\nb}");
        let err = CompileError::unmatched_brace(&src, 3);
        assert_eq!(err.line(), 2);
        assert_eq!(err.diagnostic().to_string(), "unmatched brace at line 2");
    }
}
