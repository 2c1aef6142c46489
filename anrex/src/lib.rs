//! Anrex - a compiler for annotated, human-readable regular expressions
//!
//! The annotated dialect lets a pattern be written like source code and
//! compiled down to a plain regex string:
//!
//! - **Free indentation** - the first spaces and tabs of each line are
//!   ignored, unless the preceding newline was escaped.
//! - **Comments** - everything from a `#` preceded by start of source,
//!   space, tab, or newline through the end of the line is ignored, along
//!   with any unescaped whitespace already written before it.
//! - **Escapes** - only `\\`, `\n`, `\r`, `\t` and `\v` are recognized
//!   escape sequences; `\{`, `\}`, `\(`, `\)`, and an escaped newline, tab,
//!   or space pass the latter character through verbatim. Regex-level
//!   escapes like `\d` are written `\\d`.
//! - **Variables** - `{?P<name>content}` declares a reusable variable
//!   holding everything compiled between the braces; an unescaped
//!   `${name}` pastes it again. Redeclaring a name shadows the earlier
//!   declaration.
//! - **Group flags** - a comment starting with `FLAG=` on the line where a
//!   capture group was opened attaches a directive to that group. The only
//!   recognized flag is `NoOpt`.
//! - **Optimization** - with an [`Optimizer`] configured, every capture
//!   group's body is handed to it on close and replaced with the returned,
//!   typically more compact, equivalent pattern.
//!
//! ```
//! use anrex::compile;
//!
//! let pattern = compile(
//!     "{?P<digits>[0-9]+}      # reusable chunk\n\
//!      \\(${digits}\\)\n\
//!      -${digits}",
//! )
//! .unwrap();
//! assert_eq!(pattern, "([0-9]+)-[0-9]+");
//! ```

pub mod buffer;
pub mod compiler;
pub mod error;
pub mod escape;
pub mod optimizer;
pub mod vars;

pub use buffer::OutputBuf;
pub use compiler::{Compiler, compile};
pub use error::{CompileError, Diagnostic, Result};
pub use optimizer::{Optimizer, OptimizerError, ProcessOptimizer, rewrite_anchored_prefix};
pub use vars::{VarEntry, VarTable};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end() {
        // Full pipeline: annotated source in, plain pattern out.
        let source = "{?P<x>ab}  # declare\n${x}cd";
        assert_eq!(compile(source).unwrap(), "ababcd");
    }

    #[test]
    fn test_failure_yields_no_partial_output() {
        let result = compile("abc\\q");
        assert!(result.is_err());
    }
}
