//! The compiler driver
//!
//! A single-pass, position-tracked transducer from annotated source to a
//! plain pattern string, with a small recursive extension for group
//! optimization. The scan reads source positions `i` left to right and
//! writes output positions `j`; a group splice re-enters the scan at the
//! next source position with the output offset advanced past the spliced
//! replacement.
//!
//! Dispatch priority at each position: escape, `${name}` substitution,
//! `{?P<name>` declaration, `}` close, newline fold, comment, group
//! open/close (only when optimizing), verbatim copy.

use crate::buffer::{DEFAULT_CAPACITY, OutputBuf};
use crate::error::{CompileError, Result};
use crate::escape;
use crate::optimizer::{Optimizer, rewrite_anchored_prefix};
use crate::vars::VarTable;

/// Compile annotated source with optimization off.
///
/// # Example
/// ```
/// use anrex::compile;
///
/// let pattern = compile("{?P<word>[a-z]+} # one word\n${word}").unwrap();
/// assert_eq!(pattern, "[a-z]+[a-z]+");
/// ```
pub fn compile(source: &str) -> Result<String> {
    Compiler::new().compile(source)
}

/// Configured entry point for compile calls.
///
/// Holds the optional group optimizer and the initial output-buffer capacity.
/// Each `compile` call owns its own buffer and variable table, so one
/// `Compiler` may serve parallel calls.
pub struct Compiler<'a> {
    optimizer: Option<&'a dyn Optimizer>,
    initial_capacity: usize,
}

impl<'a> Compiler<'a> {
    /// Create a compiler with optimization off.
    pub fn new() -> Self {
        Compiler {
            optimizer: None,
            initial_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Enable group optimization through `optimizer`.
    pub fn with_optimizer(mut self, optimizer: &'a dyn Optimizer) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Override the initial output-buffer capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Compile `source` to a pattern string, or abort with a diagnostic.
    ///
    /// No partial pattern is ever returned: on failure the output is
    /// discarded and the variable table is cleared for the next call.
    pub fn compile(&self, source: &str) -> Result<String> {
        let src: Vec<char> = source.chars().collect();
        let mut scan = Scan {
            src: &src,
            buf: OutputBuf::with_capacity(src.len().max(self.initial_capacity)),
            vars: VarTable::new(),
            optimizer: self.optimizer,
        };
        let outcome = scan.run(0, None);
        scan.vars.clear();
        outcome?;
        Ok(scan.buf.into_string())
    }
}

impl Default for Compiler<'_> {
    fn default() -> Self {
        Compiler::new()
    }
}

/// State owned by one compile call and threaded through splice recursion.
struct Scan<'a, 's> {
    src: &'s [char],
    buf: OutputBuf,
    vars: VarTable,
    optimizer: Option<&'a dyn Optimizer>,
}

impl Scan<'_, '_> {
    /// The driver loop. `last_spliced` carries the output offset of the most
    /// recently spliced group's start, so a `(` landing on that offset after
    /// a splice is not mistaken for a new group.
    fn run(&mut self, mut i: usize, last_spliced: Option<usize>) -> Result<()> {
        let n = self.src.len();
        let mut group_start: Option<usize> = None;
        let mut group_start_offset = 0usize;
        let mut group_opened_on_this_line = false;
        let mut do_not_optimize = false;

        while i < n {
            let c = self.src[i];

            if c == '\\' {
                i += 1;
                if i == n {
                    // A lone trailing backslash ends the scan.
                    break;
                }
                let escaped = self.src[i];
                match escape::resolve(escaped) {
                    Some(ch) => self.buf.push(ch),
                    None => return Err(CompileError::unrecognized_escape(self.src, i, escaped)),
                }
                i += 1;
                continue;
            }

            if c == '$' && self.src.get(i + 1) == Some(&'{') {
                let name_start = i + 2;
                let mut end = name_start;
                while end < n && self.src[end] != '}' {
                    end += 1;
                }
                if end == n {
                    return Err(CompileError::unmatched_brace(self.src, i));
                }
                let name: String = self.src[name_start..end].iter().collect();
                match self.vars.lookup(&name) {
                    Some(span) => {
                        // A span can outrun the buffer after a splice.
                        let span_end = span.end.min(self.buf.len());
                        let span_start = span.start.min(span_end);
                        self.buf.extend_from_within(span_start..span_end);
                    }
                    None => {
                        return Err(CompileError::undeclared_variable(
                            self.src,
                            end,
                            name,
                            self.vars.names(),
                        ));
                    }
                }
                i = end + 1;
                continue;
            }

            if c == '{' && self.source_matches(i + 1, "?P<") {
                let name_start = i + 4;
                let mut end = name_start;
                while end < n && self.src[end] != '>' {
                    end += 1;
                }
                if end == n {
                    return Err(CompileError::unmatched_brace(self.src, i));
                }
                let name: String = self.src[name_start..end].iter().collect();
                self.vars.declare(name, self.buf.len());
                i = end + 1;
                continue;
            }

            if c == '}' {
                if self.vars.close(self.buf.len()).is_none() {
                    return Err(CompileError::unmatched_brace(self.src, i));
                }
                i += 1;
                continue;
            }

            if c == '\n' {
                i += 1;
                while i < n && (self.src[i] == ' ' || self.src[i] == '\t') {
                    i += 1;
                }
                group_opened_on_this_line = false;
                continue;
            }

            if c == '#' && (i == 0 || matches!(self.src[i - 1], ' ' | '\t' | '\n')) {
                self.buf.retract_trailing_whitespace();
                // Flags only bind to a group opened earlier on this physical
                // line; a '#' right after an escaped newline does not count.
                if group_opened_on_this_line
                    && i != 0
                    && self.src[i - 1] != '\n'
                    && self.source_matches(i + 1, "FLAG=")
                {
                    let flag_start = i + 6;
                    let flag_end = self.flag_token_end(flag_start);
                    let flag: String = self.src[flag_start..flag_end].iter().collect();
                    if flag == "NoOpt" {
                        do_not_optimize = true;
                    } else {
                        return Err(CompileError::unrecognized_flag(self.src, flag_start, flag));
                    }
                    i = flag_end;
                }
                while i < n && self.src[i] != '\n' {
                    i += 1;
                }
                continue;
            }

            if let Some(optimizer) = self.optimizer {
                if c == '(' && last_spliced != Some(self.buf.len()) {
                    group_start_offset = self.group_header_len(i);
                    group_opened_on_this_line = true;
                    do_not_optimize = false;
                    group_start = Some(self.buf.len());
                } else if c == ')' {
                    if let Some(start) = group_start.take() {
                        let suppressed = do_not_optimize
                            || (group_opened_on_this_line && self.no_opt_flag_ahead(i + 1));
                        if !suppressed {
                            return self.splice_group(optimizer, i, start, group_start_offset);
                        }
                    }
                }
            }

            self.buf.push(c);
            i += 1;
        }

        Ok(())
    }

    /// Extract the group body, run it through the optimizer, splice the
    /// result over the body, emit the `)`, and resume the scan at the next
    /// source position.
    fn splice_group(
        &mut self,
        optimizer: &dyn Optimizer,
        i: usize,
        start: usize,
        header_len: usize,
    ) -> Result<()> {
        let body_start = (start + header_len).min(self.buf.len());
        let alternation = self
            .buf
            .slice_string(body_start..self.buf.len())
            .replace('\n', "|");
        let replacement = optimizer
            .optimize(&alternation)
            .map_err(|e| CompileError::optimizer_unavailable(self.src, i, e))?;
        let replacement = rewrite_anchored_prefix(&replacement);
        self.buf.splice(body_start..self.buf.len(), &replacement);
        self.buf.push(')');
        self.run(i + 1, Some(start))
    }

    /// Length of the group's syntactic header at source position `i` (which
    /// holds the `(`): `(?:` is 3, `(?P<name>` is 4 plus the name plus the
    /// `>`, a plain capturing group is 1.
    fn group_header_len(&self, i: usize) -> usize {
        if self.source_matches(i + 1, "?:") {
            return 3;
        }
        if self.source_matches(i + 1, "?P<") {
            let mut offset = 4;
            while i + offset < self.src.len() && self.src[i + offset] != '>' {
                offset += 1;
            }
            return offset + 1;
        }
        1
    }

    /// Whether the rest of the physical line starting at `i` carries a
    /// `# FLAG=NoOpt` comment. The close handler peeks ahead with this so a
    /// flag written after the `)` still suppresses the group it shares a
    /// line with.
    fn no_opt_flag_ahead(&self, mut i: usize) -> bool {
        let n = self.src.len();
        while i < n && self.src[i] != '\n' {
            if self.src[i] == '#'
                && i != 0
                && matches!(self.src[i - 1], ' ' | '\t')
                && self.source_matches(i + 1, "FLAG=")
            {
                let flag_start = i + 6;
                let flag_end = self.flag_token_end(flag_start);
                let flag: String = self.src[flag_start..flag_end].iter().collect();
                return flag == "NoOpt";
            }
            i += 1;
        }
        false
    }

    /// Whether the source at `at` starts with `literal`.
    fn source_matches(&self, at: usize, literal: &str) -> bool {
        let mut idx = at;
        for expected in literal.chars() {
            if self.src.get(idx) != Some(&expected) {
                return false;
            }
            idx += 1;
        }
        true
    }

    /// First position at or after `start` holding a space, tab, newline, or
    /// end of source.
    fn flag_token_end(&self, start: usize) -> usize {
        let mut end = start;
        while end < self.src.len() && !matches!(self.src[end], ' ' | '\t' | '\n') {
            end += 1;
        }
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_copied_verbatim() {
        assert_eq!(compile("abc").unwrap(), "abc");
        assert_eq!(compile("").unwrap(), "");
    }

    #[test]
    fn test_escapes_emit_control_characters() {
        assert_eq!(compile(r"\n").unwrap(), "\n");
        assert_eq!(compile(r"\t").unwrap(), "\t");
        assert_eq!(compile(r"\r").unwrap(), "\r");
        assert_eq!(compile(r"\v").unwrap(), "\x0B");
        assert_eq!(compile(r"\\").unwrap(), "\\");
    }

    #[test]
    fn test_escaped_braces_and_parens() {
        assert_eq!(compile(r"a\{3\}").unwrap(), "a{3}");
        assert_eq!(compile(r"\(x\)").unwrap(), "(x)");
    }

    #[test]
    fn test_unrecognized_escape_reports_line() {
        let err = compile("ab\ncd\\q").unwrap_err();
        match err {
            CompileError::UnrecognizedEscape { escape, line, .. } => {
                assert_eq!(escape, 'q');
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_backslash_ends_scan() {
        assert_eq!(compile("ab\\").unwrap(), "ab");
    }

    #[test]
    fn test_indentation_fold() {
        assert_eq!(compile("ab\n  cd").unwrap(), "abcd");
        assert_eq!(compile("ab\ncd").unwrap(), "abcd");
        assert_eq!(compile("ab\n\t\t cd").unwrap(), "abcd");
    }

    #[test]
    fn test_escaped_newline_keeps_indentation() {
        assert_eq!(compile("ab\\\n  cd").unwrap(), "ab\n  cd");
    }

    #[test]
    fn test_comment_elision() {
        assert_eq!(compile("ab #comment\ncd").unwrap(), "abcd");
        assert_eq!(compile("# whole line\nab").unwrap(), "ab");
    }

    #[test]
    fn test_hash_without_preceding_whitespace_is_literal() {
        assert_eq!(compile("ab#cd").unwrap(), "ab#cd");
    }

    #[test]
    fn test_variable_substitution() {
        assert_eq!(compile("{?P<x>foo}${x}${x}").unwrap(), "foofoofoo");
    }

    #[test]
    fn test_nested_variable_declarations() {
        assert_eq!(
            compile("{?P<a>x{?P<b>y}z}${a}${b}").unwrap(),
            "xyzxyzy"
        );
    }

    #[test]
    fn test_undeclared_variable_lists_no_names() {
        let err = compile("${missing}").unwrap_err();
        match err {
            CompileError::UndeclaredVariable { name, known, .. } => {
                assert_eq!(name, "missing");
                assert!(known.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_close_brace() {
        assert!(matches!(
            compile("}").unwrap_err(),
            CompileError::UnmatchedBrace { line: 1, .. }
        ));
    }

    #[test]
    fn test_unterminated_substitution() {
        assert!(matches!(
            compile("${oops").unwrap_err(),
            CompileError::UnmatchedBrace { .. }
        ));
    }

    #[test]
    fn test_unterminated_declaration() {
        assert!(matches!(
            compile("{?P<oops").unwrap_err(),
            CompileError::UnmatchedBrace { .. }
        ));
    }

    #[test]
    fn test_plain_brace_is_literal() {
        // Only `{?P<` opens a declaration; anything else is copied, so the
        // closing brace of a quantifier must be escaped.
        assert_eq!(compile(r"a{2,3\}").unwrap(), "a{2,3}");
    }

    #[test]
    fn test_groups_ignored_without_optimizer() {
        assert_eq!(compile("(a|b)(c|d)").unwrap(), "(a|b)(c|d)");
    }
}
