//! The external group-body optimizer seam
//!
//! The compiler hands an alternation body (line breaks already folded to `|`)
//! to an [`Optimizer`] and splices the returned pattern over the body. The
//! stock implementation shells out to an external command; tests substitute
//! in-process stubs through the same trait.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a running optimizer child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Rewrites an alternation body into an equivalent, typically more compact
/// pattern.
pub trait Optimizer {
    /// Optimize one alternation body. `alternation` has its line breaks
    /// folded to `|` separators; the result replaces the body verbatim.
    fn optimize(&self, alternation: &str) -> Result<String, OptimizerError>;
}

/// Failures of the optimizer round-trip. The compiler surfaces these as
/// `CompileError::OptimizerUnavailable`.
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// The external command could not be started
    #[error("cannot execute '{program}': {message}")]
    Spawn {
        /// The command that failed to launch
        program: String,
        /// The underlying launch failure
        message: String,
    },

    /// The external command did not finish within the configured timeout
    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout {
        /// The command that was killed
        program: String,
        /// The configured limit
        timeout: Duration,
    },

    /// The external command exited unsuccessfully
    #[error("'{program}' exited with {status}")]
    Failed {
        /// The command that failed
        program: String,
        /// Its exit status
        status: std::process::ExitStatus,
    },

    /// The external command's output could not be read as UTF-8 text
    #[error("cannot read output of '{program}': {message}")]
    Output {
        /// The command whose output was unreadable
        program: String,
        /// The underlying read failure
        message: String,
    },
}

/// An [`Optimizer`] backed by an external command.
///
/// The alternation is passed as the sole argument and the replacement pattern
/// is read from stdout. The child is killed if it exceeds the timeout, so an
/// unresponsive optimizer fails the compile instead of stalling it.
#[derive(Debug, Clone)]
pub struct ProcessOptimizer {
    program: String,
    timeout: Duration,
}

impl ProcessOptimizer {
    /// The command invoked when none is configured.
    pub const DEFAULT_PROGRAM: &'static str = "regopt.pl";

    /// Default wall-clock limit for one optimizer call.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create an optimizer invoking `program` with the default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        ProcessOptimizer {
            program: program.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Override the wall-clock limit for one optimizer call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured command.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ProcessOptimizer {
    fn default() -> Self {
        ProcessOptimizer::new(Self::DEFAULT_PROGRAM)
    }
}

impl Optimizer for ProcessOptimizer {
    fn optimize(&self, alternation: &str) -> Result<String, OptimizerError> {
        let mut child = Command::new(&self.program)
            .arg(alternation)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OptimizerError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(OptimizerError::Timeout {
                            program: self.program.clone(),
                            timeout: self.timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(OptimizerError::Spawn {
                        program: self.program.clone(),
                        message: e.to_string(),
                    });
                }
            }
        };

        if !status.success() {
            return Err(OptimizerError::Failed {
                program: self.program.clone(),
                status,
            });
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .map_err(|e| OptimizerError::Output {
                    program: self.program.clone(),
                    message: e.to_string(),
                })?;
        }
        // The trailing newline most commands emit is not part of the pattern.
        if output.ends_with('\n') {
            output.pop();
            if output.ends_with('\r') {
                output.pop();
            }
        }
        Ok(output)
    }
}

/// Rewrite a leading run of line-anchored non-capturing markers `(?^:` into
/// plain non-capturing markers `(?:`, leaving the rest of the pattern intact.
/// Applied to every optimizer result before it is spliced.
pub fn rewrite_anchored_prefix(pattern: &str) -> String {
    let bytes = pattern.as_bytes();
    let mut runs = 0;
    while bytes[runs * 4..].starts_with(b"(?^:") {
        runs += 1;
    }
    if runs == 0 {
        return pattern.to_string();
    }
    let mut rewritten = "(?:".repeat(runs);
    rewritten.push_str(&pattern[runs * 4..]);
    rewritten
}
