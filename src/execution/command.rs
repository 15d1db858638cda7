//! External command invocation.
//!
//! Account crontabs can only be read through the `crontab` utility. The
//! [`ProcessRunner`] trait wraps "run this, capture exit status, stdout and
//! stderr" so that readers can be tested against scripted outcomes, and so a
//! misbehaving child never turns into an error for the caller: every failure
//! mode is a [`ProcessOutcome`] variant.
//!
//! ```rust
//! use cronfleet::execution::Invocation;
//! use std::time::Duration;
//!
//! let query = Invocation::builder("crontab")
//!     .arg("-l")
//!     .timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(query.to_string(), "crontab -l");
//! ```

use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Default upper bound on how long a query may run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A command line to run, with its time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute
    program: String,
    /// Command arguments
    args: Vec<String>,
    /// Execution timeout
    timeout: Duration,
}

impl Invocation {
    /// Create a new builder for an invocation of `program`.
    pub fn builder(program: impl Into<String>) -> InvocationBuilder {
        InvocationBuilder::new(program)
    }

    /// Get the program being executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the command arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the timeout duration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for creating [`Invocation`] instances.
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl InvocationBuilder {
    /// Create a new builder with the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the execution timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Build the [`Invocation`].
    pub fn build(self) -> Invocation {
        Invocation {
            program: self.program,
            args: self.args,
            timeout: self.timeout,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What happened when an invocation was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process ran to completion.
    Completed {
        /// Exit code; `None` if killed by a signal.
        code: Option<i32>,
        /// Captured stdout, lossily decoded.
        stdout: String,
        /// Captured stderr, lossily decoded.
        stderr: String,
    },
    /// The program does not exist.
    NotFound,
    /// The process did not finish within its timeout and was killed.
    TimedOut(Duration),
    /// The process could not be started or waited on.
    Failed(String),
}

impl ProcessOutcome {
    /// Shorthand for a completed run.
    pub fn completed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        ProcessOutcome::Completed {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Capability to run external commands.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion or timeout. Never fails.
    async fn run(&self, invocation: &Invocation) -> ProcessOutcome;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> ProcessOutcome {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            // Keep diagnostics like "no crontab for" unlocalized.
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future on timeout must not leave the child behind.
            .kill_on_drop(true);

        let output = match timeout(invocation.timeout, cmd.output()).await {
            Err(_) => return ProcessOutcome::TimedOut(invocation.timeout),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => return ProcessOutcome::NotFound,
            Ok(Err(e)) => return ProcessOutcome::Failed(e.to_string()),
            Ok(Ok(output)) => output,
        };

        ProcessOutcome::Completed {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
