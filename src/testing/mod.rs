//! Testing utilities for users of the cronfleet library.
//!
//! - [`ScriptedRunner`]: a [`ProcessRunner`] that replays canned outcomes
//!   instead of starting processes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::execution::{Invocation, ProcessOutcome, ProcessRunner};

/// A process runner with scripted answers.
///
/// Outcomes are keyed by the full command line (`program arg1 arg2`).
/// Unscripted commands get the fallback outcome, which is
/// [`ProcessOutcome::NotFound`] unless changed. Every invocation is recorded.
///
/// # Example
///
/// ```
/// use cronfleet::execution::{Invocation, ProcessOutcome, ProcessRunner};
/// use cronfleet::testing::ScriptedRunner;
///
/// let runner = ScriptedRunner::new()
///     .on("crontab -l", ProcessOutcome::completed(1, "", "no crontab for alice"));
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let outcome = rt.block_on(runner.run(&Invocation::builder("crontab").arg("-l").build()));
///
/// assert_eq!(outcome, ProcessOutcome::completed(1, "", "no crontab for alice"));
/// assert_eq!(runner.calls(), vec!["crontab -l".to_string()]);
/// ```
#[derive(Debug)]
pub struct ScriptedRunner {
    outcomes: HashMap<String, ProcessOutcome>,
    fallback: ProcessOutcome,
    calls: RwLock<Vec<String>>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    /// A runner where every command is missing.
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            fallback: ProcessOutcome::NotFound,
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Answer `command_line` with `outcome`.
    pub fn on(mut self, command_line: impl Into<String>, outcome: ProcessOutcome) -> Self {
        self.outcomes.insert(command_line.into(), outcome);
        self
    }

    /// Answer unscripted commands with `outcome`.
    pub fn otherwise(mut self, outcome: ProcessOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> ProcessOutcome {
        let command_line = invocation.to_string();
        if let Ok(mut calls) = self.calls.write() {
            calls.push(command_line.clone());
        }

        self.outcomes
            .get(&command_line)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
