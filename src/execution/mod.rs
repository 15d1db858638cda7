//! External command execution.
//!
//! Only used to query account crontabs; discovered jobs are never run.

mod command;

pub use command::{
    DEFAULT_TIMEOUT, Invocation, InvocationBuilder, ProcessOutcome, ProcessRunner, SystemRunner,
};
