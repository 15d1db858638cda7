//! Detection of `run-parts` dispatcher invocations.
//!
//! Directory-convention jobs (`/etc/cron.hourly/*` and friends) have no
//! schedule of their own; a crontab line such as
//! `17 * * * * root cd / && run-parts --report /etc/cron.hourly` runs the whole
//! directory. These helpers recognise such lines.

/// Program that runs every executable in a directory.
pub const DISPATCHER: &str = "run-parts";

/// Whether `command` invokes the dispatcher anywhere in its pipeline.
pub fn invokes_dispatcher(command: &str) -> bool {
    dispatcher_position(command).is_some()
}

/// Whether `command` invokes the dispatcher on `dir`.
///
/// Only tokens after the dispatcher are considered. Surrounding quotes,
/// shell punctuation such as a closing `)` or `;`, and trailing slashes are
/// ignored when comparing.
pub fn dispatches_directory(command: &str, dir: &str) -> bool {
    let target = dir.trim_end_matches('/');
    if target.is_empty() {
        return false;
    }

    let tokens: Vec<&str> = command.split_whitespace().collect();
    let Some(start) = dispatcher_position(command) else {
        return false;
    };

    tokens[start + 1..]
        .iter()
        .any(|token| clean_token(token) == target)
}

fn dispatcher_position(command: &str) -> Option<usize> {
    command.split_whitespace().position(|token| {
        let token = token.trim_start_matches(['(', '\'', '"']);
        token.rsplit('/').next() == Some(DISPATCHER)
    })
}

fn clean_token(token: &str) -> &str {
    token
        .trim_matches(['\'', '"'])
        .trim_end_matches([')', ';', '&', '|'])
        .trim_matches(['\'', '"'])
        .trim_end_matches('/')
}
