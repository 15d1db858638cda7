//! Crontab line parsing.
//!
//! Two dialects are understood:
//!
//! - **system** lines (`/etc/crontab`, `/etc/cron.d/*`) carry a user field
//!   between the schedule and the command;
//! - **user** lines (`crontab -l` output) do not.
//!
//! Parsing is pure. Every line lands in one of three buckets (see
//! [`LineOutcome`]) so callers can stay quiet about comments and environment
//! assignments while still reporting lines that look like jobs but are not.

/// The schedule, user and command of one crontab line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// A 5-field expression or an `@` shortcut.
    pub schedule: String,
    /// The account the job runs as; empty for the user dialect.
    pub user: String,
    /// The command, tokens rejoined with single spaces.
    pub command: String,
}

/// Result of classifying a single crontab line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank, comment, or environment assignment.
    Ignorable,
    /// Looks like a job but has too few fields.
    Malformed,
    /// A job definition.
    Parsed(ParsedLine),
}

impl LineOutcome {
    /// Collapse into the optional form, losing the ignorable/malformed split.
    pub fn into_parsed(self) -> Option<ParsedLine> {
        match self {
            LineOutcome::Parsed(line) => Some(line),
            LineOutcome::Ignorable | LineOutcome::Malformed => None,
        }
    }
}

/// Which crontab flavour a line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `m h dom mon dow user command...`
    System,
    /// `m h dom mon dow command...`
    User,
}

impl Dialect {
    fn has_user_field(self) -> bool {
        matches!(self, Dialect::System)
    }

    /// Classify a line in this dialect.
    pub fn classify(self, line: &str) -> LineOutcome {
        classify(line, self)
    }
}

/// Parse a system crontab line. Returns `None` for anything that is not a job.
pub fn parse_system_line(line: &str) -> Option<ParsedLine> {
    classify_system_line(line).into_parsed()
}

/// Parse a user crontab line. Returns `None` for anything that is not a job.
pub fn parse_user_line(line: &str) -> Option<ParsedLine> {
    classify_user_line(line).into_parsed()
}

/// Classify a system crontab line.
pub fn classify_system_line(line: &str) -> LineOutcome {
    classify(line, Dialect::System)
}

/// Classify a user crontab line.
pub fn classify_user_line(line: &str) -> LineOutcome {
    classify(line, Dialect::User)
}

fn classify(line: &str, dialect: Dialect) -> LineOutcome {
    let raw = line.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return LineOutcome::Ignorable;
    }

    let parts: Vec<&str> = raw.split_whitespace().collect();

    if is_env_assignment(&parts, dialect) {
        return LineOutcome::Ignorable;
    }

    let user_fields = usize::from(dialect.has_user_field());
    let schedule_fields = if parts[0].starts_with('@') { 1 } else { 5 };

    // At least one command token after schedule and user.
    if parts.len() < schedule_fields + user_fields + 1 {
        return LineOutcome::Malformed;
    }

    let schedule = parts[..schedule_fields].join(" ");
    let user = if dialect.has_user_field() {
        parts[schedule_fields].to_string()
    } else {
        String::new()
    };
    let command = parts[schedule_fields + user_fields..].join(" ");

    LineOutcome::Parsed(ParsedLine {
        schedule,
        user,
        command,
    })
}

/// `KEY=VALUE` lines set variables for the jobs below them.
///
/// In the system dialect only a single bare token counts. User crontabs
/// commonly carry `MAILTO="a b"` style values, so there any line whose first
/// token starts with `IDENTIFIER=` is an assignment.
fn is_env_assignment(parts: &[&str], dialect: Dialect) -> bool {
    match dialect {
        Dialect::System => parts.len() == 1 && parts[0].contains('='),
        Dialect::User => parts[0]
            .split_once('=')
            .is_some_and(|(name, _)| {
                !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            }),
    }
}
