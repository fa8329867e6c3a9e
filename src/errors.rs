use std::fmt::Display;

use nu_ansi_term::Color;

use crate::manifest::Issue;

pub type Result<T> = std::result::Result<T, anyhow::Error>;
pub use anyhow::{bail, format_err};

/// Tone of a user-facing console line. Everything is written to stderr so
/// stdout stays clean for machine-readable output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Success,
    Notice,
    Failure,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Success => Color::Green,
            Tone::Notice => Color::Yellow,
            Tone::Failure => Color::Red,
        }
    }
}

/// Paint one line to stderr in the given tone.
pub fn console(tone: Tone, message: impl Display) {
    let text = message.to_string();
    let painted = match tone {
        Tone::Success => tone.color().paint(text),
        Tone::Notice | Tone::Failure => tone.color().bold().paint(text),
    };
    eprintln!("{}", painted);
}

/// Render a validation issue as `[CODE] field: message`, the shape every
/// edgepack surface prints issues in.
pub fn format_issue(issue: &Issue) -> String {
    if issue.field.is_empty() {
        format!("[{}] {}", issue.code, issue.message)
    } else {
        format!("[{}] {}: {}", issue.code, issue.field, issue.message)
    }
}

/// Report a manifest issue on the console: errors in red, warnings in yellow.
pub fn report_issue(issue: &Issue, failure: bool) {
    let tone = if failure { Tone::Failure } else { Tone::Notice };
    console(tone, format_issue(issue));
}

/// Formatted console line in one call, e.g.
/// `edgepack_log!(Tone::Notice, "unknown fields in {}", path)`.
#[macro_export]
macro_rules! edgepack_log {
    ($tone:expr, $($arg:tt)*) => {
        $crate::errors::console($tone, format!($($arg)*))
    };
}
