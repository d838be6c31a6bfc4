//! Classification of the renderer's stderr text.
//!
//! Only lines of the form `prince: <message>` are considered. Of those, any
//! message starting with `warning` is noise; everything else is fatal. Lines
//! without the prefix (progress, info) are ignored entirely.

use crate::error::RenderError;

const PREFIX: &str = "prince:";
const WARNING: &str = "warning";

/// Result of scanning one diagnostics stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Fatal messages in order of appearance.
    pub fatal: Vec<String>,
    /// `prince: warning...` messages, kept for logging.
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn is_fatal(&self) -> bool {
        !self.fatal.is_empty()
    }

    /// Turn fatal messages into an error; `Ok` when there are none.
    pub fn into_result(self) -> Result<Vec<String>, RenderError> {
        if self.fatal.is_empty() {
            Ok(self.warnings)
        } else {
            Err(RenderError::new(self.fatal))
        }
    }
}

/// Scan the captured diagnostics. `None` and empty text are both clean.
pub fn classify(text: Option<&str>) -> Diagnostics {
    let mut out = Diagnostics::default();
    let Some(text) = text else {
        return out;
    };

    for line in text.lines() {
        let Some(message) = match_line(line) else {
            continue;
        };
        if message.starts_with(WARNING) {
            out.warnings.push(message.to_string());
        } else {
            out.fatal.push(message.to_string());
        }
    }
    out
}

/// Returns the message part of a `prince:<ws><message>` line.
fn match_line(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let rest = line.strip_prefix(PREFIX)?;
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => Some(chars.as_str()),
        _ => None,
    }
}
