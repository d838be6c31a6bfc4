//! Error taxonomy for a render call.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal diagnostics reported by the renderer.
///
/// Holds every `prince: <message>` line (warnings excluded) in the order the
/// renderer emitted them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    messages: Vec<String>,
}

impl RenderError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Extracted messages, without the `prince: ` prefix.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Prince couldn't render the pdf, errors:\n\t{}",
            self.messages.join("\n\t")
        )
    }
}

impl std::error::Error for RenderError {}

/// Any failure surfaced by [`crate::pipeline::Pdf`].
#[derive(Debug, Error)]
pub enum PdfError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("prince did not finish within {after:?} and was killed")]
    Timeout { after: Duration },
    #[error("failed to launch '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("prince pipe failure: {0}")]
    Io(#[from] io::Error),
    #[error("prince exited with {} and no fatal diagnostics", describe_exit(.code))]
    Exit {
        code: Option<i32>,
        diagnostics: String,
    },
    #[error("invalid render config: {0}")]
    Config(String),
}

impl PdfError {
    /// Fatal diagnostic messages, if this is a render error.
    pub fn render_messages(&self) -> Option<&[String]> {
        match self {
            PdfError::Render(e) => Some(e.messages()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PdfError::Timeout { .. })
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
