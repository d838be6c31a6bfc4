//! Render config – the caller-owned "client" state shared by many render
//! calls: style sheets, media, renderer flags, deadline, executable and log
//! sink.
//!
//! Configs can be loaded from JSON so the CLI and the C ABI share one format.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PdfError;
use crate::executable::Executable;
use crate::logging::{default_logger, FileLog, RenderLog};

/// Which set of flag defaults a fresh config starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Defaults {
    /// Server mode off, JavaScript on.
    #[default]
    Current,
    /// Server mode on, JavaScript off.
    Legacy,
}

/// Configuration for rendering through `prince`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// CSS files passed as `-s`, in insertion order. Later sheets win.
    style_sheets: Vec<PathBuf>,
    /// `--media=<media>` when set and non-empty.
    pub media: Option<String>,
    /// Pass `--server`.
    pub server_flag: bool,
    /// Pass `--javascript`.
    pub javascript: bool,
    /// Deadline for the whole call. `None` waits forever.
    #[serde(rename = "timeout_ms", with = "timeout_ms")]
    pub timeout: Option<Duration>,
    /// Renderer binary; `None` uses [`Executable::default_executable`].
    pub executable: Option<Executable>,
    /// Append log records to this file instead of the default sink.
    pub log_file: Option<PathBuf>,
    /// Also log the source document at debug level.
    pub log_source: bool,
    /// Fail on a non-zero exit status even when diagnostics are clean.
    pub strict_exit_status: bool,
    /// Explicit sink; takes precedence over `log_file`.
    #[serde(skip)]
    pub logger: Option<Arc<dyn RenderLog>>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::with_defaults(Defaults::Current)
    }
}

impl RenderConfig {
    pub fn with_defaults(defaults: Defaults) -> Self {
        let (server_flag, javascript) = match defaults {
            Defaults::Current => (false, true),
            Defaults::Legacy => (true, false),
        };
        Self {
            style_sheets: Vec::new(),
            media: None,
            server_flag,
            javascript,
            timeout: None,
            executable: None,
            log_file: None,
            log_source: false,
            strict_exit_status: false,
            logger: None,
        }
    }

    /// Style sheets in the order they were added.
    pub fn style_sheets(&self) -> &[PathBuf] {
        &self.style_sheets
    }

    pub fn add_style_sheet(&mut self, sheet: impl Into<PathBuf>) -> &mut Self {
        self.style_sheets.push(sheet.into());
        self
    }

    pub fn add_style_sheets<I, P>(&mut self, sheets: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.style_sheets.extend(sheets.into_iter().map(Into::into));
        self
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    pub fn with_server_flag(mut self, on: bool) -> Self {
        self.server_flag = on;
        self
    }

    pub fn with_javascript(mut self, on: bool) -> Self {
        self.javascript = on;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_executable(mut self, executable: Executable) -> Self {
        self.executable = Some(executable);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn RenderLog>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// The configured executable, or the process-wide default.
    pub fn executable(&self) -> &Executable {
        self.executable
            .as_ref()
            .unwrap_or_else(|| Executable::default_executable())
    }

    /// The sink for this config: explicit logger, then log file, then the
    /// process-wide default.
    pub fn logger(&self) -> Arc<dyn RenderLog> {
        if let Some(logger) = &self.logger {
            return Arc::clone(logger);
        }
        match &self.log_file {
            Some(path) => Arc::new(FileLog::new(path)),
            None => default_logger(),
        }
    }

    /// Serialise to JSON. The explicit logger is never written.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON; missing fields take [`Defaults::Current`] values.
    pub fn from_json(json: &str) -> Result<Self, PdfError> {
        serde_json::from_str(json).map_err(|e| PdfError::Config(e.to_string()))
    }

    /// Deserialise from JSON; missing fields take the `defaults` profile.
    pub fn from_json_with_defaults(json: &str, defaults: Defaults) -> Result<Self, PdfError> {
        let config_err = |e: serde_json::Error| PdfError::Config(e.to_string());
        let overrides: serde_json::Value = serde_json::from_str(json).map_err(config_err)?;
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(PdfError::Config("expected a JSON object".to_string()));
        };
        let mut merged = serde_json::to_value(Self::with_defaults(defaults)).map_err(config_err)?;
        if let serde_json::Value::Object(base) = &mut merged {
            base.extend(overrides);
        }
        serde_json::from_value(merged).map_err(config_err)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, PdfError> {
        Self::from_json_file_with_defaults(path, Defaults::Current)
    }

    pub fn from_json_file_with_defaults(path: &Path, defaults: Defaults) -> Result<Self, PdfError> {
        let text = fs::read_to_string(path)
            .map_err(|e| PdfError::Config(format!("reading '{}': {e}", path.display())))?;
        Self::from_json_with_defaults(&text, defaults)
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("style_sheets", &self.style_sheets)
            .field("media", &self.media)
            .field("server_flag", &self.server_flag)
            .field("javascript", &self.javascript)
            .field("timeout", &self.timeout)
            .field("executable", &self.executable)
            .field("log_file", &self.log_file)
            .field("log_source", &self.log_source)
            .field("strict_exit_status", &self.strict_exit_status)
            .field("logger", &self.logger.as_ref().map(|_| "custom"))
            .finish()
    }
}

mod timeout_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
