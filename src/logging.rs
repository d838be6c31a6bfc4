//! Log sinks for render calls.
//!
//! Every render logs its command line before spawning and, on failure, the
//! full diagnostics text. A sink never fails the render: write errors are
//! dropped.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Destination for render log records.
pub trait RenderLog: Send + Sync {
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards records to the `log` facade.
#[derive(Debug, Clone)]
pub struct LogFacade {
    target: &'static str,
}

impl LogFacade {
    pub const DEFAULT_TARGET: &'static str = "prince_forge";

    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogFacade {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TARGET)
    }
}

impl RenderLog for LogFacade {
    fn info(&self, message: &str) {
        log::info!(target: self.target, "{message}");
    }

    fn debug(&self, message: &str) {
        log::debug!(target: self.target, "{message}");
    }

    fn error(&self, message: &str) {
        log::error!(target: self.target, "{message}");
    }
}

/// Appends records to a file, one `LEVEL message` line each.
///
/// The file is opened per record so a config can be cloned and shared
/// without holding a handle.
pub struct FileLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, level: &str, message: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let file = OpenOptions::new().create(true).append(true).open(&self.path);
        match file {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{level} {message}") {
                    log::warn!("failed to append to {}: {e}", self.path.display());
                }
            }
            Err(e) => log::warn!("failed to open log file {}: {e}", self.path.display()),
        }
    }
}

impl fmt::Debug for FileLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLog").field("path", &self.path).finish()
    }
}

impl RenderLog for FileLog {
    fn info(&self, message: &str) {
        self.write("INFO", message);
    }

    fn debug(&self, message: &str) {
        self.write("DEBUG", message);
    }

    fn error(&self, message: &str) {
        self.write("ERROR", message);
    }
}

static DEFAULT_LOGGER: OnceLock<Arc<dyn RenderLog>> = OnceLock::new();

/// The process-wide sink used when a config names none.
///
/// Initialised on first use with a [`LogFacade`]; concurrent first calls
/// observe the same instance.
pub fn default_logger() -> Arc<dyn RenderLog> {
    Arc::clone(DEFAULT_LOGGER.get_or_init(|| Arc::new(LogFacade::default())))
}

/// Install the process-wide sink. Returns the sink back if one is already set.
pub fn set_default_logger(logger: Arc<dyn RenderLog>) -> Result<(), Arc<dyn RenderLog>> {
    DEFAULT_LOGGER.set(logger)
}
