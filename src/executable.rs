//! Locating the `prince` binary and turning it into a runnable command.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the default executable.
pub const PRINCE_PATH_ENV: &str = "PRINCE_PATH";

const PRINCE_BIN: &str = if cfg!(windows) { "prince.exe" } else { "prince" };

/// Path to a renderer binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Executable {
    path: PathBuf,
}

static DEFAULT_EXECUTABLE: OnceLock<Executable> = OnceLock::new();

impl Executable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `PRINCE_PATH`, then `prince` on `PATH`, then the bare name.
    pub fn locate() -> Self {
        if let Some(path) = env::var_os(PRINCE_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::new(path);
        }
        match search_path(env::var_os("PATH").as_deref(), PRINCE_BIN) {
            Some(found) => Self::new(found),
            None => {
                log::debug!("{PRINCE_BIN} not found on PATH; relying on the OS lookup");
                Self::new(PRINCE_BIN)
            }
        }
    }

    /// Process-wide default, located once on first use.
    pub fn default_executable() -> &'static Executable {
        DEFAULT_EXECUTABLE.get_or_init(Self::locate)
    }

    /// Combine the path with an argument list. No shell is involved.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.path);
        cmd.args(args);
        cmd
    }
}

fn search_path(path_var: Option<&OsStr>, name: &str) -> Option<PathBuf> {
    env::split_paths(path_var?)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
