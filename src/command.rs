//! Command builder – turns a [`RenderConfig`] plus an output target into the
//! exact argv handed to `prince`.
//!
//! Arguments are kept as a list and never joined into a shell string, so
//! paths with spaces or quotes reach the renderer untouched. Nothing is
//! validated here; bad sheets or media show up later as diagnostics.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::RenderConfig;
use crate::executable::Executable;

/// The `-o` value meaning "write the PDF to stdout".
pub const STDOUT_SENTINEL: &str = "-";

/// Where the renderer writes the PDF.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// Stream the bytes back to the caller.
    #[default]
    Stdout,
    /// The renderer writes the file itself.
    File(PathBuf),
}

impl OutputTarget {
    fn as_os_str(&self) -> &OsStr {
        match self {
            OutputTarget::Stdout => OsStr::new(STDOUT_SENTINEL),
            OutputTarget::File(path) => path.as_os_str(),
        }
    }
}

impl From<&Path> for OutputTarget {
    fn from(path: &Path) -> Self {
        if path.as_os_str() == STDOUT_SENTINEL {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(path.to_path_buf())
        }
    }
}

/// Build the ordered argument list for one render call.
pub fn build_args(config: &RenderConfig, target: &OutputTarget) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--input=html".into()];

    if config.server_flag {
        args.push("--server".into());
    }
    if let Some(media) = config.media.as_deref().filter(|m| !m.is_empty()) {
        args.push(format!("--media={media}").into());
    }
    if config.javascript {
        args.push("--javascript".into());
    }
    for sheet in config.style_sheets() {
        args.push("-s".into());
        args.push(sheet.as_os_str().to_owned());
    }

    args.push("--silent".into());
    args.push(STDOUT_SENTINEL.into());
    args.push("-o".into());
    args.push(target.as_os_str().to_owned());
    args
}

/// One fully-formed renderer invocation. Built fresh per call.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(config: &RenderConfig, target: &OutputTarget) -> Self {
        Self::with_executable(config.executable(), config, target)
    }

    pub fn with_executable(exe: &Executable, config: &RenderConfig, target: &OutputTarget) -> Self {
        Self {
            program: exe.path().to_path_buf(),
            args: build_args(config, target),
        }
    }

    /// An invocation with an explicit argv, bypassing [`build_args`].
    pub fn from_parts(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn to_command(&self) -> Command {
        Executable::new(&self.program).command(&self.args)
    }
}

/// Space-separated command line for logs. Not meant to be re-parsed.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn bare() -> RenderConfig {
        RenderConfig::default().with_javascript(false)
    }

    #[test]
    fn minimal_argv() {
        let args = build_args(&bare(), &OutputTarget::Stdout);
        assert_eq!(strings(&args), ["--input=html", "--silent", "-", "-o", "-"]);
    }

    #[test]
    fn full_argv_order() {
        let mut config = RenderConfig::default()
            .with_server_flag(true)
            .with_media("print");
        config.add_style_sheets(["one.css", "two.css"]);
        let args = build_args(&config, &OutputTarget::File("out.pdf".into()));
        assert_eq!(
            strings(&args),
            [
                "--input=html",
                "--server",
                "--media=print",
                "--javascript",
                "-s",
                "one.css",
                "-s",
                "two.css",
                "--silent",
                "-",
                "-o",
                "out.pdf",
            ]
        );
    }

    #[test]
    fn flags_toggle_independently() {
        let base = strings(&build_args(&bare(), &OutputTarget::Stdout));
        let cases: [(RenderConfig, &str); 3] = [
            (bare().with_server_flag(true), "--server"),
            (bare().with_javascript(true), "--javascript"),
            (bare().with_media("screen"), "--media=screen"),
        ];
        for (config, flag) in cases {
            let args = strings(&build_args(&config, &OutputTarget::Stdout));
            assert_eq!(args.len(), base.len() + 1, "{flag}");
            let without: Vec<_> = args.iter().filter(|a| *a != flag).cloned().collect();
            assert_eq!(without, base, "{flag}");
        }
    }

    #[test]
    fn empty_media_is_omitted() {
        let args = strings(&build_args(&bare().with_media(""), &OutputTarget::Stdout));
        assert!(!args.iter().any(|a| a.starts_with("--media")));
    }

    #[test]
    fn sheet_paths_with_spaces_stay_single_args() {
        let mut config = bare();
        config.add_style_sheet("my styles/print sheet.css");
        let args = strings(&build_args(&config, &OutputTarget::Stdout));
        assert_eq!(args[1], "-s");
        assert_eq!(args[2], "my styles/print sheet.css");
    }

    #[test]
    fn dash_path_maps_to_stdout_target() {
        assert_eq!(OutputTarget::from(Path::new("-")), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::from(Path::new("a.pdf")),
            OutputTarget::File("a.pdf".into())
        );
    }

    #[test]
    fn invocation_display_is_loggable() {
        let exe = Executable::new("/usr/bin/prince");
        let inv = Invocation::with_executable(&exe, &bare(), &OutputTarget::Stdout);
        assert_eq!(inv.to_string(), "/usr/bin/prince --input=html --silent - -o -");
        assert_eq!(inv.to_command().get_program(), OsStr::new("/usr/bin/prince"));
    }
}
