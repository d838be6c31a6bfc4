//! Pipeline – ties together command building, the process runner and the
//! diagnostic classifier into single render calls.

use std::path::{Path, PathBuf};

use crate::command::{Invocation, OutputTarget};
use crate::config::RenderConfig;
use crate::diagnostics::classify;
use crate::error::PdfError;
use crate::logging::RenderLog;
use crate::runner::{run, RunOutput};

/// What a successful render produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    /// PDF bytes read from the renderer's stdout.
    Bytes(Vec<u8>),
    /// The renderer wrote the PDF to this path.
    File(PathBuf),
}

impl RenderOutput {
    /// The bytes, if the output was streamed.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            RenderOutput::Bytes(bytes) => Some(bytes),
            RenderOutput::File(_) => None,
        }
    }
}

/// A reusable renderer client.
///
/// Each call spawns its own process; calls share nothing but the config, so a
/// `Pdf` can be used from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct Pdf {
    config: RenderConfig,
}

impl Pdf {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Mutable access, e.g. to add style sheets. Not synchronised: callers
    /// sharing a `Pdf` must not mutate it while renders are in flight.
    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    /// The command line a render to `target` would run, as logged.
    pub fn command_line(&self, target: &OutputTarget) -> String {
        Invocation::new(&self.config, target).to_string()
    }

    /// Render `document` to `target`.
    pub fn render(&self, document: &str, target: OutputTarget) -> Result<RenderOutput, PdfError> {
        let logger = self.config.logger();
        let invocation = Invocation::new(&self.config, &target);
        log_command(logger.as_ref(), &invocation, self.config.log_source.then_some(document));

        let output = run(&invocation, document.as_bytes(), self.config.timeout)?;
        self.check(logger.as_ref(), &output)?;

        Ok(match target {
            OutputTarget::Stdout => RenderOutput::Bytes(output.stdout),
            OutputTarget::File(path) => RenderOutput::File(path),
        })
    }

    /// Render to stdout and return the PDF bytes.
    pub fn pdf_from_string(&self, document: &str) -> Result<Vec<u8>, PdfError> {
        let output = self.render(document, OutputTarget::Stdout)?;
        Ok(output.into_bytes().unwrap_or_default())
    }

    /// Have the renderer write the PDF to `path`. The file is not read back.
    pub fn render_to_file(&self, document: &str, path: &Path) -> Result<PathBuf, PdfError> {
        self.render(document, OutputTarget::File(path.to_path_buf()))?;
        Ok(path.to_path_buf())
    }

    /// Alias of [`Pdf::render_to_file`].
    pub fn pdf_from_string_to_file(&self, document: &str, path: &Path) -> Result<PathBuf, PdfError> {
        self.render_to_file(document, path)
    }

    /// Gate on diagnostics, then (optionally) on exit status.
    fn check(&self, logger: &dyn RenderLog, output: &RunOutput) -> Result<(), PdfError> {
        let diagnostics = classify(Some(&output.stderr));
        if diagnostics.is_fatal() {
            logger.error(&output.stderr);
        }
        for warning in &diagnostics.warnings {
            log::warn!("prince: {warning}");
        }
        diagnostics.into_result()?;

        if self.config.strict_exit_status && !output.status.success() {
            if !output.stderr.is_empty() {
                logger.error(&output.stderr);
            }
            return Err(PdfError::Exit {
                code: output.status.code(),
                diagnostics: output.stderr.clone(),
            });
        }
        Ok(())
    }
}

fn log_command(logger: &dyn RenderLog, invocation: &Invocation, source: Option<&str>) {
    logger.info("PRINCE XML PDF COMMAND");
    logger.info(&invocation.to_string());
    if let Some(source) = source {
        logger.debug(source);
    }
}

/// Convenience: render with a default config and return the bytes.
pub fn pdf_from_string(document: &str) -> Result<Vec<u8>, PdfError> {
    Pdf::default().pdf_from_string(document)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::executable::Executable;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, String)>>);

    impl RenderLog for Recorder {
        fn info(&self, message: &str) {
            self.0.lock().unwrap().push(("info".into(), message.into()));
        }
        fn debug(&self, message: &str) {
            self.0.lock().unwrap().push(("debug".into(), message.into()));
        }
        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(("error".into(), message.into()));
        }
    }

    fn stub(dir: &TempDir, body: &str) -> Executable {
        let path = dir.path().join("prince");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        Executable::new(path)
    }

    #[test]
    fn logs_command_before_spawn_and_diagnostics_on_failure() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut config = RenderConfig::default()
            .with_executable(stub(&dir, "cat >/dev/null; echo 'prince: bad' >&2"))
            .with_logger(recorder.clone());
        config.log_source = true;
        let pdf = Pdf::new(config);

        let err = pdf.pdf_from_string("<p>doc</p>").unwrap_err();
        assert_eq!(err.render_messages(), Some(&["bad".to_string()][..]));

        let records = recorder.0.lock().unwrap();
        assert_eq!(records[0], ("info".into(), "PRINCE XML PDF COMMAND".into()));
        assert!(records[1].1.ends_with("--input=html --javascript --silent - -o -"));
        assert_eq!(records[2], ("debug".into(), "<p>doc</p>".into()));
        assert_eq!(records[3], ("error".into(), "prince: bad\n".into()));
    }

    #[test]
    fn strict_exit_status_rejects_clean_failure() {
        let dir = TempDir::new().unwrap();
        let exe = stub(&dir, "cat >/dev/null; printf '%%PDF-'; exit 3");

        let lenient = Pdf::new(RenderConfig::default().with_executable(exe.clone()));
        assert_eq!(lenient.pdf_from_string("x").unwrap(), b"%PDF-");

        let mut config = RenderConfig::default().with_executable(exe);
        config.strict_exit_status = true;
        let err = Pdf::new(config).pdf_from_string("x").unwrap_err();
        assert!(matches!(err, PdfError::Exit { code: Some(3), .. }), "{err:?}");
    }

    #[test]
    fn command_line_reflects_target() {
        let pdf = Pdf::new(RenderConfig::default().with_executable(Executable::new("prince")));
        assert_eq!(
            pdf.command_line(&OutputTarget::File("out.pdf".into())),
            "prince --input=html --javascript --silent - -o out.pdf"
        );
    }
}
