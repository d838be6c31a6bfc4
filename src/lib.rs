//! # prince-forge – HTML → PDF through the Prince renderer
//!
//! This crate drives an external `prince` executable as a subprocess. The
//! stages of one render call are:
//!
//! 1. **Configure** – caller-owned [`RenderConfig`] ([`config`])
//! 2. **Build argv** – ordered argument list, never a shell string ([`command`])
//! 3. **Run** – spawn, pump stdin/stdout/stderr concurrently, enforce the
//!    deadline ([`runner`])
//! 4. **Classify** – turn stderr into fatal messages or noise ([`diagnostics`])
//!
//! [`pipeline::Pdf`] ties the stages together. A C-compatible FFI surface is
//! exposed via the [`ffi`] module.

pub mod command;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executable;
pub mod ffi;
pub mod logging;
pub mod pipeline;
pub mod runner;

// Re-exports for convenience
pub use command::OutputTarget;
pub use config::{Defaults, RenderConfig};
pub use error::{PdfError, RenderError};
pub use executable::Executable;
pub use pipeline::{pdf_from_string, Pdf, RenderOutput};
