//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - PDF buffers returned by `pforge_render` are allocated on the Rust heap.
//!   Callers **must** free them with `pforge_free_buffer`; a null pointer is
//!   a no-op.
//! - Strings returned by `pforge_last_error*` and `pforge_version` are owned
//!   by the library and must not be freed.
//!
//! ## Configuration
//! - Render functions take an optional null-terminated JSON config in the
//!   same format as [`RenderConfig::from_json`]. Pass `NULL` for defaults.
//!
//! ## Error handling
//! - Functions return a `c_int`: `0` success, `1` null pointer, `2` invalid
//!   UTF-8, `3` invalid config, `4` prince reported fatal errors, `5` timeout,
//!   `6` spawn / pipe / exit-status failure.
//! - Error details can be retrieved via `pforge_last_error`; for code `4`
//!   the individual messages via `pforge_last_error_message`.
//!
//! ## Thread safety
//! - The last-error state is thread-local, so it is safe to call from
//!   multiple threads.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;
use std::slice;

use crate::config::RenderConfig;
use crate::error::PdfError;
use crate::pipeline::Pdf;

const RC_NULL: c_int = 1;
const RC_UTF8: c_int = 2;
const RC_CONFIG: c_int = 3;
const RC_RENDER: c_int = 4;
const RC_TIMEOUT: c_int = 5;
const RC_FAILED: c_int = 6;

struct LastError {
    text: CString,
    messages: Vec<CString>,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    set_last_error_with(msg, &[]);
}

fn set_last_error_with(msg: &str, messages: &[String]) {
    let text = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    let messages = messages
        .iter()
        .map(|m| CString::new(m.replace('\0', " ")).unwrap_or_default())
        .collect();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(LastError { text, messages }));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn report(err: &PdfError) -> c_int {
    match err {
        PdfError::Render(render) => {
            set_last_error_with(&err.to_string(), render.messages());
            RC_RENDER
        }
        PdfError::Timeout { .. } => {
            set_last_error(&err.to_string());
            RC_TIMEOUT
        }
        PdfError::Config(_) => {
            set_last_error(&err.to_string());
            RC_CONFIG
        }
        PdfError::Spawn { .. } | PdfError::Io(_) | PdfError::Exit { .. } => {
            set_last_error(&err.to_string());
            RC_FAILED
        }
    }
}

/// Read the HTML argument as `&str`.
///
/// # Safety
/// `html_ptr` must point to `html_len` valid bytes.
unsafe fn html_arg<'a>(html_ptr: *const u8, html_len: u32) -> Result<&'a str, c_int> {
    let html_bytes = slice::from_raw_parts(html_ptr, html_len as usize);
    std::str::from_utf8(html_bytes).map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        RC_UTF8
    })
}

/// Parse the optional JSON config.
///
/// # Safety
/// `config_json`, if non-null, must be a valid null-terminated string.
unsafe fn config_arg(config_json: *const c_char) -> Result<RenderConfig, c_int> {
    if config_json.is_null() {
        return Ok(RenderConfig::default());
    }
    let json = CStr::from_ptr(config_json).to_str().map_err(|e| {
        set_last_error(&format!("Invalid UTF-8 in config: {e}"));
        RC_UTF8
    })?;
    RenderConfig::from_json(json).map_err(|e| report(&e))
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Render HTML to PDF bytes through prince's stdout.
///
/// # Parameters
/// - `html_ptr`, `html_len`: UTF-8 HTML (not necessarily null-terminated)
/// - `config_json`: optional null-terminated JSON config; `NULL` for defaults
/// - `out_buf`, `out_len`: on success, receive the heap-allocated PDF bytes
///
/// # Safety
/// - `html_ptr` must point to `html_len` valid bytes.
/// - `config_json`, if non-null, must be a valid null-terminated string.
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `pforge_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn pforge_render(
    html_ptr: *const u8,
    html_len: u32,
    config_json: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if html_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return RC_NULL;
    }
    let html = match html_arg(html_ptr, html_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let config = match config_arg(config_json) {
        Ok(c) => c,
        Err(rc) => return rc,
    };

    match Pdf::new(config).pdf_from_string(html) {
        Ok(pdf_bytes) => {
            clear_last_error();
            let len = pdf_bytes.len() as u32;
            let buf = pdf_bytes.into_boxed_slice();
            *out_buf = Box::into_raw(buf) as *mut u8;
            *out_len = len;
            0
        }
        Err(e) => report(&e),
    }
}

/// Render HTML to a PDF file written by prince itself.
///
/// # Safety
/// - `html_ptr` must point to `html_len` valid bytes.
/// - `config_json`, if non-null, and `output_path` must be valid
///   null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn pforge_render_to_file(
    html_ptr: *const u8,
    html_len: u32,
    config_json: *const c_char,
    output_path: *const c_char,
) -> c_int {
    if html_ptr.is_null() || output_path.is_null() {
        set_last_error("Null pointer argument");
        return RC_NULL;
    }
    let html = match html_arg(html_ptr, html_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let path = match CStr::from_ptr(output_path).to_str() {
        Ok(p) => Path::new(p),
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8 in output path: {e}"));
            return RC_UTF8;
        }
    };
    let config = match config_arg(config_json) {
        Ok(c) => c,
        Err(rc) => return rc,
    };

    match Pdf::new(config).render_to_file(html, path) {
        Ok(_) => {
            clear_last_error();
            0
        }
        Err(e) => report(&e),
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `pforge_render`.
///
/// # Safety
/// `buf` must have been returned by a previous `pforge_render` call, and
/// `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn pforge_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `pforge_*` call on the same
/// thread. The caller should **not** free this pointer.
///
/// Returns null if the last call succeeded.
#[no_mangle]
pub extern "C" fn pforge_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(last) => last.text.as_ptr(),
        None => ptr::null(),
    })
}

/// Number of prince messages attached to the last error (non-zero only
/// after return code `4`).
#[no_mangle]
pub extern "C" fn pforge_last_error_message_count() -> u32 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map_or(0, |last| last.messages.len() as u32)
    })
}

/// The `index`-th prince message of the last error, or null when out of
/// range. Same lifetime rules as `pforge_last_error`.
#[no_mangle]
pub extern "C" fn pforge_last_error_message(index: u32) -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .and_then(|last| last.messages.get(index as usize))
            .map_or(ptr::null(), |m| m.as_ptr())
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn pforge_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe { pforge_render(ptr::null(), 0, ptr::null(), &mut out_buf, &mut out_len) };

        assert_eq!(rc, RC_NULL, "Should fail on null input");
        assert!(!pforge_last_error().is_null());
    }

    #[test]
    fn ffi_invalid_utf8() {
        let html = [0xff_u8, 0xfe];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            pforge_render(html.as_ptr(), 2, ptr::null(), &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, RC_UTF8);
    }

    #[test]
    fn ffi_invalid_config() {
        let html = b"<p>x</p>";
        let cfg = CString::new("{\"timeout_ms\": \"soon\"}").unwrap();
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            pforge_render(html.as_ptr(), html.len() as u32, cfg.as_ptr(), &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, RC_CONFIG);
        let msg = unsafe { CStr::from_ptr(pforge_last_error()) }.to_str().unwrap();
        assert!(msg.starts_with("invalid render config"), "{msg}");
    }

    #[test]
    fn ffi_render_error_exposes_messages() {
        let err: PdfError =
            crate::error::RenderError::new(vec!["a".into(), "b".into()]).into();
        assert_eq!(report(&err), RC_RENDER);
        assert_eq!(pforge_last_error_message_count(), 2);
        let second = unsafe { CStr::from_ptr(pforge_last_error_message(1)) };
        assert_eq!(second.to_str().unwrap(), "b");
        assert!(pforge_last_error_message(2).is_null());
    }

    #[test]
    fn ffi_error_strings_are_library_owned() {
        set_last_error("first");
        let a = pforge_last_error();
        let b = pforge_last_error();
        assert_eq!(a, b, "repeat calls hand out the same buffer");
        assert_eq!(unsafe { CStr::from_ptr(a) }.to_str().unwrap(), "first");

        clear_last_error();
        assert!(pforge_last_error().is_null());
        assert_eq!(pforge_last_error_message_count(), 0);
    }

    #[test]
    fn ffi_version() {
        let v = pforge_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
