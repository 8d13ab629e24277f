//! C FFI Interface for ocshim
//!
//! This module lets C hosts (and anything that speaks the C ABI) register
//! plain function pointers as handlers, apply a configuration, and read the
//! bridge diagnostics. The callbacks handed to OpenConnect itself live in
//! [`crate::bridge`] and [`crate::auth`].

#![allow(clippy::missing_safety_doc)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use log::error;

use crate::auth::{AuthFormResult, CertVerdict};
use crate::bridge::{Bridge, ProgressVfn, RawCursor};
use crate::config::BridgeConfig;
use crate::diagnostics::{self, DiagnosticsSnapshot};
use crate::error::{Result, ShimError};
use crate::registry;

/// Error codes returned by C FFI functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcShimError {
    Success = 0,
    InvalidConfig = 1,
    InvalidParameter = 5,
    InternalError = 99,
}

impl From<ShimError> for OcShimError {
    fn from(error: ShimError) -> Self {
        match error {
            ShimError::Config(_) => OcShimError::InvalidConfig,
            ShimError::InvalidParameter(_) => OcShimError::InvalidParameter,
            _ => OcShimError::InternalError,
        }
    }
}

/// `ocshim_progress_text_fn`
pub type ProgressTextFn = Option<unsafe extern "C" fn(privdata: *mut c_void, level: c_int, text: *const c_char)>;
/// `ocshim_progress_cursor_fn`
pub type ProgressCursorFn =
    Option<unsafe extern "C" fn(privdata: *mut c_void, level: c_int, cursor: *const RawCursor)>;
/// `ocshim_cert_fn`
pub type CertFn = Option<unsafe extern "C" fn(privdata: *mut c_void, reason: *const c_char) -> c_int>;
/// `ocshim_auth_form_fn`
pub type AuthFormFn = Option<unsafe extern "C" fn(privdata: *mut c_void, form: *mut c_void) -> c_int>;

/// Register the handler for formatted progress messages
///
/// # Parameters
/// - `handler`: called with `(privdata, level, text)`; `text` is only valid
///   during the call. NULL clears the slot.
#[no_mangle]
pub extern "C" fn ocshim_register_progress_handler(handler: ProgressTextFn) {
    match handler {
        Some(f) => registry::global().register_progress(move |ctx, level, text| unsafe {
            f(ctx.as_ptr(), level.as_raw(), text.as_ptr())
        }),
        None => registry::global().clear_progress(),
    }
}

/// Register the handler for forwarded progress messages
///
/// # Parameters
/// - `handler`: called with `(privdata, level, cursor)`; the cursor is only
///   valid during the call. NULL clears the slot.
#[no_mangle]
pub extern "C" fn ocshim_register_progress_va_handler(handler: ProgressCursorFn) {
    match handler {
        Some(f) => registry::global().register_progress_cursor(move |ctx, level, cursor| unsafe {
            f(ctx.as_ptr(), level.as_raw(), cursor.as_raw())
        }),
        None => registry::global().clear_progress_cursor(),
    }
}

/// Register the certificate validation handler
///
/// # Parameters
/// - `handler`: returns 0 to accept, nonzero to reject. NULL clears the slot.
#[no_mangle]
pub extern "C" fn ocshim_register_cert_handler(handler: CertFn) {
    match handler {
        Some(f) => registry::global().register_cert(move |ctx, reason| {
            CertVerdict::from_raw(unsafe { f(ctx.as_ptr(), reason.as_ptr()) })
        }),
        None => registry::global().clear_cert(),
    }
}

/// Register the auth form handler
///
/// # Parameters
/// - `handler`: returns an `OC_FORM_RESULT_*` code. NULL clears the slot.
#[no_mangle]
pub extern "C" fn ocshim_register_auth_form_handler(handler: AuthFormFn) {
    match handler {
        Some(f) => registry::global().register_auth_form(move |ctx, form| {
            AuthFormResult::from_raw(unsafe { f(ctx.as_ptr(), form.as_ptr()) })
        }),
        None => registry::global().clear_auth_form(),
    }
}

unsafe fn configure_from_ptr(config_str: *const c_char) -> Result<()> {
    if config_str.is_null() {
        return Err(ShimError::InvalidParameter("config string is NULL".to_string()));
    }

    let config_str = CStr::from_ptr(config_str)
        .to_str()
        .map_err(|e| ShimError::InvalidParameter(format!("config string is not UTF-8: {e}")))?;

    let config = config_str.parse::<BridgeConfig>()?;
    Bridge::install(&config)
}

/// Parse and apply a bridge configuration
///
/// # Parameters
/// - `config_str`: TOML configuration string
/// - `error_msg`: Output buffer for error messages (nullable)
/// - `error_msg_len`: Size of error message buffer
///
/// # Returns
/// - 0 on success
/// - Error code on failure
#[no_mangle]
pub unsafe extern "C" fn ocshim_configure(
    config_str: *const c_char,
    error_msg: *mut c_char,
    error_msg_len: usize,
) -> c_int {
    match configure_from_ptr(config_str) {
        Ok(()) => OcShimError::Success as c_int,
        Err(err) => {
            error!(target: "ocshim", "configuration rejected: {err}");
            if !error_msg.is_null() && error_msg_len > 0 {
                let error_cstr = CString::new(err.to_string()).unwrap_or_default();
                let error_bytes = error_cstr.as_bytes();
                let copy_len = std::cmp::min(error_bytes.len(), error_msg_len - 1);

                ptr::copy_nonoverlapping(error_bytes.as_ptr() as *const c_char, error_msg, copy_len);
                *error_msg.add(copy_len) = 0;
            }
            OcShimError::from(err) as c_int
        }
    }
}

/// Progress callback matching the configured mode
#[no_mangle]
pub extern "C" fn ocshim_progress_callback_for_config() -> ProgressVfn {
    Bridge::progress_callback()
}

/// Copy the diagnostic counters
///
/// # Returns
/// - 0 on success
/// - `InvalidParameter` if `out` is NULL
#[no_mangle]
pub unsafe extern "C" fn ocshim_diagnostics_get(out: *mut DiagnosticsSnapshot) -> c_int {
    if out.is_null() {
        return OcShimError::InvalidParameter as c_int;
    }
    *out = diagnostics::global().snapshot();
    OcShimError::Success as c_int
}

#[no_mangle]
pub extern "C" fn ocshim_diagnostics_reset() {
    diagnostics::global().reset();
}

/// Get library version
///
/// # Returns
/// - Version string (caller must not free)
#[no_mangle]
pub extern "C" fn ocshim_version() -> *const c_char {
    static VERSION_CSTR: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION_CSTR.as_ptr() as *const c_char
}
