//! Variadic progress bridge
//!
//! OpenConnect reports progress through `(privdata, level, fmt, ...)`. Stable
//! Rust can call C-variadic functions but cannot define them, so the entry
//! points the library calls are compiled from `csrc/progress_shim.c`. The shim
//! either formats the message and calls [`ocshim_dispatch_progress`], or packs
//! the format string and the live `va_list` into a cursor and calls
//! [`ocshim_dispatch_progress_va`]. Both land in the global
//! [`Registry`](crate::registry::Registry).
//!
//! Nothing in this module reports failure to the library. Dropped messages
//! and handler panics only show up in [`crate::diagnostics`].

#![allow(clippy::missing_safety_doc)]

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;
use log::{debug, trace, warn};

use crate::auth::CertVerdict;
use crate::config::{BridgeConfig, ProgressMode};
use crate::context::{Context, Level};
use crate::diagnostics::{self, Diagnostics, DiagnosticsSnapshot, DropReason};
use crate::error::Result;
use crate::log_sink::LogSink;
use crate::registry::{self, Registry};

/// Same shape as `openconnect_progress_vfn`.
pub type ProgressVfn = unsafe extern "C" fn(*mut c_void, c_int, *const c_char, ...);

/// C layout of `ocshim_cursor`.
#[repr(C)]
pub struct RawCursor {
    fmt: *const c_char,
    args: *mut c_void,
}

extern "C" {
    #[cfg(test)]
    pub(crate) fn ocshim_progress_callback(privdata: *mut c_void, level: c_int, fmt: *const c_char, ...);
    #[cfg(test)]
    pub(crate) fn ocshim_progress_va_callback(privdata: *mut c_void, level: c_int, fmt: *const c_char, ...);
    fn ocshim_get_progress_callback() -> ProgressVfn;
    fn ocshim_get_progress_va_callback() -> ProgressVfn;
    fn ocshim_cursor_format(cursor: *const RawCursor) -> *mut c_char;
    fn ocshim_string_free(s: *mut c_char);
}

/// Format string plus an unconsumed argument list, borrowed for one call.
///
/// The lifetime ties the cursor to the callback that produced it; the
/// underlying `va_list` is gone once that callback returns. Formatting always
/// walks a duplicate, so [`ArgCursor::format`] can be called repeatedly.
pub struct ArgCursor<'a> {
    raw: *const RawCursor,
    _call: PhantomData<&'a RawCursor>,
}

impl<'a> ArgCursor<'a> {
    /// # Safety
    /// `raw` must point at a live cursor with a non-NULL format string for
    /// the whole of `'a`.
    pub unsafe fn from_raw(raw: &'a RawCursor) -> Self {
        Self {
            raw,
            _call: PhantomData,
        }
    }

    pub fn format_string(&self) -> &'a CStr {
        // SAFETY: the shim never builds a cursor with a NULL format.
        unsafe { CStr::from_ptr((*self.raw).fmt) }
    }

    /// Render the message. `None` if measuring or allocating failed.
    pub fn format(&self) -> Option<CString> {
        // SAFETY: the cursor is live for 'a; the returned buffer is ours to free.
        unsafe {
            let buffer = ocshim_cursor_format(self.raw);
            if buffer.is_null() {
                return None;
            }
            let text = CStr::from_ptr(buffer).to_owned();
            ocshim_string_free(buffer);
            Some(text)
        }
    }

    /// Pointer for C handlers (`const ocshim_cursor *`).
    pub fn as_raw(&self) -> *const RawCursor {
        self.raw
    }
}

/// Settings applied by [`Bridge::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub mode: ProgressMode,
    pub unhandled_cert: CertVerdict,
    /// The log sink currently owns both progress slots.
    pub log_sink_installed: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: ProgressMode::Formatted,
            unhandled_cert: CertVerdict::Reject,
            log_sink_installed: false,
        }
    }
}

lazy_static! {
    static ref SETTINGS: RwLock<Settings> = RwLock::new(Settings::default());
}

pub(crate) fn settings() -> Settings {
    *SETTINGS.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn deliver_text(registry: &Registry, diag: &Diagnostics, ctx: Context, level: Level, text: &CStr) {
    match panic::catch_unwind(AssertUnwindSafe(|| registry.dispatch_progress(ctx, level, text))) {
        Ok(true) => diag.record_delivered(),
        Ok(false) => {
            diag.record_unhandled();
            trace!(target: "ocshim", "no progress handler, dropped {level} message for {ctx}");
        }
        Err(_) => {
            diag.record_panic();
            warn!(target: "ocshim", "progress handler panicked on {level} message for {ctx}");
        }
    }
}

pub(crate) fn deliver_cursor(
    registry: &Registry,
    diag: &Diagnostics,
    ctx: Context,
    level: Level,
    cursor: &ArgCursor<'_>,
) {
    match panic::catch_unwind(AssertUnwindSafe(|| registry.dispatch_progress_cursor(ctx, level, cursor))) {
        Ok(true) => diag.record_delivered(),
        Ok(false) => {
            diag.record_unhandled();
            trace!(target: "ocshim", "no cursor handler, dropped {level} message for {ctx}");
        }
        Err(_) => {
            diag.record_panic();
            warn!(target: "ocshim", "cursor handler panicked on {level} message for {ctx}");
        }
    }
}

/// Called by the shim with a formatted message. `text` is freed by the shim
/// as soon as this returns.
#[no_mangle]
pub unsafe extern "C" fn ocshim_dispatch_progress(privdata: *mut c_void, level: c_int, text: *const c_char) {
    if text.is_null() {
        return;
    }
    deliver_text(
        registry::global(),
        diagnostics::global(),
        Context::from_ptr(privdata),
        Level::from_raw(level),
        CStr::from_ptr(text),
    );
}

/// Called by the shim in forwarding mode.
#[no_mangle]
pub unsafe extern "C" fn ocshim_dispatch_progress_va(privdata: *mut c_void, level: c_int, cursor: *const RawCursor) {
    let Some(raw) = cursor.as_ref() else {
        return;
    };
    if raw.fmt.is_null() {
        diagnostics::global().record_drop(DropReason::NullFormat);
        return;
    }
    let cursor = ArgCursor::from_raw(raw);
    deliver_cursor(
        registry::global(),
        diagnostics::global(),
        Context::from_ptr(privdata),
        Level::from_raw(level),
        &cursor,
    );
}

/// Called by the shim when a message is dropped before dispatch.
#[no_mangle]
pub extern "C" fn ocshim_note_drop(reason: c_int) {
    match DropReason::from_code(reason) {
        Some(reason) => {
            diagnostics::global().record_drop(reason);
            trace!(target: "ocshim", "progress message dropped: {reason:?}");
        }
        None => debug!(target: "ocshim", "unknown drop reason {reason}"),
    }
}

/// Process-wide setup and callback selection.
pub struct Bridge;

impl Bridge {
    /// Apply a configuration: select the progress mode, the certificate
    /// fallback verdict, and optionally route library messages into `log`.
    ///
    /// Handlers registered by the host are left alone unless
    /// `logging.forward_to_log` asks for the log sink, which then takes the
    /// progress slots. A later install with forwarding off empties those
    /// slots again.
    pub fn install(config: &BridgeConfig) -> Result<()> {
        config.validate()?;
        let sink = if config.logging.forward_to_log {
            Some(LogSink::from_config(&config.logging)?)
        } else {
            None
        };

        let mut settings = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
        settings.mode = config.progress.mode;
        settings.unhandled_cert = config.certificates.unhandled;

        match sink {
            Some(sink) => {
                sink.register(registry::global());
                settings.log_sink_installed = true;
            }
            None if settings.log_sink_installed => {
                registry::global().clear_progress();
                registry::global().clear_progress_cursor();
                settings.log_sink_installed = false;
            }
            None => {}
        }
        drop(settings);

        debug!(
            target: "ocshim",
            "bridge installed: mode={:?} unhandled_cert={:?} forward_to_log={}",
            config.progress.mode, config.certificates.unhandled, config.logging.forward_to_log
        );
        Ok(())
    }

    pub fn settings() -> Settings {
        settings()
    }

    /// The progress callback for the installed mode, ready to hand to
    /// `openconnect_vpninfo_new`.
    pub fn progress_callback() -> ProgressVfn {
        Self::progress_callback_for(settings().mode)
    }

    pub fn progress_callback_for(mode: ProgressMode) -> ProgressVfn {
        // SAFETY: plain getters in the shim with no preconditions.
        unsafe {
            match mode {
                ProgressMode::Formatted => ocshim_get_progress_callback(),
                ProgressMode::Forward => ocshim_get_progress_va_callback(),
            }
        }
    }

    pub fn registry() -> &'static Registry {
        registry::global()
    }

    pub fn diagnostics() -> DiagnosticsSnapshot {
        diagnostics::global().snapshot()
    }
}
