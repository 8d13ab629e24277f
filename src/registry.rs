//! Callback registry
//!
//! One slot per callback kind. A slot holds at most one handler and
//! registration is last-write-wins. The bridge entry points read the slot on
//! every call, so handlers may be swapped while the library is running.

use std::ffi::CStr;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::auth::{AuthFormHandle, AuthFormResult, CertVerdict};
use crate::bridge::ArgCursor;
use crate::context::{Context, Level};

/// Receives pre-formatted progress text.
pub type ProgressFn = dyn Fn(Context, Level, &CStr) + Send + Sync;
/// Receives the format string and an unconsumed argument cursor.
pub type CursorFn = dyn for<'a> Fn(Context, Level, &ArgCursor<'a>) + Send + Sync;
/// Decides whether a peer certificate is acceptable.
pub type CertFn = dyn Fn(Context, &CStr) -> CertVerdict + Send + Sync;
/// Fills in an authentication form.
pub type AuthFormFn = dyn Fn(Context, AuthFormHandle) -> AuthFormResult + Send + Sync;

/// A single handler slot.
///
/// Readers clone the `Arc` under the read lock and call the handler after
/// releasing it, so a handler can re-register from inside its own call.
struct Slot<T: ?Sized> {
    inner: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Slot<T> {
    const fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    fn set(&self, handler: Arc<T>) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(handler).is_some()
    }

    fn clear(&self) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.take().is_some()
    }

    fn get(&self) -> Option<Arc<T>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Handler table for every callback kind the bridge serves.
pub struct Registry {
    progress: Slot<ProgressFn>,
    progress_cursor: Slot<CursorFn>,
    cert: Slot<CertFn>,
    auth_form: Slot<AuthFormFn>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            progress: Slot::new(),
            progress_cursor: Slot::new(),
            cert: Slot::new(),
            auth_form: Slot::new(),
        }
    }

    pub fn register_progress<F>(&self, handler: F)
    where
        F: Fn(Context, Level, &CStr) + Send + Sync + 'static,
    {
        if self.progress.set(Arc::new(handler)) {
            debug!(target: "ocshim", "replaced progress handler");
        }
    }

    pub fn clear_progress(&self) {
        self.progress.clear();
    }

    pub fn has_progress(&self) -> bool {
        self.progress.is_set()
    }

    /// Returns `false` when no handler is registered.
    pub fn dispatch_progress(&self, ctx: Context, level: Level, text: &CStr) -> bool {
        match self.progress.get() {
            Some(handler) => {
                handler(ctx, level, text);
                true
            }
            None => false,
        }
    }

    pub fn register_progress_cursor<F>(&self, handler: F)
    where
        F: Fn(Context, Level, &ArgCursor<'_>) + Send + Sync + 'static,
    {
        if self.progress_cursor.set(Arc::new(handler)) {
            debug!(target: "ocshim", "replaced progress cursor handler");
        }
    }

    pub fn clear_progress_cursor(&self) {
        self.progress_cursor.clear();
    }

    pub fn has_progress_cursor(&self) -> bool {
        self.progress_cursor.is_set()
    }

    pub fn dispatch_progress_cursor(&self, ctx: Context, level: Level, cursor: &ArgCursor<'_>) -> bool {
        match self.progress_cursor.get() {
            Some(handler) => {
                handler(ctx, level, cursor);
                true
            }
            None => false,
        }
    }

    pub fn register_cert<F>(&self, handler: F)
    where
        F: Fn(Context, &CStr) -> CertVerdict + Send + Sync + 'static,
    {
        if self.cert.set(Arc::new(handler)) {
            debug!(target: "ocshim", "replaced certificate handler");
        }
    }

    pub fn clear_cert(&self) {
        self.cert.clear();
    }

    pub fn has_cert(&self) -> bool {
        self.cert.is_set()
    }

    /// `None` when no handler is registered.
    pub fn dispatch_cert(&self, ctx: Context, reason: &CStr) -> Option<CertVerdict> {
        self.cert.get().map(|handler| handler(ctx, reason))
    }

    pub fn register_auth_form<F>(&self, handler: F)
    where
        F: Fn(Context, AuthFormHandle) -> AuthFormResult + Send + Sync + 'static,
    {
        if self.auth_form.set(Arc::new(handler)) {
            debug!(target: "ocshim", "replaced auth form handler");
        }
    }

    pub fn clear_auth_form(&self) {
        self.auth_form.clear();
    }

    pub fn has_auth_form(&self) -> bool {
        self.auth_form.is_set()
    }

    pub fn dispatch_auth_form(&self, ctx: Context, form: AuthFormHandle) -> Option<AuthFormResult> {
        self.auth_form.get().map(|handler| handler(ctx, form))
    }

    /// Return every slot to the unset state.
    pub fn clear_all(&self) {
        self.progress.clear();
        self.progress_cursor.clear();
        self.cert.clear();
        self.auth_form.clear();
    }
}

static GLOBAL: Registry = Registry::new();

/// The process-wide registry the bridge entry points dispatch through.
pub fn global() -> &'static Registry {
    &GLOBAL
}
