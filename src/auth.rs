//! Certificate validation and auth-form callbacks.
//!
//! Both have fixed arity, so unlike the progress callback they are exported
//! directly from Rust. The getters exist for hosts that cannot take the
//! address of an exported symbol.

#![allow(clippy::missing_safety_doc)]

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::bridge;
use crate::context::Context;
use crate::diagnostics::{self, Diagnostics};
use crate::registry::{self, Registry};

/// Outcome of a peer certificate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertVerdict {
    Accept,
    Reject,
}

impl CertVerdict {
    /// The library treats zero as "accept" and anything else as "reject".
    pub fn to_raw(self) -> c_int {
        match self {
            CertVerdict::Accept => 0,
            CertVerdict::Reject => 1,
        }
    }

    pub fn from_raw(raw: c_int) -> Self {
        if raw == 0 {
            CertVerdict::Accept
        } else {
            CertVerdict::Reject
        }
    }
}

/// `OC_FORM_RESULT_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AuthFormResult {
    Err = -1,
    Ok = 0,
    Cancelled = 1,
    NewGroup = 2,
}

impl AuthFormResult {
    pub fn to_raw(self) -> c_int {
        self as c_int
    }

    /// Unknown codes are treated as errors.
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            0 => AuthFormResult::Ok,
            1 => AuthFormResult::Cancelled,
            2 => AuthFormResult::NewGroup,
            _ => AuthFormResult::Err,
        }
    }
}

/// Opaque `struct oc_auth_form *` owned by the library.
///
/// Never dereferenced here; the handler hands it back to library code that
/// knows the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFormHandle(*mut c_void);

impl AuthFormHandle {
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// Same shape as `openconnect_validate_peer_cert_vfn`.
pub type ValidatePeerCertVfn = unsafe extern "C" fn(*mut c_void, *const c_char) -> c_int;
/// Same shape as `openconnect_process_auth_form_vfn`.
pub type ProcessAuthFormVfn = unsafe extern "C" fn(*mut c_void, *mut c_void) -> c_int;

pub(crate) fn validate_cert(
    registry: &Registry,
    diag: &Diagnostics,
    ctx: Context,
    reason: &CStr,
    unhandled: CertVerdict,
) -> CertVerdict {
    match panic::catch_unwind(AssertUnwindSafe(|| registry.dispatch_cert(ctx, reason))) {
        Ok(Some(verdict)) => {
            diag.record_delivered();
            verdict
        }
        Ok(None) => {
            diag.record_unhandled();
            debug!(target: "ocshim", "no certificate handler for {ctx}, returning {unhandled:?}");
            unhandled
        }
        Err(_) => {
            diag.record_panic();
            warn!(target: "ocshim", "certificate handler panicked for {ctx}, returning {unhandled:?}");
            unhandled
        }
    }
}

pub(crate) fn process_form(
    registry: &Registry,
    diag: &Diagnostics,
    ctx: Context,
    form: AuthFormHandle,
) -> AuthFormResult {
    if form.is_null() {
        debug!(target: "ocshim", "NULL auth form for {ctx}");
        return AuthFormResult::Err;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| registry.dispatch_auth_form(ctx, form))) {
        Ok(Some(result)) => {
            diag.record_delivered();
            result
        }
        Ok(None) => {
            diag.record_unhandled();
            debug!(target: "ocshim", "no auth form handler for {ctx}");
            AuthFormResult::Err
        }
        Err(_) => {
            diag.record_panic();
            warn!(target: "ocshim", "auth form handler panicked for {ctx}");
            AuthFormResult::Err
        }
    }
}

/// Certificate validation entry point handed to the library.
///
/// # Returns
/// - 0 to accept the certificate
/// - nonzero to reject it
#[no_mangle]
pub unsafe extern "C" fn ocshim_validate_peer_cert(privdata: *mut c_void, reason: *const c_char) -> c_int {
    let reason = if reason.is_null() {
        c""
    } else {
        CStr::from_ptr(reason)
    };
    let unhandled = bridge::settings().unhandled_cert;
    validate_cert(
        registry::global(),
        diagnostics::global(),
        Context::from_ptr(privdata),
        reason,
        unhandled,
    )
    .to_raw()
}

/// Auth form entry point handed to the library.
///
/// # Returns
/// - One of the `OC_FORM_RESULT_*` codes
#[no_mangle]
pub unsafe extern "C" fn ocshim_process_auth_form(privdata: *mut c_void, form: *mut c_void) -> c_int {
    process_form(
        registry::global(),
        diagnostics::global(),
        Context::from_ptr(privdata),
        AuthFormHandle::from_ptr(form),
    )
    .to_raw()
}

#[no_mangle]
pub extern "C" fn ocshim_get_cert_validation_callback() -> ValidatePeerCertVfn {
    ocshim_validate_peer_cert
}

#[no_mangle]
pub extern "C" fn ocshim_get_auth_form_callback() -> ProcessAuthFormVfn {
    ocshim_process_auth_form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_codes() {
        assert_eq!(CertVerdict::Accept.to_raw(), 0);
        assert_ne!(CertVerdict::Reject.to_raw(), 0);
        assert_eq!(CertVerdict::from_raw(0), CertVerdict::Accept);
        assert_eq!(CertVerdict::from_raw(-3), CertVerdict::Reject);
    }

    #[test]
    fn test_form_result_codes() {
        assert_eq!(AuthFormResult::Err.to_raw(), -1);
        assert_eq!(AuthFormResult::Ok.to_raw(), 0);
        assert_eq!(AuthFormResult::Cancelled.to_raw(), 1);
        assert_eq!(AuthFormResult::NewGroup.to_raw(), 2);
        assert_eq!(AuthFormResult::from_raw(9), AuthFormResult::Err);
    }

    #[test]
    fn test_unhandled_cert_uses_default() {
        let registry = Registry::new();
        let diag = Diagnostics::new();
        let verdict = validate_cert(&registry, &diag, Context::NULL, c"expired", CertVerdict::Reject);
        assert_eq!(verdict, CertVerdict::Reject);
        let verdict = validate_cert(&registry, &diag, Context::NULL, c"expired", CertVerdict::Accept);
        assert_eq!(verdict, CertVerdict::Accept);
    }

    #[test]
    fn test_cert_handler_sees_reason_and_context() {
        let registry = Registry::new();
        let diag = Diagnostics::new();
        registry.register_cert(|ctx, reason| {
            if ctx == Context::from_raw(0x10) && reason.to_bytes() == b"hostname mismatch" {
                CertVerdict::Accept
            } else {
                CertVerdict::Reject
            }
        });
        let verdict = validate_cert(
            &registry,
            &diag,
            Context::from_raw(0x10),
            c"hostname mismatch",
            CertVerdict::Reject,
        );
        assert_eq!(verdict, CertVerdict::Accept);
        let verdict = validate_cert(&registry, &diag, Context::from_raw(0x11), c"hostname mismatch", CertVerdict::Reject);
        assert_eq!(verdict, CertVerdict::Reject);
    }

    #[test]
    fn test_panicking_cert_handler_fails_closed() {
        let registry = Registry::new();
        let diag = Diagnostics::new();
        registry.register_cert(|_, _| panic!("handler bug"));
        let verdict = validate_cert(&registry, &diag, Context::NULL, c"untrusted", CertVerdict::Reject);
        assert_eq!(verdict, CertVerdict::Reject);
        assert_eq!(diag.snapshot().handler_panicked, 1);
    }

    #[test]
    fn test_auth_form_paths() {
        let registry = Registry::new();
        let diag = Diagnostics::new();
        let mut form_storage = 0u8;
        let form = AuthFormHandle::from_ptr(&mut form_storage as *mut u8 as *mut c_void);

        assert_eq!(process_form(&registry, &diag, Context::NULL, form), AuthFormResult::Err);

        let form_addr = form.as_ptr() as usize;
        registry.register_auth_form(move |_, received| {
            if received.as_ptr() as usize == form_addr {
                AuthFormResult::NewGroup
            } else {
                AuthFormResult::Err
            }
        });
        assert_eq!(process_form(&registry, &diag, Context::NULL, form), AuthFormResult::NewGroup);

        let null_form = AuthFormHandle::from_ptr(std::ptr::null_mut());
        assert_eq!(process_form(&registry, &diag, Context::NULL, null_form), AuthFormResult::Err);

        registry.register_auth_form(|_, _| panic!("form bug"));
        assert_eq!(process_form(&registry, &diag, Context::NULL, form), AuthFormResult::Err);

        let snap = diag.snapshot();
        assert_eq!(snap.unhandled, 1);
        assert_eq!(snap.delivered, 1);
        assert_eq!(snap.handler_panicked, 1);
    }
}
