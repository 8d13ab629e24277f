//! Counters for conditions the bridge absorbs instead of reporting.
//!
//! The library has no channel for callback failure, so the only way to see
//! dropped messages is here.

use std::sync::atomic::{AtomicU64, Ordering};

/// Why a progress message did not reach a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NullFormat,
    FormatFailed,
    AllocFailed,
}

impl DropReason {
    /// Decode the `OCSHIM_DROP_*` codes the C shim reports.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(DropReason::NullFormat),
            2 => Some(DropReason::FormatFailed),
            3 => Some(DropReason::AllocFailed),
            _ => None,
        }
    }
}

/// Plain copy of the counters, laid out for C (`ocshim_diagnostics`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub delivered: u64,
    pub null_format: u64,
    pub format_failed: u64,
    pub alloc_failed: u64,
    pub unhandled: u64,
    pub handler_panicked: u64,
}

impl DiagnosticsSnapshot {
    /// Total messages that never reached a handler.
    pub fn dropped(&self) -> u64 {
        self.null_format + self.format_failed + self.alloc_failed + self.unhandled
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    delivered: AtomicU64,
    null_format: AtomicU64,
    format_failed: AtomicU64,
    alloc_failed: AtomicU64,
    unhandled: AtomicU64,
    handler_panicked: AtomicU64,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            null_format: AtomicU64::new(0),
            format_failed: AtomicU64::new(0),
            alloc_failed: AtomicU64::new(0),
            unhandled: AtomicU64::new(0),
            handler_panicked: AtomicU64::new(0),
        }
    }

    pub fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::NullFormat => &self.null_format,
            DropReason::FormatFailed => &self.format_failed,
            DropReason::AllocFailed => &self.alloc_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unhandled(&self) {
        self.unhandled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.handler_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            null_format: self.null_format.load(Ordering::Relaxed),
            format_failed: self.format_failed.load(Ordering::Relaxed),
            alloc_failed: self.alloc_failed.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            handler_panicked: self.handler_panicked.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.delivered,
            &self.null_format,
            &self.format_failed,
            &self.alloc_failed,
            &self.unhandled,
            &self.handler_panicked,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

static GLOBAL: Diagnostics = Diagnostics::new();

/// Process-wide counters fed by the bridge entry points.
pub fn global() -> &'static Diagnostics {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_codes() {
        assert_eq!(DropReason::from_code(1), Some(DropReason::NullFormat));
        assert_eq!(DropReason::from_code(2), Some(DropReason::FormatFailed));
        assert_eq!(DropReason::from_code(3), Some(DropReason::AllocFailed));
        assert_eq!(DropReason::from_code(0), None);
        assert_eq!(DropReason::from_code(4), None);
    }

    #[test]
    fn test_counters_and_reset() {
        let diag = Diagnostics::new();
        diag.record_drop(DropReason::NullFormat);
        diag.record_drop(DropReason::AllocFailed);
        diag.record_unhandled();
        diag.record_delivered();
        diag.record_delivered();
        diag.record_panic();

        let snap = diag.snapshot();
        assert_eq!(snap.delivered, 2);
        assert_eq!(snap.null_format, 1);
        assert_eq!(snap.alloc_failed, 1);
        assert_eq!(snap.format_failed, 0);
        assert_eq!(snap.unhandled, 1);
        assert_eq!(snap.handler_panicked, 1);
        assert_eq!(snap.dropped(), 3);

        diag.reset();
        assert_eq!(diag.snapshot(), DiagnosticsSnapshot::default());
    }
}
