//! Helpers for tests that touch the process-wide registry and counters.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::{Context, Level};
use crate::registry;

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that use the global registry, settings, or diagnostics.
pub(crate) fn global_lock() -> MutexGuard<'static, ()> {
    GLOBAL_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

type Delivery = (Context, Level, Vec<u8>);

/// Records every formatted message delivered through the global registry.
pub(crate) struct Recorder {
    seen: Arc<Mutex<Vec<Delivery>>>,
}

impl Recorder {
    /// Clear all global slots and take the text slot.
    pub(crate) fn install_text() -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry::global().clear_all();
        registry::global().register_progress(move |ctx, level, text| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((ctx, level, text.to_bytes().to_vec()));
        });
        Self { seen }
    }

    pub(crate) fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.seen.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        registry::global().clear_progress();
    }
}
