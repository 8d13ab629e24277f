//! ocshim - Static Library Bridging OpenConnect Callbacks into Rust
//!
//! OpenConnect reports progress through a C-variadic callback
//! (`void (*)(void *privdata, int level, const char *fmt, ...)`), which stable
//! Rust cannot implement. This library supplies that callback as a small C
//! shim and delivers each message to a handler registered from Rust or from a
//! C host.
//!
//! ## What This Library Provides
//! - Progress callbacks in two modes: pre-formatted text, or the format string
//!   with a forwarded argument cursor
//! - Certificate validation and auth-form callbacks with fail-closed defaults
//! - A last-write-wins handler registry, one slot per callback kind
//! - TOML configuration and an optional handler that forwards into `log`
//! - Counters for every message the bridge absorbs instead of reporting
//! - C FFI bindings for hosts written in other languages
//!
//! ## What Your Application Must Provide
//! - The OpenConnect session itself (`openconnect_vpninfo_new` and friends)
//! - The `privdata` context and whatever it points at
//!
//! ## Example
//! ```no_run
//! use ocshim::{Bridge, BridgeConfig};
//!
//! Bridge::install(&BridgeConfig::default()).unwrap();
//! Bridge::registry().register_progress(|ctx, level, text| {
//!     println!("[{ctx} {level}] {}", text.to_string_lossy());
//! });
//! let progress = Bridge::progress_callback();
//! // hand `progress` to openconnect_vpninfo_new(...)
//! # let _ = progress;
//! ```

pub mod auth;
pub mod bridge;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod log_sink;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export core types for static library interface
pub use auth::{AuthFormHandle, AuthFormResult, CertVerdict};
pub use bridge::{ArgCursor, Bridge, ProgressVfn};
pub use config::{BridgeConfig, ProgressMode};
pub use context::{Context, Level};
pub use diagnostics::DiagnosticsSnapshot;
pub use error::{Result, ShimError};
pub use log_sink::LogSink;
pub use registry::Registry;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// C FFI Interface for cross-platform integration
pub mod ffi;
