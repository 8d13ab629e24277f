//! Pass-through values carried on every callback: the caller's context token
//! and the library's severity level.

use std::fmt;
use std::os::raw::{c_int, c_void};

/// Opaque, caller-owned token threaded through every callback (`privdata`).
///
/// Stored as an integer so it cannot be dereferenced by accident. Only the
/// code that created it knows what it points at; use [`Context::as_ptr`] to
/// hand it back to that code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Context(usize);

impl Context {
    /// The NULL context.
    pub const NULL: Context = Context(0);

    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Severity passed by the library, kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Level(c_int);

impl Level {
    /// `PRG_ERR`
    pub const ERR: Level = Level(0);
    /// `PRG_INFO`
    pub const INFO: Level = Level(1);
    /// `PRG_DEBUG`
    pub const DEBUG: Level = Level(2);
    /// `PRG_TRACE`
    pub const TRACE: Level = Level(3);

    pub const fn from_raw(raw: c_int) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> c_int {
        self.0
    }

    /// Map onto the `log` facade. Anything below `PRG_ERR` is an error,
    /// anything above `PRG_TRACE` is trace.
    pub fn to_log_level(self) -> log::Level {
        match self.0 {
            i32::MIN..=0 => log::Level::Error,
            1 => log::Level::Info,
            2 => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }
}

impl From<c_int> for Level {
    fn from(raw: c_int) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::ERR => f.write_str("ERR"),
            Level::INFO => f.write_str("INFO"),
            Level::DEBUG => f.write_str("DEBUG"),
            Level::TRACE => f.write_str("TRACE"),
            Level(other) => write!(f, "LEVEL({other})"),
        }
    }
}
