//! Process-wide diagnostic switch.
//!
//! Disabled at startup. When enabled, table operations emit `tracing`
//! events at TRACE level; nothing else changes.

use core::sync::atomic::{AtomicBool, Ordering};

static TRACE: AtomicBool = AtomicBool::new(false);

/// Turn operation tracing on or off for the whole process.
pub fn set_trace(enable: bool) {
    TRACE.store(enable, Ordering::Relaxed);
}

pub fn trace_enabled() -> bool {
    TRACE.load(Ordering::Relaxed)
}

/// Emit a `tracing::trace!` event only while the switch is on.
macro_rules! trace_op {
    ($($arg:tt)*) => {
        if $crate::trace::trace_enabled() {
            ::tracing::trace!($($arg)*);
        }
    };
}

pub(crate) use trace_op;
