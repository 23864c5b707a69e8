#![allow(unsafe_code)]

//! Signal-driven cancellation.
//!
//! The handler is async-signal-safe: it only stores an atomic flag. The
//! orchestrator polls [`interrupted`] at per-file boundaries and unwinds
//! through its RAII temp-file guards, so cancellation never leaves stray
//! files behind.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Installs the `SIGINT` handler. Call once at startup.
pub fn install_signal_handler() {
    // SAFETY: handle_signal is async-signal-safe (a single atomic store) and
    // has the signature libc::signal expects.
    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
    }
}

/// Reports whether a `SIGINT` arrived since startup.
#[must_use]
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(test)]
pub(crate) fn reset_for_test() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear_and_latches() {
        reset_for_test();
        assert!(!interrupted());
        INTERRUPTED.store(true, Ordering::SeqCst);
        assert!(interrupted());
        reset_for_test();
    }
}
