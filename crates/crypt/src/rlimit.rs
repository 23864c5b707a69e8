#![allow(unsafe_code)]

//! Core-dump suppression while secrets are in memory.

use std::sync::Mutex;

/// Process-wide guard state. The depth counter makes nested password-bearing
/// sections safe: the limit is saved once on the outermost entry and
/// restored once on the outermost exit.
static GUARD: Mutex<GuardState> = Mutex::new(GuardState {
    depth: 0,
    saved: None,
});

struct GuardState {
    depth: u32,
    saved: Option<libc::rlimit>,
}

/// RAII guard that zeroes `RLIMIT_CORE` for its lifetime.
///
/// While any guard is alive a crash cannot write passwords or derived keys
/// into a core file. Failure to change the limit is logged as a warning and
/// the operation proceeds; suppression is defense in depth, not a
/// precondition.
pub struct CoreDumpGuard {
    _private: (),
}

impl CoreDumpGuard {
    /// Disables core dumps, saving the prior limit on the outermost call.
    #[must_use]
    pub fn disable() -> Self {
        let mut state = GUARD.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.depth == 0 {
            let mut prior = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            // SAFETY: `prior` is a valid out-pointer for getrlimit.
            if unsafe { libc::getrlimit(libc::RLIMIT_CORE, &mut prior) } == 0 {
                state.saved = Some(prior);
            } else {
                tracing::warn!("failed to read current core dump limit");
                state.saved = None;
            }

            let zero = libc::rlimit {
                rlim_cur: 0,
                rlim_max: state.saved.map_or(0, |prior| prior.rlim_max),
            };
            // SAFETY: `zero` is a valid rlimit value for setrlimit.
            if unsafe { libc::setrlimit(libc::RLIMIT_CORE, &zero) } != 0 {
                tracing::warn!("failed to disable core dumps");
            }
        }
        state.depth += 1;
        Self { _private: () }
    }
}

impl Drop for CoreDumpGuard {
    fn drop(&mut self) {
        let mut state = GUARD.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            if let Some(prior) = state.saved.take() {
                // SAFETY: `prior` is the rlimit previously returned by getrlimit.
                if unsafe { libc::setrlimit(libc::RLIMIT_CORE, &prior) } != 0 {
                    tracing::warn!("failed to restore core dump limit");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The guards mutate process-wide state; the tests must not interleave.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn current_core_limit() -> libc::rlimit {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: `limit` is a valid out-pointer for getrlimit.
        let rc = unsafe { libc::getrlimit(libc::RLIMIT_CORE, &mut limit) };
        assert_eq!(rc, 0, "getrlimit must succeed in tests");
        limit
    }

    #[test]
    fn guard_zeroes_and_restores_the_limit() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = current_core_limit();
        {
            let _guard = CoreDumpGuard::disable();
            assert_eq!(current_core_limit().rlim_cur, 0);
        }
        assert_eq!(current_core_limit().rlim_cur, before.rlim_cur);
    }

    #[test]
    fn nested_guards_restore_only_once() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = current_core_limit();
        {
            let _outer = CoreDumpGuard::disable();
            {
                let _inner = CoreDumpGuard::disable();
                assert_eq!(current_core_limit().rlim_cur, 0);
            }
            // Still suppressed while the outer guard lives.
            assert_eq!(current_core_limit().rlim_cur, 0);
        }
        assert_eq!(current_core_limit().rlim_cur, before.rlim_cur);
    }
}
