//! Shared plumbing for tests that fork or wait. Such tests must not run
//! concurrently: `wait_any` collects whichever child terminates first, so
//! two of them running at once would steal each other's children.

use std::sync::{Mutex, MutexGuard, PoisonError};

static PROCESS_TEST_LOCK: Mutex<()> = Mutex::new(());

/// Hold this for the whole body of any test that forks a child process.
pub(crate) fn process_test_lock() -> MutexGuard<'static, ()> {
    PROCESS_TEST_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
