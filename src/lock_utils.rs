//! Poison-tolerant access to the session's shared state.
//!
//! Session state is only ever replaced wholesale (snapshots, views, the
//! pending transaction), so a recovered guard still holds the last
//! committed value.

use std::sync::{Mutex, MutexGuard};
use tracing::error;

/// Acquire a Mutex lock, recovering from poisoning if necessary.
///
/// # Arguments
/// * `mutex` - The Mutex to lock
/// * `context` - What the lock protects (for logging)
pub fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("Mutex poisoned for '{}' - recovering last committed value", context);
            poisoned.into_inner()
        }
    }
}
