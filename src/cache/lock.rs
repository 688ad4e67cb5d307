//! Lock access for the in-process cache. Poisoned locks are reclaimed and logged.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| reclaim(poisoned, owner, op, "read"))
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| reclaim(poisoned, owner, op, "write"))
}

fn reclaim<G>(
    poisoned: PoisonError<G>,
    owner: &'static str,
    op: &'static str,
    mode: &'static str,
) -> G {
    warn!(owner, op, mode, "cache lock poisoned by a panicked holder; reusing its contents");
    poisoned.into_inner()
}
