use parking_lot::{lock_api::ArcMutexGuard, Mutex, RawMutex};
use std::{collections::BTreeMap, sync::Arc};

pub(crate) type KeyedGuard = ArcMutexGuard<RawMutex, ()>;

/// One lock per key, created on first use and kept for the lifetime of the map.
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<BTreeMap<K, Arc<Mutex<()>>>>,
}

impl<K: Ord + Copy> KeyedLocks<K> {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Blocks until the lock of `key` is acquired.
    /// The map itself is only locked while looking the key up.
    #[must_use]
    pub(crate) fn lock(&self, key: K) -> KeyedGuard {
        let lock = self.locks.lock().entry(key).or_default().clone();
        lock.lock_arc()
    }
}

impl<K: Ord + Copy> Default for KeyedLocks<K> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "async")]
mod async_impl {
    use parking_lot::Mutex as SyncMutex;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    use super::{Arc, BTreeMap};

    pub(crate) type KeyedSharedGuard = OwnedMutexGuard<()>;

    pub(crate) struct KeyedSharedLocks<K> {
        locks: SyncMutex<BTreeMap<K, Arc<Mutex<()>>>>,
    }

    impl<K: Ord + Copy> KeyedSharedLocks<K> {
        #[inline]
        #[must_use]
        pub(crate) const fn new() -> Self {
            Self {
                locks: SyncMutex::new(BTreeMap::new()),
            }
        }

        /// Waits until the lock of `key` is acquired.
        /// Dropping the returned future before completion doesn't leave the lock held.
        pub(crate) async fn lock(&self, key: K) -> KeyedSharedGuard {
            let lock = self.locks.lock().entry(key).or_default().clone();
            lock.lock_owned().await
        }
    }

    impl<K: Ord + Copy> Default for KeyedSharedLocks<K> {
        #[inline]
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(feature = "async")]
pub(crate) use async_impl::{KeyedSharedGuard, KeyedSharedLocks};
