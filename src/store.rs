use parking_lot::Mutex;
use std::{collections::BTreeMap, mem};
use tracing::{debug, error};
#[cfg(feature = "async")]
use tracing::warn;

#[cfg(feature = "async")]
use crate::lock::{KeyedSharedGuard, KeyedSharedLocks};
use crate::{
    any::{AnyArc, TypeInfo},
    errors::CloseErrorKind,
    finalizer::BoxedFinalizer,
    lock::{KeyedGuard, KeyedLocks},
    provider::{Provider, ProviderId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreFlavor {
    /// Backs one resolution context, resolution of a provider happens on a single call path.
    Scope,
    /// Backs the container, shared by every context.
    Singleton,
}

/// Cache of produced instances keyed by provider identity, with the finalizers to call on close.
pub(crate) struct InstanceStore {
    flavor: StoreFlavor,
    cache: Mutex<BTreeMap<ProviderId, AnyArc>>,
    finalizers: Mutex<Vec<(TypeInfo, BoxedFinalizer)>>,
    locks: KeyedLocks<ProviderId>,
    #[cfg(feature = "async")]
    async_locks: KeyedSharedLocks<ProviderId>,
}

/// Result of [`InstanceStore::sync_lock`] and [`InstanceStore::lock`].
///
/// Holds the provider lock of a singleton store until dropped.
pub(crate) struct StoreGuard<G> {
    cached: Option<AnyArc>,
    _guard: Option<G>,
}

impl<G> StoreGuard<G> {
    #[inline]
    #[must_use]
    pub(crate) fn cached(&self) -> Option<AnyArc> {
        self.cached.clone()
    }
}

impl InstanceStore {
    #[inline]
    #[must_use]
    pub(crate) const fn new(flavor: StoreFlavor) -> Self {
        Self {
            flavor,
            cache: Mutex::new(BTreeMap::new()),
            finalizers: Mutex::new(Vec::new()),
            locks: KeyedLocks::new(),
            #[cfg(feature = "async")]
            async_locks: KeyedSharedLocks::new(),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, provider: &Provider) -> Option<AnyArc> {
        self.cache.lock().get(&provider.id()).cloned()
    }

    /// Caches the instance unless the provider is transient.
    ///
    /// Returns the cached instance, which is the already cached one if the provider was populated concurrently.
    pub(crate) fn add(&self, provider: &Provider, instance: AnyArc) -> AnyArc {
        if !provider.lifetime().is_cached() {
            return instance;
        }

        let cached = self.cache.lock().entry(provider.id()).or_insert(instance).clone();
        debug!("Cached");
        cached
    }

    /// Acquires the provider lock of a singleton store, for scope stores this doesn't lock anything.
    ///
    /// The returned guard contains the instance cached before or while waiting for the lock, if any.
    #[must_use]
    pub(crate) fn sync_lock(&self, provider: &Provider) -> StoreGuard<KeyedGuard> {
        let guard = match self.flavor {
            StoreFlavor::Scope => None,
            StoreFlavor::Singleton => Some(self.locks.lock(provider.id())),
        };

        StoreGuard {
            cached: self.get(provider),
            _guard: guard,
        }
    }

    /// Async version of [`Self::sync_lock`].
    #[cfg(feature = "async")]
    pub(crate) async fn lock(&self, provider: &Provider) -> StoreGuard<KeyedSharedGuard> {
        let guard = match self.flavor {
            StoreFlavor::Scope => None,
            StoreFlavor::Singleton => Some(self.async_locks.lock(provider.id()).await),
        };

        StoreGuard {
            cached: self.get(provider),
            _guard: guard,
        }
    }

    pub(crate) fn push_finalizer(&self, type_info: TypeInfo, finalizer: BoxedFinalizer) {
        self.finalizers.lock().push((type_info, finalizer));
        debug!("Pushed to finalizers");
    }

    #[cfg(feature = "async")]
    fn take(&self) -> Vec<(TypeInfo, BoxedFinalizer)> {
        self.cache.lock().clear();
        mem::take(&mut *self.finalizers.lock())
    }

    /// Calls finalizers in LIFO order and clears the cache.
    ///
    /// Every finalizer is called even if some of them fail, the first error is returned.
    /// If any finalizer is asynchronous, nothing is called or cleared and [`CloseErrorKind::AsyncFinalizerInSyncClose`]
    /// is returned, so the store can still be closed with [`Self::aclose`].
    pub(crate) fn close(&self) -> Result<(), CloseErrorKind> {
        let finalizers = {
            let mut finalizers = self.finalizers.lock();
            #[cfg(feature = "async")]
            if let Some(type_info) = last_async(&finalizers) {
                let err = CloseErrorKind::AsyncFinalizerInSyncClose { type_info };
                error!("{}", err);
                return Err(err);
            }
            self.cache.lock().clear();
            mem::take(&mut *finalizers)
        };

        let mut first_err = None;
        for (type_info, finalizer) in finalizers.into_iter().rev() {
            let result = match finalizer {
                BoxedFinalizer::Sync(finalizer) => finalizer().map_err(|source| CloseErrorKind::Finalizer { type_info, source }),
                #[cfg(feature = "async")]
                BoxedFinalizer::Async(_) => Err(CloseErrorKind::AsyncFinalizerInSyncClose { type_info }),
            };

            match result {
                Ok(()) => debug!(dependency = type_info.name, "Finalized"),
                Err(err) => {
                    error!("{}", err);
                    first_err.get_or_insert(err);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Async version of [`Self::close`], awaits asynchronous finalizers in the same LIFO order.
    #[cfg(feature = "async")]
    pub(crate) async fn aclose(&self) -> Result<(), CloseErrorKind> {
        let mut first_err = None;

        for (type_info, finalizer) in self.take().into_iter().rev() {
            let result = match finalizer {
                BoxedFinalizer::Sync(finalizer) => finalizer(),
                BoxedFinalizer::Async(finalizer) => finalizer().await,
            };

            match result {
                Ok(()) => debug!(dependency = type_info.name, "Finalized"),
                Err(source) => {
                    let err = CloseErrorKind::Finalizer { type_info, source };
                    error!("{}", err);
                    first_err.get_or_insert(err);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }
}

/// Type of the last pushed finalizer that has to be awaited, if any.
#[cfg(feature = "async")]
fn last_async(finalizers: &[(TypeInfo, BoxedFinalizer)]) -> Option<TypeInfo> {
    finalizers
        .iter()
        .rev()
        .find(|(_, finalizer)| finalizer.is_async())
        .map(|(type_info, _)| *type_info)
}

impl Drop for InstanceStore {
    fn drop(&mut self) {
        let finalizers = mem::take(self.finalizers.get_mut());
        if finalizers.is_empty() {
            return;
        }

        debug!("Closing on drop");
        for (type_info, finalizer) in finalizers.into_iter().rev() {
            match finalizer {
                BoxedFinalizer::Sync(finalizer) => {
                    if let Err(source) = finalizer() {
                        error!("{}", CloseErrorKind::Finalizer { type_info, source });
                    }
                }
                #[cfg(feature = "async")]
                BoxedFinalizer::Async(_) => {
                    warn!(dependency = type_info.name, "Asynchronous finalizer skipped, the store wasn't closed before drop");
                }
            }
        }
    }
}
