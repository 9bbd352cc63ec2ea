use parking_lot::{Mutex, RwLock};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, error};

#[cfg(feature = "async")]
use crate::{async_impl::context::Context, errors::StartErrorKind};
use crate::{
    any::TypeInfo,
    context::SyncContext,
    dependency::Dependency,
    errors::{CloseErrorKind, RegisterErrorKind, ResolveErrorKind},
    extensions::{Extension, FactoryDependencyExtractor, ObjectDependencyExtractor, SupportsDependencyExtraction},
    generics::{GenericFamily, GenericTemplate},
    provider::{Provider, ProviderId},
    registry::Registry,
    store::{InstanceStore, StoreFlavor},
};

/// Registry of providers plus the singleton instance store shared by every context created from it.
///
/// Cloning is cheap, clones share the same registry and singletons.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    registry: RwLock<Registry>,
    /// Providers of active overrides per type, the last one wins.
    overrides: RwLock<BTreeMap<TypeInfo, Vec<(u64, Provider)>>>,
    next_override: AtomicU64,
    families: RwLock<BTreeSet<TypeInfo>>,
    instantiated: Mutex<BTreeMap<TypeInfo, Provider>>,
    dependencies: RwLock<BTreeMap<ProviderId, Arc<[Dependency]>>>,
    pub(crate) singletons: InstanceStore,
    extensions: Box<[Arc<dyn Extension>]>,
    /// Count of extensions started by [`Container::start`], `None` if the container isn't started.
    #[cfg(feature = "async")]
    started: tokio::sync::Mutex<Option<usize>>,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_extensions(Vec::new())
    }

    /// Creates container with extensions, calling [`Extension::on_init`] of each of them in order.
    #[must_use]
    pub fn with_extensions(extensions: Vec<Arc<dyn Extension>>) -> Self {
        let container = Self {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(Registry::new()),
                overrides: RwLock::new(BTreeMap::new()),
                next_override: AtomicU64::new(0),
                families: RwLock::new(BTreeSet::new()),
                instantiated: Mutex::new(BTreeMap::new()),
                dependencies: RwLock::new(BTreeMap::new()),
                singletons: InstanceStore::new(StoreFlavor::Singleton),
                extensions: extensions.into_boxed_slice(),
                #[cfg(feature = "async")]
                started: tokio::sync::Mutex::new(None),
            }),
        };

        for extension in container.inner.extensions.iter() {
            extension.on_init(&container);
            debug!(extension = extension.name(), "Initialized");
        }

        container
    }

    /// Registers the provider for the type returned by its dependency extractor.
    ///
    /// Registration isn't synchronized with resolutions of the same type running concurrently,
    /// register providers before sharing the container.
    ///
    /// # Errors
    /// - Returns [`RegisterErrorKind::DuplicateProvider`] if a provider with the same implementation is already registered for the type
    /// - Returns [`RegisterErrorKind::ExtractorMismatch`] if an extension extractor disagrees with the factory arguments
    pub fn register(&self, provider: Provider) -> Result<(), RegisterErrorKind> {
        self.extract(&provider)
            .and_then(|(type_info, _)| {
                self.inner
                    .registry
                    .write()
                    .add(type_info, provider)
                    .inspect(|_| debug!(dependency = type_info.name, "Registered"))
            })
            .inspect_err(|err| error!("{}", err))
    }

    /// # Errors
    /// Stops on the first failed registration, see [`Self::register`]
    pub fn register_all(&self, providers: impl IntoIterator<Item = Provider>) -> Result<(), RegisterErrorKind> {
        providers.into_iter().try_for_each(|provider| self.register(provider))
    }

    /// Registers a generic family, see [`GenericFamily`].
    ///
    /// # Errors
    /// Returns [`RegisterErrorKind::DuplicateGenericFamily`] if the family is already registered
    pub fn register_generic<Family: GenericFamily>(&self) -> Result<(), RegisterErrorKind> {
        let family = TypeInfo::of::<Family>();
        if self.inner.families.write().insert(family) {
            debug!(family = family.name, "Generic family registered");
            Ok(())
        } else {
            let err = RegisterErrorKind::DuplicateGenericFamily { family };
            error!("{}", err);
            Err(err)
        }
    }

    /// Returns the only provider registered for `Dep`.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoProvider`] if no provider is registered
    /// - Returns [`ResolveErrorKind::MultipleProviders`] if more than one provider is registered
    pub fn get_provider<Dep: ?Sized + 'static>(&self) -> Result<Provider, ResolveErrorKind> {
        let type_info = TypeInfo::of::<Dep>();
        self.select(type_info, None)?.ok_or(ResolveErrorKind::NoProvider { type_info })
    }

    /// Returns the provider registered for `Dep` with implementation `Impl`.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoProvider`] if no provider is registered
    /// - Returns [`ResolveErrorKind::NoImplementation`] if none of the registered providers has the implementation
    pub fn get_provider_impl<Dep: ?Sized + 'static, Impl: ?Sized + 'static>(&self) -> Result<Provider, ResolveErrorKind> {
        let type_info = TypeInfo::of::<Dep>();
        self.select(type_info, Some(TypeInfo::of::<Impl>()))?
            .ok_or(ResolveErrorKind::NoProvider { type_info })
    }

    pub(crate) fn select(&self, type_info: TypeInfo, implementation: Option<TypeInfo>) -> Result<Option<Provider>, ResolveErrorKind> {
        if let Some(provider) = self.overridden(type_info) {
            return match implementation {
                Some(implementation) if provider.implementation() != implementation => {
                    Err(ResolveErrorKind::NoImplementation { type_info, implementation })
                }
                _ => Ok(Some(provider)),
            };
        }

        self.inner
            .registry
            .read()
            .select(type_info, implementation)
            .map(|provider| provider.cloned())
    }

    /// Providers registered for the type, in registration order.
    #[must_use]
    pub fn providers_for(&self, type_info: TypeInfo) -> Vec<Provider> {
        match self.overridden(type_info) {
            Some(provider) => vec![provider],
            None => self.inner.registry.read().get(&type_info).to_vec(),
        }
    }

    /// Snapshot of every registered provider grouped by type, with active overrides applied.
    #[must_use]
    pub fn providers(&self) -> Vec<(TypeInfo, Vec<Provider>)> {
        let mut providers = self
            .inner
            .registry
            .read()
            .iter()
            .map(|(type_info, providers)| (*type_info, providers.to_vec()))
            .collect::<BTreeMap<_, _>>();

        for (type_info, overrides) in self.inner.overrides.read().iter() {
            if let Some((_, provider)) = overrides.last() {
                providers.insert(*type_info, vec![provider.clone()]);
            }
        }

        providers.into_iter().collect()
    }

    fn overridden(&self, type_info: TypeInfo) -> Option<Provider> {
        self.inner
            .overrides
            .read()
            .get(&type_info)
            .and_then(|overrides| overrides.last())
            .map(|(_, provider)| provider.clone())
    }

    #[inline]
    #[must_use]
    pub fn has_generic_family(&self, family: TypeInfo) -> bool {
        self.inner.families.read().contains(&family)
    }

    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.inner.extensions
    }

    fn extension_extractor(&self, provider: &Provider) -> Option<&dyn SupportsDependencyExtraction> {
        self.inner
            .extensions
            .iter()
            .filter_map(|extension| extension.dependency_extractor())
            .find(|extractor| extractor.supports(provider))
    }

    fn extractor_for(&self, provider: &Provider) -> &dyn SupportsDependencyExtraction {
        self.extension_extractor(provider).unwrap_or(if provider.is_object() {
            &ObjectDependencyExtractor
        } else {
            &FactoryDependencyExtractor
        })
    }

    /// Dependencies of the provider as computed by the first supporting extractor.
    ///
    /// Results of extension extractors are memoized per provider, built-in ones are memoized by the provider itself.
    #[must_use]
    pub fn dependencies_of(&self, provider: &Provider) -> Arc<[Dependency]> {
        let Some(extractor) = self.extension_extractor(provider) else {
            return self.extractor_for(provider).extract_dependencies(provider);
        };

        if let Some(dependencies) = self.inner.dependencies.read().get(&provider.id()) {
            return dependencies.clone();
        }

        let dependencies = extractor.extract_dependencies(provider);
        self.inner
            .dependencies
            .write()
            .entry(provider.id())
            .or_insert(dependencies)
            .clone()
    }

    /// Type the provider is registered for, as computed by the first supporting extractor.
    #[must_use]
    pub fn extract_type(&self, provider: &Provider) -> TypeInfo {
        self.extractor_for(provider).extract_type(provider)
    }

    /// Registration type and dependencies of the provider, checked against what its factory declares.
    ///
    /// Nothing is memoized here, so providers registered in contexts don't outlive them in the container.
    pub(crate) fn extract(&self, provider: &Provider) -> Result<(TypeInfo, Arc<[Dependency]>), RegisterErrorKind> {
        let extractor = self.extractor_for(provider);
        let type_info = extractor.extract_type(provider);
        let dependencies = extractor.extract_dependencies(provider);

        if type_info != provider.type_info() || (!provider.is_object() && *dependencies != *provider.dependencies()) {
            return Err(RegisterErrorKind::ExtractorMismatch {
                type_info: provider.type_info(),
            });
        }
        Ok((type_info, dependencies))
    }

    /// Returns the provider of the parameterized type built by its registered family.
    ///
    /// The provider is built once per type, so its instances are cached like the ones of any registered provider.
    pub(crate) fn instantiate_generic(&self, type_info: TypeInfo, template: &GenericTemplate) -> Result<Provider, ResolveErrorKind> {
        if !self.has_generic_family(template.family()) {
            return Err(ResolveErrorKind::NoProvider { type_info });
        }

        let mut instantiated = self.inner.instantiated.lock();
        if let Some(provider) = instantiated.get(&type_info) {
            return Ok(provider.clone());
        }

        let provider = template.instantiate();
        let actual = self.extract_type(&provider);
        if actual != type_info {
            return Err(ResolveErrorKind::IncorrectType { expected: type_info, actual });
        }

        debug!(dependency = type_info.name, family = template.family().name, "Generic provider instantiated");
        instantiated.insert(type_info, provider.clone());
        Ok(provider)
    }

    /// Replaces every provider registered for the types of the given providers until the returned guard is dropped.
    ///
    /// Contexts created before the override observe it too, instances of the replaced providers stay cached
    /// and are used again after the guard is dropped.
    /// The latest active override of a type wins, and a dropped guard removes only its own providers,
    /// so nested guards may be dropped in any order.
    ///
    /// # Errors
    /// - Returns [`RegisterErrorKind::DuplicateOverride`] if more than one of the given providers is registered for the same type
    /// - Returns [`RegisterErrorKind::ExtractorMismatch`] if an extension extractor disagrees with one of the factories
    pub fn override_providers(&self, providers: impl IntoIterator<Item = Provider>) -> Result<OverrideGuard, RegisterErrorKind> {
        let mut overrides = BTreeMap::new();
        for provider in providers {
            let (type_info, _) = self.extract(&provider).inspect_err(|err| error!("{}", err))?;
            if overrides.insert(type_info, provider).is_some() {
                let err = RegisterErrorKind::DuplicateOverride { type_info };
                error!("{}", err);
                return Err(err);
            }
        }

        let id = self.inner.next_override.fetch_add(1, Ordering::Relaxed);
        let mut active = self.inner.overrides.write();
        let types = overrides
            .into_iter()
            .map(|(type_info, provider)| {
                let provider_id = provider.id();
                active.entry(type_info).or_default().push((id, provider));
                (type_info, provider_id)
            })
            .collect::<Vec<_>>();
        debug!(count = types.len(), "Overrides applied");

        Ok(OverrideGuard {
            container: self.clone(),
            id,
            types,
        })
    }

    #[inline]
    #[must_use]
    pub fn sync_context(&self) -> SyncContext {
        SyncContext::new(self.clone())
    }

    #[cfg(feature = "async")]
    #[inline]
    #[must_use]
    pub fn context(&self) -> Context {
        Context::new(self.clone())
    }

    /// Calls the function with a new synchronous context and closes the context after.
    ///
    /// # Errors
    /// Returns the first error of the context finalizers
    pub fn with_sync_context<R>(&self, f: impl FnOnce(&SyncContext) -> R) -> Result<R, CloseErrorKind> {
        let context = self.sync_context();
        let result = f(&context);
        context.close()?;
        Ok(result)
    }

    /// Awaits the function with a new context and closes the context after.
    ///
    /// # Errors
    /// Returns the first error of the context finalizers
    #[cfg(feature = "async")]
    pub async fn with_context<F, Fut>(&self, f: F) -> Result<Fut::Output, CloseErrorKind>
    where
        F: FnOnce(Context) -> Fut,
        Fut: std::future::Future,
    {
        let context = self.context();
        let result = f(context.clone()).await;
        context.aclose().await?;
        Ok(result)
    }

    /// Calls finalizers of the singletons in LIFO order.
    ///
    /// # Errors
    /// - Returns the first error of the finalizers, every finalizer is called anyway
    /// - Returns [`CloseErrorKind::AsyncFinalizerInSyncClose`] without calling anything if a finalizer is asynchronous, use [`Self::aclose`] then
    pub fn close(&self) -> Result<(), CloseErrorKind> {
        self.inner.singletons.close()
    }

    /// Calls [`Extension::on_startup`] of every extension in registration order.
    ///
    /// If an extension fails, the already started ones are shut down in reverse order.
    ///
    /// # Errors
    /// - Returns [`StartErrorKind::AlreadyStarted`] if the container is started and not closed
    /// - Returns [`StartErrorKind::Startup`] if an extension failed
    #[cfg(feature = "async")]
    pub async fn start(&self) -> Result<(), StartErrorKind> {
        let mut started = self.inner.started.lock().await;
        if started.is_some() {
            return Err(StartErrorKind::AlreadyStarted);
        }

        for (index, extension) in self.inner.extensions.iter().enumerate() {
            if let Err(source) = extension.on_startup(self).await {
                let err = StartErrorKind::Startup {
                    extension: extension.name(),
                    source,
                };
                error!("{}", err);

                for extension in self.inner.extensions[..index].iter().rev() {
                    if let Err(source) = extension.on_shutdown(self).await {
                        error!("{}", CloseErrorKind::Shutdown {
                            extension: extension.name(),
                            source,
                        });
                    }
                }
                return Err(err);
            }
            debug!(extension = extension.name(), "Started");
        }

        *started = Some(self.inner.extensions.len());
        Ok(())
    }

    /// Calls finalizers of the singletons in LIFO order, awaiting asynchronous ones,
    /// then calls [`Extension::on_shutdown`] of the started extensions in reverse order.
    ///
    /// # Errors
    /// Returns the first error of the finalizers or the shutdowns, every one of them is called anyway
    #[cfg(feature = "async")]
    pub async fn aclose(&self) -> Result<(), CloseErrorKind> {
        let mut first_err = self.inner.singletons.aclose().await.err();

        let started = self.inner.started.lock().await.take().unwrap_or(0);
        for extension in self.inner.extensions[..started].iter().rev() {
            match extension.on_shutdown(self).await {
                Ok(()) => debug!(extension = extension.name(), "Shut down"),
                Err(source) => {
                    let err = CloseErrorKind::Shutdown {
                        extension: extension.name(),
                        source,
                    };
                    error!("{}", err);
                    first_err.get_or_insert(err);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }
}

impl Default for Container {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the providers replaced by [`Container::override_providers`] when dropped.
#[must_use = "overrides are reverted when the guard is dropped"]
pub struct OverrideGuard {
    container: Container,
    id: u64,
    types: Vec<(TypeInfo, ProviderId)>,
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        let mut overrides = self.container.inner.overrides.write();
        let mut dependencies = self.container.inner.dependencies.write();
        for (type_info, provider_id) in &self.types {
            if let Some(providers) = overrides.get_mut(type_info) {
                providers.retain(|(id, _)| *id != self.id);
                if providers.is_empty() {
                    overrides.remove(type_info);
                }
            }
            dependencies.remove(provider_id);
        }
        debug!(count = self.types.len(), "Overrides reverted");
    }
}
