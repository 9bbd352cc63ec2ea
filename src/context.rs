use std::sync::Arc;
use tracing::{debug, debug_span, error};

use crate::{
    ambient::{self, CurrentGuard},
    any::{AnyArc, TypeInfo},
    container::Container,
    dependency::Dependency,
    dependency_resolver::{DependencyResolver, Resolved, ResolvedSet},
    errors::{CloseErrorKind, RegisterErrorKind, ResolveErrorKind},
    generics::{GenericTemplate, Parameterized},
    handler::Handler,
    instantiator::Produced,
    provider::Provider,
    scope::{check_cycle, downcast, Lookup, ResolutionPath, ScopeInner},
    store::InstanceStore,
};

/// Synchronous resolution context.
///
/// Scoped and transient instances are cached by the context, singletons by its container.
/// Clones share the same scope. Dropping the last clone of an unclosed context calls its finalizers.
///
/// Asynchronous providers can't be resolved here, see [`crate::Context`].
#[derive(Clone)]
pub struct SyncContext {
    pub(crate) inner: Arc<ScopeInner>,
}

impl SyncContext {
    #[inline]
    #[must_use]
    pub(crate) fn new(container: Container) -> Self {
        Self {
            inner: Arc::new(ScopeInner::new(container)),
        }
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// Resolves the only provider registered for `Dep`.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoProvider`] if no provider is registered
    /// - Returns [`ResolveErrorKind::MultipleProviders`] if more than one provider is registered
    /// - Returns [`ResolveErrorKind::AsyncProvider`] if the provider or one of its dependencies is asynchronous
    /// - Returns [`ResolveErrorKind::CyclicDependency`] if the provider depends on itself
    /// - Returns [`ResolveErrorKind::Instantiator`] if a factory failed
    pub fn resolve<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        self.inner
            .find_provider(TypeInfo::of::<Dep>(), None)
            .and_then(|provider| self.resolve_as(&provider))
            .inspect_err(|err| error!("{}", err))
    }

    /// Resolves the provider registered for `Dep` with implementation `Impl`.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::NoImplementation`] if no provider has the implementation, see [`Self::resolve`] for the rest
    pub fn resolve_impl<Dep: Send + Sync + 'static, Impl: ?Sized + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        self.inner
            .find_provider(TypeInfo::of::<Dep>(), Some(TypeInfo::of::<Impl>()))
            .and_then(|provider| self.resolve_as(&provider))
            .inspect_err(|err| error!("{}", err))
    }

    /// Resolves every provider registered for `Dep`, in registration order.
    ///
    /// # Errors
    /// See [`Self::resolve`], no providers isn't an error
    pub fn resolve_iterable<Dep: Send + Sync + 'static>(&self) -> Result<Vec<Arc<Dep>>, ResolveErrorKind> {
        self.inner
            .find_all(TypeInfo::of::<Dep>())
            .iter()
            .map(|provider| self.resolve_as(provider))
            .collect::<Result<_, _>>()
            .inspect_err(|err| error!("{}", err))
    }

    /// Resolves the provider registered for the parameterized type, or the one built by its generic family.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::NoProvider`] if neither is registered, see [`Self::resolve`] for the rest
    pub fn resolve_generic<Dep: Parameterized>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        self.inner
            .find_generic(TypeInfo::of::<Dep>(), &GenericTemplate::of::<Dep>())
            .and_then(|provider| self.resolve_as(&provider))
            .inspect_err(|err| error!("{}", err))
    }

    /// Resolves the extractor arguments of the handler and calls it.
    ///
    /// # Errors
    /// Returns an error if one of the arguments can't be resolved, the handler isn't called then
    pub fn execute<H, Deps>(&self, handler: H) -> Result<H::Output, ResolveErrorKind>
    where
        H: Handler<Deps>,
        Deps: DependencyResolver,
    {
        let deps = self.resolve_all::<Deps>().inspect_err(|err| error!("{}", err))?;
        Ok(handler.call(deps))
    }

    /// Registers a provider visible only to this context.
    ///
    /// Providers registered here take priority over the container ones of the same type.
    /// Their instances are cached by the context whatever their lifetime is, so a singleton registered here
    /// lives until the context is closed.
    ///
    /// # Errors
    /// - Returns [`RegisterErrorKind::DuplicateProvider`] if a provider with the same implementation is already registered here
    /// - Returns [`RegisterErrorKind::ExtractorMismatch`] if an extension extractor disagrees with the factory arguments
    pub fn register(&self, provider: Provider) -> Result<(), RegisterErrorKind> {
        self.inner.register(provider).inspect_err(|err| error!("{}", err))
    }

    /// Calls finalizers of the instances cached by the context in LIFO order.
    ///
    /// # Errors
    /// Returns the first error of the finalizers, every finalizer is called anyway
    pub fn close(&self) -> Result<(), CloseErrorKind> {
        self.inner.store.close()
    }

    /// Makes the context the active one of the current thread until the guard is dropped, see [`crate::ambient::inject_sync`].
    #[inline]
    #[must_use]
    pub fn enter(&self) -> CurrentGuard {
        ambient::enter_sync(self.clone())
    }

    fn resolve_all<Deps: DependencyResolver>(&self) -> Result<Deps, ResolveErrorKind> {
        let dependencies = Deps::dependencies();
        let mut path = ResolutionPath::new();
        let mut resolved = ResolvedSet::with_capacity(dependencies.len());
        for dependency in &dependencies {
            resolved.push(self.resolve_dependency(dependency, &mut path)?);
        }
        Deps::resolve(&mut resolved)
    }

    fn resolve_as<Dep: Send + Sync + 'static>(&self, provider: &Provider) -> Result<Arc<Dep>, ResolveErrorKind> {
        let instance = self.resolve_provider(provider, &mut ResolutionPath::new())?;
        downcast(instance, provider)
    }

    fn resolve_dependency(&self, dependency: &Dependency, path: &mut ResolutionPath) -> Result<Resolved, ResolveErrorKind> {
        match self.inner.lookup(dependency)? {
            Lookup::Single(provider) => self.resolve_provider(&provider, path).map(Resolved::Single),
            Lookup::Iterable(providers) => providers
                .iter()
                .map(|provider| self.resolve_provider(provider, path))
                .collect::<Result<_, _>>()
                .map(Resolved::Iterable),
        }
    }

    fn resolve_provider(&self, provider: &Provider, path: &mut ResolutionPath) -> Result<AnyArc, ResolveErrorKind> {
        let span = debug_span!("resolve", dependency = provider.type_info().name, lifetime = %provider.lifetime());
        let _guard = span.enter();

        let store = self.inner.store_for(provider);
        if let Some(instance) = store.get(provider) {
            debug!("Found in cache");
            return Ok(instance);
        }
        debug!("Not found in cache");

        if provider.is_async() {
            return Err(ResolveErrorKind::AsyncProvider {
                type_info: provider.type_info(),
            });
        }

        check_cycle(path, provider)?;
        path.push((provider.id(), provider.type_info()));
        let result = self.provide(provider, store, path);
        path.pop();
        result
    }

    fn provide(&self, provider: &Provider, store: &InstanceStore, path: &mut ResolutionPath) -> Result<AnyArc, ResolveErrorKind> {
        let dependencies = self.inner.dependencies_of(provider);
        let mut resolved = ResolvedSet::with_capacity(dependencies.len());
        for dependency in dependencies.iter() {
            resolved.push(self.resolve_dependency(dependency, path)?);
        }

        let guard = store.sync_lock(provider);
        if let Some(instance) = guard.cached() {
            debug!("Found in cache after lock");
            return Ok(instance);
        }

        let Produced { value, finalizer } = provider.provide_sync(resolved)?;
        if let Some(finalizer) = finalizer {
            store.push_finalizer(provider.type_info(), finalizer);
        }
        let instance = store.add(provider, value);
        drop(guard);

        self.inner.on_resolve_sync(provider, &*instance);
        Ok(instance)
    }
}
