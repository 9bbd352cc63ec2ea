use std::{future::Future, sync::Arc};
use tracing::{debug, debug_span, error, Instrument as _};

use crate::{
    ambient,
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
    utils::future::BoxFuture,
};

/// Asynchronous resolution context.
///
/// Resolves both synchronous and asynchronous providers, awaiting asynchronous factories and finalizers.
/// Semantics are the same as the ones of [`crate::SyncContext`].
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Arc<ScopeInner>,
}

impl Context {
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
    /// - Returns [`ResolveErrorKind::CyclicDependency`] if the provider depends on itself
    /// - Returns [`ResolveErrorKind::Instantiator`] if a factory failed
    pub async fn resolve<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let provider = self
            .inner
            .find_provider(TypeInfo::of::<Dep>(), None)
            .inspect_err(|err| error!("{}", err))?;
        self.resolve_as(&provider).await.inspect_err(|err| error!("{}", err))
    }

    /// Resolves the provider registered for `Dep` with implementation `Impl`.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::NoImplementation`] if no provider has the implementation, see [`Self::resolve`] for the rest
    pub async fn resolve_impl<Dep: Send + Sync + 'static, Impl: ?Sized + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let provider = self
            .inner
            .find_provider(TypeInfo::of::<Dep>(), Some(TypeInfo::of::<Impl>()))
            .inspect_err(|err| error!("{}", err))?;
        self.resolve_as(&provider).await.inspect_err(|err| error!("{}", err))
    }

    /// Resolves every provider registered for `Dep`, in registration order.
    ///
    /// # Errors
    /// See [`Self::resolve`], no providers isn't an error
    pub async fn resolve_iterable<Dep: Send + Sync + 'static>(&self) -> Result<Vec<Arc<Dep>>, ResolveErrorKind> {
        let providers = self.inner.find_all(TypeInfo::of::<Dep>());
        let mut instances = Vec::with_capacity(providers.len());
        for provider in &providers {
            instances.push(self.resolve_as(provider).await.inspect_err(|err| error!("{}", err))?);
        }
        Ok(instances)
    }

    /// Resolves the provider registered for the parameterized type, or the one built by its generic family.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::NoProvider`] if neither is registered, see [`Self::resolve`] for the rest
    pub async fn resolve_generic<Dep: Parameterized>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let provider = self
            .inner
            .find_generic(TypeInfo::of::<Dep>(), &GenericTemplate::of::<Dep>())
            .inspect_err(|err| error!("{}", err))?;
        self.resolve_as(&provider).await.inspect_err(|err| error!("{}", err))
    }

    /// Resolves the extractor arguments of the handler and calls it.
    ///
    /// # Errors
    /// Returns an error if one of the arguments can't be resolved, the handler isn't called then
    pub async fn execute<H, Deps>(&self, handler: H) -> Result<H::Output, ResolveErrorKind>
    where
        H: Handler<Deps>,
        Deps: DependencyResolver,
    {
        let deps = self.resolve_all::<Deps>().await.inspect_err(|err| error!("{}", err))?;
        Ok(handler.call(deps))
    }

    /// Resolves the extractor arguments of the handler, calls it and awaits the returned future.
    ///
    /// # Errors
    /// Returns an error if one of the arguments can't be resolved, the handler isn't called then
    pub async fn execute_async<H, Deps, Fut>(&self, handler: H) -> Result<Fut::Output, ResolveErrorKind>
    where
        H: Handler<Deps, Output = Fut>,
        Deps: DependencyResolver,
        Fut: Future,
    {
        let deps = self.resolve_all::<Deps>().await.inspect_err(|err| error!("{}", err))?;
        Ok(handler.call(deps).await)
    }

    /// Registers a provider visible only to this context, see [`crate::SyncContext::register`].
    ///
    /// # Errors
    /// - Returns [`RegisterErrorKind::DuplicateProvider`] if a provider with the same implementation is already registered here
    /// - Returns [`RegisterErrorKind::ExtractorMismatch`] if an extension extractor disagrees with the factory arguments
    pub fn register(&self, provider: Provider) -> Result<(), RegisterErrorKind> {
        self.inner.register(provider).inspect_err(|err| error!("{}", err))
    }

    /// Calls finalizers of the instances cached by the context in LIFO order, awaiting asynchronous ones.
    ///
    /// # Errors
    /// Returns the first error of the finalizers, every finalizer is called anyway
    pub async fn aclose(&self) -> Result<(), CloseErrorKind> {
        self.inner.store.aclose().await
    }

    /// Awaits the future with the context as the active one of the task, see [`crate::ambient::inject`].
    pub async fn scope<Fut: Future>(&self, future: Fut) -> Fut::Output {
        ambient::scope(self.clone(), future).await
    }

    async fn resolve_all<Deps: DependencyResolver>(&self) -> Result<Deps, ResolveErrorKind> {
        let dependencies = Deps::dependencies();
        let mut path = ResolutionPath::new();
        let mut resolved = ResolvedSet::with_capacity(dependencies.len());
        for dependency in &dependencies {
            resolved.push(self.resolve_dependency(dependency, &mut path).await?);
        }
        Deps::resolve(&mut resolved)
    }

    async fn resolve_as<Dep: Send + Sync + 'static>(&self, provider: &Provider) -> Result<Arc<Dep>, ResolveErrorKind> {
        let instance = self.resolve_provider(provider, &mut ResolutionPath::new()).await?;
        downcast(instance, provider)
    }

    async fn resolve_dependency(&self, dependency: &Dependency, path: &mut ResolutionPath) -> Result<Resolved, ResolveErrorKind> {
        match self.inner.lookup(dependency)? {
            Lookup::Single(provider) => self.resolve_provider(&provider, path).await.map(Resolved::Single),
            Lookup::Iterable(providers) => {
                let mut instances = Vec::with_capacity(providers.len());
                for provider in &providers {
                    instances.push(self.resolve_provider(provider, path).await?);
                }
                Ok(Resolved::Iterable(instances))
            }
        }
    }

    fn resolve_provider<'a>(
        &'a self,
        provider: &'a Provider,
        path: &'a mut ResolutionPath,
    ) -> BoxFuture<'a, Result<AnyArc, ResolveErrorKind>> {
        let span = debug_span!("resolve", dependency = provider.type_info().name, lifetime = %provider.lifetime());

        Box::pin(
            async move {
                let store = self.inner.store_for(provider);
                if let Some(instance) = store.get(provider) {
                    debug!("Found in cache");
                    return Ok(instance);
                }
                debug!("Not found in cache");

                check_cycle(path, provider)?;
                path.push((provider.id(), provider.type_info()));
                let result = self.provide(provider, store, path).await;
                path.pop();
                result
            }
            .instrument(span),
        )
    }

    async fn provide(
        &self,
        provider: &Provider,
        store: &InstanceStore,
        path: &mut ResolutionPath,
    ) -> Result<AnyArc, ResolveErrorKind> {
        let dependencies = self.inner.dependencies_of(provider);
        let mut resolved = ResolvedSet::with_capacity(dependencies.len());
        for dependency in dependencies.iter() {
            resolved.push(self.resolve_dependency(dependency, path).await?);
        }

        let guard = store.lock(provider).await;
        if let Some(instance) = guard.cached() {
            debug!("Found in cache after lock");
            return Ok(instance);
        }

        let Produced { value, finalizer } = provider.provide(resolved).await?;
        if let Some(finalizer) = finalizer {
            store.push_finalizer(provider.type_info(), finalizer);
        }
        let instance = store.add(provider, value);
        drop(guard);

        self.inner.on_resolve(provider, &*instance).await;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    };

    use parking_lot::Mutex;
    use tracing_test::traced_test;

    use crate::{
        async_impl::finalizer::AsyncManaged,
        container::Container,
        errors::ResolveErrorKind,
        finalizer::Managed,
        inject::Inject,
        provider::{Object, Scoped, Singleton, Transient},
        InstantiateErrorKind,
    };

    struct Config(u8);
    struct Connection;
    struct Request;

    #[tokio::test]
    #[traced_test]
    async fn test_async_factories() {
        let container = Container::new();
        container
            .register_all([
                Object::new(Config(5)),
                Scoped::new_async(|Inject(config): Inject<Config>| async move {
                    tokio::task::yield_now().await;
                    Ok::<_, InstantiateErrorKind>(u32::from(config.0) * 2)
                }),
                Transient::new(|Inject(value): Inject<u32>| Ok::<_, InstantiateErrorKind>(u64::from(*value) + 1)),
            ])
            .unwrap();
        let context = container.context();

        assert_eq!(*context.resolve::<u32>().await.unwrap(), 10);
        assert_eq!(*context.resolve::<u64>().await.unwrap(), 11);
        assert!(Arc::ptr_eq(&context.resolve::<u32>().await.unwrap(), &context.resolve::<u32>().await.unwrap()));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_async_provider_in_sync_context() {
        let container = Container::new();
        container
            .register(Scoped::new_async(|| async { Ok::<_, InstantiateErrorKind>(Connection) }))
            .unwrap();

        let err = container.sync_context().resolve::<Connection>().err().unwrap();
        assert!(matches!(err, ResolveErrorKind::AsyncProvider { .. }));
        assert!(container.context().resolve::<Connection>().await.is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_aclose_mixed_finalizers() {
        let closed = Arc::new(Mutex::new(Vec::new()));
        let container = Container::new();
        container
            .register_all([
                Scoped::resource({
                    let closed = closed.clone();
                    move || {
                        let closed = closed.clone();
                        Ok::<_, InstantiateErrorKind>(Managed::new(Config(1), move |_config| {
                            closed.lock().push("config");
                            Ok(())
                        }))
                    }
                }),
                Scoped::async_resource({
                    let closed = closed.clone();
                    move |_config: Inject<Config>| {
                        let closed = closed.clone();
                        async move {
                            Ok::<_, InstantiateErrorKind>(AsyncManaged::new(Connection, move |_connection| async move {
                                tokio::task::yield_now().await;
                                closed.lock().push("connection");
                                Ok(())
                            }))
                        }
                    }
                }),
            ])
            .unwrap();

        let context = container.context();
        context.resolve::<Connection>().await.unwrap();
        context.aclose().await.unwrap();

        assert_eq!(*closed.lock(), ["connection", "config"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[traced_test]
    async fn test_singleton_created_once_concurrently() {
        let call_count = Arc::new(AtomicU8::new(0));
        let container = Container::new();
        container
            .register(Singleton::new_async({
                let call_count = call_count.clone();
                move || {
                    let call_count = call_count.clone();
                    async move {
                        call_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok::<_, InstantiateErrorKind>(Connection)
                    }
                }
            }))
            .unwrap();

        let handles = (0..8)
            .map(|_| {
                let container = container.clone();
                tokio::spawn(async move { container.context().resolve::<Connection>().await.unwrap() })
            })
            .collect::<Vec<_>>();

        let mut instances = Vec::new();
        for handle in handles {
            instances.push(handle.await.unwrap());
        }

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_execute_async() {
        let container = Container::new();
        container.register(Object::new(Config(3))).unwrap();
        container
            .register(Scoped::new(|_config: Inject<Config>| Ok::<_, InstantiateErrorKind>(Request)))
            .unwrap();
        let context = container.context();

        let value = context
            .execute_async(|Inject(config): Inject<Config>, _request: Inject<Request>| async move {
                tokio::task::yield_now().await;
                config.0 + 1
            })
            .await
            .unwrap();
        assert_eq!(value, 4);

        let value = context.execute(|Inject(config): Inject<Config>| config.0).await.unwrap();
        assert_eq!(value, 3);
    }
}
