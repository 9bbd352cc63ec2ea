use std::{
    fmt::{self, Debug, Formatter},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
};

#[cfg(feature = "async")]
use crate::async_impl::instantiator::{
    boxed_async_instantiator, boxed_async_resource_instantiator, AsyncInstantiator, BoxedAsyncInstantiator,
};
#[cfg(feature = "async")]
use crate::errors::{InstantiatorErrorKind, ResolveErrorKind};
use crate::{
    any::{AnyArc, TypeInfo},
    dependency::Dependency,
    dependency_resolver::{DependencyResolver, ResolvedSet},
    finalizer::IntoProduced,
    instantiator::{boxed_instantiator, boxed_resource_instantiator, BoxedInstantiator, Instantiator, Produced, ProvideErrorKind},
    lifetime::Lifetime,
    service::Service as _,
};

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a provider, shared by its clones.
///
/// Instance stores cache by this identity, so two providers declaring the same type never share instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderId(u64);

impl ProviderId {
    #[inline]
    fn next() -> Self {
        Self(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub(crate) enum FactoryCall {
    Sync(BoxedInstantiator),
    #[cfg(feature = "async")]
    Async(BoxedAsyncInstantiator),
}

#[derive(Clone)]
pub(crate) struct Factory {
    call: FactoryCall,
    is_async: bool,
    is_resource: bool,
}

#[derive(Clone)]
pub(crate) enum ProviderKind {
    Scoped(Factory),
    Transient(Factory),
    Singleton(Factory),
    Object(AnyArc),
}

/// Describes how to produce an instance of a declared type.
///
/// Built with [`Scoped`], [`Transient`], [`Singleton`] or [`Object`] and registered in a [`crate::Container`].
#[derive(Clone)]
pub struct Provider {
    id: ProviderId,
    type_info: TypeInfo,
    implementation: TypeInfo,
    pub(crate) kind: ProviderKind,
    declared_dependencies: fn() -> Vec<Dependency>,
    dependencies: Arc<OnceLock<Arc<[Dependency]>>>,
}

impl Provider {
    fn new(type_info: TypeInfo, implementation: TypeInfo, kind: ProviderKind, declared_dependencies: fn() -> Vec<Dependency>) -> Self {
        Self {
            id: ProviderId::next(),
            type_info,
            implementation,
            kind,
            declared_dependencies,
            dependencies: Arc::new(OnceLock::new()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> ProviderId {
        self.id
    }

    /// Type of the provided instance, the key the provider is registered with.
    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// Implementation key used to select one of many providers registered for the same type.
    ///
    /// Defaults to the type of the factory itself.
    #[inline]
    #[must_use]
    pub const fn implementation(&self) -> TypeInfo {
        self.implementation
    }

    /// Sets the implementation key, so the provider can be selected with [`crate::InjectImpl`]
    /// or [`crate::SyncContext::resolve_impl`].
    ///
    /// The provider gets a new identity and doesn't share cached instances with the original one.
    #[inline]
    #[must_use]
    pub fn with_implementation<Impl: ?Sized + 'static>(self) -> Self {
        Self {
            id: ProviderId::next(),
            implementation: TypeInfo::of::<Impl>(),
            dependencies: Arc::new(OnceLock::new()),
            ..self
        }
    }

    /// [`Object`] providers count as singletons, their value is shared by every context.
    #[inline]
    #[must_use]
    pub const fn lifetime(&self) -> Lifetime {
        match self.kind {
            ProviderKind::Scoped(_) => Lifetime::Scoped,
            ProviderKind::Transient(_) => Lifetime::Transient,
            ProviderKind::Singleton(_) | ProviderKind::Object(_) => Lifetime::Singleton,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self.kind, ProviderKind::Object(_))
    }

    /// Whether the factory or the finalizer of the provided resource has to be awaited.
    #[inline]
    #[must_use]
    pub const fn is_async(&self) -> bool {
        match &self.kind {
            ProviderKind::Scoped(factory) | ProviderKind::Transient(factory) | ProviderKind::Singleton(factory) => {
                factory.is_async
            }
            ProviderKind::Object(_) => false,
        }
    }

    /// Whether the provided instance registers a finalizer in the instance store that caches it.
    #[inline]
    #[must_use]
    pub const fn is_resource(&self) -> bool {
        match &self.kind {
            ProviderKind::Scoped(factory) | ProviderKind::Transient(factory) | ProviderKind::Singleton(factory) => {
                factory.is_resource
            }
            ProviderKind::Object(_) => false,
        }
    }

    /// Dependencies declared by the factory arguments, in declaration order.
    ///
    /// Computed on first call and shared by the clones of this provider.
    #[must_use]
    pub fn dependencies(&self) -> Arc<[Dependency]> {
        self.dependencies
            .get_or_init(|| (self.declared_dependencies)().into())
            .clone()
    }

    pub(crate) fn provide_sync(&self, resolved: ResolvedSet) -> Result<Produced, ProvideErrorKind> {
        match &self.kind {
            ProviderKind::Object(value) => Ok(Produced {
                value: value.clone(),
                finalizer: None,
            }),
            ProviderKind::Scoped(factory) | ProviderKind::Transient(factory) | ProviderKind::Singleton(factory) => {
                match &factory.call {
                    FactoryCall::Sync(instantiator) => instantiator.call(resolved),
                    #[cfg(feature = "async")]
                    FactoryCall::Async(_) => Err(InstantiatorErrorKind::Deps(ResolveErrorKind::AsyncProvider {
                        type_info: self.type_info,
                    })),
                }
            }
        }
    }

    #[cfg(feature = "async")]
    pub(crate) async fn provide(&self, resolved: ResolvedSet) -> Result<Produced, ProvideErrorKind> {
        match &self.kind {
            ProviderKind::Object(value) => Ok(Produced {
                value: value.clone(),
                finalizer: None,
            }),
            ProviderKind::Scoped(factory) | ProviderKind::Transient(factory) | ProviderKind::Singleton(factory) => {
                match &factory.call {
                    FactoryCall::Sync(instantiator) => instantiator.call(resolved),
                    FactoryCall::Async(instantiator) => instantiator.call(resolved).await,
                }
            }
        }
    }
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Provider {}

impl Debug for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("type_info", &self.type_info.name)
            .field("implementation", &self.implementation.name)
            .field("lifetime", &self.lifetime())
            .field("is_async", &self.is_async())
            .field("is_resource", &self.is_resource())
            .finish_non_exhaustive()
    }
}

macro_rules! impl_factory_provider {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        pub struct $name;

        impl $name {
            /// Provider calling a synchronous factory, the instance type is the factory's `Ok` type.
            #[allow(clippy::new_ret_no_self)]
            #[must_use]
            pub fn new<Inst, Deps>(instantiator: Inst) -> Provider
            where
                Inst: Instantiator<Deps>,
                Inst::Provides: Sync,
                Deps: DependencyResolver,
            {
                Provider::new(
                    TypeInfo::of::<Inst::Provides>(),
                    TypeInfo::of::<Inst>(),
                    ProviderKind::$variant(Factory {
                        call: FactoryCall::Sync(boxed_instantiator(instantiator)),
                        is_async: false,
                        is_resource: false,
                    }),
                    Deps::dependencies,
                )
            }

            /// Provider calling a synchronous factory that returns a [`crate::Managed`] resource.
            ///
            /// The instance type is the managed value type, the finalizer is called when the instance store caching it is closed.
            #[allow(private_bounds)]
            #[must_use]
            pub fn resource<Inst, Deps>(instantiator: Inst) -> Provider
            where
                Inst: Instantiator<Deps>,
                Inst::Provides: IntoProduced,
                Deps: DependencyResolver,
            {
                Provider::new(
                    TypeInfo::of::<<Inst::Provides as IntoProduced>::Target>(),
                    TypeInfo::of::<Inst>(),
                    ProviderKind::$variant(Factory {
                        call: FactoryCall::Sync(boxed_resource_instantiator(instantiator)),
                        is_async: <Inst::Provides as IntoProduced>::IS_ASYNC,
                        is_resource: true,
                    }),
                    Deps::dependencies,
                )
            }

            /// Provider awaiting an asynchronous factory.
            #[cfg(feature = "async")]
            #[must_use]
            pub fn new_async<Inst, Deps>(instantiator: Inst) -> Provider
            where
                Inst: AsyncInstantiator<Deps>,
                Inst::Provides: Sync,
                Deps: DependencyResolver,
            {
                Provider::new(
                    TypeInfo::of::<Inst::Provides>(),
                    TypeInfo::of::<Inst>(),
                    ProviderKind::$variant(Factory {
                        call: FactoryCall::Async(boxed_async_instantiator(instantiator)),
                        is_async: true,
                        is_resource: false,
                    }),
                    Deps::dependencies,
                )
            }

            /// Provider awaiting an asynchronous factory that returns a [`crate::Managed`] or [`crate::AsyncManaged`] resource.
            #[cfg(feature = "async")]
            #[allow(private_bounds)]
            #[must_use]
            pub fn async_resource<Inst, Deps>(instantiator: Inst) -> Provider
            where
                Inst: AsyncInstantiator<Deps>,
                Inst::Provides: IntoProduced,
                Deps: DependencyResolver,
            {
                Provider::new(
                    TypeInfo::of::<<Inst::Provides as IntoProduced>::Target>(),
                    TypeInfo::of::<Inst>(),
                    ProviderKind::$variant(Factory {
                        call: FactoryCall::Async(boxed_async_resource_instantiator(instantiator)),
                        is_async: true,
                        is_resource: true,
                    }),
                    Deps::dependencies,
                )
            }
        }
    };
}

impl_factory_provider!(
    /// Providers caching their instance once per resolution context.
    Scoped,
    Scoped
);
impl_factory_provider!(
    /// Providers producing a new instance on every resolution.
    Transient,
    Transient
);
impl_factory_provider!(
    /// Providers caching their instance once per container.
    Singleton,
    Singleton
);

/// Providers of already constructed values.
pub struct Object;

impl Object {
    #[allow(clippy::new_ret_no_self)]
    #[must_use]
    pub fn new<Dep: Send + Sync + 'static>(value: Dep) -> Provider {
        Self::from_arc(Arc::new(value))
    }

    #[must_use]
    pub fn from_arc<Dep: Send + Sync + 'static>(value: Arc<Dep>) -> Provider {
        Provider::new(TypeInfo::of::<Dep>(), TypeInfo::of::<Object>(), ProviderKind::Object(value), Vec::new)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    };

    use tracing_test::traced_test;

    use super::{Object, Scoped, Singleton, Transient};
    use crate::{
        any::TypeInfo,
        dependency::Dependency,
        dependency_resolver::ResolvedSet,
        finalizer::Managed,
        inject::{Inject, InjectAll},
        lifetime::Lifetime,
        InstantiateErrorKind,
    };

    struct Config;
    struct Database;
    struct Postgres;
    struct Plugin;

    #[test]
    fn test_lifetimes() {
        assert_eq!(Scoped::new(|| Ok::<_, InstantiateErrorKind>(Config)).lifetime(), Lifetime::Scoped);
        assert_eq!(Transient::new(|| Ok::<_, InstantiateErrorKind>(Config)).lifetime(), Lifetime::Transient);
        assert_eq!(Singleton::new(|| Ok::<_, InstantiateErrorKind>(Config)).lifetime(), Lifetime::Singleton);
        assert_eq!(Object::new(Config).lifetime(), Lifetime::Singleton);
    }

    #[test]
    fn test_declared_type_and_dependencies() {
        let provider = Scoped::new(|_config: Inject<Config>, _plugins: InjectAll<Plugin>| {
            Ok::<_, InstantiateErrorKind>(Database)
        });

        assert_eq!(provider.type_info(), TypeInfo::of::<Database>());
        assert_eq!(
            &*provider.dependencies(),
            [Dependency::single::<Config>(), Dependency::iterable::<Plugin>()]
        );
        assert!(Arc::ptr_eq(&provider.dependencies(), &provider.clone().dependencies()));
        assert!(!provider.is_async());
        assert!(!provider.is_resource());
    }

    #[test]
    fn test_resource_declared_type() {
        let resource = Scoped::resource(|| Ok::<_, InstantiateErrorKind>(Managed::new(Database, |_database| Ok(()))));
        let plain = Scoped::new(|| Ok::<_, InstantiateErrorKind>(Managed::new(Database, |_database| Ok(()))));

        assert_eq!(resource.type_info(), TypeInfo::of::<Database>());
        assert!(resource.is_resource());
        assert_eq!(plain.type_info(), TypeInfo::of::<Managed<Database>>());
        assert!(!plain.is_resource());
    }

    #[test]
    fn test_with_implementation() {
        let provider = Scoped::new(|| Ok::<_, InstantiateErrorKind>(Database));
        let postgres = provider.clone().with_implementation::<Postgres>();

        assert_eq!(postgres.implementation(), TypeInfo::of::<Postgres>());
        assert_eq!(postgres.type_info(), provider.type_info());
        assert_ne!(postgres, provider);
        assert_eq!(provider.clone(), provider);
    }

    #[test]
    #[traced_test]
    fn test_provide_sync() {
        let call_count = Arc::new(AtomicU8::new(0));
        let provider = Transient::new({
            let call_count = call_count.clone();
            move || {
                call_count.fetch_add(1, Ordering::SeqCst);
                Ok::<_, InstantiateErrorKind>(Config)
            }
        });

        let produced = provider.provide_sync(ResolvedSet::default()).unwrap();
        assert!(produced.value.downcast_ref::<Config>().is_some());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        let object = Object::new(42_i32);
        let first = object.provide_sync(ResolvedSet::default()).unwrap().value;
        let second = object.provide_sync(ResolvedSet::default()).unwrap().value;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    #[traced_test]
    async fn test_provide_async() {
        let provider = Scoped::new_async(|Inject(value): Inject<i32>| async move { Ok::<_, InstantiateErrorKind>(*value + 1) });
        assert!(provider.is_async());
        assert_eq!(provider.type_info(), TypeInfo::of::<i32>());

        let mut resolved = ResolvedSet::default();
        resolved.push(crate::dependency_resolver::Resolved::Single(Arc::new(1_i32)));
        let produced = provider.provide(resolved).await.unwrap();
        assert_eq!(*produced.value.downcast_ref::<i32>().unwrap(), 2);

        let err = provider.provide_sync(ResolvedSet::default()).err().unwrap();
        assert!(matches!(
            err,
            crate::errors::InstantiatorErrorKind::Deps(crate::ResolveErrorKind::AsyncProvider { .. })
        ));
    }
}
