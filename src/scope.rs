use parking_lot::RwLock;
use std::{any::Any, collections::BTreeMap, sync::Arc};
use tracing::warn;

use crate::{
    any::{AnyArc, TypeInfo},
    container::Container,
    dependency::{Dependency, DependencyKind},
    errors::{RegisterErrorKind, ResolveErrorKind},
    generics::GenericTemplate,
    lifetime::Lifetime,
    provider::{Provider, ProviderId},
    registry::Registry,
    store::{InstanceStore, StoreFlavor},
};

/// Providers entered on the current resolution path, used to detect cycles.
pub(crate) type ResolutionPath = Vec<(ProviderId, TypeInfo)>;

/// State shared by the sync and async resolution contexts.
pub(crate) struct ScopeInner {
    pub(crate) container: Container,
    pub(crate) store: InstanceStore,
    local: RwLock<Registry>,
    /// Dependencies of the providers registered in the context, dropped with it.
    local_dependencies: RwLock<BTreeMap<ProviderId, Arc<[Dependency]>>>,
}

/// Providers a dependency is resolved with.
pub(crate) enum Lookup {
    Single(Provider),
    Iterable(Vec<Provider>),
}

impl ScopeInner {
    #[inline]
    #[must_use]
    pub(crate) fn new(container: Container) -> Self {
        Self {
            container,
            store: InstanceStore::new(StoreFlavor::Scope),
            local: RwLock::new(Registry::new()),
            local_dependencies: RwLock::new(BTreeMap::new()),
        }
    }

    pub(crate) fn register(&self, provider: Provider) -> Result<(), RegisterErrorKind> {
        let (type_info, dependencies) = self.container.extract(&provider)?;
        let id = provider.id();
        self.local.write().add(type_info, provider)?;
        self.local_dependencies.write().insert(id, dependencies);
        Ok(())
    }

    pub(crate) fn dependencies_of(&self, provider: &Provider) -> Arc<[Dependency]> {
        if let Some(dependencies) = self.local_dependencies.read().get(&provider.id()) {
            return dependencies.clone();
        }
        self.container.dependencies_of(provider)
    }

    #[inline]
    fn is_local(&self, provider: &Provider) -> bool {
        self.local_dependencies.read().contains_key(&provider.id())
    }

    /// Providers registered in the context shadow every container provider of the same type.
    pub(crate) fn find_provider(&self, type_info: TypeInfo, implementation: Option<TypeInfo>) -> Result<Provider, ResolveErrorKind> {
        {
            let local = self.local.read();
            if local.contains(&type_info) {
                return local
                    .select(type_info, implementation)?
                    .cloned()
                    .ok_or(ResolveErrorKind::NoProvider { type_info });
            }
        }

        self.container
            .select(type_info, implementation)?
            .ok_or(ResolveErrorKind::NoProvider { type_info })
    }

    pub(crate) fn find_all(&self, type_info: TypeInfo) -> Vec<Provider> {
        {
            let local = self.local.read();
            if local.contains(&type_info) {
                return local.get(&type_info).to_vec();
            }
        }

        self.container.providers_for(type_info)
    }

    /// Explicitly registered providers of the parameterized type take priority over its family.
    pub(crate) fn find_generic(&self, type_info: TypeInfo, template: &GenericTemplate) -> Result<Provider, ResolveErrorKind> {
        match self.find_provider(type_info, None) {
            Err(ResolveErrorKind::NoProvider { .. }) => self.container.instantiate_generic(type_info, template),
            result => result,
        }
    }

    pub(crate) fn lookup(&self, dependency: &Dependency) -> Result<Lookup, ResolveErrorKind> {
        let type_info = dependency.type_info;
        match &dependency.kind {
            DependencyKind::Single => self.find_provider(type_info, None).map(Lookup::Single),
            DependencyKind::Implementation(implementation) => self.find_provider(type_info, Some(*implementation)).map(Lookup::Single),
            DependencyKind::Iterable => Ok(Lookup::Iterable(self.find_all(type_info))),
            DependencyKind::Generic(template) => self.find_generic(type_info, template).map(Lookup::Single),
        }
    }

    /// Singletons are cached by the container, everything else by the context.
    /// Singletons registered in the context are cached by the context, like the scoped ones.
    #[must_use]
    pub(crate) fn store_for(&self, provider: &Provider) -> &InstanceStore {
        match provider.lifetime() {
            Lifetime::Singleton if !self.is_local(provider) => &self.container.inner.singletons,
            Lifetime::Singleton | Lifetime::Scoped | Lifetime::Transient => &self.store,
        }
    }

    pub(crate) fn on_resolve_sync(&self, provider: &Provider, instance: &(dyn Any + Send + Sync)) {
        for extension in self.container.extensions() {
            if let Err(err) = extension.on_resolve_sync(provider, instance) {
                warn!(extension = extension.name(), error = %err, "Resolve hook failed");
            }
        }
    }

    #[cfg(feature = "async")]
    pub(crate) async fn on_resolve(&self, provider: &Provider, instance: &(dyn Any + Send + Sync)) {
        for extension in self.container.extensions() {
            if let Err(err) = extension.on_resolve(provider, instance).await {
                warn!(extension = extension.name(), error = %err, "Resolve hook failed");
            }
        }
    }
}

/// # Errors
/// Returns [`ResolveErrorKind::CyclicDependency`] if the provider is already on the path
pub(crate) fn check_cycle(path: &ResolutionPath, provider: &Provider) -> Result<(), ResolveErrorKind> {
    match path.iter().position(|(id, _)| *id == provider.id()) {
        Some(start) => Err(ResolveErrorKind::CyclicDependency {
            path: path[start..]
                .iter()
                .map(|(_, type_info)| *type_info)
                .chain([provider.type_info()])
                .collect(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn downcast<Dep: Send + Sync + 'static>(instance: AnyArc, provider: &Provider) -> Result<Arc<Dep>, ResolveErrorKind> {
    instance.downcast().map_err(|_| ResolveErrorKind::IncorrectType {
        expected: TypeInfo::of::<Dep>(),
        actual: provider.type_info(),
    })
}
