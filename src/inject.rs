use std::{marker::PhantomData, ops::Deref, sync::Arc};

use crate::{
    dependency::Dependency,
    dependency_resolver::{DependencyResolver, ResolvedSet},
    generics::Parameterized,
    ResolveErrorKind,
};

/// Injects the only provider registered for `Dep`.
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    #[inline]
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::single::<Dep>()]
    }

    #[inline]
    fn resolve(resolved: &mut ResolvedSet) -> Result<Self, ResolveErrorKind> {
        resolved.pop_single().map(Self)
    }
}

impl<Dep> Deref for Inject<Dep> {
    type Target = Dep;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Injects the provider registered for `Dep` with implementation `Impl`,
/// see [`crate::Provider::with_implementation`].
pub struct InjectImpl<Dep, Impl>(pub Arc<Dep>, PhantomData<fn() -> Impl>);

impl<Dep, Impl> InjectImpl<Dep, Impl> {
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Arc<Dep> {
        self.0
    }
}

impl<Dep: Send + Sync + 'static, Impl: 'static> DependencyResolver for InjectImpl<Dep, Impl> {
    #[inline]
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::implementation::<Dep, Impl>()]
    }

    #[inline]
    fn resolve(resolved: &mut ResolvedSet) -> Result<Self, ResolveErrorKind> {
        resolved.pop_single().map(|dependency| Self(dependency, PhantomData))
    }
}

impl<Dep, Impl> Deref for InjectImpl<Dep, Impl> {
    type Target = Dep;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Injects instances of every provider registered for `Dep`, in registration order.
pub struct InjectAll<Dep>(pub Vec<Arc<Dep>>);

impl<Dep: Send + Sync + 'static> DependencyResolver for InjectAll<Dep> {
    #[inline]
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::iterable::<Dep>()]
    }

    #[inline]
    fn resolve(resolved: &mut ResolvedSet) -> Result<Self, ResolveErrorKind> {
        resolved.pop_iterable().map(Self)
    }
}

/// Injects a parameterized generic, instantiating its [`crate::GenericFamily`] when no explicit provider is registered.
pub struct InjectGeneric<Dep>(pub Arc<Dep>);

impl<Dep: Parameterized> DependencyResolver for InjectGeneric<Dep> {
    #[inline]
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::generic::<Dep>()]
    }

    #[inline]
    fn resolve(resolved: &mut ResolvedSet) -> Result<Self, ResolveErrorKind> {
        resolved.pop_single().map(Self)
    }
}

impl<Dep> Deref for InjectGeneric<Dep> {
    type Target = Dep;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
