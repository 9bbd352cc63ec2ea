use crate::{any::TypeInfo, provider::Provider};

/// Describes how to build the provider of a generic type for any type argument.
///
/// A family is registered once with [`crate::Container::register_generic`],
/// after that every parameterization requested through [`crate::InjectGeneric`]
/// or [`crate::SyncContext::resolve_generic`] is instantiated on demand.
///
/// # Example
/// ```
/// use injectum::{GenericFamily, Inject, InstantiateErrorKind, Parameterized, Provider, Scoped};
/// use std::sync::Arc;
///
/// struct Repository<T>(Arc<T>);
///
/// struct RepositoryFamily;
///
/// impl GenericFamily for RepositoryFamily {
///     fn provider<A: Send + Sync + 'static>() -> Provider {
///         Scoped::new(|Inject(session): Inject<A>| Ok::<_, InstantiateErrorKind>(Repository(session)))
///     }
/// }
///
/// impl<T: Send + Sync + 'static> Parameterized for Repository<T> {
///     type Family = RepositoryFamily;
///     type Arg = T;
/// }
/// ```
pub trait GenericFamily: 'static {
    fn provider<A: Send + Sync + 'static>() -> Provider;
}

/// A type built by a [`GenericFamily`] from its argument.
///
/// Types with more parameters make the family generic over the remaining ones, registered once per instantiation.
pub trait Parameterized: Send + Sync + 'static {
    type Family: GenericFamily;
    type Arg: Send + Sync + 'static;
}

#[derive(Clone, Copy)]
pub struct GenericTemplate {
    family: TypeInfo,
    instantiate: fn() -> Provider,
}

impl PartialEq for GenericTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family
    }
}

impl Eq for GenericTemplate {}

impl GenericTemplate {
    #[inline]
    #[must_use]
    pub(crate) fn of<T: Parameterized>() -> Self {
        Self {
            family: TypeInfo::of::<T::Family>(),
            instantiate: <T::Family as GenericFamily>::provider::<T::Arg>,
        }
    }

    #[inline]
    #[must_use]
    pub const fn family(&self) -> TypeInfo {
        self.family
    }

    #[inline]
    #[must_use]
    pub(crate) fn instantiate(&self) -> Provider {
        (self.instantiate)()
    }
}
