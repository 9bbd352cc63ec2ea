use std::fmt::{self, Debug, Formatter};

use crate::{
    any::TypeInfo,
    generics::{GenericTemplate, Parameterized},
};

/// A dependency declared by a factory argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub type_info: TypeInfo,
    pub kind: DependencyKind,
}

#[derive(Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// The only provider registered for the type.
    Single,
    /// The provider registered for the type with the given implementation.
    Implementation(TypeInfo),
    /// Instances of every provider registered for the type, in registration order.
    Iterable,
    /// The provider registered for the type, or the one instantiated from its generic family.
    Generic(GenericTemplate),
}

impl Debug for DependencyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("Single"),
            Self::Implementation(implementation) => f.debug_tuple("Implementation").field(&implementation.name).finish(),
            Self::Iterable => f.write_str("Iterable"),
            Self::Generic(template) => f.debug_tuple("Generic").field(&template.family().name).finish(),
        }
    }
}

impl Dependency {
    #[inline]
    #[must_use]
    pub fn single<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            kind: DependencyKind::Single,
        }
    }

    #[inline]
    #[must_use]
    pub fn implementation<T: ?Sized + 'static, I: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            kind: DependencyKind::Implementation(TypeInfo::of::<I>()),
        }
    }

    #[inline]
    #[must_use]
    pub fn iterable<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            kind: DependencyKind::Iterable,
        }
    }

    #[inline]
    #[must_use]
    pub fn generic<T: Parameterized>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            kind: DependencyKind::Generic(GenericTemplate::of::<T>()),
        }
    }

    /// Implementation the dependency is restricted to, if any.
    #[inline]
    #[must_use]
    pub const fn implementation_filter(&self) -> Option<TypeInfo> {
        match self.kind {
            DependencyKind::Implementation(implementation) => Some(implementation),
            _ => None,
        }
    }
}
