use std::{collections::VecDeque, sync::Arc};

use crate::{any::{AnyArc, TypeInfo}, dependency::Dependency, errors::ResolveErrorKind};

/// A value resolved for one declared dependency.
pub enum Resolved {
    Single(AnyArc),
    Iterable(Vec<AnyArc>),
}

/// Resolved dependencies in declaration order, consumed front to back by extractors.
#[derive(Default)]
pub struct ResolvedSet(VecDeque<Resolved>);

impl ResolvedSet {
    #[inline]
    #[must_use]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(VecDeque::with_capacity(capacity))
    }

    #[inline]
    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Takes the next resolved value as a single instance of `Dep`.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::UnresolvedDependency`] if the next value is missing or isn't a single instance
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the next value isn't a `Dep`
    pub fn pop_single<Dep: Send + Sync + 'static>(&mut self) -> Result<Arc<Dep>, ResolveErrorKind> {
        match self.0.pop_front() {
            Some(Resolved::Single(dependency)) => downcast(dependency),
            _ => Err(ResolveErrorKind::UnresolvedDependency {
                type_info: TypeInfo::of::<Dep>(),
            }),
        }
    }

    /// Takes the next resolved value as instances of `Dep`.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::UnresolvedDependency`] if the next value is missing or isn't a list of instances
    /// - Returns [`ResolveErrorKind::IncorrectType`] if any of the instances isn't a `Dep`
    pub fn pop_iterable<Dep: Send + Sync + 'static>(&mut self) -> Result<Vec<Arc<Dep>>, ResolveErrorKind> {
        match self.0.pop_front() {
            Some(Resolved::Iterable(dependencies)) => dependencies.into_iter().map(downcast).collect(),
            _ => Err(ResolveErrorKind::UnresolvedDependency {
                type_info: TypeInfo::of::<Dep>(),
            }),
        }
    }
}

fn downcast<Dep: Send + Sync + 'static>(dependency: AnyArc) -> Result<Arc<Dep>, ResolveErrorKind> {
    let actual = (*dependency).type_id();
    dependency.downcast().map_err(|_| ResolveErrorKind::IncorrectType {
        expected: TypeInfo::of::<Dep>(),
        actual: TypeInfo {
            name: "<erased>",
            id: actual,
        },
    })
}

/// Declares the dependencies of a factory or handler argument and rebuilds it from resolved values.
///
/// Implemented for every extractor ([`crate::Inject`], [`crate::InjectImpl`], [`crate::InjectAll`],
/// [`crate::InjectGeneric`]) and for tuples of them.
pub trait DependencyResolver: Sized + Send + 'static {
    #[must_use]
    fn dependencies() -> Vec<Dependency>;

    /// # Errors
    /// Returns an error if resolved values don't match the declared dependencies
    fn resolve(resolved: &mut ResolvedSet) -> Result<Self, ResolveErrorKind>;
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            #[inline]
            #[allow(unused_mut)]
            fn dependencies() -> Vec<Dependency> {
                let mut dependencies = Vec::new();
                $( dependencies.extend($ty::dependencies()); )*
                dependencies
            }

            #[inline]
            #[allow(unused_variables)]
            fn resolve(resolved: &mut ResolvedSet) -> Result<Self, ResolveErrorKind> {
                Ok(($($ty::resolve(resolved)?,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);

#[cfg(test)]
mod tests {
    use std::{any::Any, sync::Arc};

    use super::{DependencyResolver, Resolved, ResolvedSet};
    use crate::{
        dependency::{Dependency, DependencyKind},
        inject::{Inject, InjectAll},
        ResolveErrorKind,
    };

    struct Request(u8);
    struct Plugin(&'static str);

    #[test]
    fn test_tuple_dependencies_order() {
        let dependencies = <(Inject<Request>, InjectAll<Plugin>, Inject<u8>)>::dependencies();

        assert_eq!(
            dependencies,
            [Dependency::single::<Request>(), Dependency::iterable::<Plugin>(), Dependency::single::<u8>()]
        );
        assert_eq!(dependencies[1].kind, DependencyKind::Iterable);
    }

    #[test]
    fn test_tuple_resolve() {
        let mut resolved = ResolvedSet::default();
        resolved.push(Resolved::Single(Arc::new(Request(1))));
        resolved.push(Resolved::Iterable(vec![
            Arc::new(Plugin("auth")) as Arc<dyn Any + Send + Sync>,
            Arc::new(Plugin("cors")),
        ]));

        let (Inject(request), InjectAll(plugins)) = <(Inject<Request>, InjectAll<Plugin>)>::resolve(&mut resolved).unwrap();

        assert_eq!(request.0, 1);
        assert_eq!(plugins.iter().map(|plugin| plugin.0).collect::<Vec<_>>(), ["auth", "cors"]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolve_incorrect_type() {
        let mut resolved = ResolvedSet::default();
        resolved.push(Resolved::Single(Arc::new(Plugin("auth"))));

        let err = <(Inject<Request>,)>::resolve(&mut resolved).err().unwrap();
        assert!(matches!(err, ResolveErrorKind::IncorrectType { .. }));
    }

    #[test]
    fn test_resolve_missing() {
        let mut resolved = ResolvedSet::default();

        let err = <(Inject<Request>,)>::resolve(&mut resolved).err().unwrap();
        assert!(matches!(err, ResolveErrorKind::UnresolvedDependency { .. }));
    }
}
