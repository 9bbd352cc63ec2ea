use std::sync::Arc;

use tracing::debug;

use crate::{
    any::AnyArc,
    dependency_resolver::{DependencyResolver, ResolvedSet},
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    finalizer::{BoxedFinalizer, IntoProduced},
    service::{service_fn, BoxService},
};

/// A synchronous factory taking its dependencies as extractor arguments.
///
/// Implemented for every `Fn(T1, .., Tn) -> Result<Provides, Error>` closure or function
/// where each argument is a [`DependencyResolver`].
pub trait Instantiator<Deps>: Send + Sync + 'static
where
    Deps: DependencyResolver,
{
    type Provides: Send + 'static;
    type Error: Into<InstantiateErrorKind>;

    /// # Errors
    /// Returns the factory error
    fn instantiate(&self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;
}

/// Instance produced by a provider with the release obligation it registers, if any.
pub(crate) struct Produced {
    pub(crate) value: AnyArc,
    pub(crate) finalizer: Option<BoxedFinalizer>,
}

pub(crate) type ProvideErrorKind = InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>;

pub(crate) type BoxedInstantiator = BoxService<ResolvedSet, Produced, ProvideErrorKind>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedInstantiator
where
    Inst: Instantiator<Deps>,
    Inst::Provides: Sync,
    Deps: DependencyResolver,
{
    BoxService::new(service_fn(move |mut resolved: ResolvedSet| -> Result<Produced, ProvideErrorKind> {
        let dependencies = Deps::resolve(&mut resolved).map_err(ProvideErrorKind::Deps)?;
        let dependency = instantiator
            .instantiate(dependencies)
            .map_err(|err| ProvideErrorKind::Factory(err.into()))?;

        debug!("Instantiated");

        Ok(Produced {
            value: Arc::new(dependency),
            finalizer: None,
        })
    }))
}

#[must_use]
pub(crate) fn boxed_resource_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedInstantiator
where
    Inst: Instantiator<Deps>,
    Inst::Provides: IntoProduced,
    Deps: DependencyResolver,
{
    BoxService::new(service_fn(move |mut resolved: ResolvedSet| -> Result<Produced, ProvideErrorKind> {
        let dependencies = Deps::resolve(&mut resolved).map_err(ProvideErrorKind::Deps)?;
        let resource = instantiator
            .instantiate(dependencies)
            .map_err(|err| ProvideErrorKind::Factory(err.into()))?;

        debug!("Instantiated resource");

        Ok(resource.into_produced())
    }))
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Result<Response, Err> + Send + Sync + 'static,
            Response: Send + 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;

            #[inline]
            fn instantiate(&self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);
