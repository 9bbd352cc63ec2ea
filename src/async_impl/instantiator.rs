use std::{future::Future, sync::Arc};

use tracing::debug;

use crate::{
    dependency_resolver::{DependencyResolver, ResolvedSet},
    errors::InstantiateErrorKind,
    finalizer::IntoProduced,
    instantiator::{ProvideErrorKind, Produced},
    service::{service_fn, BoxAsyncService},
    utils::future::BoxFuture,
};

/// An asynchronous factory taking its dependencies as extractor arguments.
///
/// Implemented for every `Fn(T1, .., Tn) -> impl Future<Output = Result<Provides, Error>>` closure or function
/// where each argument is a [`DependencyResolver`].
pub trait AsyncInstantiator<Deps>: Send + Sync + 'static
where
    Deps: DependencyResolver,
{
    type Provides: Send + 'static;
    type Error: Into<InstantiateErrorKind>;
    type Future: Future<Output = Result<Self::Provides, Self::Error>> + Send + 'static;

    fn instantiate(&self, dependencies: Deps) -> Self::Future;
}

pub(crate) type BoxedAsyncInstantiator = BoxAsyncService<ResolvedSet, Produced, ProvideErrorKind>;

#[must_use]
pub(crate) fn boxed_async_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedAsyncInstantiator
where
    Inst: AsyncInstantiator<Deps>,
    Inst::Provides: Sync,
    Deps: DependencyResolver,
{
    BoxAsyncService::new(service_fn(
        move |mut resolved: ResolvedSet| -> BoxFuture<'static, Result<Produced, ProvideErrorKind>> {
            let future = Deps::resolve(&mut resolved).map(|dependencies| instantiator.instantiate(dependencies));

            Box::pin(async move {
                let dependency = future
                    .map_err(ProvideErrorKind::Deps)?
                    .await
                    .map_err(|err| ProvideErrorKind::Factory(err.into()))?;

                debug!("Instantiated");

                Ok::<_, ProvideErrorKind>(Produced {
                    value: Arc::new(dependency),
                    finalizer: None,
                })
            })
        },
    ))
}

#[must_use]
pub(crate) fn boxed_async_resource_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedAsyncInstantiator
where
    Inst: AsyncInstantiator<Deps>,
    Inst::Provides: IntoProduced,
    Deps: DependencyResolver,
{
    BoxAsyncService::new(service_fn(
        move |mut resolved: ResolvedSet| -> BoxFuture<'static, Result<Produced, ProvideErrorKind>> {
            let future = Deps::resolve(&mut resolved).map(|dependencies| instantiator.instantiate(dependencies));

            Box::pin(async move {
                let resource = future
                    .map_err(ProvideErrorKind::Deps)?
                    .await
                    .map_err(|err| ProvideErrorKind::Factory(err.into()))?;

                debug!("Instantiated resource");

                Ok::<_, ProvideErrorKind>(resource.into_produced())
            })
        },
    ))
}

macro_rules! impl_async_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, Response, Err, $($ty,)*> AsyncInstantiator<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<Response, Err>> + Send + 'static,
            Response: Send + 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;
            type Future = Fut;

            #[inline]
            fn instantiate(&self, ($($ty,)*): ($($ty,)*)) -> Self::Future {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_async_instantiator);

#[cfg(test)]
mod tests {
    use std::{
        any::Any,
        sync::{
            atomic::{AtomicU8, Ordering},
            Arc,
        },
    };

    use tracing_test::traced_test;

    use super::{boxed_async_instantiator, boxed_async_resource_instantiator};
    use crate::{
        async_impl::finalizer::AsyncManaged,
        dependency_resolver::{Resolved, ResolvedSet},
        errors::InstantiatorErrorKind,
        finalizer::BoxedFinalizer,
        inject::Inject,
        service::Service as _,
        InstantiateErrorKind,
    };

    struct Request(u8);
    struct Response(u8);

    #[tokio::test]
    #[traced_test]
    async fn test_boxed_async_instantiator() {
        let call_count = Arc::new(AtomicU8::new(0));

        let instantiator = boxed_async_instantiator({
            let call_count = call_count.clone();
            move |Inject(request): Inject<Request>| {
                let call_count = call_count.clone();
                async move {
                    call_count.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, InstantiateErrorKind>(Response(request.0 * 2))
                }
            }
        });

        let mut resolved = ResolvedSet::default();
        resolved.push(Resolved::Single(Arc::new(Request(21)) as Arc<dyn Any + Send + Sync>));

        let produced = instantiator.call(resolved).await.unwrap();
        assert_eq!(produced.value.downcast_ref::<Response>().unwrap().0, 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        let err = instantiator.call(ResolvedSet::default()).await.err().unwrap();
        assert!(matches!(err, InstantiatorErrorKind::Deps(_)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_boxed_async_resource_instantiator() {
        let finalized = Arc::new(AtomicU8::new(0));

        let instantiator = boxed_async_resource_instantiator({
            let finalized = finalized.clone();
            move || {
                let finalized = finalized.clone();
                async move {
                    Ok::<_, InstantiateErrorKind>(AsyncManaged::new(Response(1), move |response| async move {
                        finalized.fetch_add(response.0, Ordering::SeqCst);
                        Ok(())
                    }))
                }
            }
        });

        let produced = instantiator.call(ResolvedSet::default()).await.unwrap();
        let Some(BoxedFinalizer::Async(finalizer)) = produced.finalizer else {
            panic!("async finalizer expected");
        };
        assert_eq!(finalized.load(Ordering::SeqCst), 0);

        finalizer().await.unwrap();
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
    }
}
