use std::{future::Future, sync::Arc};

use crate::{
    errors::InstantiateErrorKind,
    finalizer::{BoxedFinalizer, IntoProduced},
    instantiator::Produced,
    utils::future::BoxFuture,
};

/// A value produced by a resource factory together with its asynchronous finalizer.
///
/// The finalizer is awaited on [`crate::Context::aclose`] or [`crate::Container::aclose`].
/// Providers returning it are asynchronous and can't be resolved through a [`crate::SyncContext`].
pub struct AsyncManaged<Dep> {
    value: Dep,
    finalizer: Box<dyn FnOnce(Arc<Dep>) -> BoxFuture<'static, Result<(), InstantiateErrorKind>> + Send + Sync>,
}

impl<Dep: Send + Sync + 'static> AsyncManaged<Dep> {
    #[inline]
    #[must_use]
    pub fn new<Fin, Fut>(value: Dep, finalizer: Fin) -> Self
    where
        Fin: FnOnce(Arc<Dep>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), InstantiateErrorKind>> + Send + 'static,
    {
        Self {
            value,
            finalizer: Box::new(move |dependency| Box::pin(finalizer(dependency))),
        }
    }
}

impl<Dep> AsyncManaged<Dep> {
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &Dep {
        &self.value
    }
}

impl<Dep: Send + Sync + 'static> IntoProduced for AsyncManaged<Dep> {
    type Target = Dep;

    const IS_ASYNC: bool = true;

    fn into_produced(self) -> Produced {
        let value = Arc::new(self.value);
        let dependency = value.clone();
        let finalizer = self.finalizer;

        Produced {
            value,
            finalizer: Some(BoxedFinalizer::Async(Box::new(move || finalizer(dependency)))),
        }
    }
}
