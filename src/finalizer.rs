use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use crate::{errors::InstantiateErrorKind, instantiator::Produced};
#[cfg(feature = "async")]
use crate::utils::future::BoxFuture;

/// Release obligation pushed to an instance store, called once on its close.
pub(crate) enum BoxedFinalizer {
    Sync(Box<dyn FnOnce() -> Result<(), InstantiateErrorKind> + Send>),
    #[cfg(feature = "async")]
    Async(Box<dyn FnOnce() -> BoxFuture<'static, Result<(), InstantiateErrorKind>> + Send>),
}

impl BoxedFinalizer {
    #[cfg(feature = "async")]
    #[inline]
    #[must_use]
    pub(crate) const fn is_async(&self) -> bool {
        match self {
            Self::Sync(_) => false,
            #[cfg(feature = "async")]
            Self::Async(_) => true,
        }
    }
}

/// A value produced by a resource factory together with its synchronous finalizer.
///
/// Only providers built with a `resource` constructor (e.g. [`crate::Scoped::resource`]) call the finalizer,
/// when the instance store that cached the value is closed.
/// A plain factory returning [`Managed`] provides the [`Managed`] value itself and its finalizer is never called.
///
/// # Example
/// ```
/// use injectum::{InstantiateErrorKind, Managed, Scoped};
///
/// struct Connection;
///
/// let provider = Scoped::resource(|| {
///     Ok::<_, InstantiateErrorKind>(Managed::new(Connection, |_connection| Ok(())))
/// });
/// assert!(provider.is_resource());
/// ```
pub struct Managed<Dep> {
    value: Dep,
    finalizer: Box<dyn FnOnce(Arc<Dep>) -> Result<(), InstantiateErrorKind> + Send + Sync>,
}

impl<Dep: Send + Sync + 'static> Managed<Dep> {
    #[inline]
    #[must_use]
    pub fn new<Fin>(value: Dep, finalizer: Fin) -> Self
    where
        Fin: FnOnce(Arc<Dep>) -> Result<(), InstantiateErrorKind> + Send + Sync + 'static,
    {
        Self {
            value,
            finalizer: Box::new(finalizer),
        }
    }
}

impl<Dep> Managed<Dep> {
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &Dep {
        &self.value
    }
}

impl<Dep: Debug> Debug for Managed<Dep> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed").field("value", &self.value).finish_non_exhaustive()
    }
}

/// Output of a resource factory, split into the shared value and its release obligation.
pub(crate) trait IntoProduced: Send + 'static {
    type Target: Send + Sync + 'static;

    /// Whether the release obligation has to be awaited.
    const IS_ASYNC: bool;

    fn into_produced(self) -> Produced;
}

impl<Dep: Send + Sync + 'static> IntoProduced for Managed<Dep> {
    type Target = Dep;

    const IS_ASYNC: bool = false;

    fn into_produced(self) -> Produced {
        let value = Arc::new(self.value);
        let dependency = value.clone();
        let finalizer = self.finalizer;

        Produced {
            value,
            finalizer: Some(BoxedFinalizer::Sync(Box::new(move || finalizer(dependency)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    };

    use super::{BoxedFinalizer, IntoProduced as _, Managed};

    struct Connection(u8);

    #[test]
    fn test_managed_into_produced() {
        let finalized = Arc::new(AtomicU8::new(0));

        let managed = Managed::new(Connection(5), {
            let finalized = finalized.clone();
            move |connection: Arc<Connection>| {
                finalized.store(connection.0, Ordering::SeqCst);
                Ok(())
            }
        });
        assert_eq!(managed.value().0, 5);

        let produced = managed.into_produced();
        assert_eq!(produced.value.downcast_ref::<Connection>().unwrap().0, 5);
        assert_eq!(finalized.load(Ordering::SeqCst), 0);

        let Some(BoxedFinalizer::Sync(finalizer)) = produced.finalizer else {
            panic!("sync finalizer expected");
        };
        finalizer().unwrap();
        assert_eq!(finalized.load(Ordering::SeqCst), 5);
    }
}
