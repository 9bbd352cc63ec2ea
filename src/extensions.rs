use std::{any::Any, sync::Arc};

#[cfg(feature = "async")]
use crate::utils::future::BoxFuture;
use crate::{any::TypeInfo, container::Container, dependency::Dependency, provider::Provider};

/// Strategy computing the registration type and the dependencies of a provider.
///
/// The first extension whose extractor supports a provider is used for it,
/// [`FactoryDependencyExtractor`] and [`ObjectDependencyExtractor`] are tried after every extension.
///
/// Factories rebuild their arguments from the resolved dependencies in declaration order, so for factory providers
/// an extractor must return exactly the dependencies of [`Provider::dependencies`] and, for every provider,
/// the type of [`Provider::type_info`]. Registration fails with [`crate::RegisterErrorKind::ExtractorMismatch`] otherwise.
/// Dependencies extracted for [`crate::Object`] providers are free, they are resolved before the object is provided.
pub trait SupportsDependencyExtraction: Send + Sync {
    #[must_use]
    fn supports(&self, provider: &Provider) -> bool;

    #[must_use]
    fn extract_dependencies(&self, provider: &Provider) -> Arc<[Dependency]>;

    #[must_use]
    fn extract_type(&self, provider: &Provider) -> TypeInfo;
}

/// Extracts dependencies declared by the extractor arguments of a factory.
pub struct FactoryDependencyExtractor;

impl SupportsDependencyExtraction for FactoryDependencyExtractor {
    #[inline]
    fn supports(&self, provider: &Provider) -> bool {
        !provider.is_object()
    }

    #[inline]
    fn extract_dependencies(&self, provider: &Provider) -> Arc<[Dependency]> {
        provider.dependencies()
    }

    #[inline]
    fn extract_type(&self, provider: &Provider) -> TypeInfo {
        provider.type_info()
    }
}

/// [`crate::Object`] providers have no dependencies.
pub struct ObjectDependencyExtractor;

impl SupportsDependencyExtraction for ObjectDependencyExtractor {
    #[inline]
    fn supports(&self, provider: &Provider) -> bool {
        provider.is_object()
    }

    #[inline]
    fn extract_dependencies(&self, _provider: &Provider) -> Arc<[Dependency]> {
        Vec::new().into()
    }

    #[inline]
    fn extract_type(&self, provider: &Provider) -> TypeInfo {
        provider.type_info()
    }
}

/// Hooks called by the container and contexts at fixed points.
///
/// Every method has a no-op default, implement only the ones you need.
///
/// # Errors
/// Errors of the resolve hooks are logged and don't change the resolution outcome.
/// Errors of the lifespan hooks are returned by [`Container::start`] and [`Container::aclose`].
pub trait Extension: Send + Sync + 'static {
    #[must_use]
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called once when the container is created, in registration order.
    fn on_init(&self, _container: &Container) {}

    /// Called by [`Container::start`], in registration order.
    #[cfg(feature = "async")]
    fn on_startup<'a>(&'a self, _container: &'a Container) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Called by [`Container::aclose`] after the singletons are closed, in reverse registration order.
    #[cfg(feature = "async")]
    fn on_shutdown<'a>(&'a self, _container: &'a Container) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Called by a [`crate::SyncContext`] after an instance is provided and cached.
    ///
    /// # Errors
    /// Returned errors are logged at warn level
    fn on_resolve_sync(&self, _provider: &Provider, _instance: &(dyn Any + Send + Sync)) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called by a [`crate::Context`] after an instance is provided and cached.
    #[cfg(feature = "async")]
    fn on_resolve<'a>(&'a self, _provider: &'a Provider, _instance: &'a (dyn Any + Send + Sync)) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    #[must_use]
    fn dependency_extractor(&self) -> Option<&dyn SupportsDependencyExtraction> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{FactoryDependencyExtractor, ObjectDependencyExtractor, SupportsDependencyExtraction as _};
    use crate::{
        any::TypeInfo,
        dependency::Dependency,
        inject::Inject,
        provider::{Object, Scoped},
        InstantiateErrorKind,
    };

    struct Config;
    struct Service;

    #[test]
    fn test_builtin_extractors() {
        let object = Object::new(Config);
        let factory = Scoped::new(|_config: Inject<Config>| Ok::<_, InstantiateErrorKind>(Service));

        assert!(ObjectDependencyExtractor.supports(&object));
        assert!(!ObjectDependencyExtractor.supports(&factory));
        assert!(FactoryDependencyExtractor.supports(&factory));
        assert!(!FactoryDependencyExtractor.supports(&object));

        assert!(ObjectDependencyExtractor.extract_dependencies(&object).is_empty());
        assert_eq!(&*FactoryDependencyExtractor.extract_dependencies(&factory), [Dependency::single::<Config>()]);
        assert_eq!(FactoryDependencyExtractor.extract_type(&factory), TypeInfo::of::<Service>());
    }
}
