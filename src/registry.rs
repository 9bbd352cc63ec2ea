use std::collections::BTreeMap;

use crate::{
    any::TypeInfo,
    errors::{RegisterErrorKind, ResolveErrorKind},
    provider::Provider,
};

/// Providers keyed by the type they are registered for, in registration order.
#[derive(Default, Clone)]
pub(crate) struct Registry {
    providers: BTreeMap<TypeInfo, Vec<Provider>>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// # Errors
    /// Returns [`RegisterErrorKind::DuplicateProvider`] if a provider with the same implementation is already registered for the type
    pub(crate) fn add(&mut self, type_info: TypeInfo, provider: Provider) -> Result<(), RegisterErrorKind> {
        let providers = self.providers.entry(type_info).or_default();
        if providers.iter().any(|registered| registered.implementation() == provider.implementation()) {
            return Err(RegisterErrorKind::DuplicateProvider {
                type_info,
                implementation: provider.implementation(),
            });
        }

        providers.push(provider);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, type_info: &TypeInfo) -> &[Provider] {
        self.providers.get(type_info).map_or(&[], Vec::as_slice)
    }

    #[inline]
    #[must_use]
    pub(crate) fn contains(&self, type_info: &TypeInfo) -> bool {
        !self.get(type_info).is_empty()
    }

    /// Selects the provider to resolve a single instance of the type with.
    ///
    /// Returns `Ok(None)` if no provider is registered for the type.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoImplementation`] if providers are registered for the type, but none with the implementation
    /// - Returns [`ResolveErrorKind::MultipleProviders`] if more than one provider is registered and no implementation is specified
    pub(crate) fn select(&self, type_info: TypeInfo, implementation: Option<TypeInfo>) -> Result<Option<&Provider>, ResolveErrorKind> {
        let providers = self.get(&type_info);

        match (providers, implementation) {
            ([], _) => Ok(None),
            (providers, Some(implementation)) => providers
                .iter()
                .find(|provider| provider.implementation() == implementation)
                .map(Some)
                .ok_or(ResolveErrorKind::NoImplementation { type_info, implementation }),
            ([provider], None) => Ok(Some(provider)),
            (providers, None) => Err(ResolveErrorKind::MultipleProviders {
                type_info,
                count: providers.len(),
            }),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&TypeInfo, &[Provider])> {
        self.providers
            .iter()
            .filter(|(_, providers)| !providers.is_empty())
            .map(|(type_info, providers)| (type_info, providers.as_slice()))
    }
}
