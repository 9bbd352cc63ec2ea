use std::collections::{BTreeMap, BTreeSet};

use super::{ContainerValidator, ValidationError};
use crate::{
    any::TypeInfo,
    container::Container,
    dependency::{Dependency, DependencyKind},
    lifetime::Lifetime,
    provider::{Provider, ProviderId},
};

type ProvidersByType = BTreeMap<TypeInfo, Vec<Provider>>;

fn providers_by_type(container: &Container) -> ProvidersByType {
    container.providers().into_iter().collect()
}

/// Registered providers a dependency can be resolved with.
fn matching<'a>(providers: &'a ProvidersByType, dependency: &Dependency) -> impl Iterator<Item = &'a Provider> {
    let implementation = dependency.implementation_filter();
    providers
        .get(&dependency.type_info)
        .into_iter()
        .flatten()
        .filter(move |provider| implementation.map_or(true, |implementation| provider.implementation() == implementation))
}

/// Every non-iterable dependency has a provider, generic ones may be covered by their registered family.
#[must_use]
pub fn all_dependencies_are_present(container: &Container) -> Vec<ValidationError> {
    let providers = providers_by_type(container);
    let mut errors = Vec::new();

    for provider in providers.values().flatten() {
        for dependency in container.dependencies_of(provider).iter() {
            let present = match &dependency.kind {
                DependencyKind::Iterable => true,
                DependencyKind::Single | DependencyKind::Implementation(_) => matching(&providers, dependency).next().is_some(),
                DependencyKind::Generic(template) => {
                    matching(&providers, dependency).next().is_some() || container.has_generic_family(template.family())
                }
            };

            if !present {
                errors.push(ValidationError::DependencyNotFound {
                    dependant: provider.type_info(),
                    dependency: dependency.type_info,
                });
            }
        }
    }

    errors
}

#[must_use]
pub fn all_providers_for_type_have_equal_lifetime(container: &Container) -> Vec<ValidationError> {
    container
        .providers()
        .into_iter()
        .filter_map(|(type_info, providers)| {
            let lifetimes = providers.iter().map(Provider::lifetime).collect::<BTreeSet<_>>();
            (lifetimes.len() > 1).then(|| ValidationError::LifetimeMismatch {
                type_info,
                lifetimes: lifetimes.into_iter().collect(),
            })
        })
        .collect()
}

type ProviderPredicate = Box<dyn Fn(&Provider) -> bool + Send + Sync>;

/// Forbids providers matching the first predicate to depend on providers matching the second one.
pub struct ForbidDependency {
    dependant: ProviderPredicate,
    dependency: ProviderPredicate,
}

impl ForbidDependency {
    #[must_use]
    pub fn new(
        dependant: impl Fn(&Provider) -> bool + Send + Sync + 'static,
        dependency: impl Fn(&Provider) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            dependant: Box::new(dependant),
            dependency: Box::new(dependency),
        }
    }
}

impl ContainerValidator for ForbidDependency {
    fn validate(&self, container: &Container) -> Vec<ValidationError> {
        let providers = providers_by_type(container);
        let mut errors = Vec::new();

        for provider in providers.values().flatten().filter(|provider| (self.dependant)(*provider)) {
            for dependency in container.dependencies_of(provider).iter() {
                for dependency_provider in matching(&providers, dependency).filter(|provider| (self.dependency)(*provider)) {
                    errors.push(ValidationError::ForbiddenDependency {
                        dependant: provider.type_info(),
                        dependant_lifetime: provider.lifetime(),
                        dependency: dependency_provider.type_info(),
                        dependency_lifetime: dependency_provider.lifetime(),
                    });
                }
            }
        }

        errors
    }
}

/// A singleton depending on a scoped provider would keep the instance of the first context forever.
#[must_use]
pub fn forbid_singleton_on_scoped_dependency() -> ForbidDependency {
    ForbidDependency::new(
        |provider| provider.lifetime() == Lifetime::Singleton,
        |provider| provider.lifetime() == Lifetime::Scoped,
    )
}

/// Reports every cycle of the provider graph once.
#[must_use]
pub fn no_cyclic_dependencies(container: &Container) -> Vec<ValidationError> {
    let providers = providers_by_type(container);
    let mut visited = BTreeSet::new();
    let mut stack = Vec::new();
    let mut errors = Vec::new();

    for provider in providers.values().flatten() {
        if let Some(path) = dfs_visit(container, &providers, provider, &mut visited, &mut stack) {
            errors.push(ValidationError::CyclicDependency { path });
            visited.extend(stack.drain(..).map(Provider::id));
        }
    }

    errors
}

fn dfs_visit<'a>(
    container: &Container,
    providers: &'a ProvidersByType,
    provider: &'a Provider,
    visited: &mut BTreeSet<ProviderId>,
    stack: &mut Vec<&'a Provider>,
) -> Option<Vec<TypeInfo>> {
    if visited.contains(&provider.id()) {
        return None;
    }
    if let Some(start) = stack.iter().position(|entered| entered.id() == provider.id()) {
        return Some(
            stack[start..]
                .iter()
                .map(|entered| entered.type_info())
                .chain([provider.type_info()])
                .collect(),
        );
    }
    stack.push(provider);

    for dependency in container.dependencies_of(provider).iter() {
        for dependency_provider in matching(providers, dependency) {
            if let Some(path) = dfs_visit(container, providers, dependency_provider, visited, stack) {
                return Some(path);
            }
        }
    }

    stack.pop();
    visited.insert(provider.id());
    None
}

/// Presence, singleton on scoped and cycle rules.
#[must_use]
pub fn default_validators() -> Vec<Box<dyn ContainerValidator>> {
    vec![
        Box::new(all_dependencies_are_present),
        Box::new(forbid_singleton_on_scoped_dependency()),
        Box::new(no_cyclic_dependencies),
    ]
}
