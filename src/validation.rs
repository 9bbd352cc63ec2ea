//! Static checks of a container's provider graph, run before resolving anything.
//!
//! Every validator reports all of its failures and [`validate_container`] collects them into one [`ValidationErrorGroup`].

mod rules;

pub use rules::{
    all_dependencies_are_present, all_providers_for_type_have_equal_lifetime, default_validators,
    forbid_singleton_on_scoped_dependency, no_cyclic_dependencies, ForbidDependency,
};

use tracing::{debug, error};

use crate::{any::TypeInfo, container::Container, errors::DisplayPath, lifetime::Lifetime};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Provider for `{dependant}` depends on `{dependency}`, which has no provider")]
    DependencyNotFound { dependant: TypeInfo, dependency: TypeInfo },
    #[error("Providers for `{type_info}` have different lifetimes: {lifetimes:?}")]
    LifetimeMismatch { type_info: TypeInfo, lifetimes: Vec<Lifetime> },
    #[error("{dependant_lifetime} provider for `{dependant}` depends on {dependency_lifetime} provider for `{dependency}`")]
    ForbiddenDependency {
        dependant: TypeInfo,
        dependant_lifetime: Lifetime,
        dependency: TypeInfo,
        dependency_lifetime: Lifetime,
    },
    #[error("{}", DisplayPath(.path))]
    CyclicDependency { path: Vec<TypeInfo> },
}

#[derive(thiserror::Error, Debug)]
#[error(
    "Container validation failed with {} error(s): {}",
    .errors.len(),
    .errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
)]
pub struct ValidationErrorGroup {
    pub errors: Vec<ValidationError>,
}

/// A rule checked against the registered providers.
///
/// Implemented for every `Fn(&Container) -> Vec<ValidationError>`.
pub trait ContainerValidator: Send + Sync {
    fn validate(&self, container: &Container) -> Vec<ValidationError>;
}

impl<F> ContainerValidator for F
where
    F: Fn(&Container) -> Vec<ValidationError> + Send + Sync,
{
    #[inline]
    fn validate(&self, container: &Container) -> Vec<ValidationError> {
        self(container)
    }
}

/// Runs every validator, see [`default_validators`] for the built-in rule set.
///
/// # Errors
/// Returns every failure of every validator at once
pub fn validate_container(container: &Container, validators: &[Box<dyn ContainerValidator>]) -> Result<(), ValidationErrorGroup> {
    let errors = validators
        .iter()
        .flat_map(|validator| validator.validate(container))
        .collect::<Vec<_>>();

    if errors.is_empty() {
        debug!("Container is valid");
        return Ok(());
    }

    let err = ValidationErrorGroup { errors };
    error!("{}", err);
    Err(err)
}
