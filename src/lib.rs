#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dependency;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod extensions;
pub(crate) mod finalizer;
pub(crate) mod generics;
pub(crate) mod handler;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod lifetime;
pub(crate) mod lock;
pub(crate) mod provider;
pub(crate) mod registry;
pub(crate) mod scope;
pub(crate) mod service;
pub(crate) mod store;
pub(crate) mod utils;

pub mod ambient;
pub mod validation;

#[cfg(feature = "async")]
pub(crate) mod async_impl;

pub use any::TypeInfo;
pub use container::{Container, OverrideGuard};
pub use context::SyncContext;
pub use dependency::{Dependency, DependencyKind};
pub use dependency_resolver::{DependencyResolver, Resolved, ResolvedSet};
pub use errors::{
    CloseErrorKind, InstantiateErrorKind, InstantiatorErrorKind, RegisterErrorKind, ResolveErrorKind, StartErrorKind,
};
pub use extensions::{Extension, FactoryDependencyExtractor, ObjectDependencyExtractor, SupportsDependencyExtraction};
pub use finalizer::Managed;
pub use generics::{GenericFamily, GenericTemplate, Parameterized};
pub use handler::Handler;
pub use inject::{Inject, InjectAll, InjectGeneric, InjectImpl};
pub use instantiator::Instantiator;
pub use lifetime::Lifetime;
pub use provider::{Object, Provider, ProviderId, Scoped, Singleton, Transient};
pub use utils::future::BoxFuture;

#[cfg(feature = "async")]
pub use async_impl::{context::Context, finalizer::AsyncManaged, instantiator::AsyncInstantiator};
