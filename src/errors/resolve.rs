use std::fmt::{self, Formatter};

use super::{InstantiateErrorKind, InstantiatorErrorKind};
use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Provider for `{type_info}` not found")]
    NoProvider { type_info: TypeInfo },
    #[error("Provider for `{type_info}` with implementation `{implementation}` not found")]
    NoImplementation { type_info: TypeInfo, implementation: TypeInfo },
    #[error("Multiple providers ({count}) found for `{type_info}`, an implementation should be specified")]
    MultipleProviders { type_info: TypeInfo, count: usize },
    #[error("Incorrect type: expected `{expected}`, actual `{actual}`")]
    IncorrectType { expected: TypeInfo, actual: TypeInfo },
    #[error("Provider for `{type_info}` is asynchronous and can't be resolved in a synchronous context")]
    AsyncProvider { type_info: TypeInfo },
    #[error("{}", DisplayPath(.path))]
    CyclicDependency { path: Vec<TypeInfo> },
    #[error("Dependency `{type_info}` wasn't resolved before instantiation")]
    UnresolvedDependency { type_info: TypeInfo },
    #[error("No active context")]
    NoActiveContext,
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}

impl ResolveErrorKind {
    /// Returns the error of the failed factory, if the resolution failed because of it.
    #[must_use]
    pub fn factory_error(&self) -> Option<&InstantiateErrorKind> {
        match self {
            Self::Instantiator(InstantiatorErrorKind::Factory(err)) => Some(err),
            Self::Instantiator(InstantiatorErrorKind::Deps(err)) => err.factory_error(),
            _ => None,
        }
    }
}

impl From<InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>> for ResolveErrorKind {
    fn from(err: InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>) -> Self {
        match err {
            InstantiatorErrorKind::Deps(err) => Self::Instantiator(InstantiatorErrorKind::Deps(Box::new(err))),
            InstantiatorErrorKind::Factory(err) => Self::Instantiator(InstantiatorErrorKind::Factory(err)),
        }
    }
}

pub(crate) struct DisplayPath<'a>(pub(crate) &'a [TypeInfo]);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Cyclic dependency detected: ")?;
        for (index, type_info) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{type_info}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayPath, ResolveErrorKind};
    use crate::{any::TypeInfo, errors::InstantiatorErrorKind, InstantiateErrorKind};

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct ConnectionRefused;

    #[test]
    fn test_display_path() {
        let path = [TypeInfo::of::<u8>(), TypeInfo::of::<u16>(), TypeInfo::of::<u8>()];

        assert_eq!(DisplayPath(&path).to_string(), "Cyclic dependency detected: u8 -> u16 -> u8");
    }

    #[test]
    fn test_factory_error_through_deps() {
        let err = ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(ResolveErrorKind::Instantiator(
            InstantiatorErrorKind::Factory(InstantiateErrorKind::custom(ConnectionRefused)),
        ))));

        let factory_err = err.factory_error().unwrap();
        assert!(factory_err.downcast_ref::<ConnectionRefused>().is_some());
        assert_eq!(err.to_string(), "connection refused");
    }
}
