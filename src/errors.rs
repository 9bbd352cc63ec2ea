mod close;
mod instantiate;
mod instantiator;
mod register;
mod resolve;

pub use close::{CloseErrorKind, StartErrorKind};
pub use instantiate::InstantiateErrorKind;
pub use instantiator::InstantiatorErrorKind;
pub use register::RegisterErrorKind;
pub use resolve::ResolveErrorKind;

pub(crate) use resolve::DisplayPath;
