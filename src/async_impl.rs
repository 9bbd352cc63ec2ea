pub(crate) mod context;
pub(crate) mod finalizer;
pub(crate) mod instantiator;
