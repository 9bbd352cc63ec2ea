pub(crate) mod base;
pub(crate) mod boxed;
pub(crate) mod service_fn;

pub(crate) use base::Service;
#[cfg(feature = "async")]
pub(crate) use boxed::BoxAsyncService;
pub(crate) use boxed::BoxService;
pub(crate) use service_fn::service_fn;
