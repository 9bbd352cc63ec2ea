use std::sync::Arc;

use super::base::Service;
#[cfg(feature = "async")]
use crate::utils::future::BoxFuture;

type DynService<Request, Response, Error, Output> =
    dyn Service<Request, Response = Response, Error = Error, Output = Output> + Send + Sync;

/// Shared type-erased synchronous service.
pub(crate) struct BoxService<Request, Response, Error>(Arc<DynService<Request, Response, Error, Result<Response, Error>>>);

impl<Request, Response, Error> BoxService<Request, Response, Error> {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error, Output = Result<Response, Error>> + Send + Sync + 'static,
    {
        Self(Arc::new(service))
    }
}

impl<Request, Response, Error> Clone for BoxService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<Request, Response, Error> Service<Request> for BoxService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;
    type Output = Result<Response, Error>;

    #[inline]
    fn call(&self, request: Request) -> Self::Output {
        self.0.call(request)
    }
}

/// Shared type-erased asynchronous service.
#[cfg(feature = "async")]
pub(crate) struct BoxAsyncService<Request, Response, Error>(
    Arc<DynService<Request, Response, Error, BoxFuture<'static, Result<Response, Error>>>>,
);

#[cfg(feature = "async")]
impl<Request, Response, Error> BoxAsyncService<Request, Response, Error> {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error, Output = BoxFuture<'static, Result<Response, Error>>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(service))
    }
}

#[cfg(feature = "async")]
impl<Request, Response, Error> Clone for BoxAsyncService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(feature = "async")]
impl<Request, Response, Error> Service<Request> for BoxAsyncService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;
    type Output = BoxFuture<'static, Result<Response, Error>>;

    #[inline]
    fn call(&self, request: Request) -> Self::Output {
        self.0.call(request)
    }
}
