use core::marker::PhantomData;

use super::base::Service;

pub(crate) struct ServiceFn<F, Response, Error> {
    f: F,
    _marker: PhantomData<fn() -> (Response, Error)>,
}

/// Wraps a closure returning `Result<Response, Error>` or a value that resolves to it.
///
/// The response and error types are fixed at construction so that both sync and async closures
/// share a single [`Service`] implementation.
#[inline]
#[must_use]
pub(crate) const fn service_fn<F, Response, Error>(f: F) -> ServiceFn<F, Response, Error> {
    ServiceFn { f, _marker: PhantomData }
}

impl<F, Request, Response, Error, Output> Service<Request> for ServiceFn<F, Response, Error>
where
    F: Fn(Request) -> Output,
{
    type Response = Response;
    type Error = Error;
    type Output = Output;

    #[inline]
    fn call(&self, request: Request) -> Self::Output {
        (self.f)(request)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::{service_fn, Service as _};

    #[derive(Clone, Copy)]
    struct Request(bool);
    struct Response(bool);

    #[test]
    fn test_service_sync() {
        let service = service_fn::<_, Response, Infallible>(|Request(val)| Ok::<_, Infallible>(Response(val)));

        let request = Request(true);
        let response = service.call(request).unwrap();

        assert_eq!(request.0, response.0);
    }

    #[tokio::test]
    async fn test_service_async() {
        let service =
            service_fn::<_, Response, Infallible>(|Request(val)| async move { Ok::<_, Infallible>(Response(val)) });

        let request = Request(true);
        let response = service.call(request).await.unwrap();

        assert_eq!(request.0, response.0);
    }
}
