pub(crate) trait Service<Request> {
    type Response;
    type Error;

    // `Result<Response, Error>` for sync services, a future resolving to it for async ones.
    type Output;

    fn call(&self, request: Request) -> Self::Output;
}

impl<S, Request> Service<Request> for &S
where
    S: Service<Request> + ?Sized,
{
    type Response = S::Response;
    type Error = S::Error;
    type Output = S::Output;

    #[inline]
    fn call(&self, request: Request) -> Self::Output {
        (**self).call(request)
    }
}
