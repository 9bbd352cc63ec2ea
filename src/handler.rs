/// A function called by [`crate::SyncContext::execute`] with its extractor arguments resolved.
///
/// Implemented for every `FnOnce` whose arguments implement [`crate::DependencyResolver`].
/// Explicit arguments are passed by capturing them in the closure.
pub trait Handler<Deps>: Send + Sized {
    type Output;

    fn call(self, deps: Deps) -> Self::Output;
}

macro_rules! impl_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Response + Send,
        {
            type Output = Response;

            #[inline]
            fn call(self, ($($ty,)*): ($($ty,)*)) -> Self::Output {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_handler);
