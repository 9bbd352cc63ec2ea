//! The active resolution context of the current thread or task.
//!
//! A [`SyncContext`] is made active with [`SyncContext::enter`] for the current thread,
//! a [`Context`] with [`Context::scope`] for the awaited future.
//! Contexts are never shared between threads or tasks through this module.

use std::{cell::RefCell, marker::PhantomData};
#[cfg(feature = "async")]
use std::future::Future;

#[cfg(feature = "async")]
use crate::async_impl::context::Context;
use crate::{context::SyncContext, dependency_resolver::DependencyResolver, errors::ResolveErrorKind, handler::Handler};

thread_local! {
    static CURRENT_SYNC: RefCell<Vec<SyncContext>> = const { RefCell::new(Vec::new()) };
}

#[cfg(feature = "async")]
tokio::task_local! {
    static CURRENT: Context;
}

/// Keeps a [`SyncContext`] active on the current thread, the previously active one is restored on drop.
#[must_use = "the context is deactivated when the guard is dropped"]
pub struct CurrentGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT_SYNC.with_borrow_mut(|contexts| {
            contexts.pop();
        });
    }
}

pub(crate) fn enter_sync(context: SyncContext) -> CurrentGuard {
    CURRENT_SYNC.with_borrow_mut(|contexts| contexts.push(context));
    CurrentGuard { _not_send: PhantomData }
}

#[must_use]
pub fn current_sync() -> Option<SyncContext> {
    CURRENT_SYNC.with_borrow(|contexts| contexts.last().cloned())
}

/// Calls the handler through the active [`SyncContext`] of the current thread.
///
/// # Errors
/// - Returns [`ResolveErrorKind::NoActiveContext`] if no context is active
/// - Returns an error if one of the arguments can't be resolved, see [`SyncContext::execute`]
pub fn inject_sync<H, Deps>(handler: H) -> Result<H::Output, ResolveErrorKind>
where
    H: Handler<Deps>,
    Deps: DependencyResolver,
{
    current_sync().ok_or(ResolveErrorKind::NoActiveContext)?.execute(handler)
}

#[cfg(feature = "async")]
pub(crate) async fn scope<Fut: Future>(context: Context, future: Fut) -> Fut::Output {
    CURRENT.scope(context, future).await
}

#[cfg(feature = "async")]
#[must_use]
pub fn current() -> Option<Context> {
    CURRENT.try_with(Context::clone).ok()
}

/// Calls the handler through the active [`Context`] of the current task and awaits its future.
///
/// # Errors
/// - Returns [`ResolveErrorKind::NoActiveContext`] if no context is active
/// - Returns an error if one of the arguments can't be resolved, see [`Context::execute_async`]
#[cfg(feature = "async")]
pub async fn inject<H, Deps, Fut>(handler: H) -> Result<Fut::Output, ResolveErrorKind>
where
    H: Handler<Deps, Output = Fut>,
    Deps: DependencyResolver,
    Fut: Future,
{
    let context = current().ok_or(ResolveErrorKind::NoActiveContext)?;
    context.execute_async(handler).await
}
