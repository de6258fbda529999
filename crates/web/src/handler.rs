//! Handler traits and the async-fn adapter.
//!
//! A plain route points at a [`RouteHandler`]: it receives the parsed
//! [`Request`] and drives the [`ResponseWriter`] itself. `handler_fn`
//! adapts an ordinary `async fn(Request, &mut ResponseWriter) ->
//! HandlerResult` into that trait; the [`HandlerFn`] helper trait exists
//! only to tie the borrowed writer's lifetime to the returned future.

use std::error::Error;
use std::future::Future;

use femto_http::connection::ResponseWriter;
use futures::future::BoxFuture;

use crate::request::Request;

/// Whatever a handler fails with; converted to a 500 at the connection
/// boundary, never allowed to take the server down.
pub type HandlerError = Box<dyn Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// An object-safe request handler.
pub trait RouteHandler: Send + Sync {
    fn handle<'a>(&'a self, request: Request, response: &'a mut ResponseWriter) -> BoxFuture<'a, HandlerResult>;
}

/// Helper trait over the writer borrow's lifetime, so that plain async
/// functions satisfy [`RouteHandler`] through [`FnHandler`].
pub trait HandlerFn<'a>: Send + Sync {
    type Fut: Future<Output = HandlerResult> + Send + 'a;

    fn call(&self, request: Request, response: &'a mut ResponseWriter) -> Self::Fut;
}

impl<'a, F, Fut> HandlerFn<'a> for F
where
    F: Fn(Request, &'a mut ResponseWriter) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'a,
{
    type Fut = Fut;

    fn call(&self, request: Request, response: &'a mut ResponseWriter) -> Self::Fut {
        (self)(request, response)
    }
}

/// A [`RouteHandler`] backed by an async function.
pub struct FnHandler<F> {
    f: F,
}

impl<F> RouteHandler for FnHandler<F>
where
    F: for<'a> HandlerFn<'a>,
{
    fn handle<'a>(&'a self, request: Request, response: &'a mut ResponseWriter) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.f.call(request, response))
    }
}

/// Wraps an async function as a route handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> HandlerFn<'a>,
{
    FnHandler { f }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_is_handler<T: RouteHandler>(_handler: &T) {
        // no op
    }

    #[test]
    fn plain_async_fn_is_a_handler() {
        async fn index(_request: Request, response: &mut ResponseWriter) -> HandlerResult {
            response.send("hello").await?;
            Ok(())
        }

        let handler = handler_fn(index);
        assert_is_handler(&handler);
    }

    #[test]
    fn bodyless_async_fn_is_a_handler() {
        async fn nothing(_request: Request, _response: &mut ResponseWriter) -> HandlerResult {
            Ok(())
        }

        assert_is_handler(&handler_fn(nothing));
    }
}
