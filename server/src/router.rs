//! Request dispatch pipeline
//!
//! A `Router` matches the request against its route table, runs the
//! matched handlers in order until one responds, falls back to the
//! not-found handler and passes the terminal response through the
//! before-response hook. Errors and panics anywhere in that chain are
//! turned into a response by the error handler.

use crate::defaults::{InternalError, NotFound};
use edgehub_core::{
    BoxedHandler, Context, Handler, HandlerError, HandlerOutcome, Method, RequestFacts, Response,
    RouteMatch, RouteMatcher, RouteTable, RouterError,
};
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// Turns a handler fault into a response
pub trait ErrorHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        err: HandlerError,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<Response, HandlerError>>;
}

impl<F> ErrorHandler for F
where
    F: Fn(HandlerError, &mut Context) -> Result<Response, HandlerError> + Send + Sync,
{
    fn handle<'a>(
        &'a self,
        err: HandlerError,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<Response, HandlerError>> {
        futures::future::ready(self(err, ctx)).boxed()
    }
}

/// Sees every terminal response; `Some` replaces it
pub trait BeforeResponse: Send + Sync {
    fn call<'a>(
        &'a self,
        ctx: &'a mut Context,
        response: &'a Response,
    ) -> BoxFuture<'a, Result<Option<Response>, HandlerError>>;
}

impl<F> BeforeResponse for F
where
    F: Fn(&mut Context, &Response) -> Result<Option<Response>, HandlerError> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        ctx: &'a mut Context,
        response: &'a Response,
    ) -> BoxFuture<'a, Result<Option<Response>, HandlerError>> {
        futures::future::ready(self(ctx, response)).boxed()
    }
}

/// Outcome of one pass through a dispatcher
#[derive(Debug)]
pub enum Attempt {
    /// A handler or an explicitly configured not-found handler responded
    Responded(Response),
    /// Nothing responded except the default not-found handler
    Unmatched(Response),
    /// The chain failed; the error handler has not run yet
    Failed(HandlerError),
    /// An error handler failed; nothing can answer this request
    Escaped(HandlerError),
}

/// Anything that can answer a request context
pub trait Dispatch: Send + Sync {
    /// Run the chain once without recovering faults
    fn attempt<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Attempt>;

    /// Answer a fault with this dispatcher's error handler
    fn recover<'a>(
        &'a self,
        err: HandlerError,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<Response, HandlerError>>;

    /// Whether a custom error handler is configured
    fn has_error_handler(&self) -> bool;

    /// Produce the terminal response, recovering faults
    ///
    /// `Err` means the error handler itself failed.
    fn dispatch<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Response, HandlerError>> {
        async move {
            match self.attempt(ctx).await {
                Attempt::Responded(res) | Attempt::Unmatched(res) => Ok(res),
                Attempt::Failed(err) => self.recover(err, ctx).await,
                Attempt::Escaped(err) => Err(err),
            }
        }
        .boxed()
    }
}

/// Method + path dispatcher with middleware, not-found, error and
/// before-response hooks
pub struct Router<M = RouteTable<BoxedHandler>> {
    matcher: M,
    not_found: Option<BoxedHandler>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    before_response: Option<Arc<dyn BeforeResponse>>,
}

impl Router {
    /// Create a router backed by the default route table
    pub fn new() -> Self {
        Self::with_matcher(RouteTable::new())
    }

    /// Add middleware for every request
    pub fn use_middleware<H>(self, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.use_at("/", handler)
    }

    /// Add middleware for `path` and everything below it
    pub fn use_at<H>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.try_use(path, vec![Arc::new(handler) as BoxedHandler])
            .unwrap_or_else(|e| panic!("Failed to mount middleware at '{}': {}", path, e));
        self
    }

    /// Add a GET route (also answers HEAD)
    pub fn get<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Some(Method::GET), path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add a POST route
    pub fn post<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Some(Method::POST), path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add a PUT route
    pub fn put<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Some(Method::PUT), path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add a PATCH route
    pub fn patch<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Some(Method::PATCH), path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add a DELETE route
    pub fn delete<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Some(Method::DELETE), path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add a HEAD route
    pub fn head<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Some(Method::HEAD), path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add an OPTIONS route
    pub fn options<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Some(Method::OPTIONS), path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add a route for every method
    pub fn all<H: Handler + 'static>(self, path: &str, handler: H) -> Self {
        self.route(None, path, vec![Arc::new(handler) as BoxedHandler])
    }

    /// Add a handler chain; `None` matches every method
    ///
    /// # Panics
    /// Panics when `path` is not a valid pattern.
    pub fn route(mut self, method: Option<Method>, path: &str, handlers: Vec<BoxedHandler>) -> Self {
        self.try_route(method, path, handlers).unwrap_or_else(|e| {
            let method = method.as_ref().map_or("ALL", Method::as_str);
            panic!("Failed to register {} route '{}': {}", method, path, e)
        });
        self
    }

    /// Add a handler chain, reporting invalid patterns
    pub fn try_route(
        &mut self,
        method: Option<Method>,
        path: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<(), RouterError> {
        self.matcher.insert(method, path, handlers)
    }

    /// Mount middleware, reporting invalid patterns
    pub fn try_use(&mut self, path: &str, handlers: Vec<BoxedHandler>) -> Result<(), RouterError> {
        self.matcher.mount(path, handlers)
    }

    /// Registered routes
    pub fn table(&self) -> &RouteTable<BoxedHandler> {
        &self.matcher
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RouteMatcher<BoxedHandler>> Router<M> {
    /// Create a router over any route matcher
    pub fn with_matcher(matcher: M) -> Self {
        Self {
            matcher,
            not_found: None,
            error_handler: None,
            before_response: None,
        }
    }

    /// Handler run when no route responded
    pub fn on_no_match<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Handler turning faults into responses
    pub fn on_error<E: ErrorHandler + 'static>(mut self, handler: E) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Hook run on every terminal response
    pub fn on_before_response<B: BeforeResponse + 'static>(mut self, hook: B) -> Self {
        self.before_response = Some(Arc::new(hook));
        self
    }

    /// Whether a custom not-found handler is configured
    pub fn has_not_found_handler(&self) -> bool {
        self.not_found.is_some()
    }

    /// Answer one request
    ///
    /// `Err` is returned only when the error handler itself fails.
    pub async fn handle(&self, req: RequestFacts) -> Result<Response, HandlerError> {
        let mut ctx = Context::new(req);
        self.dispatch(&mut ctx).await
    }

    async fn run_chain(&self, ctx: &mut Context) -> Result<Attempt, HandlerError> {
        let RouteMatch { handlers, params } = self.matcher.find(ctx.req().method(), ctx.req().path());
        debug!(
            method = %ctx.req().method(),
            path = ctx.req().path(),
            handlers = handlers.len(),
            "Dispatching request"
        );
        ctx.bind_params(params);

        for handler in handlers {
            if let HandlerOutcome::Respond(res) = handler.call(ctx).await? {
                return self.finish(ctx, res).await.map(Attempt::Responded);
            }
        }

        match &self.not_found {
            Some(handler) => {
                let res = match handler.call(ctx).await? {
                    HandlerOutcome::Respond(res) => res,
                    HandlerOutcome::Continue => ctx.res.end(),
                };
                self.finish(ctx, res).await.map(Attempt::Responded)
            }
            None => {
                let res = NotFound::respond(ctx);
                self.finish(ctx, res).await.map(Attempt::Unmatched)
            }
        }
    }

    async fn finish(&self, ctx: &mut Context, res: Response) -> Result<Response, HandlerError> {
        let Some(hook) = &self.before_response else {
            return Ok(res);
        };
        let replacement = hook.call(ctx, &res).await?;
        Ok(replacement.unwrap_or(res))
    }
}

impl<M: RouteMatcher<BoxedHandler>> Dispatch for Router<M> {
    fn attempt<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Attempt> {
        async move {
            ctx.reset_response();
            match guarded(self.run_chain(ctx)).await {
                Ok(attempt) => attempt,
                Err(err) => Attempt::Failed(err),
            }
        }
        .boxed()
    }

    fn recover<'a>(
        &'a self,
        err: HandlerError,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<Response, HandlerError>> {
        recover_with(self.error_handler.as_deref(), err, ctx).boxed()
    }

    fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }
}

/// Run `handler`, or the default 500 handler, on a fault
pub(crate) async fn recover_with(
    handler: Option<&dyn ErrorHandler>,
    err: HandlerError,
    ctx: &mut Context,
) -> Result<Response, HandlerError> {
    error!(
        error = %err,
        method = %ctx.req().method(),
        path = ctx.req().path(),
        "Request handler failed"
    );
    let handler = handler.unwrap_or(&InternalError);
    guarded(async move { handler.handle(err, ctx).await }).await
}

/// Await `fut`, converting a panic into `HandlerError::Panic`
pub(crate) async fn guarded<T, F>(fut: F) -> Result<T, HandlerError>
where
    F: Future<Output = Result<T, HandlerError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(HandlerError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
