//! Handler trait, flow control and built-in middleware
//!
//! Route handlers and middleware share one shape: they receive the
//! request context and either let the chain continue or finish it with
//! a response.

use crate::context::Context;
use crate::cookie::CookieError;
use crate::method::Method;
use crate::params::ParamError;
use crate::request::{BodyError, RequestFacts};
use crate::response::{Response, StatusCode};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

/// Handler result indicating flow control
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Continue to next handler
    Continue,
    /// Stop processing and return response
    Respond(Response),
}

impl From<Response> for HandlerOutcome {
    fn from(response: Response) -> Self {
        HandlerOutcome::Respond(response)
    }
}

pub type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// Request handler or middleware
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

/// Shared handler as stored in routers
pub type BoxedHandler = Arc<dyn Handler>;

/// Synchronous closures are handlers
impl<F> Handler for F
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        futures::future::ready(self(ctx)).boxed()
    }
}

/// Handler backed by a closure returning a boxed future
///
/// ```rust
/// use edgehub_core::{AsyncHandler, HandlerOutcome};
/// use futures::FutureExt;
///
/// let handler = AsyncHandler::new(|ctx| {
///     async move {
///         let has_body = ctx.req().body().await?.is_some();
///         Ok(HandlerOutcome::Respond(ctx.res.send(has_body)))
///     }
///     .boxed()
/// });
/// # let _ = handler;
/// ```
pub struct AsyncHandler<F> {
    func: F,
}

impl<F> AsyncHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Handler for AsyncHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self.func)(ctx)
    }
}

/// Failure raised by a handler
///
/// The `Display` output is the bare message, which the default error
/// handler sends as the response body.
#[derive(Debug)]
pub enum HandlerError {
    /// Free-form message
    Message(String),
    /// Request body could not be parsed
    Body(BodyError),
    /// Cookie rejected at `set_cookie`
    Cookie(CookieError),
    /// Route parameter missing or malformed
    Param(ParamError),
    /// JSON serialization failed
    Json(serde_json::Error),
    /// Handler panicked
    Panic(String),
    /// Any other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Wrap an arbitrary error
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Other(Box::new(err))
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Message(msg) => f.write_str(msg),
            HandlerError::Body(err) => write!(f, "{}", err),
            HandlerError::Cookie(err) => write!(f, "{}", err),
            HandlerError::Param(err) => write!(f, "{}", err),
            HandlerError::Json(err) => write!(f, "{}", err),
            HandlerError::Panic(msg) => write!(f, "Handler panicked: {}", msg),
            HandlerError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        HandlerError::Message(msg)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        HandlerError::Message(msg.to_string())
    }
}

impl From<BodyError> for HandlerError {
    fn from(err: BodyError) -> Self {
        HandlerError::Body(err)
    }
}

impl From<CookieError> for HandlerError {
    fn from(err: CookieError) -> Self {
        HandlerError::Cookie(err)
    }
}

impl From<ParamError> for HandlerError {
    fn from(err: ParamError) -> Self {
        HandlerError::Param(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Json(err)
    }
}

/// Computes the allowed origin for a request; `None` omits the header
pub type OriginFn = Arc<dyn Fn(&RequestFacts) -> Option<String> + Send + Sync>;

/// `Access-Control-Allow-Origin` policy
#[derive(Clone)]
pub enum CorsOrigin {
    /// `*`
    Any,
    /// A fixed origin
    Exact(String),
    /// Never emit the header
    Disabled,
    /// Computed per request
    Dynamic(OriginFn),
}

impl fmt::Debug for CorsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsOrigin::Any => f.write_str("Any"),
            CorsOrigin::Exact(origin) => f.debug_tuple("Exact").field(origin).finish(),
            CorsOrigin::Disabled => f.write_str("Disabled"),
            CorsOrigin::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Built-in CORS middleware
///
/// Adds the CORS response headers and lets the chain continue. Preflight
/// (`OPTIONS`) requests additionally get the allow-methods, allow-headers
/// and max-age headers.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    origin: CorsOrigin,
    methods: Vec<Method>,
    headers: Vec<String>,
    expose_headers: Vec<String>,
    credentials: bool,
    max_age: u64,
    terminate_preflight: bool,
}

impl CorsMiddleware {
    /// Create permissive CORS middleware
    pub fn permissive() -> Self {
        Self {
            origin: CorsOrigin::Any,
            methods: vec![
                Method::POST,
                Method::GET,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            headers: [
                "X-Requested-With",
                "Access-Control-Allow-Origin",
                "X-HTTP-Method-Override",
                "Content-Type",
                "Authorization",
                "Accept",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            expose_headers: Vec::new(),
            credentials: true,
            max_age: 86400,
            terminate_preflight: false,
        }
    }

    /// Create CORS middleware allowing one fixed origin
    pub fn with_origin<S: Into<String>>(origin: S) -> Self {
        Self::permissive().origin(CorsOrigin::Exact(origin.into()))
    }

    pub fn origin(mut self, origin: CorsOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Compute the allowed origin from the request
    pub fn origin_fn<F>(self, func: F) -> Self
    where
        F: Fn(&RequestFacts) -> Option<String> + Send + Sync + 'static,
    {
        self.origin(CorsOrigin::Dynamic(Arc::new(func)))
    }

    pub fn methods<I: IntoIterator<Item = Method>>(mut self, methods: I) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expose_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn credentials(mut self, enabled: bool) -> Self {
        self.credentials = enabled;
        self
    }

    /// Preflight cache lifetime in seconds
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Answer preflight requests with `204` instead of continuing
    pub fn terminate_preflight(mut self, enabled: bool) -> Self {
        self.terminate_preflight = enabled;
        self
    }

    fn apply(&self, ctx: &mut Context) -> HandlerOutcome {
        let origin = match &self.origin {
            CorsOrigin::Any => Some("*".to_string()),
            CorsOrigin::Exact(origin) => Some(origin.clone()),
            CorsOrigin::Disabled => None,
            CorsOrigin::Dynamic(func) => func(ctx.req()),
        };
        if let Some(origin) = origin {
            ctx.res.set_header("Access-Control-Allow-Origin", origin);
        }
        if self.credentials {
            ctx.res.set_header("Access-Control-Allow-Credentials", "true");
        }
        if !self.expose_headers.is_empty() {
            ctx.res
                .set_header_list("Access-Control-Expose-Headers", &self.expose_headers);
        }

        if ctx.req().method() != Method::OPTIONS {
            return HandlerOutcome::Continue;
        }

        let methods: Vec<&str> = self.methods.iter().map(|m| m.as_str()).collect();
        ctx.res
            .set_header_list("Access-Control-Allow-Methods", &methods)
            .set_header_list("Access-Control-Allow-Headers", &self.headers)
            .set_header("Access-Control-Max-Age", self.max_age.to_string());

        if self.terminate_preflight {
            HandlerOutcome::Respond(ctx.res.send_status(StatusCode::NO_CONTENT))
        } else {
            HandlerOutcome::Continue
        }
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::permissive()
    }
}

impl Handler for CorsMiddleware {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        futures::future::ready(Ok(self.apply(ctx))).boxed()
    }
}
