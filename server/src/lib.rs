//! # EdgeHub Router
//!
//! Request dispatcher for edge runtimes: method and path routing with
//! middleware, virtual hosts and a fetch entrypoint for the host.
//!
//! ## Features
//! - Ordered middleware and route chains with early exit
//! - Custom not-found, error and before-response hooks
//! - Panics in handlers are caught and answered like errors
//! - Host based dispatch with `*` label captures
//! - Optional pass-through to the origin when an error escapes
//!
//! ## Quick Start
//!
//! ```no_run
//! use edgehub_router::{serve, Context, HandlerResult, Router, ServeOptions};
//!
//! # async fn run(request: http::Request<bytes::Bytes>) -> Result<(), edgehub_router::EdgeError> {
//! let router = Router::new()
//!     .get("/", |ctx: &mut Context| -> HandlerResult {
//!         Ok(ctx.res.text("Hello, World!").end().into())
//!     })
//!     .get("/users/:id", |ctx: &mut Context| -> HandlerResult {
//!         let id = ctx.param("id").unwrap_or("unknown").to_string();
//!         Ok(ctx.res.json(&serde_json::json!({ "id": id }))?.into())
//!     });
//!
//! let listener = serve(router, ServeOptions::default());
//! let outcome = listener.fetch(request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Virtual Hosts
//!
//! ```rust
//! use edgehub_router::{Context, HandlerResult, Router, VHostRouter};
//!
//! let api = Router::new().get("/", |ctx: &mut Context| -> HandlerResult {
//!     let tenant = ctx.vhost().map(|v| v.params[0].clone()).unwrap_or_default();
//!     Ok(ctx.res.text(tenant).end().into())
//! });
//!
//! let vhost = VHostRouter::new().use_host("*.example.com", api);
//! assert_eq!(vhost.resolve("acme.example.com").len(), 1);
//! ```

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod router;
pub mod serve;
pub mod vhost;

pub use config::ServeOptions;
pub use defaults::{InternalError, NotFound, NOT_FOUND_BODY};
pub use error::{EdgeError, EdgeResult};
pub use logging::{init_logging, RequestLogger, RequestStart};
pub use router::{Attempt, BeforeResponse, Dispatch, ErrorHandler, Router};
pub use serve::{serve, FetchOutcome, Listener};
pub use vhost::{HostMatch, HostPattern, VHostRouter};

// Re-export the request and handler primitives from the core crate
pub use edgehub_core::{
    AsyncHandler, BoxedHandler, Context, CookieOptions, CorsMiddleware, CorsOrigin, Handler,
    HandlerError, HandlerOutcome, HandlerResult, Headers, Method, Payload, RequestFacts, Response,
    SameSite, StatusCode, VHostData,
};
