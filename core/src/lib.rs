//! # EdgeHub Core
//!
//! Request context, route table and handler primitives for the EdgeHub
//! edge dispatcher.
//!
//! ## Features
//! - Ordered route table with `:param`, `:param?`, `:param.ext` and `*` patterns
//! - Request facts derived once per request, with a lazy at-most-once body parser
//! - Response accumulator finalized into a single immutable response
//! - Handler trait shared by sync closures, async handlers and middleware
//!
//! ## Example
//! ```rust
//! use edgehub_core::{Method, RouteMatcher, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table.mount("/", vec!["logger"]).unwrap();
//! table.insert(Some(Method::GET), "/users/:id", vec!["get_user"]).unwrap();
//!
//! let found = table.find(Method::GET, "/users/123");
//! assert_eq!(found.handlers, vec![&"logger", &"get_user"]);
//! assert_eq!(found.params.get("id"), Some("123"));
//! ```

pub mod context;
pub mod cookie;
pub mod headers;
pub mod method;
pub mod middleware;
pub mod params;
pub mod pattern;
pub mod query;
pub mod request;
pub mod response;
pub mod route;

pub use context::{Context, Extensions, VHostData};
pub use cookie::{CookieError, CookieOptions, SameSite};
pub use headers::Headers;
pub use method::{ExtensionMethod, Method, UnsupportedMethod};
pub use middleware::{
    AsyncHandler, BoxedHandler, CorsMiddleware, CorsOrigin, Handler, HandlerError,
    HandlerOutcome, HandlerResult,
};
pub use params::{ParamError, Params};
pub use pattern::PathPattern;
pub use query::{Query, QueryValue};
pub use request::{BodyError, ParsedBody, RequestError, RequestFacts};
pub use response::{EndOptions, Payload, Response, ResponseAccumulator, StatusCode};
pub use route::{RouteMatch, RouteMatcher, RouteTable, RouterError};
