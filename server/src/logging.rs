//! Logging setup and request logging middleware

use crate::error::{EdgeError, EdgeResult};
use edgehub_core::{Context, Handler, HandlerOutcome, HandlerResult};
use futures::future::{BoxFuture, FutureExt};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// Fails when `level` is not a valid filter or a subscriber is already set.
pub fn init_logging(level: &str) -> EdgeResult<()> {
    let env_filter = level
        .parse::<EnvFilter>()
        .map_err(|e| EdgeError::Config(format!("Invalid log level '{}': {}", level, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|e| EdgeError::Config(format!("Failed to initialize logging: {}", e)))
}

/// Time the request started, stored in the context extensions
#[derive(Debug, Clone, Copy)]
pub struct RequestStart(pub Instant);

impl RequestStart {
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Middleware logging each request it sees
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger {
    verbose: bool,
}

impl RequestLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at `info` instead of `debug`
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl Handler for RequestLogger {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        let method = ctx.req().method();
        let host = ctx.req().host();
        let path = ctx.req().path();
        if self.verbose {
            info!(%method, host, path, "Request");
        } else {
            debug!(%method, host, path, "Request");
        }

        ctx.extensions.insert(RequestStart(Instant::now()));
        futures::future::ready(Ok(HandlerOutcome::Continue)).boxed()
    }
}
