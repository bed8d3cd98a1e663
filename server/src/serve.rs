//! Serving entrypoint
//!
//! `serve` wraps a dispatcher into a `Listener`, the fetch surface a host
//! runtime calls once per inbound request. The listener is a
//! `tower_service::Service` so it plugs into any tower-compatible host.

use crate::config::ServeOptions;
use crate::error::{EdgeError, EdgeResult};
use crate::router::{Attempt, Dispatch};
use bytes::Bytes;
use edgehub_core::{Context, RequestFacts};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower_service::Service;
use tracing::{debug, error, warn};

/// What the host should do with a request
#[derive(Debug)]
pub enum FetchOutcome {
    /// Send this response
    Respond(http::Response<Bytes>),
    /// Forward the request to the origin untouched
    PassThrough,
}

impl FetchOutcome {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough)
    }

    /// The response, if the dispatcher produced one
    pub fn into_response(self) -> Option<http::Response<Bytes>> {
        match self {
            Self::Respond(res) => Some(res),
            Self::PassThrough => None,
        }
    }
}

/// Fetch handler installed by `serve`
#[derive(Clone)]
pub struct Listener {
    dispatcher: Arc<dyn Dispatch>,
    options: Arc<ServeOptions>,
}

/// Install `dispatcher` as the fetch handler
pub fn serve<D: Dispatch + 'static>(dispatcher: D, options: ServeOptions) -> Listener {
    let has_error_handler = dispatcher.has_error_handler();

    if options.pass_through_on_exception && has_error_handler {
        warn!(
            "pass_through_on_exception is enabled but a custom error handler is set; \
             the error handler answers faults and requests pass through only when it fails"
        );
    } else if !options.pass_through_on_exception && !has_error_handler {
        warn!(
            "No custom error handler and pass_through_on_exception is disabled; \
             faults answer with the default 500 response"
        );
    }

    Listener {
        dispatcher: Arc::new(dispatcher),
        options: Arc::new(options),
    }
}

impl Listener {
    pub fn options(&self) -> &ServeOptions {
        &self.options
    }

    /// Answer one host request
    pub async fn fetch(&self, request: http::Request<Bytes>) -> EdgeResult<FetchOutcome> {
        match RequestFacts::from_http(request) {
            Ok(facts) => self.fetch_facts(facts).await,
            Err(err) => self.escape(err.into()),
        }
    }

    /// Answer a request that has already been converted
    ///
    /// With `pass_through_on_exception` and no custom error handler, a
    /// fault skips the default 500 and the request goes to the origin.
    pub async fn fetch_facts(&self, facts: RequestFacts) -> EdgeResult<FetchOutcome> {
        let mut ctx = Context::new(facts);

        let result = if self.faults_pass_through() {
            match self.dispatcher.attempt(&mut ctx).await {
                Attempt::Responded(res) | Attempt::Unmatched(res) => Ok(res),
                Attempt::Failed(err) | Attempt::Escaped(err) => Err(err),
            }
        } else {
            self.dispatcher.dispatch(&mut ctx).await
        };

        let res = match result {
            Ok(res) => res,
            Err(err) => return self.escape(err.into()),
        };
        debug!(status = res.status.as_u16(), "Request answered");

        match res.into_http() {
            Ok(res) => Ok(FetchOutcome::Respond(res)),
            Err(err) => self.escape(err.into()),
        }
    }

    fn faults_pass_through(&self) -> bool {
        self.options.pass_through_on_exception && !self.dispatcher.has_error_handler()
    }

    fn escape(&self, err: EdgeError) -> EdgeResult<FetchOutcome> {
        if self.options.pass_through_on_exception {
            warn!(error = %err, "Passing request through to origin");
            Ok(FetchOutcome::PassThrough)
        } else {
            error!(error = %err, "Error escaped dispatcher");
            Err(err)
        }
    }
}

impl Service<http::Request<Bytes>> for Listener {
    type Response = FetchOutcome;
    type Error = EdgeError;
    type Future = BoxFuture<'static, Result<FetchOutcome, EdgeError>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Bytes>) -> Self::Future {
        let listener = self.clone();
        async move { listener.fetch(request).await }.boxed()
    }
}
