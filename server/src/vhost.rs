//! Virtual host dispatch
//!
//! Host patterns are literal host names where `*` stands for one label
//! (`*.example.com`). Every registration whose pattern matches the
//! request host is a candidate; candidates are tried in registration
//! order until one of them actually answers.

use crate::defaults::NotFound;
use crate::error::{EdgeError, EdgeResult};
use crate::router::{guarded, recover_with, Attempt, Dispatch, ErrorHandler};
use edgehub_core::{
    BoxedHandler, Context, Handler, HandlerError, HandlerOutcome, RequestFacts, Response, VHostData,
};
use futures::future::{BoxFuture, FutureExt};
use regex_lite::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::debug;

const LABEL_CAPTURE: &str = "([^.]+)";

/// Compiled, anchored, case-insensitive host pattern
#[derive(Debug, Clone)]
pub struct HostPattern {
    regex: Regex,
}

impl HostPattern {
    /// Compile a host pattern where each `*` captures one label
    pub fn compile(pattern: &str) -> EdgeResult<Self> {
        let source = pattern
            .split('*')
            .map(regex_lite::escape)
            .collect::<Vec<_>>()
            .join(LABEL_CAPTURE);
        Self::anchored(source)
    }

    /// Use a pre-built expression, adding anchors when missing
    pub fn from_regex(regex: &Regex) -> EdgeResult<Self> {
        Self::anchored(regex.as_str().to_string())
    }

    fn anchored(mut source: String) -> EdgeResult<Self> {
        if !source.starts_with('^') {
            source.insert(0, '^');
        }
        if !ends_with_unescaped_dollar(&source) {
            source.push('$');
        }

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| EdgeError::HostPattern(format!("{}: {}", source, e)))?;
        Ok(Self { regex })
    }

    /// Anchored expression source
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Positional captures when `host` matches; unmatched groups are empty
    pub fn captures(&self, host: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(host)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

fn ends_with_unescaped_dollar(source: &str) -> bool {
    let Some(rest) = source.strip_suffix('$') else {
        return false;
    };
    let backslashes = rest.bytes().rev().take_while(|&b| b == b'\\').count();
    backslashes % 2 == 0
}

/// A registration whose pattern matched the request host
pub struct HostMatch<'a> {
    pub router: &'a Arc<dyn Dispatch>,
    pub data: VHostData,
}

/// Dispatcher selecting sub-routers by request host
pub struct VHostRouter {
    hosts: Vec<(HostPattern, Arc<dyn Dispatch>)>,
    not_found: Option<BoxedHandler>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl VHostRouter {
    pub fn new() -> Self {
        Self {
            hosts: Vec::new(),
            not_found: None,
            error_handler: None,
        }
    }

    /// Register `router` for hosts matching `pattern`
    ///
    /// # Panics
    /// Panics when the pattern does not compile.
    pub fn use_host<D: Dispatch + 'static>(mut self, pattern: &str, router: D) -> Self {
        self.try_use_host(pattern, router)
            .unwrap_or_else(|e| panic!("Failed to register host '{}': {}", pattern, e));
        self
    }

    /// Register `router` for hosts matching `pattern`, reporting bad patterns
    pub fn try_use_host<D: Dispatch + 'static>(&mut self, pattern: &str, router: D) -> EdgeResult<()> {
        let pattern = HostPattern::compile(pattern)?;
        self.hosts.push((pattern, Arc::new(router)));
        Ok(())
    }

    /// Register `router` for hosts matching a pre-built expression
    ///
    /// # Panics
    /// Panics when the anchored expression does not compile.
    pub fn use_regex<D: Dispatch + 'static>(mut self, regex: &Regex, router: D) -> Self {
        self.try_use_regex(regex, router)
            .unwrap_or_else(|e| panic!("Failed to register host '{}': {}", regex.as_str(), e));
        self
    }

    /// Register `router` for a pre-built expression, reporting failures
    pub fn try_use_regex<D: Dispatch + 'static>(&mut self, regex: &Regex, router: D) -> EdgeResult<()> {
        let pattern = HostPattern::from_regex(regex)?;
        self.hosts.push((pattern, Arc::new(router)));
        Ok(())
    }

    /// Handler run when no candidate answered
    pub fn on_no_match<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Error handler for candidates without their own
    pub fn on_error<E: ErrorHandler + 'static>(mut self, handler: E) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Every registration matching `host`, in registration order
    pub fn resolve(&self, host: &str) -> Vec<HostMatch<'_>> {
        self.hosts
            .iter()
            .filter_map(|(pattern, router)| {
                pattern.captures(host).map(|params| HostMatch {
                    router,
                    data: VHostData {
                        host: host.to_string(),
                        params,
                    },
                })
            })
            .collect()
    }

    /// Answer one request
    pub async fn handle(&self, req: RequestFacts) -> Result<Response, HandlerError> {
        let mut ctx = Context::new(req);
        self.dispatch(&mut ctx).await
    }

    async fn run(&self, ctx: &mut Context) -> Attempt {
        let host = ctx.req().host().to_string();

        for candidate in self.resolve(&host) {
            ctx.set_vhost(Some(candidate.data));
            match candidate.router.attempt(ctx).await {
                Attempt::Unmatched(_) => {
                    debug!(host = %host, "Virtual host candidate did not answer");
                }
                Attempt::Failed(err) if candidate.router.has_error_handler() => {
                    return match candidate.router.recover(err, ctx).await {
                        Ok(res) => Attempt::Responded(res),
                        Err(err) => Attempt::Escaped(err),
                    };
                }
                attempt => return attempt,
            }
        }

        ctx.set_vhost(None);
        ctx.reset_response();
        match &self.not_found {
            Some(handler) => match guarded(async { handler.call(ctx).await }).await {
                Ok(HandlerOutcome::Respond(res)) => Attempt::Responded(res),
                Ok(HandlerOutcome::Continue) => Attempt::Responded(ctx.res.end()),
                Err(err) => Attempt::Failed(err),
            },
            None => Attempt::Unmatched(NotFound::respond(ctx)),
        }
    }
}

impl Default for VHostRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatch for VHostRouter {
    fn attempt<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Attempt> {
        self.run(ctx).boxed()
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
