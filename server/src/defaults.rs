//! Default not-found and error handlers

use crate::router::ErrorHandler;
use edgehub_core::{Context, Handler, HandlerError, HandlerOutcome, HandlerResult, Response, StatusCode};
use futures::future::{BoxFuture, FutureExt};

pub const NOT_FOUND_BODY: &str = "404 - Resource not found";

/// Answers `404` with a fixed plain-text body
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl NotFound {
    pub fn respond(ctx: &mut Context) -> Response {
        ctx.res.status(StatusCode::NOT_FOUND).text(NOT_FOUND_BODY).end()
    }
}

impl Handler for NotFound {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        futures::future::ready(Ok(HandlerOutcome::Respond(Self::respond(ctx)))).boxed()
    }
}

/// Answers `500` with the error message as plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalError;

impl ErrorHandler for InternalError {
    fn handle<'a>(
        &'a self,
        err: HandlerError,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<Response, HandlerError>> {
        let response = ctx
            .res
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .text(err.to_string())
            .end();
        futures::future::ready(Ok(response)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use edgehub_core::{Headers, Method, RequestFacts};

    fn context() -> Context {
        let req = RequestFacts::new(Method::GET, "http://example.com/nope", Headers::new(), Bytes::new())
            .unwrap();
        Context::new(req)
    }

    #[tokio::test]
    async fn test_not_found_default() {
        let mut ctx = context();
        match NotFound.call(&mut ctx).await.unwrap() {
            HandlerOutcome::Respond(res) => {
                assert_eq!(res.status, StatusCode::NOT_FOUND);
                assert_eq!(res.text(), NOT_FOUND_BODY);
                assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
            }
            HandlerOutcome::Continue => panic!("not-found must respond"),
        }
    }

    #[tokio::test]
    async fn test_internal_error_default() {
        let mut ctx = context();
        let res = InternalError
            .handle(HandlerError::from("database unavailable"), &mut ctx)
            .await
            .unwrap();

        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.text(), "database unavailable");
    }
}
