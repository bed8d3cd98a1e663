use bytes::Bytes;
use edgehub_router::{
    serve, AsyncHandler, Context, CookieOptions, EdgeError, FetchOutcome, HandlerError,
    HandlerOutcome, HandlerResult, Listener, Response, Router, ServeOptions, StatusCode,
    VHostRouter, NOT_FOUND_BODY,
};
use futures::future::FutureExt;
use serde_json::{json, Value};

fn request(method: &str, uri: &str) -> http::Request<Bytes> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

fn logging_middleware(ctx: &mut Context) -> HandlerResult {
    ctx.res.set_header("x-request-logged", "1");
    Ok(HandlerOutcome::Continue)
}

fn posts_router() -> Router {
    Router::new()
        .use_middleware(logging_middleware)
        .get("/posts", |ctx: &mut Context| -> HandlerResult {
            Ok(ctx.res.json(&json!([{ "id": 1, "title": "Hello" }]))?.into())
        })
        .post(
            "/posts",
            AsyncHandler::new(|ctx| {
                async move {
                    let title = match ctx.req().body().await? {
                        Some(body) => body.to_json()["title"].as_str().map(str::to_string),
                        None => return Err(HandlerError::from("Request body is required")),
                    };
                    let title = title.ok_or("title is required")?;
                    Ok(ctx
                        .res
                        .status(StatusCode::CREATED)
                        .json(&json!({ "title": title }))?
                        .into())
                }
                .boxed()
            }),
        )
}

async fn fetch(listener: &Listener, req: http::Request<Bytes>) -> http::Response<Bytes> {
    match listener.fetch(req).await.unwrap() {
        FetchOutcome::Respond(res) => res,
        FetchOutcome::PassThrough => panic!("expected a response"),
    }
}

#[tokio::test]
async fn test_vhost_resolves_wildcard_capture() {
    let vhost = VHostRouter::new().use_host(
        "*.example.com",
        Router::new().get("/", |ctx: &mut Context| -> HandlerResult {
            let params = ctx.vhost().map(|v| v.params.clone()).unwrap_or_default();
            Ok(ctx.res.json(&params)?.into())
        }),
    );

    let found = vhost.resolve("api.example.com");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].data.params, vec!["api".to_string()]);

    let listener = serve(vhost, ServeOptions::default());
    let res = fetch(&listener, request("GET", "https://api.example.com/")).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(res.body().as_ref(), br#"["api"]"#);
}

#[tokio::test]
async fn test_middleware_side_effects_reach_final_response() {
    let listener = serve(posts_router(), ServeOptions::default());
    let res = fetch(&listener, request("GET", "https://blog.test/posts")).await;

    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(res.headers()["x-request-logged"], "1");
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body, json!([{ "id": 1, "title": "Hello" }]));
}

#[tokio::test]
async fn test_missing_body_runs_error_handler() {
    let listener = serve(posts_router(), ServeOptions::default());
    let res = fetch(&listener, request("POST", "https://blog.test/posts")).await;

    assert_eq!(res.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body().as_ref(), b"Request body is required");
}

#[tokio::test]
async fn test_json_body_creates_post() {
    let listener = serve(posts_router(), ServeOptions::default());
    let req = http::Request::builder()
        .method("POST")
        .uri("https://blog.test/posts")
        .header("content-type", "application/json; charset=utf-8")
        .body(Bytes::from_static(br#"{"title":"Edge routing"}"#))
        .unwrap();

    let res = fetch(&listener, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["title"], "Edge routing");
}

#[tokio::test]
async fn test_unregistered_path_gets_default_not_found() {
    let listener = serve(posts_router(), ServeOptions::default());
    let res = fetch(&listener, request("GET", "https://blog.test/nope")).await;

    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
    assert_eq!(res.body().as_ref(), NOT_FOUND_BODY.as_bytes());
}

#[tokio::test]
async fn test_origin_form_request_uses_host_header() {
    let listener = serve(
        Router::new().get("/where", |ctx: &mut Context| -> HandlerResult {
            let url = ctx.req().url().to_string();
            Ok(ctx.res.text(url).end().into())
        }),
        ServeOptions::default(),
    );
    let req = http::Request::builder()
        .uri("/where?x=1")
        .header("host", "edge.test")
        .header("x-forwarded-proto", "https")
        .body(Bytes::new())
        .unwrap();

    let res = fetch(&listener, req).await;
    assert_eq!(res.body().as_ref(), b"https://edge.test/where?x=1");
}

#[tokio::test]
async fn test_each_cookie_is_its_own_header_line() {
    let router = Router::new().get("/login", |ctx: &mut Context| -> HandlerResult {
        ctx.res
            .set_cookie("session", "abc", CookieOptions::new().http_only())?
            .set_cookie("theme", "dark", CookieOptions::new())?;
        Ok(ctx.res.send_status(StatusCode::NO_CONTENT).into())
    });
    let listener = serve(router, ServeOptions::default());
    let res = fetch(&listener, request("GET", "https://edge.test/login")).await;

    let cookies: Vec<_> = res
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("session=abc"));
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[1].starts_with("theme=dark"));
}

#[tokio::test]
async fn test_failing_error_handler_passes_through_when_enabled() {
    let failing = || {
        Router::new()
            .get("/", |_: &mut Context| -> HandlerResult { Err("upstream broke".into()) })
            .on_error(|_: HandlerError, _: &mut Context| -> Result<Response, HandlerError> {
                panic!("error handler crashed")
            })
    };

    let listener = serve(failing(), ServeOptions::new().pass_through_on_exception(true));
    let outcome = listener.fetch(request("GET", "https://edge.test/")).await.unwrap();
    assert!(outcome.is_pass_through());

    let listener = serve(failing(), ServeOptions::default());
    let err = listener.fetch(request("GET", "https://edge.test/")).await.unwrap_err();
    assert!(matches!(err, EdgeError::Handler(HandlerError::Panic(_))));
}

#[tokio::test]
async fn test_fault_passes_through_without_error_handler() {
    let vhost = VHostRouter::new()
        .use_host(
            "api.example.com",
            Router::new().get("/", |_: &mut Context| -> HandlerResult { Err("api down".into()) }),
        )
        .use_host(
            "www.example.com",
            Router::new()
                .get("/", |_: &mut Context| -> HandlerResult { Err("www down".into()) })
                .on_error(|_: HandlerError, ctx: &mut Context| -> Result<Response, HandlerError> {
                    Ok(ctx.res.status(StatusCode::SERVICE_UNAVAILABLE).send("maintenance"))
                }),
        );
    let listener = serve(vhost, ServeOptions::new().pass_through_on_exception(true));

    let outcome = listener.fetch(request("GET", "https://api.example.com/")).await.unwrap();
    assert!(outcome.is_pass_through());

    let res = fetch(&listener, request("GET", "https://www.example.com/")).await;
    assert_eq!(res.status(), http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body().as_ref(), b"maintenance");
}

#[tokio::test]
async fn test_extension_method_is_dispatched() {
    let router = Router::new().all("/cache/*", |ctx: &mut Context| -> HandlerResult {
        let body = format!("{} {}", ctx.req().method(), ctx.param("wild").unwrap_or_default());
        Ok(ctx.res.text(body).end().into())
    });
    let listener = serve(router, ServeOptions::default());

    let res = fetch(&listener, request("PURGE", "https://edge.test/cache/img/logo.png")).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(res.body().as_ref(), b"PURGE img/logo.png");

    let res = fetch(&listener, request("PURGE", "https://edge.test/other")).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cookie_values_round_trip() {
    let router = Router::new()
        .get("/set", |ctx: &mut Context| -> HandlerResult {
            ctx.res.set_cookie("greeting", "hello world; ça va", CookieOptions::new())?;
            Ok(ctx.res.send_status(StatusCode::NO_CONTENT).into())
        })
        .get("/read", |ctx: &mut Context| -> HandlerResult {
            let greeting = ctx.req().cookie("greeting").unwrap_or_default().to_string();
            Ok(ctx.res.text(greeting).end().into())
        });
    let listener = serve(router, ServeOptions::default());

    let res = fetch(&listener, request("GET", "https://edge.test/set")).await;
    let line = res.headers()["set-cookie"].to_str().unwrap().to_string();
    assert_eq!(line, "greeting=hello%20world%3B%20%C3%A7a%20va");

    let req = http::Request::builder()
        .uri("https://edge.test/read")
        .header("cookie", line.as_str())
        .body(Bytes::new())
        .unwrap();
    let res = fetch(&listener, req).await;
    assert_eq!(res.body().as_ref(), "hello world; ça va".as_bytes());
}
