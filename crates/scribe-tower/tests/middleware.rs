use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use proptest::prelude::*;
use scribe_core::{CorrelationId, LogConfig, LogLevel, SkipRule, TargetType, BODY_LIMIT_MARKER};
use scribe_testing::{test_builder, test_logger, ChunkedBody, FixedClock, RecordingBackend, TestServer};
use scribe_tower::{CaptureBody, HttpLoggerLayer, RequestBody};
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;
use tower::{service_fn, Layer, ServiceExt};

type Handled = Result<Response<ChunkedBody>, Infallible>;

async fn run<F, Fut>(
    config: LogConfig,
    request: Request<ChunkedBody>,
    handler: F,
) -> (Response<CaptureBody<ChunkedBody>>, RecordingBackend)
where
    F: FnMut(Request<RequestBody<ChunkedBody>>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Handled> + Send + 'static,
{
    let (logger, backend) = test_logger(config);
    let service = HttpLoggerLayer::new(logger).layer(service_fn(handler));
    let response = service.oneshot(request).await.unwrap();
    (response, backend)
}

fn get(path: &str) -> Request<ChunkedBody> {
    Request::get(path).body(ChunkedBody::empty()).unwrap()
}

async fn respond_chunks(chunks: Vec<&'static str>) -> Handled {
    Ok(Response::new(ChunkedBody::new(chunks)))
}

async fn body_bytes<B>(body: B) -> Bytes
where
    B: Body,
    B::Error: std::fmt::Debug,
{
    body.collect().await.unwrap().to_bytes()
}

#[tokio::test]
async fn skipped_request_logs_nothing_and_keeps_body() {
    let config = LogConfig::builder().skip_path("/health").build();
    let (response, backend) = run(config, get("/health"), |_req| {
        respond_chunks(vec!["o", "k", "!"])
    })
    .await;

    assert!(!response.body().is_capturing());
    assert_eq!(body_bytes(response.into_body()).await, "ok!");
    assert!(backend.is_empty());
}

#[tokio::test]
async fn skip_by_method_and_combined_rule() {
    let config = LogConfig::builder()
        .skip(SkipRule::method("OPTIONS"))
        .skip(SkipRule::all([SkipRule::path("/users"), SkipRule::method("GET")]))
        .build();
    let (logger, backend) = test_logger(config);
    let service = HttpLoggerLayer::new(logger).layer(service_fn(
        |_req: Request<RequestBody<ChunkedBody>>| respond_chunks(vec![]),
    ));

    for (method, path) in [("OPTIONS", "/x"), ("GET", "/users")] {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(ChunkedBody::empty())
            .unwrap();
        let response = service.clone().oneshot(request).await.unwrap();
        body_bytes(response.into_body()).await;
    }
    assert!(backend.is_empty());

    let post = Request::post("/users").body(ChunkedBody::empty()).unwrap();
    let response = service.clone().oneshot(post).await.unwrap();
    body_bytes(response.into_body()).await;
    assert_eq!(backend.len(), 2);
}

#[tokio::test]
async fn one_response_message_for_any_number_of_chunks() {
    for chunks in [vec![], vec!["{\"a\":1}"], vec!["{\"a\"", ":", "1", "}"]] {
        let expected: String = chunks.concat();
        let (response, backend) =
            run(LogConfig::default(), get("/items"), move |_req| respond_chunks(chunks.clone())).await;
        assert_eq!(body_bytes(response.into_body()).await, expected.as_bytes());

        let responses = backend.messages_from("response");
        assert_eq!(responses.len(), 1, "chunks: {expected:?}");
        if expected.is_empty() {
            assert!(responses[0].get("body").is_none());
        } else {
            assert_eq!(responses[0]["body"], json!({"a": 1}));
        }
    }
}

#[tokio::test]
async fn json_body_is_parsed_and_text_is_raw() {
    let (response, backend) =
        run(LogConfig::default(), get("/json"), |_req| respond_chunks(vec![r#"{"ok":true}"#])).await;
    body_bytes(response.into_body()).await;
    assert_eq!(backend.messages_from("response")[0]["body"], json!({"ok": true}));

    let (response, backend) =
        run(LogConfig::default(), get("/text"), |_req| respond_chunks(vec!["plain ", "text"])).await;
    body_bytes(response.into_body()).await;
    assert_eq!(backend.messages_from("response")[0]["body"], "plain text");
}

#[tokio::test]
async fn not_found_is_logged_as_warning_without_latency() {
    let config = LogConfig::builder().response_props(["statusCode"]).build();
    let (response, backend) = run(config, get("/missing"), |_req| async {
        let mut response = Response::new(ChunkedBody::new([r#"{"error":"not found"}"#]));
        *response.status_mut() = StatusCode::NOT_FOUND;
        Ok(response)
    })
    .await;
    body_bytes(response.into_body()).await;

    let lines = backend.lines();
    let response_line = lines
        .iter()
        .find(|l| l.json()["from"] == "response")
        .unwrap();
    assert_eq!(response_line.level, LogLevel::Warn);
    let message = response_line.json();
    assert_eq!(message["level"], "warn");
    assert_eq!(message["statusCode"], 404);
    assert!(message.get("latency").is_none());
    assert!(message.get("body").is_none());
}

#[tokio::test]
async fn server_error_is_logged_as_error() {
    let (response, backend) = run(LogConfig::default(), get("/boom"), |_req| async {
        let mut response = Response::new(ChunkedBody::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        Ok(response)
    })
    .await;
    body_bytes(response.into_body()).await;
    assert_eq!(backend.levels(), vec![LogLevel::Info, LogLevel::Error]);
}

#[tokio::test]
async fn request_body_is_coerced_and_replayed() {
    let config = LogConfig::builder()
        .request_props(["body.id"])
        .parse_prop("body.id", TargetType::String)
        .build();
    let request = Request::post("/orders")
        .body(ChunkedBody::new([r#"{"id":"#, r#"123,"amount":0}"#]))
        .unwrap();
    let (response, backend) = run(config, request, |req: Request<RequestBody<ChunkedBody>>| async move {
        assert!(req.body().is_buffered());
        let seen = req.into_body().collect().await.unwrap().to_bytes();
        Ok(Response::new(ChunkedBody::new([seen])))
    })
    .await;

    assert_eq!(
        body_bytes(response.into_body()).await,
        r#"{"id":123,"amount":0}"#
    );
    let request_message = &backend.messages_from("request")[0];
    assert_eq!(request_message["body"], json!({"id": "123"}));
}

#[tokio::test]
async fn request_body_error_reaches_handler() {
    let request = Request::post("/upload")
        .body(ChunkedBody::new(["part"]).fail_after(1))
        .unwrap();
    let (response, backend) = run(LogConfig::default(), request, |req: Request<RequestBody<ChunkedBody>>| async move {
        let mut body = req.into_body();
        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap(), "part");
        assert!(body.frame().await.unwrap().is_err());
        Ok(Response::new(ChunkedBody::empty()))
    })
    .await;
    body_bytes(response.into_body()).await;
    assert_eq!(backend.messages_from("request")[0]["body"], "part");
}

#[tokio::test]
async fn oversized_body_is_replaced_but_fully_delivered() {
    let fifty = format!("\"{}\"", "x".repeat(48));
    assert_eq!(fifty.len(), 50);
    let config = LogConfig::builder().body_length_limit(10).build();
    let sent = fifty.clone();
    let (response, backend) = run(config, get("/big"), move |_req| {
        let sent = sent.clone();
        async move { Ok(Response::new(ChunkedBody::new([sent]))) }
    })
    .await;

    let delivered = body_bytes(response.into_body()).await;
    assert_eq!(delivered.len(), 50);
    assert_eq!(delivered, fifty.as_bytes());
    assert_eq!(backend.messages_from("response")[0]["body"], BODY_LIMIT_MARKER);
}

#[tokio::test]
async fn oversized_request_does_not_hold_back_handler() {
    let config = LogConfig::builder().body_length_limit(10).build();
    // The client keeps the upload open after the first 64 bytes.
    let request = Request::post("/upload")
        .body(ChunkedBody::new([vec![b'x'; 64]]).stalled())
        .unwrap();
    let handled = tokio::time::timeout(
        Duration::from_secs(5),
        run(config, request, |req: Request<RequestBody<ChunkedBody>>| async move {
            let mut body = req.into_body();
            let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
            assert!(!body.is_end_stream());
            Ok(Response::new(ChunkedBody::new([first.len().to_string()])))
        }),
    )
    .await;

    let (response, backend) = handled.expect("handler was not called while the upload was open");
    assert_eq!(body_bytes(response.into_body()).await, "64");
    assert_eq!(backend.messages_from("request")[0]["body"], BODY_LIMIT_MARKER);
}

#[tokio::test]
async fn oversized_request_reaches_handler_whole() {
    let config = LogConfig::builder().body_length_limit(10).build();
    let request = Request::post("/upload")
        .body(ChunkedBody::new(["0123", "4567", "89ab", "cdef"]))
        .unwrap();
    let (response, backend) = run(config, request, |req: Request<RequestBody<ChunkedBody>>| async move {
        let seen = req.into_body().collect().await.unwrap().to_bytes();
        Ok(Response::new(ChunkedBody::new([seen])))
    })
    .await;

    assert_eq!(body_bytes(response.into_body()).await, "0123456789abcdef");
    assert_eq!(backend.messages_from("request")[0]["body"], BODY_LIMIT_MARKER);
    assert_eq!(backend.messages_from("response")[0]["body"], BODY_LIMIT_MARKER);
}

#[tokio::test]
async fn bodiless_status_is_logged_without_polling() {
    for status in [StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED] {
        let (response, backend) = run(LogConfig::default(), get("/cached"), move |_req| async move {
            let mut response = Response::new(ChunkedBody::new(["never read"]));
            *response.status_mut() = status;
            Ok(response)
        })
        .await;

        assert!(!response.body().is_capturing());
        let responses = backend.messages_from("response");
        assert_eq!(responses.len(), 1, "status {status}");
        assert_eq!(responses[0]["statusCode"], status.as_u16());
        assert!(responses[0].get("body").is_none());
    }
}

#[tokio::test]
async fn head_request_is_logged_over_hyper() {
    let (logger, backend) = test_logger(LogConfig::default());
    let service = HttpLoggerLayer::new(logger).layer(service_fn(
        |_req: Request<RequestBody<hyper::body::Incoming>>| async {
            Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(br#"{"ok":true}"#))))
        },
    ));
    let server = TestServer::start(service).await;

    let (status, body) = server.send(Method::HEAD, "/items", Bytes::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    let responses = backend.messages_from("response");
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["statusCode"], 200);

    let (status, body) = server.get("/items").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(backend.messages_from("request").len(), 2);
    assert_eq!(backend.messages_from("response").len(), 2);
}

#[tokio::test]
async fn panicking_masker_leaves_traffic_alone() {
    let backend = RecordingBackend::new();
    let layer = HttpLoggerLayer::with_backend(
        LogConfig::default(),
        test_builder(FixedClock::new(0)).masker(|_message: Map<String, Value>| -> Map<String, Value> {
            panic!("masker failed")
        }),
        backend.clone(),
    );
    let service = layer.layer(service_fn(|_req: Request<RequestBody<ChunkedBody>>| {
        respond_chunks(vec!["still ", "delivered"])
    }));

    let response = service.oneshot(get("/orders")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();
    let mut delivered = Vec::new();
    while let Some(frame) = body.frame().await {
        delivered.extend_from_slice(&frame.unwrap().into_data().unwrap());
    }
    assert_eq!(delivered, b"still delivered");
    assert!(!body.is_capturing());
    assert!(backend.is_empty());
}

#[tokio::test]
async fn correlation_id_from_header_or_generated() {
    let config = || {
        LogConfig::builder()
            .correlation_id_path("headers.x-request-id")
            .build()
    };
    let echo_id = |req: Request<RequestBody<ChunkedBody>>| async move {
        let id = req.extensions().get::<CorrelationId>().cloned().unwrap();
        Ok(Response::new(ChunkedBody::new([id.to_string()])))
    };

    let with_header = Request::get("/")
        .header("x-request-id", "abc-123")
        .body(ChunkedBody::empty())
        .unwrap();
    let (response, backend) = run(config(), with_header, echo_id).await;
    assert_eq!(body_bytes(response.into_body()).await, "abc-123");
    for message in backend.messages() {
        assert_eq!(message["id"], "abc-123");
    }

    let (response, backend) = run(config(), get("/"), echo_id).await;
    let generated = body_bytes(response.into_body()).await;
    let messages = backend.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["id"], messages[1]["id"]);
    assert_eq!(messages[0]["id"].as_str().unwrap().as_bytes(), &generated[..]);
    assert_eq!(messages[0]["id"].as_str().unwrap().len(), 36);
}

#[tokio::test]
async fn response_message_waits_for_body_end() {
    let (response, backend) = run(LogConfig::default(), get("/slow"), |_req| {
        respond_chunks(vec!["a", "b", "c"])
    })
    .await;

    // Only the request has been logged so far.
    assert_eq!(backend.len(), 1);
    assert_eq!(backend.messages()[0]["from"], "request");

    let mut body = response.into_body();
    body.frame().await.unwrap().unwrap();
    assert_eq!(backend.len(), 1);
    body.frame().await.unwrap().unwrap();
    body.frame().await.unwrap().unwrap();
    assert_eq!(backend.len(), 2);
    assert!(body.frame().await.is_none());
    assert_eq!(backend.len(), 2);
}

#[tokio::test]
async fn aborted_body_emits_nothing() {
    let (response, backend) = run(LogConfig::default(), get("/abort"), |_req| {
        respond_chunks(vec!["a", "b"])
    })
    .await;
    let mut body = response.into_body();
    body.frame().await.unwrap().unwrap();
    drop(body);
    assert_eq!(backend.messages_from("response").len(), 0);
}

#[tokio::test]
async fn failing_body_emits_nothing_and_propagates_error() {
    let (response, backend) = run(LogConfig::default(), get("/fail"), |_req| async {
        Ok(Response::new(ChunkedBody::new(["a", "b"]).fail_after(1)))
    })
    .await;
    let mut body = response.into_body();
    body.frame().await.unwrap().unwrap();
    assert!(body.frame().await.unwrap().is_err());
    assert!(!body.is_capturing());
    assert_eq!(backend.messages_from("response").len(), 0);
}

#[tokio::test]
async fn latency_is_reported_when_requested() {
    let clock = FixedClock::new(5_000);
    let backend = RecordingBackend::new();
    let layer = HttpLoggerLayer::with_backend(
        LogConfig::builder().response_props(["statusCode", "latency"]).build(),
        test_builder(clock.clone()),
        backend.clone(),
    );
    let handler_clock = clock.clone();
    let service = layer.layer(service_fn(move |_req: Request<RequestBody<ChunkedBody>>| {
        handler_clock.advance(25);
        respond_chunks(vec!["done"])
    }));
    let response = service.oneshot(get("/timed")).await.unwrap();
    body_bytes(response.into_body()).await;

    let message = &backend.messages_from("response")[0];
    assert_eq!(message["latency"], 25);
    assert_eq!(message["startTime"], 5_025);
}

#[tokio::test]
async fn end_to_end_over_hyper() {
    let (logger, backend) = test_logger(LogConfig::builder().request_props(["id", "body", "method"]).build());
    let service = HttpLoggerLayer::new(logger).layer(service_fn(
        |req: Request<RequestBody<hyper::body::Incoming>>| async move {
            let bytes = req.into_body().collect().await.map(|c| c.to_bytes());
            let bytes = bytes.unwrap_or_default();
            Ok::<_, Infallible>(Response::new(Full::new(bytes)))
        },
    ));
    let server = TestServer::start(service).await;

    let (status, body) = server
        .send(http::Method::POST, "/echo", r#"{"name":"Papyrus"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"name":"Papyrus"}"#);

    let messages = backend.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["method"], "POST");
    assert_eq!(messages[0]["body"], json!({"name": "Papyrus"}));
    assert_eq!(messages[1]["body"], json!({"name": "Papyrus"}));
    assert_eq!(messages[1]["statusCode"], 200);
}

fn chunk_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 0..8)
}

proptest! {
    #[test]
    fn body_passes_through_unchanged(chunks in chunk_strategy(), skip in any::<bool>()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let expected: Vec<u8> = chunks.concat();
        let config = if skip {
            LogConfig::builder().skip(SkipRule::predicate(|_, _| true)).build()
        } else {
            LogConfig::default()
        };

        let (delivered, backend) = runtime.block_on(async move {
            let (response, backend) = run(config, get("/prop"), move |_req| {
                let chunks: Vec<Bytes> = chunks.iter().cloned().map(Bytes::from).collect();
                async move { Ok(Response::new(ChunkedBody::new(chunks))) }
            })
            .await;
            (body_bytes(response.into_body()).await, backend)
        });

        prop_assert_eq!(&delivered[..], &expected[..]);
        let expected_messages = if skip { 0 } else { 2 };
        prop_assert_eq!(backend.len(), expected_messages);
        if !skip {
            let response: Value = backend.messages_from("response").remove(0);
            prop_assert_eq!(response["from"].as_str(), Some("response"));
        }
    }
}
