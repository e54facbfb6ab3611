//! Minimal server logging every exchange through `tracing`.
//!
//! ```text
//! cargo run -p scribe --example hello
//! curl -d '{"name":"Papyrus"}' localhost:3000/echo
//! curl localhost:3000/health
//! ```

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use scribe::prelude::*;
use std::convert::Infallible;
use tokio::net::TcpListener;
use tower::{service_fn, ServiceBuilder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn handle(req: Request<RequestBody<Incoming>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let id = req
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.to_string())
        .unwrap_or_default();

    let response = match req.uri().path() {
        "/health" => Response::new(Full::new(Bytes::from_static(b"ok"))),
        "/echo" => {
            let body = req
                .into_body()
                .collect()
                .await
                .map(|c| c.to_bytes())
                .unwrap_or_default();
            let mut response = Response::new(Full::new(body));
            response
                .headers_mut()
                .insert("content-type", http::HeaderValue::from_static("application/json"));
            response
        }
        _ => {
            let mut response = Response::new(Full::new(Bytes::from(format!(
                r#"{{"error":"not found","id":"{id}"}}"#
            ))));
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
    };
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,scribe=debug")))
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    let config = LogConfig::builder()
        .request_props(["id", "method", "url", "body"])
        .response_props(["id", "statusCode", "body", "latency", "req.method"])
        .correlation_id_path("headers.x-request-id")
        .skip_path("/health")
        .body_length_limit(16 * 1024)
        .build();
    let layer = HttpLoggerLayer::tracing(
        config,
        MessageBuilder::new("hello").masker(KeyMasker::default()),
    );
    let service = ServiceBuilder::new().layer(layer).service(service_fn(handle));

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on http://127.0.0.1:3000");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let service = TowerToHyperService::new(service.clone());
        tokio::spawn(async move {
            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::debug!(error = %err, "connection error");
            }
        });
    }
}
