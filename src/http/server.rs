//! HTTP server: the boundary between the wire and the pipeline.
//!
//! # Responsibilities
//! - Create Axum Router sending every path and method to the pipeline
//! - Wire up middleware (tracing, request timeout)
//! - Convert hyper requests into `Request` records and `Response` records
//!   back into hyper responses
//! - Run dispatch off the async workers, since modules may block
//! - Apply reloaded pipeline options while serving
//! - Observability (metrics per dispatch)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{request::Parts, HeaderName, HeaderValue, StatusCode, Version},
    response::IntoResponse,
    routing::any,
    Router,
};
use hyper::ext::ReasonPhrase;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ListenerConfig, ServerConfig};
use crate::http::{Headers, Request, Response};
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::observability::metrics;
use crate::pipeline::Pipeline;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_body_bytes: usize,
}

/// HTTP front end for a pipeline.
pub struct PipelineServer {
    router: Router,
    pipeline: Arc<Pipeline>,
}

impl PipelineServer {
    /// Create a new server for `pipeline` with the given listener settings.
    pub fn new(pipeline: Arc<Pipeline>, config: &ListenerConfig) -> Self {
        let state = AppState {
            pipeline: Arc::clone(&pipeline),
            max_body_bytes: config.max_body_bytes,
        };
        let router = Self::build_router(config, state);
        Self { router, pipeline }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch_handler))
            .route("/{*path}", any(dispatch_handler))
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// The router, for serving it some other way or for tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Serve connections from `listener` until `shutdown` fires or Ctrl+C.
    ///
    /// Configurations arriving on `config_updates` have their `[pipeline]`
    /// section applied; a rejected section keeps the current options.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Pipeline server starting");

        let pipeline = Arc::clone(&self.pipeline);
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match pipeline.configure(&config.pipeline) {
                    Ok(()) => tracing::info!("Pipeline options reloaded"),
                    Err(e) => tracing::error!(error = %e, "Rejected reloaded pipeline options"),
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        reloader.abort();
        tracing::info!("Pipeline server stopped");
        Ok(())
    }
}

/// Single handler for every request: convert, dispatch, convert back.
async fn dispatch_handler(State(state): State<AppState>, request: axum::extract::Request) -> axum::response::Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.max_body_bytes, "Rejected request body");
            metrics::record_dispatch(parts.method.as_str(), 413, start_time);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let request = to_pipeline_request(&parts, body.to_vec());
    let method = request.method().to_string();
    tracing::debug!(method = %method, target = %request.target(), "Dispatching request");

    let pipeline = Arc::clone(&state.pipeline);
    let response = match tokio::task::spawn_blocking(move || pipeline.handle_request(&request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(method = %method, error = %e, "Dispatch failed");
            metrics::record_dispatch(&method, 500, start_time);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    metrics::record_dispatch(&method, response.status, start_time);
    to_http_response(response)
}

/// Protocol version as it appears on a request line.
pub fn version_str(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == Version::HTTP_2 {
        "HTTP/2.0"
    } else if version == Version::HTTP_3 {
        "HTTP/3.0"
    } else {
        "HTTP/1.1"
    }
}

/// Build a pipeline request from hyper's parsed head and the buffered body.
///
/// Repeated headers are joined with `", "`.
pub fn to_pipeline_request(parts: &Parts, body: Vec<u8>) -> Request {
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.to_string());

    let mut headers = Headers::new();
    for (name, value) in parts.headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    Request::new(parts.method.as_str(), target, version_str(parts.version))
        .with_headers(headers)
        .with_body(body)
}

/// Turn a finished pipeline response into a hyper response.
///
/// The protocol version is left to hyper. Invalid status codes become 500;
/// headers hyper cannot represent are dropped.
pub fn to_http_response(response: Response) -> axum::response::Response {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        tracing::warn!(status = response.status, "Invalid status code from pipeline");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut out = axum::response::Response::new(Body::from(response.body));
    *out.status_mut() = status;

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }

    let reason = response.reason.as_str();
    if !reason.is_empty() && status.canonical_reason() != Some(reason) {
        match ReasonPhrase::try_from(reason.as_bytes()) {
            Ok(phrase) => {
                out.extensions_mut().insert(phrase);
            }
            Err(_) => tracing::warn!(reason = %reason, "Dropping invalid reason phrase"),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Flow, Module, ModuleError, Options, Registrar, Stage};
    use tower::ServiceExt;

    struct Teapot;

    impl Module for Teapot {
        fn name(&self) -> &str {
            "teapot"
        }

        fn start(self: Arc<Self>, registrar: &Registrar<'_>, _options: &Options) -> Result<(), ModuleError> {
            registrar.hook(self, Stage::Middle)?;
            Ok(())
        }

        fn stop(&self) -> Result<(), ModuleError> {
            Ok(())
        }

        fn handle_request(&self, request: &Request, response: &mut Response) -> Flow {
            response.set_status(418, "Short and stout");
            response.set_body(format!("{} {} {}", request.method(), request.target(), request.body().len()));
            Flow::Continue
        }
    }

    fn server_with(modules: Vec<Arc<dyn Module>>) -> PipelineServer {
        let pipeline = Arc::new(Pipeline::new());
        for module in modules {
            pipeline.start_module(module, &Options::new()).unwrap();
        }
        PipelineServer::new(pipeline, &ListenerConfig::default())
    }

    #[test]
    fn request_conversion() {
        let (parts, _) = axum::http::Request::builder()
            .method("PUT")
            .uri("/items/3?force=true")
            .version(Version::HTTP_10)
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(())
            .unwrap()
            .into_parts();

        let req = to_pipeline_request(&parts, b"data".to_vec());
        assert_eq!(req.method(), "PUT");
        assert_eq!(req.target(), "/items/3?force=true");
        assert_eq!(req.version(), "HTTP/1.0");
        assert_eq!(req.header("accept"), Some("text/html, application/json"));
        assert_eq!(req.body(), b"data");
    }

    #[test]
    fn response_conversion_keeps_custom_reason() {
        let mut res = Response {
            status: 200,
            reason: "Fine by me".into(),
            ..Response::default()
        };
        res.set_header("X-Custom", "1");
        res.set_header("Bad Header", "x");
        res.set_body("ok");

        let out = to_http_response(res);
        assert_eq!(out.status(), StatusCode::OK);
        assert_eq!(out.headers().get("x-custom").unwrap(), "1");
        assert_eq!(out.headers().len(), 1);
        let phrase = out.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(phrase.as_bytes(), b"Fine by me");
    }

    #[test]
    fn canonical_reason_needs_no_extension() {
        let res = Response {
            status: 404,
            reason: "Not Found".into(),
            ..Response::default()
        };
        let out = to_http_response(res);
        assert_eq!(out.status(), StatusCode::NOT_FOUND);
        assert!(out.extensions().get::<ReasonPhrase>().is_none());
    }

    #[test]
    fn invalid_status_becomes_500() {
        let res = Response {
            status: 42,
            ..Response::default()
        };
        assert_eq!(to_http_response(res).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn router_dispatches_every_path() {
        let server = server_with(vec![Arc::new(Teapot)]);

        for uri in ["/", "/deep/nested/path?x=1"] {
            let res = server
                .router()
                .oneshot(
                    axum::http::Request::builder()
                        .method("POST")
                        .uri(uri)
                        .body(Body::from("abc"))
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(res.status().as_u16(), 418);
            let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
            assert_eq!(body, format!("POST {uri} 3").as_bytes());
        }
    }

    #[tokio::test]
    async fn empty_pipeline_answers_501() {
        let server = server_with(Vec::new());
        let res = server
            .router()
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(res.headers().get("content-type").unwrap(), "text/html");
        let phrase = res.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(phrase.as_bytes(), b"Request not handled");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let pipeline = Arc::new(Pipeline::new());
        let config = ListenerConfig {
            max_body_bytes: 4,
            ..ListenerConfig::default()
        };
        let server = PipelineServer::new(pipeline, &config);
        let res = server
            .router()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from("too long"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
