//! Request correlation and HTTP tracing.
//!
//! Every request is tagged with a [`CorrelationId`], taken from the
//! `X-Correlation-ID` header when it holds a UUID and generated otherwise.
//! The id is stored as a request extension, recorded on the request span
//! built by [`http_trace_layer`], echoed in the response header and attached
//! to the log line written for every error response.
//!
//! The correlation layer must wrap the trace layer so the span can read the
//! extension:
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/health", get(health_check))
//!     .layer(http_trace_layer())
//!     .layer(correlation_id_layer());
//! ```

use crate::error::ErrorCode;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation id of the current request.
///
/// Handlers read it with `Extension<CorrelationId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// The id carried by `headers`, or a fresh one if absent or not a UUID.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .unwrap_or_else(Uuid::new_v4);
        Self(id)
    }
}

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Request/response tracing with a span that carries the correlation id.
#[must_use]
pub fn http_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, CorrelatedSpan> {
    TraceLayer::new_for_http().make_span_with(CorrelatedSpan)
}

/// Builds the `http_request` span from the request's [`CorrelationId`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelatedSpan;

impl<B> MakeSpan<B> for CorrelatedSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let correlation_id = request
            .extensions()
            .get::<CorrelationId>()
            .map_or_else(|| CorrelationId::from_headers(request.headers()), |id| *id);

        tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id.0,
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Assigns the correlation id and reports error responses under it.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = CorrelationId::from_headers(req.headers());
        req.extensions_mut().insert(correlation_id);
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.await?;
            report_error(&response, correlation_id, &method, &path);

            if let Ok(value) = HeaderValue::from_str(&correlation_id.0.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }

            Ok(response)
        })
    }
}

fn report_error(response: &Response, correlation_id: CorrelationId, method: &axum::http::Method, path: &str) {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return;
    }

    // Rejections produced by axum itself carry no code.
    let code = response
        .extensions()
        .get::<ErrorCode>()
        .map_or("UNKNOWN", |c| c.0.as_str());

    if status.is_server_error() {
        tracing::warn!(
            correlation_id = %correlation_id.0,
            %method,
            path,
            status = status.as_u16(),
            code,
            "Request failed"
        );
    } else {
        tracing::info!(
            correlation_id = %correlation_id.0,
            %method,
            path,
            status = status.as_u16(),
            code,
            "Request rejected"
        );
    }
}
