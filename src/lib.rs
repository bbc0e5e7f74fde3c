//! Contact pipeline of a portfolio site: shared field rules, the form state
//! machine used by the client and the relay forwarding messages to the email
//! provider.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod form;
pub mod mail;
mod router;
pub mod telemetry;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use url::Url;

/// Route accepting contact messages.
pub const SEND_EMAIL_PATH: &str = "/api/send-email";

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub relay: Arc<config::RelayConfiguration>,
    pub provider: Arc<dyn mail::EmailProvider>,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().latency_unit(LatencyUnit::Micros)),
        )
        // Browsers call the relay cross-origin.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        );

    Router::new()
        // `POST /api/send-email` goes to `send_email`.
        .route(
            SEND_EMAIL_PATH,
            post(router::send_email::handler).fallback(router::method_not_allowed),
        )
        // `GET /metrics` goes to `metrics`.
        .route("/metrics", get(router::metrics::handler))
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
///
/// Provider identifiers are read from the environment; their absence only
/// warns here and fails each request later.
pub fn initialize_state(
    config: config::Configuration,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let relay = config::RelayConfiguration::from_env();
    if !relay.is_complete() {
        tracing::warn!(
            "email provider configuration missing, messages will not be relayed"
        );
    }

    let provider = mail::EmailJs::new(Url::parse(&config.provider.url)?);

    let metrics = if config.telemetry.metrics {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    Ok(AppState {
        config: Arc::new(config),
        relay: Arc::new(relay),
        provider: Arc::new(provider),
        metrics,
    })
}
