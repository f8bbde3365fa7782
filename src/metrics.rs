//! Prometheus collectors for the HTTP surface and listing creation.
//!
//! One [`Metrics`] is built at startup and cloned into whoever records; all
//! clones share the same registry. The registry is exported in text format
//! by [`metrics_app`] on its own port.

use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    extract::{MatchedPath, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::ApiError;

/// Label used for requests that matched no route.
const UNMATCHED: &str = "unmatched";

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    response_time: HistogramVec,
    listings_created: IntCounter,
}

impl Metrics {
    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests").namespace(namespace),
            &["method", "endpoint", "status"],
        )?;
        let response_time = HistogramVec::new(
            HistogramOpts::new("http_response_time_seconds", "HTTP response time in seconds")
                .namespace(namespace),
            &["method", "endpoint"],
        )?;
        let listings_created = IntCounter::with_opts(
            Opts::new("listings_created_total", "Total number of listings created").namespace(namespace),
        )?;

        let registry = Registry::new();
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(response_time.clone()))?;
        registry.register(Box::new(listings_created.clone()))?;

        Ok(Self {
            registry,
            requests,
            response_time,
            listings_created,
        })
    }

    pub fn observe_request(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.requests
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();
        self.response_time
            .with_label_values(&[method, endpoint])
            .observe(elapsed.as_secs_f64());
    }

    pub fn listing_created(&self) {
        self.listings_created.inc();
    }

    /// Prometheus text exposition of every collector.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .context("encode metrics")?;
        String::from_utf8(buf).context("metrics are not utf-8")
    }
}

/// Counts and times every routed request. The endpoint label is the route
/// template (`/listing/feed`), never the raw path.
pub async fn track_requests(State(metrics): State<Metrics>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED.to_owned());

    let res = next.run(req).await;
    metrics.observe_request(&method, &endpoint, res.status().as_u16(), started.elapsed());
    res
}

async fn export(State(metrics): State<Metrics>) -> Result<Response, ApiError> {
    let body = metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Exporter router, served apart from the public API.
pub fn metrics_app(metrics: Metrics) -> Router {
    Router::new()
        .route("/metrics", get(export))
        .with_state(metrics)
}
