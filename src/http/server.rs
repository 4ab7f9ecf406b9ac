//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (timeout, limits, request ID, tracing)
//! - Bind server to listener
//! - Run the proxy pipeline: resolve → fetch → sanitize → classify → rewrite
//! - Swap in reloaded configuration without dropping connections

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::proxy::target;
use crate::proxy::upstream::forwards_body;
use crate::proxy::{ProxyError, UpstreamClient, UpstreamRequest};
use crate::resilience::with_deadline;
use crate::rewrite::{rewrite_body, ContentClass, RewriteContext};
use crate::security::headers::sanitize_response_headers;
use crate::security::limits::{read_request_body, read_upstream_body};

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-config state shared by all requests. Replaced wholesale on reload.
#[derive(Debug)]
pub struct Runtime {
    pub config: GatewayConfig,
    pub upstream: UpstreamClient,
}

impl Runtime {
    pub fn build(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config)?;
        Ok(Self { config, upstream })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    runtime: Arc<ArcSwap<Runtime>>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    runtime: Arc<ArcSwap<Runtime>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Listener, timeout and limit layers are fixed here; a reload only
    /// replaces the runtime seen by handlers.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let runtime = Arc::new(ArcSwap::from_pointee(Runtime::build(config.clone())?));
        let state = AppState {
            runtime: runtime.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, runtime })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/healthz", get(health_handler))
            .route("/api/proxy", any(proxy_handler))
            .route("/api/proxy/", any(proxy_handler))
            .route("/api/proxy/{*rest}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(RequestBodyLimitLayer::new(config.limits.max_request_body_bytes))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_concurrent_requests))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Configuration currently used by handlers.
    pub fn config(&self) -> GatewayConfig {
        self.runtime.load().config.clone()
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configs received on `updates` replace the runtime for subsequent
    /// requests; requests already in flight keep the one they started with.
    pub async fn run(
        self,
        listener: TcpListener,
        updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(updates) = updates {
            tokio::spawn(apply_updates(self.runtime.clone(), updates, shutdown.subscribe()));
        }

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn apply_updates(
    runtime: Arc<ArcSwap<Runtime>>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match Runtime::build(config) {
                    Ok(next) => {
                        runtime.store(Arc::new(next));
                        tracing::info!("Configuration reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reloaded configuration rejected; keeping current");
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let runtime = state.runtime.load_full();
    let request_id = request_id(request.headers()).to_string();

    match forward(&runtime, &request_id, request).await {
        Ok((class, response)) => {
            metrics::record_request(class, response.status().as_u16(), start);
            response
        }
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!(request_id = %request_id, kind = e.kind(), error = %e, "Proxy request failed");
            } else {
                tracing::warn!(request_id = %request_id, kind = e.kind(), error = %e, "Proxy request rejected");
            }
            metrics::record_error(&e, start);
            e.into_response()
        }
    }
}

async fn forward(
    runtime: &Runtime,
    request_id: &str,
    request: Request,
) -> Result<(ContentClass, Response), ProxyError> {
    let start = Instant::now();
    let config = &runtime.config;
    let (parts, body) = request.into_parts();

    // 1. Resolve target and the origin the browser sees
    let target = target::resolve(&parts.uri, &parts.headers)?;
    let origin = target::proxy_origin(&parts.headers, &config.origin, &config.listener.bind_address);

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        target = %target,
        "Proxying request"
    );

    // 2. Buffer the request body for methods that carry one
    let body = if forwards_body(&parts.method) {
        Some(read_request_body(body, config.limits.max_request_body_bytes).await?)
    } else {
        None
    };

    // 3. Fetch; redirects are resolved inside the client
    let upstream = runtime
        .upstream
        .fetch(UpstreamRequest {
            method: parts.method.clone(),
            target: target.clone(),
            headers: &parts.headers,
            body,
        })
        .await?;

    // 4. Classify and sanitize
    let status = upstream.status();
    let final_url = upstream.url().clone();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let class = ContentClass::classify(content_type.as_deref());
    let headers = sanitize_response_headers(upstream.headers(), &config.headers.default_cache_control);

    // 5. Rewrite text bodies, stream everything else
    let body = if class.is_rewritable() && parts.method != Method::HEAD {
        let raw = with_deadline(
            runtime.upstream.deadline(),
            read_upstream_body(upstream, config.limits.max_rewrite_bytes),
        )
        .await?;
        let ctx = RewriteContext::new(origin, final_url.clone()).with_content_type(content_type.as_deref());
        Body::from(rewrite_off_thread(class, raw, ctx).await)
    } else {
        Body::from_stream(upstream.bytes_stream())
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    tracing::info!(
        request_id = %request_id,
        target = %target,
        final_url = %final_url,
        status = status.as_u16(),
        class = %class,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request proxied"
    );

    Ok((class, response))
}

/// Run the rewriter on the blocking pool. A panicked rewrite serves the original bytes.
async fn rewrite_off_thread(class: ContentClass, raw: Bytes, ctx: RewriteContext) -> Bytes {
    let original = raw.clone();
    match tokio::task::spawn_blocking(move || rewrite_body(class, raw, &ctx)).await {
        Ok(rewritten) => rewritten,
        Err(e) => {
            tracing::error!(class = %class, error = %e, "Rewrite task failed; serving original body");
            metrics::record_rewrite_fallback(class);
            original
        }
    }
}
