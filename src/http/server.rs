//! HTTP server setup and upstream forwarding.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (request ID, tracing, timeout)
//! - Translate masked request paths to real ones before forwarding
//! - Forward requests to the upstream application
//! - Apply hot-reloaded configuration
//! - Serve the admin API when enabled

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, Request, StatusCode, Uri, Version,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use arc_swap::ArcSwap;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::ProxyConfig;
use crate::http::request::{RequestClassifier, X_REQUEST_ID};
use crate::http::response::mask_output;
use crate::masking::{MaskControl, MaskSnapshot, OutputRewriter};
use crate::observability::metrics;

/// Error type for serving.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid upstream address '{0}'")]
    Upstream(String),
}

/// Settings that hot reload replaces wholesale.
#[derive(Debug)]
pub struct RuntimeState {
    pub upstream: Authority,
    pub classifier: RequestClassifier,
    pub output: OutputRewriter,
    pub masking_enabled: bool,
    pub max_buffer_bytes: usize,
    pub admin_api_key: String,
}

impl RuntimeState {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ServeError> {
        let upstream = Authority::from_str(&config.upstream.address)
            .map_err(|_| ServeError::Upstream(config.upstream.address.clone()))?;
        Ok(Self {
            upstream,
            classifier: RequestClassifier::from_config(&config.masking),
            output: OutputRewriter::new(config.masking.min_rewrite_bytes),
            masking_enabled: config.masking.enabled,
            max_buffer_bytes: config.upstream.max_buffer_bytes,
            admin_api_key: config.admin.api_key.clone(),
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<MaskControl>,
    pub client: Client<HttpConnector, Body>,
    inner: Arc<ArcSwap<RuntimeState>>,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> Result<Self, ServeError> {
        let runtime = RuntimeState::from_config(config)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            control: Arc::new(MaskControl::new(config)),
            client,
            inner: Arc::new(ArcSwap::from_pointee(runtime)),
        })
    }

    pub fn runtime(&self) -> Arc<RuntimeState> {
        self.inner.load_full()
    }

    /// Apply a reloaded configuration. An unusable file keeps the current state.
    pub fn apply_config(&self, config: &ProxyConfig) {
        match RuntimeState::from_config(config) {
            Ok(runtime) => self.inner.store(Arc::new(runtime)),
            Err(e) => {
                tracing::error!(error = %e, "Rejected reloaded configuration");
                return;
            }
        }
        self.control.reload(config);
    }
}

/// HTTP server for the masking proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServeError> {
        let state = AppState::new(&config)?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            state,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), mask_output))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Admin API router over this server's state.
    pub fn admin_router(&self) -> Router {
        setup_admin_router(self.state.clone())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires, applying configs from `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServeError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, upstream = %self.config.upstream.address, "HTTP server starting");

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                reload_state.apply_config(&config);
            }
        });

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            let admin = self.admin_router();
            let mut admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Translates masked paths and forwards the request upstream.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let runtime = state.runtime();
    let snapshot = request
        .extensions()
        .get::<Arc<MaskSnapshot>>()
        .cloned()
        .unwrap_or_else(|| state.control.snapshot());

    let method = request.method().to_string();
    let (mut parts, body) = request.into_parts();

    let path_and_query = forward_path(&snapshot, &parts.uri);
    let uri = Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(runtime.upstream.clone())
        .path_and_query(path_and_query)
        .build();
    let uri = match uri {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, path = %parts.uri, "Translated path is not a valid URI");
            metrics::record_request(&method, 400, start_time);
            return (StatusCode::BAD_REQUEST, "Invalid request path").into_response();
        }
    };

    tracing::debug!(method = %method, upstream = %uri, "Proxying request");

    parts.uri = uri;
    parts.version = Version::HTTP_11;
    // Bodies must come back uncompressed to be maskable.
    parts.headers.remove(header::ACCEPT_ENCODING);
    if let Ok(value) = HeaderValue::from_str(&client_addr.ip().to_string()) {
        parts.headers.append("x-forwarded-for", value);
    }

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start_time);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream error");
            metrics::record_request(&method, 502, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Path and query to send upstream: translated when a rule matches, otherwise as received.
fn forward_path(snapshot: &MaskSnapshot, uri: &Uri) -> String {
    let Some(translation) = snapshot.routes().translate(uri.path()) else {
        return uri
            .path_and_query()
            .map(PathAndQuery::as_str)
            .unwrap_or("/")
            .to_string();
    };

    metrics::record_route_translation(translation.origin.label());
    tracing::debug!(rule = %translation.rule, from = %uri.path(), to = %translation.path, "Route translated");

    match uri.query() {
        Some(query) if translation.path.contains('?') => format!("{}&{}", translation.path, query),
        Some(query) => format!("{}?{}", translation.path, query),
        None => translation.path,
    }
}
