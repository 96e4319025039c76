//! HTTP transport: REST data endpoints plus streamable MCP

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Router, middleware};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthConfig, bearer_auth_middleware, caller_id};
use crate::config::TransportConfig;
use crate::constants::CALLER_ID_HEADER;
use crate::server::ServerHandler;
use crate::service::DataService;
use crate::types::{FetchRequest, HealthResult, OperationList, PageRequest, PaginatedResult};
use crate::{Error, Result};

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub cors_origin: Option<String>,
    pub bearer_token: Option<String>,
    pub request_timeout: Duration,
}

impl HttpConfig {
    /// Transport settings plus `MCP_CORS_ORIGIN` from the environment
    pub fn from_transport(transport: &TransportConfig) -> Self {
        Self {
            cors_origin: std::env::var("MCP_CORS_ORIGIN").ok(),
            bearer_token: transport.bearer_token.clone(),
            request_timeout: transport.request_timeout,
        }
    }
}

/// Error body `{"detail": "..."}` with a status derived from the error kind
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "Request rejected");
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

/// Paging window from the query string
#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

/// REST routes bound to `service`
pub fn routes(service: Arc<DataService>) -> Router {
    #[allow(unused_mut)]
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/interfaces", get(interfaces_handler))
        .route("/mcp-data", post(mcp_data_handler));

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.with_state(service)
}

/// Wrap `router` with auth, tracing, timeout, and CORS layers
pub fn with_layers(router: Router, config: &HttpConfig) -> Router {
    let auth_config = AuthConfig::new(config.bearer_token.clone());

    router
        .layer(middleware::from_fn_with_state(
            auth_config,
            bearer_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(build_cors_layer(config))
}

/// Serve REST and MCP over HTTP until `shutdown` resolves
pub async fn run_http(
    service: Arc<DataService>,
    transport: &TransportConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::new(transport.http_host, transport.http_port);
    let http_config = HttpConfig::from_transport(transport);
    emit_security_warnings(transport.http_host, &http_config);

    let cancellation_token = CancellationToken::new();
    let mut mcp_config = StreamableHttpServerConfig::default();
    mcp_config.cancellation_token = cancellation_token.clone();
    let handler = ServerHandler::new(Arc::clone(&service));
    let mcp_service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        Arc::new(LocalSessionManager::default()),
        mcp_config,
    );

    let app = with_layers(routes(service).nest_service("/mcp", mcp_service), &http_config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            cancellation_token.cancel();
        })
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn build_cors_layer(config: &HttpConfig) -> CorsLayer {
    let origin = config
        .cors_origin
        .as_ref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CORS_ORIGIN));

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CALLER_ID_HEADER),
        ])
}

fn emit_security_warnings(host: IpAddr, http_config: &HttpConfig) {
    for warning in security_warnings(host, http_config) {
        tracing::warn!("{warning}");
    }

    if http_config.cors_origin.is_none() {
        tracing::info!(
            "CORS origin not configured (MCP_CORS_ORIGIN). \
             Using restrictive default: {DEFAULT_CORS_ORIGIN}"
        );
    }
}

/// Exposure risks of serving on `host` with `http_config`
fn security_warnings(host: IpAddr, http_config: &HttpConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let is_non_loopback = !host.is_loopback();
    let is_all_interfaces = host == IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        || host == IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED);

    if is_all_interfaces {
        warnings.push(
            "HTTP server binding to all interfaces. \
             This exposes the server to all network interfaces."
                .to_string(),
        );
    } else if is_non_loopback {
        warnings.push(format!(
            "HTTP server binding to non-loopback address ({host}). \
             Ensure network security policies are in place."
        ));
    }

    if http_config.bearer_token.is_none() && is_non_loopback {
        warnings.push(
            "SECURITY WARNING: HTTP server accessible from network without authentication. \
             Set MCP_HTTP_BEARER_TOKEN to enable authentication."
                .to_string(),
        );
    }

    warnings
}

async fn health_handler(State(service): State<Arc<DataService>>) -> Json<HealthResult> {
    Json(service.health().await)
}

async fn interfaces_handler(State(service): State<Arc<DataService>>) -> Json<OperationList> {
    Json(OperationList {
        operations: service.operations(),
    })
}

async fn mcp_data_handler(
    State(service): State<Arc<DataService>>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
    Json(request): Json<FetchRequest>,
) -> std::result::Result<Json<PaginatedResult>, ApiError> {
    let page = PageRequest::from_optional(query.page, query.page_size)?;
    let caller = caller_id(&headers);

    let result = service
        .handle_mcp_data_request(request, page, &caller)
        .await?;
    Ok(Json(result))
}

#[cfg(feature = "metrics")]
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}
