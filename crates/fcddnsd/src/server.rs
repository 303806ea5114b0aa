//! HTTP boundary: translates requests into `RequestHandler` calls

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fcddns_core::handler::DDNS_PATH_PREFIX;
use fcddns_core::{DdnsRequest, DdnsResponse, RequestHandler};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<RequestHandler>,
    /// Header carrying the real client address when behind a proxy
    pub client_ip_header: Option<HeaderName>,
}

impl AppState {
    /// Configured header first (first entry of a comma list), then the socket peer
    fn peer_ip(&self, headers: &HeaderMap, socket: Option<SocketAddr>) -> Option<IpAddr> {
        let from_header = self.client_ip_header.as_ref().and_then(|name| {
            let value = headers.get(name)?.to_str().ok()?;
            let first = value.split(',').next()?.trim();
            match first.parse() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    debug!("Ignoring unparseable {} header: {:?}", name, value);
                    None
                }
            }
        });

        from_header.or(socket.map(|addr| addr.ip()))
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/ddns/v1", get(ddns))
        .route("/ddns/v1/*rest", get(ddns))
        .route("/myip", get(my_ip))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

async fn ddns(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let peer = state.peer_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let response = state
        .handler
        .handle(&DdnsRequest::new(uri.path(), peer))
        .await;
    plain_text(response)
}

async fn my_ip(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let peer = state.peer_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    plain_text(RequestHandler::my_ip(peer))
}

// `/ddns/v1/` and `/ddns/v1x` miss the routes above but still belong to the core
async fn fallback(
    state: State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if uri.path().starts_with(DDNS_PATH_PREFIX) {
        return ddns(state, connect_info, headers, uri).await;
    }
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn plain_text(response: DdnsResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body).into_response()
}

/// Serve `router` on `addr` until `shutdown` resolves
pub async fn serve(
    addr: SocketAddr,
    router: Router,
    shutdown: impl Future<Output = &'static str> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let signal = shutdown.await;
        info!("Received shutdown signal: {}", signal);
    })
    .await
    .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}
