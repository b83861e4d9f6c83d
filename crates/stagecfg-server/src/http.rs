//! HTTP surface of the config server.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use stagecfg_protocol::{
    encode_verifying_key, CONFIG_ROUTE, HEALTH_ROUTE, KEY_ROUTE, TOKEN_CONTENT_TYPE,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::endpoint::{Distribution, DistributionEndpoint, EndpointError};

/// Query parameters of the distribution route.
#[derive(Debug, Deserialize)]
pub struct ConfigQuery {
    #[serde(default)]
    pub stage: Option<String>,
}

/// Build the router serving `endpoint`.
pub fn build_router(endpoint: Arc<DistributionEndpoint>) -> Router {
    Router::new()
        .route(CONFIG_ROUTE, get(get_config))
        .route(KEY_ROUTE, get(get_key))
        .route(HEALTH_ROUTE, get(health_check))
        .with_state(endpoint)
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "config server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolve once `signal` fires. A signal that cannot be installed never
/// resolves, so the server keeps running.
pub async fn shutdown_on<S>(signal: S)
where
    S: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

/// Graceful shutdown on ctrl-c.
pub async fn shutdown_signal() {
    shutdown_on(tokio::signal::ctrl_c()).await
}

async fn health_check() -> &'static str {
    "ok"
}

async fn get_key(State(endpoint): State<Arc<DistributionEndpoint>>) -> Response {
    plain_text(
        StatusCode::OK,
        encode_verifying_key(&endpoint.signer().verifying_key()),
    )
}

async fn get_config(
    State(endpoint): State<Arc<DistributionEndpoint>>,
    Path(application): Path<String>,
    Query(query): Query<ConfigQuery>,
) -> Response {
    let stage = query.stage;
    let outcome = tokio::task::spawn_blocking(move || {
        endpoint.distribute(&application, stage.as_deref())
    })
    .await;

    match outcome {
        Ok(Ok(Distribution::Token(token))) => plain_text(StatusCode::OK, token),
        Ok(Ok(Distribution::UnknownApplication)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(EndpointError::Validation(e))) => {
            warn!(error = %e, "rejected config request");
            plain_text(StatusCode::BAD_REQUEST, e.to_string())
        }
        Ok(Err(e)) => {
            error!(error = %e, "config request failed");
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!(error = %e, "config request task failed");
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TOKEN_CONTENT_TYPE)], body).into_response()
}
