// # Readiness Probe
//
// Small HTTP server for orchestrators:
//
// - `GET /live`: always 200, the process is up
// - `GET /ready`: 200 when every readiness check passes, 503 otherwise
//
// Appending `?full=1` to either endpoint returns a JSON object mapping each
// check name to `"OK"` or the error text.
//
// The server shares no state with the reconciliation loop. Checks run on
// every request and nothing is cached.

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cfddns_core::PublicIpSource;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Name of the check that probes the public IP resolver
pub const RESOLVER_CHECK: &str = "public-ip-resolver-webpage";

#[derive(Clone)]
struct ProbeState {
    resolver: Arc<dyn PublicIpSource>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeQuery {
    full: Option<String>,
}

impl ProbeQuery {
    fn wants_full(&self) -> bool {
        matches!(self.full.as_deref(), Some("1") | Some("true"))
    }
}

/// Build the probe router
pub fn router(resolver: Arc<dyn PublicIpSource>) -> Router {
    Router::new()
        .route("/live", get(live))
        .route("/ready", get(ready))
        .with_state(ProbeState { resolver })
}

/// Bind the probe server and serve it on a background task
///
/// Binding happens before this returns, so a taken port is reported to the
/// caller. Returns the bound address and the server task.
pub async fn spawn(
    listen_addr: SocketAddr,
    resolver: Arc<dyn PublicIpSource>,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind readiness probe on {listen_addr}"))?;
    let local_addr = listener.local_addr()?;

    let app = router(resolver);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Readiness probe server stopped: {}", e);
        }
    });

    info!("Readiness probe listening on {}", local_addr);
    Ok((local_addr, handle))
}

async fn live(Query(query): Query<ProbeQuery>) -> Response {
    render(Vec::new(), query.wants_full())
}

async fn ready(State(state): State<ProbeState>, Query(query): Query<ProbeQuery>) -> Response {
    let resolver = state
        .resolver
        .probe()
        .await
        .map_err(|e| e.to_string());

    render(vec![(RESOLVER_CHECK, resolver)], query.wants_full())
}

fn render(results: Vec<(&'static str, Result<(), String>)>, full: bool) -> Response {
    let healthy = results.iter().all(|(_, result)| result.is_ok());
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut body = serde_json::Map::new();
    if full {
        for (name, result) in results {
            let value = match result {
                Ok(()) => "OK".to_string(),
                Err(e) => e,
            };
            body.insert(name.to_string(), serde_json::Value::String(value));
        }
    }

    (status, Json(serde_json::Value::Object(body))).into_response()
}
