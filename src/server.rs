//! HTTP transport: health and version endpoints plus one wildcard route
//! resolving modules against the live context snapshot.
//!
//! GET carries parameters in the query string and is only wired for
//! queryable (single SELECT) modules; POST carries a JSON object body and
//! works for every module.

use crate::error::Error;
use crate::state::ServerState;
use crate::value::{Parameters, Row, SqlValue};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn run_get(
    State(state): State<ServerState>,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Row>>, Error> {
    let context = state.context();
    let executor = context
        .executor_for_path(&path)
        .ok_or_else(|| Error::ModuleNotFound(path.clone()))?;
    if executor.module().mutates_data() {
        return Err(Error::MethodNotAllowed(path));
    }
    let parameters: Parameters = query
        .into_iter()
        .map(|(name, value)| (name, SqlValue::Text(value)))
        .collect();
    let rows = executor.run(parameters).await?;
    Ok(Json(rows))
}

async fn run_post(
    State(state): State<ServerState>,
    Path(path): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<Vec<Row>>, Error> {
    let context = state.context();
    let executor = context
        .executor_for_path(&path)
        .ok_or_else(|| Error::ModuleNotFound(path.clone()))?;
    let parameters: Parameters = match &body {
        serde_json::Value::Null => Parameters::new(),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(name, value)| (name.clone(), SqlValue::from_json(value)))
            .collect(),
        _ => {
            return Err(Error::BadRequest(
                "request body must be a JSON object of parameters".to_string(),
            ))
        }
    };
    let rows = executor.run(parameters).await?;
    Ok(Json(rows))
}

/// Build the router. One wildcard route serves every module; the module
/// set is whatever the state's current snapshot holds, so a reload takes
/// effect without rebuilding the router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/*path", get(run_get).post(run_post))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process stops.
pub async fn serve(state: ServerState, port: u16) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
