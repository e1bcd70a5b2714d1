use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Query;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use tourmirror_core::graph_ops;

use crate::ServerState;

const EMPTY_ENVELOPE: &str = r#"{"data": "empty"}"#;

pub(crate) async fn graph_get(
  State(state): State<ServerState>,
  Query(params): Query<HashMap<String, String>>,
) -> Response {
  graph_response(&state, params.get("operationName").map(String::as_str)).await
}

pub(crate) async fn graph_post(State(state): State<ServerState>, body: Bytes) -> Response {
  let operation = serde_json::from_slice::<Value>(&body)
    .ok()
    .and_then(|body| body.get("operationName")?.as_str().map(str::to_string));
  if operation.is_none() {
    warn!("graph request carried no operationName");
  }
  graph_response(&state, operation.as_deref()).await
}

/// Captured response, then request template, then the empty envelope. Never
/// a 404: the client treats a failed query endpoint as fatal.
async fn graph_response(state: &ServerState, operation: Option<&str>) -> Response {
  if let Some(operation) = operation {
    let captured = graph_ops::captured_response_path(state.root(), operation);
    if let Ok(bytes) = tokio::fs::read(&captured).await {
      info!("serving the captured {operation} response");
      return json_response(bytes);
    }
    if let Some(template) = state.templates().get(operation) {
      info!("serving {operation} from its request template");
      return json_response(template.as_bytes().to_vec());
    }
    info!("nothing captured for {operation}, serving the empty envelope");
  }
  json_response(EMPTY_ENVELOPE.as_bytes().to_vec())
}

fn json_response(body: Vec<u8>) -> Response {
  ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub(crate) async fn config_showcase() -> Response {
  json_response(br#"{"application": "showcase", "application_version": "25.11.3"}"#.to_vec())
}

pub(crate) async fn geoip() -> Response {
  json_response(br#"{"city":"Unknown","country_code":"US","country_name":"United States"}"#.to_vec())
}

pub(crate) async fn plugins_stub() -> Response {
  json_response(b"{}".to_vec())
}

pub(crate) async fn event_sink() -> Response {
  json_response(b"{}".to_vec())
}

/// Receives the console output the patched page forwards and folds it into
/// the server log.
pub(crate) async fn client_log(body: Bytes) -> StatusCode {
  match serde_json::from_slice::<Value>(&body) {
    Ok(record) => {
      let level = record.get("level").and_then(Value::as_str).unwrap_or("INFO");
      let message = record.get("message").and_then(Value::as_str).unwrap_or_default();
      info!("client {level}: {message}");
    }
    Err(_) => info!("client log: {}", String::from_utf8_lossy(&body)),
  }
  StatusCode::OK
}
