use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing::info_span;
use tracing::Span;

use tourmirror_core::graph_ops::OperationTemplates;
use tourmirror_core::layout;

mod rewrite;
mod routes;

/// Read-only state shared by every request: the mirror root, the discovered
/// hashed bundle name, and the operation templates.
#[derive(Clone)]
pub struct ServerState {
  inner: Arc<StateInner>,
}

struct StateInner {
  root: PathBuf,
  showcase_file: Option<String>,
  templates: OperationTemplates,
}

impl ServerState {
  pub fn new(root: PathBuf, templates: OperationTemplates) -> Self {
    let showcase_file = layout::find_showcase_file(&root.join("js"));
    match &showcase_file {
      Some(name) => info!("aliasing /js/showcase.js to {name}"),
      None => info!("no hashed showcase bundle found under js/"),
    }
    Self {
      inner: Arc::new(StateInner { root, showcase_file, templates }),
    }
  }

  pub fn root(&self) -> &Path {
    &self.inner.root
  }

  pub(crate) fn showcase_file(&self) -> Option<&str> {
    self.inner.showcase_file.as_deref()
  }

  pub(crate) fn templates(&self) -> &OperationTemplates {
    &self.inner.templates
  }
}

pub fn app(state: ServerState) -> Router {
  // Everything that is not an explicit API route is a mirror file lookup,
  // with the rewrite middleware fixing up paths the mirror spells
  // differently than the client asks for them.
  let mirror = Router::new()
    .fallback_service(ServeDir::new(state.root()))
    .layer(axum::middleware::from_fn_with_state(state.clone(), rewrite::rewrite_request));

  Router::new()
    .route("/api/mp/models/graph", get(routes::graph_get).post(routes::graph_post))
    .route("/api/mp/accounts/graph", post(routes::graph_post))
    .route("/client_log", post(routes::client_log))
    .route("/api/v1/event", post(routes::event_sink))
    .route("/api/v1/event/{*rest}", post(routes::event_sink))
    .route("/api/v2/config/showcase", get(routes::config_showcase).post(routes::config_showcase))
    .route("/geoip", get(routes::geoip).post(routes::geoip))
    .route("/geoip/{*rest}", get(routes::geoip).post(routes::geoip))
    .route(
      "/api/v1/jsonstore/model/plugins/{*rest}",
      get(routes::plugins_stub).post(routes::plugins_stub),
    )
    .fallback_service(mirror)
    .with_state(state)
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
          info_span!("request", method = ?request.method(), uri = ?request.uri())
        })
        .on_response(|response: &Response, latency: Duration, _span: &Span| {
          info!("{} in {latency:?}", response.status());
        }),
    )
}

/// Binds and serves until the process is stopped.
pub async fn serve(state: ServerState, host: &str, port: u16) -> anyhow::Result<()> {
  let app = app(state);
  let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
  info!("replay server listening on http://{}/", listener.local_addr()?);
  axum::serve(listener, app).await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use axum::body::Body;
  use axum::http::header;
  use axum::http::Method;
  use axum::http::Request;
  use axum::http::StatusCode;
  use pretty_assertions::assert_eq;
  use tower::ServiceExt;

  use super::*;

  fn mirror() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("js")).unwrap();
    std::fs::create_dir_all(root.join("locale")).unwrap();
    std::fs::create_dir_all(root.join("api/mp/models")).unwrap();
    std::fs::write(root.join("index.html"), "<html>tour</html>").unwrap();
    std::fs::write(root.join("js/showcase.ab12cd.js"), "patched bundle").unwrap();
    std::fs::write(root.join("locale/strings.json"), r#"{"base": true}"#).unwrap();
    std::fs::write(root.join("api/mp/models/graph_GetSnapshots.json"), r#"{"data":{"snaps":[]}}"#)
      .unwrap();
    dir
  }

  fn state_for(mirror: &tempfile::TempDir) -> ServerState {
    ServerState::new(mirror.path().to_path_buf(), OperationTemplates::default())
  }

  async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
  }

  fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
  }

  fn post_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
      .method(Method::POST)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  #[tokio::test]
  async fn mirror_files_are_served_directly() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, body) = send(app, get_request("/index.html")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html>tour</html>");
  }

  #[tokio::test]
  async fn the_plain_showcase_name_aliases_to_the_hashed_bundle() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, body) = send(app, get_request("/js/showcase.js")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "patched bundle");
  }

  #[tokio::test]
  async fn unmirrored_locales_fall_back_to_the_base_strings() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, body) = send(app, get_request("/locale/messages/strings_de.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"base": true}"#);
  }

  #[tokio::test]
  async fn mirrored_locales_are_not_redirected() {
    let mirror = mirror();
    std::fs::create_dir_all(mirror.path().join("locale/messages")).unwrap();
    std::fs::write(mirror.path().join("locale/messages/strings_de.json"), r#"{"de": true}"#)
      .unwrap();
    let app = app(state_for(&mirror));

    let (_, body) = send(app, get_request("/locale/messages/strings_de.json")).await;

    assert_eq!(body, r#"{"de": true}"#);
  }

  #[tokio::test]
  async fn crop_queries_resolve_to_variant_files() {
    let mirror = mirror();
    std::fs::create_dir_all(mirror.path().join("models/x")).unwrap();
    std::fs::write(mirror.path().join("models/x/pic.jpg"), "plain").unwrap();
    std::fs::write(
      mirror.path().join("models/x/pic.jpgwidth=512_crop=1024,1024,x0.5,y0.0.jpg"),
      "variant",
    )
    .unwrap();
    let app = app(state_for(&mirror));

    let (_, cropped) = send(
      app.clone(),
      get_request("/models/x/pic.jpg?width=512&crop=1024,1024,x0.5,y0.0"),
    )
    .await;
    let (_, plain) = send(app, get_request("/models/x/pic.jpg?crop=nosuchvariant")).await;

    assert_eq!(cropped, "variant");
    assert_eq!(plain, "plain");
  }

  #[tokio::test]
  async fn captured_operations_win_over_everything() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, body) = send(
      app,
      post_request("/api/mp/models/graph", r#"{"operationName":"GetSnapshots","variables":{}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"data":{"snaps":[]}}"#);
  }

  #[tokio::test]
  async fn unknown_operations_get_the_empty_envelope_not_a_404() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, body) = send(
      app,
      post_request("/api/mp/models/graph", r#"{"operationName":"NeverCaptured"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"data": "empty"}"#);
  }

  #[tokio::test]
  async fn templates_answer_when_no_capture_exists() {
    let mirror = mirror();
    let templates_dir = tempfile::tempdir().unwrap();
    std::fs::write(
      templates_dir.path().join("graph_GetModelViewPrefetch.json"),
      r#"{"operationName":"GetModelViewPrefetch","variables":{"id":"[MATTERPORT_MODEL_ID]"}}"#,
    )
    .unwrap();
    let templates = OperationTemplates::load(templates_dir.path(), "abc123");
    let app = app(ServerState::new(mirror.path().to_path_buf(), templates));

    let (status, body) = send(
      app,
      post_request("/api/mp/models/graph", r#"{"operationName":"GetModelViewPrefetch"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""id":"abc123""#));
  }

  #[tokio::test]
  async fn graph_get_resolves_the_operation_from_the_query() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, body) =
      send(app, get_request("/api/mp/models/graph?operationName=GetSnapshots")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"data":{"snaps":[]}}"#);
  }

  #[tokio::test]
  async fn stray_posts_are_answered_like_gets() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, body) = send(app, post_request("/index.html", "ignored")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html>tour</html>");
  }

  #[tokio::test]
  async fn stub_endpoints_always_answer() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (config_status, config) = send(app.clone(), get_request("/api/v2/config/showcase")).await;
    let (geoip_status, geoip) = send(app.clone(), get_request("/geoip/resolve")).await;
    let (event_status, _) = send(app.clone(), post_request("/api/v1/event", "{}")).await;
    let (plugins_status, plugins) =
      send(app, get_request("/api/v1/jsonstore/model/plugins/whatever")).await;

    assert_eq!(config_status, StatusCode::OK);
    assert!(config.contains("showcase"));
    assert_eq!(geoip_status, StatusCode::OK);
    assert!(geoip.contains("country_code"));
    assert_eq!(event_status, StatusCode::OK);
    assert_eq!(plugins_status, StatusCode::OK);
    assert_eq!(plugins, "{}");
  }

  #[tokio::test]
  async fn the_logo_suffix_gets_a_transparent_svg() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let response = app
      .oneshot(get_request("/assets/images/logo-white-r.svg"))
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
      response.headers().get(header::CONTENT_TYPE).unwrap(),
      "image/svg+xml"
    );
  }

  #[tokio::test]
  async fn missing_files_are_a_plain_404() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (status, _) = send(app, get_request("/nope/missing.js")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn client_log_accepts_structured_and_raw_bodies() {
    let mirror = mirror();
    let app = app(state_for(&mirror));

    let (structured, _) = send(
      app.clone(),
      post_request("/client_log", r#"{"level":"ERROR","message":"three failed"}"#),
    )
    .await;
    let (raw, _) = send(app, post_request("/client_log", "not json at all")).await;

    assert_eq!(structured, StatusCode::OK);
    assert_eq!(raw, StatusCode::OK);
  }
}
