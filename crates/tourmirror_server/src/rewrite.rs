use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use tracing::info;
use tracing::warn;

use crate::ServerState;

/// A path-rewrite policy. Rules run in order; the first to return a
/// replacement path wins.
type RewriteRule = fn(&ServerState, &str, &str) -> Option<String>;

const RULES: &[(&str, RewriteRule)] = &[
  ("showcase-alias", showcase_alias),
  ("locale-fallback", locale_fallback),
  ("crop-variant", crop_variant),
];

/// Wraps the mirror file service: stray POSTs are answered as GETs, paths
/// the mirror spells differently are rewritten, and 404s are logged since
/// they usually mean an incomplete mirror.
pub(crate) async fn rewrite_request(
  State(state): State<ServerState>,
  mut request: Request,
  next: Next,
) -> Response {
  if request.uri().path().ends_with("logo-white-r.svg") {
    return blank_logo();
  }

  if request.method() == Method::POST {
    info!("answering POST {} as a GET", request.uri().path());
    *request.method_mut() = Method::GET;
  }

  let path = request.uri().path().to_string();
  let query = request.uri().query().unwrap_or("").to_string();
  if let Some((rule, rewritten)) = apply_rules(&state, &path, &query) {
    info!("rewriting {path} to {rewritten} ({rule})");
    if let Ok(uri) = rewritten.parse::<Uri>() {
      *request.uri_mut() = uri;
    }
  }

  let response = next.run(request).await;
  if response.status() == StatusCode::NOT_FOUND {
    warn!("404 for {path}, the mirror may be incomplete");
  }
  response
}

fn apply_rules(state: &ServerState, path: &str, query: &str) -> Option<(&'static str, String)> {
  for &(name, rule) in RULES {
    if let Some(rewritten) = rule(state, path, query) {
      return Some((name, rewritten));
    }
  }
  None
}

/// The patched bundle asks for js/showcase.js by its plain name; serve the
/// hashed file the mirror actually holds.
fn showcase_alias(state: &ServerState, path: &str, _query: &str) -> Option<String> {
  if !path.starts_with("/js/showcase.js") || on_disk(state, path) {
    return None;
  }
  let file_name = state.showcase_file()?;
  Some(format!("/js/{file_name}"))
}

/// Locales that were never mirrored fall back to the base strings file.
fn locale_fallback(state: &ServerState, path: &str, _query: &str) -> Option<String> {
  if !path.starts_with("/locale/messages/strings_") || on_disk(state, path) {
    return None;
  }
  Some(String::from("/locale/strings.json"))
}

/// Crop requests map onto the variant files the advanced download pass
/// writes; without a matching variant the plain image answers.
fn crop_variant(state: &ServerState, path: &str, query: &str) -> Option<String> {
  if !path.ends_with(".jpg") || !query.contains("crop=") {
    return None;
  }
  let mut crop = String::new();
  let mut width = String::new();
  for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
    match key.as_ref() {
      "crop" if crop.is_empty() => crop = format!("crop={value}"),
      "width" if width.is_empty() => width = format!("width={value}_"),
      _ => {}
    }
  }
  let variant = format!("{path}{width}{crop}.jpg");
  on_disk(state, &variant).then_some(variant)
}

fn on_disk(state: &ServerState, request_path: &str) -> bool {
  state.root().join(request_path.trim_start_matches('/')).exists()
}

/// Tours reference a white logo the mirror never has; a transparent SVG
/// keeps the viewer quiet about it.
fn blank_logo() -> Response {
  (
    [(header::CONTENT_TYPE, "image/svg+xml")],
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"></svg>"#,
  )
    .into_response()
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use tourmirror_core::graph_ops::OperationTemplates;

  use super::*;

  fn state_over(dir: &tempfile::TempDir) -> ServerState {
    ServerState::new(dir.path().to_path_buf(), OperationTemplates::default())
  }

  #[test]
  fn rules_apply_in_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("js")).unwrap();
    std::fs::write(dir.path().join("js/showcase.beef01.js"), "x").unwrap();
    let state = state_over(&dir);

    let (rule, rewritten) = apply_rules(&state, "/js/showcase.js", "").unwrap();

    assert_eq!(rule, "showcase-alias");
    assert_eq!(rewritten, "/js/showcase.beef01.js");
  }

  #[test]
  fn present_paths_are_never_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("locale/messages")).unwrap();
    std::fs::write(dir.path().join("locale/messages/strings_fr.json"), "{}").unwrap();
    let state = state_over(&dir);

    assert_eq!(apply_rules(&state, "/locale/messages/strings_fr.json", ""), None);
  }

  #[test]
  fn crop_rewrites_require_the_variant_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("m")).unwrap();
    std::fs::write(dir.path().join("m/p.jpgcrop=512,512,x0.25,y0.75.jpg"), "v").unwrap();
    let state = state_over(&dir);

    let hit = apply_rules(&state, "/m/p.jpg", "crop=512,512,x0.25,y0.75");
    let miss = apply_rules(&state, "/m/p.jpg", "crop=512,512,x0.99,y0.99");

    assert_eq!(hit, Some(("crop-variant", String::from("/m/p.jpgcrop=512,512,x0.25,y0.75.jpg"))));
    assert_eq!(miss, None);
  }

  #[test]
  fn width_precedes_crop_in_variant_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("m")).unwrap();
    std::fs::write(dir.path().join("m/p.jpgwidth=512_crop=1024,1024,x0.0,y0.5.jpg"), "v").unwrap();
    let state = state_over(&dir);

    // Query order differs from file-name order; parsing normalizes it.
    let hit = apply_rules(&state, "/m/p.jpg", "crop=1024,1024,x0.0,y0.5&width=512");

    assert_eq!(
      hit,
      Some(("crop-variant", String::from("/m/p.jpgwidth=512_crop=1024,1024,x0.0,y0.5.jpg")))
    );
  }
}
