use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use tourmirror_core::prefetch;

pub const STATIC_ORIGIN: &str = "https://static.matterport.com/";

/// Either of these means the page cannot be mirrored at all, so they abort
/// the run instead of degrading it.
#[derive(Debug, Error, PartialEq)]
pub enum PageAnalysisError {
  #[error("the show page carries no static asset base")]
  MissingStaticBase,
  #[error("no signed model access url in the page markup or prefetch payload")]
  MissingAccessUrl,
}

/// Structural facts pulled from the live show page. Everything downstream
/// keys off these.
#[derive(Clone, Debug, PartialEq)]
pub struct PageAnalysis {
  pub static_base: String,
  /// Signed URL template with a `{filename}` hole, used for sweep tiles.
  pub access_url: String,
  /// Same shape, but routed the way the mesh CDN expects.
  pub mesh_access_url: String,
  pub runtime_path: Option<String>,
  pub showcase_path: Option<String>,
  pub three_min_url: Option<String>,
  pub webgl_vendors: Vec<String>,
}

static STATIC_BASE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"<base href="(https://static\.matterport\.com/.*?)">"#).unwrap());

static THREE_MODULE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"https://static\.matterport\.com/webgl-vendors/three/[a-z0-9\-_/.]*/three\.module\.min\.js")
    .unwrap()
});

static THREE_LEGACY: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"https://static\.matterport\.com/webgl-vendors/three/[a-z0-9\-_/.]*/three\.min\.js")
    .unwrap()
});

static SIGNED_MODEL_URL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r#""(https://cdn-\d*\.matterport\.com/models/[a-z0-9\-_/.]*/)([\{\}0-9a-z_/<>\\u.]+)(\?t=.*?)""#,
  )
  .unwrap()
});

static RUNTIME_SRC: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"src="(js/runtime~showcase\.[a-f0-9]+\.js)""#).unwrap());

static SHOWCASE_SRC: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"src="(js/showcase\.[a-f0-9]+\.js)""#).unwrap());

static SCRIPT_SRC: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"<script[^>]+src=["']([^"']+)["']"#).unwrap());

static LINK_HREF: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"<link[^>]+href=["']([^"']+)["']"#).unwrap());

pub fn analyze_page(html: &str) -> Result<PageAnalysis, PageAnalysisError> {
  let static_base = capture(&STATIC_BASE, html).ok_or(PageAnalysisError::MissingStaticBase)?;

  let three_min_url = THREE_MODULE
    .find(html)
    .or_else(|| THREE_LEGACY.find(html))
    .map(|segment| segment.as_str().to_string());
  let webgl_vendors = three_min_url.as_deref().map(webgl_vendor_urls).unwrap_or_default();
  if three_min_url.is_none() {
    warn!("no three.js reference on the page; WebGL vendor files will be missing");
  }

  let mut access_url = SIGNED_MODEL_URL.captures(html).and_then(|captures| {
    let base = captures.get(1)?.as_str();
    let query = captures.get(3)?.as_str();
    Some(format!("{base}~/{{filename}}{query}"))
  });
  let mut mesh_access_url = access_url.clone();

  if let Some(data) = prefetch::extract_value(html) {
    if let Some(template) = tileset_access_url(&data) {
      access_url = Some(template);
    }
    if let Some(template) = mesh_access_url_from(&data) {
      mesh_access_url = Some(template);
    }
  }

  let access_url = access_url.ok_or(PageAnalysisError::MissingAccessUrl)?;
  let mesh_access_url = mesh_access_url.unwrap_or_else(|| access_url.clone());

  Ok(PageAnalysis {
    static_base,
    access_url,
    mesh_access_url,
    runtime_path: capture(&RUNTIME_SRC, html),
    showcase_path: capture(&SHOWCASE_SRC, html),
    three_min_url,
    webgl_vendors,
  })
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
  pattern
    .captures(text)
    .and_then(|captures| captures.get(1))
    .map(|segment| segment.as_str().to_string())
}

/// The prefetch payload's tileset template is fresher than whatever the
/// markup regex finds, so it wins when present.
fn tileset_access_url(data: &Value) -> Option<String> {
  let template = data
    .pointer("/queries/GetModelPrefetch/data/model/assets/tilesets/0/urlTemplate")?
    .as_str()?;
  let (base, _) = template.split_once("/~/")?;
  let query = after_question_mark(template);
  info!("using the tileset access url from the prefetch payload");
  Some(format!("{base}/~/{{filename}}?{query}"))
}

fn mesh_access_url_from(data: &Value) -> Option<String> {
  let url = data
    .pointer("/queries/GetModelPrefetch/data/model/assets/meshes/0/url")?
    .as_str()?;
  if let Some((base, _)) = url.split_once("/~/") {
    // The tilde segment trips the mesh CDN; fetch straight off the base.
    let query = after_question_mark(url);
    return Some(format!("{base}/{{filename}}?{query}"));
  }
  let path = match url.split_once('?') {
    Some((path, _)) => path,
    None => url,
  };
  let file_name = path.rsplit('/').next()?;
  if file_name.is_empty() {
    return None;
  }
  Some(url.replace(file_name, "{filename}"))
}

fn after_question_mark(url: &str) -> &str {
  match url.split_once('?') {
    Some((_, query)) => query,
    None => "",
  }
}

fn webgl_vendor_urls(three_min_url: &str) -> Vec<String> {
  const SIBLINGS: &[&str] = &[
    "three.core.min.js",
    "libs/draco/gltf/draco_wasm_wrapper.js",
    "libs/draco/gltf/draco_decoder.wasm",
    "libs/basis/basis_transcoder.wasm",
    "libs/basis/basis_transcoder.js",
  ];
  let mut urls = vec![three_min_url.to_string()];
  for sibling in SIBLINGS {
    urls.push(
      three_min_url
        .replace("three.module.min.js", sibling)
        .replace("three.min.js", sibling),
    );
  }
  urls
}

/// Vendor files keep their static-origin relative path inside the mirror.
pub fn vendor_local_path(url: &str) -> String {
  url.replace(STATIC_ORIGIN, "")
}

/// Assets referenced by script and link tags in the page markup. Absolute,
/// protocol-relative, and data: references are dropped; the rest are
/// relative to the static base.
pub fn static_referenced_assets(html: &str) -> Vec<String> {
  let mut assets = Vec::new();
  for captures in SCRIPT_SRC.captures_iter(html) {
    if let Some(segment) = captures.get(1) {
      assets.push(segment.as_str().to_string());
    }
  }
  for captures in LINK_HREF.captures_iter(html) {
    if let Some(segment) = captures.get(1) {
      assets.push(segment.as_str().to_string());
    }
  }
  assets.retain(|asset| {
    !(asset.starts_with("http") || asset.starts_with("//") || asset.starts_with("data:"))
  });
  assets
}

/// Joins a static base and a relative asset without doubling or dropping
/// the slash between them.
pub fn join_static_base(base: &str, asset: &str) -> String {
  match (base.ends_with('/'), asset.starts_with('/')) {
    (true, true) => format!("{}{}", &base[..base.len() - 1], asset),
    (false, false) => format!("{base}/{asset}"),
    _ => format!("{base}{asset}"),
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  const PAGE: &str = concat!(
    r#"<html><head><base href="https://static.matterport.com/showcase-ext/25.11.3-0-gb123/">"#,
    "\n",
    r#"<script src="js/runtime~showcase.aa11bb.js"></script>"#,
    "\n",
    r#"<script src="js/showcase.cc22dd.js"></script>"#,
    "\n",
    r#"<script type="module" src="https://static.matterport.com/webgl-vendors/three/0.160.0/three.module.min.js"></script>"#,
    "\n",
    r#"<link rel="stylesheet" href="css/showcase.css">"#,
    "\n",
    r#"<script>var u = "https://cdn-1.matterport.com/models/abc123def/prefetch/{filename}?t=2-tok&k=key";</script>"#,
    "\n",
    r#"</head></html>"#,
  );

  #[test]
  fn the_page_yields_every_structural_fact() {
    let analysis = analyze_page(PAGE).unwrap();

    assert_eq!(analysis.static_base, "https://static.matterport.com/showcase-ext/25.11.3-0-gb123/");
    assert_eq!(
      analysis.access_url,
      "https://cdn-1.matterport.com/models/abc123def/prefetch/~/{filename}?t=2-tok&k=key"
    );
    assert_eq!(analysis.mesh_access_url, analysis.access_url);
    assert_eq!(analysis.runtime_path.as_deref(), Some("js/runtime~showcase.aa11bb.js"));
    assert_eq!(analysis.showcase_path.as_deref(), Some("js/showcase.cc22dd.js"));
  }

  #[test]
  fn vendor_urls_are_derived_from_the_three_reference() {
    let analysis = analyze_page(PAGE).unwrap();

    assert_eq!(analysis.webgl_vendors.len(), 6);
    assert!(analysis
      .webgl_vendors
      .contains(&String::from("https://static.matterport.com/webgl-vendors/three/0.160.0/three.core.min.js")));
    assert!(analysis.webgl_vendors.contains(&String::from(
      "https://static.matterport.com/webgl-vendors/three/0.160.0/libs/draco/gltf/draco_decoder.wasm"
    )));
  }

  #[test]
  fn prefetch_templates_override_the_markup_url() {
    let page = concat!(
      r#"<base href="https://static.matterport.com/showcase-ext/1.0/">"#,
      r#"<script>var u = "https://cdn-1.matterport.com/models/abc123def/old/{filename}?t=2-old&k=old";</script>"#,
      r#"<script>window.MP_PREFETCHED_MODELDATA = parseJSON("{\"queries\":{\"GetModelPrefetch\":{\"data\":{\"model\":{\"assets\":{\"tilesets\":[{\"urlTemplate\":\"https://cdn-2.matterport.com/models/abc123def/fresh/~/tile.jpg?t=2-new&k=new\"}],\"meshes\":[{\"url\":\"https://cdn-2.matterport.com/models/abc123def/mesh/~/thing.dam?t=2-new&k=new\"}]}}}}}}");</script>"#,
    );

    let analysis = analyze_page(page).unwrap();

    assert_eq!(
      analysis.access_url,
      "https://cdn-2.matterport.com/models/abc123def/fresh/~/{filename}?t=2-new&k=new"
    );
    assert_eq!(
      analysis.mesh_access_url,
      "https://cdn-2.matterport.com/models/abc123def/mesh/{filename}?t=2-new&k=new"
    );
  }

  #[test]
  fn missing_static_base_is_fatal() {
    assert_eq!(analyze_page("<html></html>"), Err(PageAnalysisError::MissingStaticBase));
  }

  #[test]
  fn missing_access_url_is_fatal() {
    let page = r#"<base href="https://static.matterport.com/showcase-ext/1.0/">"#;

    assert_eq!(analyze_page(page), Err(PageAnalysisError::MissingAccessUrl));
  }

  #[test]
  fn referenced_assets_keep_only_relative_urls() {
    let assets = static_referenced_assets(PAGE);

    assert_eq!(
      assets,
      vec!["js/runtime~showcase.aa11bb.js", "js/showcase.cc22dd.js", "css/showcase.css"]
    );
  }

  #[test]
  fn base_joining_normalizes_slashes() {
    assert_eq!(join_static_base("https://s.example/a/", "/b.css"), "https://s.example/a/b.css");
    assert_eq!(join_static_base("https://s.example/a", "b.css"), "https://s.example/a/b.css");
    assert_eq!(join_static_base("https://s.example/a/", "b.css"), "https://s.example/a/b.css");
  }
}
