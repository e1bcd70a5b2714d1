use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;
use tracing::warn;

use tourmirror_core::layout;

// The conjunct that discards signed urls once their expiry stamp passes.
static EXPIRY_GUARD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"&&\(!e\.expires\|\|.{1,10}\*e\.expires>Date\.now\(\)\)").unwrap());

const GEOIP_CALL: &str =
  r#"e.get("https://static.matterport.com/geoip/",{responseType:"json",priority:i.RequestPriority.LOW})"#;
const GEOIP_STUB: &str =
  r#"{"country_code":"US","country_name":"united states","region":"CA","city":"los angeles"}"#;

/// Rewrites the main bundle for offline replay: expiry checks dropped, API
/// and base urls made origin-relative, the geoip lookup replaced with a
/// canned answer, and the static origin stripped. Reapplying the rewrite to
/// already-patched text changes nothing.
pub fn rewrite_main_bundle(source: &str) -> String {
  let source = EXPIRY_GUARD.replace_all(source, "");
  let source = source.replace(r#""/api/mp/"#, "`${window.location.pathname}`+\"api/mp/");
  let source =
    source.replace("${this.baseUrl}", "${window.location.origin}${window.location.pathname}");
  let source = source.replace(GEOIP_CALL, GEOIP_STUB);
  source.replace("https://static.matterport.com", "")
}

/// Applies the bundle rewrite to the hashed showcase file under js/ and
/// returns its name. A mirror without one is left alone.
pub fn patch_main_bundle(root: &Path) -> anyhow::Result<Option<String>> {
  let js_dir = root.join("js");
  let Some(file_name) = layout::find_showcase_file(&js_dir) else {
    warn!("no showcase bundle under {}, nothing to patch", js_dir.display());
    return Ok(None);
  };
  let path = js_dir.join(&file_name);
  let source = std::fs::read_to_string(&path)?;
  std::fs::write(&path, rewrite_main_bundle(&source))?;
  info!("patched {file_name} for offline replay");
  Ok(Some(file_name))
}
