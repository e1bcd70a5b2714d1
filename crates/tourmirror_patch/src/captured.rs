use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

/// Captured snapshots that embed absolute CDN urls the replay origin has to
/// own for the client to load tiles locally.
const SNAPSHOTS_WITH_CDN_URLS: &[&str] = &[
  "graph_GetModelDetails.json",
  "graph_GetSnapshots.json",
  "graph_GetModelViewPrefetch.json",
];

const MODEL_CDN_ORIGIN: &str = "https://cdn-2.matterport.com";

static VALID_UNTIL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"validUntil":\s*"20\d{2}-\d{2}-\d{2}T"#).unwrap());

/// Pushes signed-url expiry stamps far enough out that replayed data never
/// goes stale. 2099 is its own fixed point, so reapplication is a no-op.
pub(crate) fn extend_valid_until(text: &str) -> String {
  VALID_UNTIL.replace_all(text, r#"validUntil":"2099-01-01T"#).into_owned()
}

/// Points the CDN urls inside the captured graph snapshots at the local
/// origin and extends their expiry stamps. Snapshots that were never
/// captured are skipped.
pub fn patch_captured_snapshots(root: &Path, local_origin: &str) -> anyhow::Result<()> {
  let models_dir = root.join("api/mp/models");
  for name in SNAPSHOTS_WITH_CDN_URLS {
    let path = models_dir.join(name);
    if !path.exists() {
      continue;
    }
    let text = std::fs::read_to_string(&path)?;
    let patched = extend_valid_until(&text.replace(MODEL_CDN_ORIGIN, local_origin));
    std::fs::write(&path, patched)?;
    info!("patched {name} for local replay");
  }
  Ok(())
}
