use std::path::Path;
use std::path::PathBuf;

use url::Url;

/// Local relative path for an asset reference. The query string is dropped
/// and directory-style references map to their index.html, so metadata
/// endpoints like `api/v1/player/models/<id>/` land as regular files.
pub fn local_asset_path(asset: &str) -> PathBuf {
  let asset = match asset.split_once('?') {
    Some((path, _)) => path,
    None => asset,
  };
  let asset = asset.trim_start_matches('/');
  if asset.is_empty() || asset.ends_with('/') {
    PathBuf::from(format!("{asset}index.html"))
  } else {
    PathBuf::from(asset)
  }
}

/// Mirror-relative path for an absolute URL: its path component without the
/// leading slash. None when the URL does not parse or has no path.
pub fn local_path_for_url(url: &str) -> Option<PathBuf> {
  let parsed = Url::parse(url).ok()?;
  let path = parsed.path().trim_start_matches('/');
  if path.is_empty() {
    return None;
  }
  Some(PathBuf::from(path))
}

/// Finds the hashed main bundle inside a mirror's js/ directory. Sorted so
/// repeated calls agree on which file an alias points at.
pub fn find_showcase_file(js_dir: &Path) -> Option<String> {
  let entries = std::fs::read_dir(js_dir).ok()?;
  let mut names: Vec<String> = entries
    .filter_map(|entry| entry.ok())
    .filter_map(|entry| entry.file_name().into_string().ok())
    .filter(|name| name.starts_with("showcase.") && name.ends_with(".js"))
    .collect();
  names.sort();
  names.into_iter().next()
}

/// Resolves the mirror directory for a page id, preferring downloads/<id>
/// with a bare <id> directory as fallback.
pub fn resolve_mirror_dir(base_dir: &Path, page_id: &str) -> Option<PathBuf> {
  let primary = base_dir.join("downloads").join(page_id);
  if primary.is_dir() {
    return Some(primary);
  }
  let fallback = base_dir.join(page_id);
  if fallback.is_dir() {
    return Some(fallback);
  }
  None
}
