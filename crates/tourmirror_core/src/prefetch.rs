use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Matches the page's embedded prefetch payload. The capture is the escaped
/// JSON text between the parseJSON quotes.
static PREFETCHED_MODELDATA: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?s)window\.MP_PREFETCHED_MODELDATA = parseJSON\("(.+?)"\);"#).unwrap()
});

/// Returns the escaped payload segment embedded in the page, if present.
pub fn extract_raw(html: &str) -> Option<&str> {
  PREFETCHED_MODELDATA
    .captures(html)
    .and_then(|captures| captures.get(1))
    .map(|segment| segment.as_str())
}

/// Undoes the page's JSON-in-a-string escaping. Quotes are restored before
/// backslashes so escaped backslashes survive the pass.
pub fn unescape(raw: &str) -> String {
  raw.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// Applies the page's escaping convention: backslashes first, then quotes.
/// The inverse of [`unescape`].
pub fn escape(json: &str) -> String {
  json.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extracts and decodes the prefetch payload. A payload that fails to decode
/// is logged and treated as absent.
pub fn extract_value(html: &str) -> Option<Value> {
  let raw = extract_raw(html)?;
  match serde_json::from_str(&unescape(raw)) {
    Ok(value) => Some(value),
    Err(error) => {
      warn!("prefetched model data did not decode: {error}");
      None
    }
  }
}
