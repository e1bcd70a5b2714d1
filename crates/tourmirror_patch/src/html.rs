use std::path::Path;

use serde_json::Value;
use tracing::info;
use tracing::warn;

use tourmirror_core::prefetch;

use crate::captured::extend_valid_until;

/// External origins the page references that the replay origin serves
/// instead. The leading quote keeps the match anchored to whole url
/// literals.
const REMOTE_ORIGIN_PREFIXES: &[&str] = &[
  "\"https://cdn-1.matterport.com/",
  "\"https://mp-app-prod.global.ssl.fastly.net/",
  "\"https://events.matterport.com/",
  "\"https://cdn-2.matterport.com/",
];

/// Forwards browser console output and page errors to the replay server's
/// /client_log endpoint, so replay problems show up in the server log.
const CLIENT_LOG_FORWARDER: &str = r#"
<script>
(function () {
  var pass = { INFO: console.log, WARN: console.warn, ERROR: console.error };
  function forward(level, parts) {
    try {
      fetch("/client_log", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({
          level: level,
          message: Array.from(parts).map(String).join(" "),
          timestamp: new Date().toISOString()
        })
      });
    } catch (e) {}
  }
  console.log = function () { forward("INFO", arguments); pass.INFO.apply(console, arguments); };
  console.warn = function () { forward("WARN", arguments); pass.WARN.apply(console, arguments); };
  console.error = function () { forward("ERROR", arguments); pass.ERROR.apply(console, arguments); };
  window.onerror = function (message, source, lineno, colno) {
    forward("ERROR", [message + " at " + source + ":" + lineno + ":" + colno]);
  };
  window.addEventListener("unhandledrejection", function (event) {
    forward("ERROR", ["unhandled rejection: " + event.reason]);
  });
})();
</script>"#;

pub struct IndexHtmlContext<'a> {
  pub page_id: &'a str,
  pub static_base: &'a str,
  /// Origin the rewritten page loads everything from, e.g.
  /// "http://localhost:8080/".
  pub local_origin: &'a str,
  pub three_min_url: Option<&'a str>,
}

/// Rewrites the captured show page for local serving: assets come off the
/// local origin, a guard pins the query string to this model, expiry stamps
/// move out of reach, and the console forwarder rides along.
pub fn prepare_index_html(html: &str, ctx: &IndexHtmlContext) -> String {
  let redirect_guard = format!(
    r#"if (window.location.search != "?m={id}") {{ document.location.search = "?m={id}"; }}"#,
    id = ctx.page_id
  );

  let mut content = html.replace(ctx.static_base, ctx.local_origin).replace(
    "window.MP_PREFETCHED_MODELDATA",
    &format!("{redirect_guard};window.MP_PREFETCHED_MODELDATA"),
  );
  for prefix in REMOTE_ORIGIN_PREFIXES {
    content = content.replace(prefix, &format!("\"{}", ctx.local_origin));
  }
  if let Some(three) = ctx.three_min_url {
    content = content.replace(
      three,
      &format!("./{}", three.replace("https://static.matterport.com/", "")),
    );
  }
  let content = extend_valid_until(&content);
  content.replace("<head>", &format!("<head>{CLIENT_LOG_FORWARDER}"))
}

/// Folds captured operation responses into the page's embedded prefetch
/// payload so the client starts with warm query data. Reapplying with the
/// same operations reproduces the same page.
pub fn inject_prefetched_queries(html: &str, operations: &[(String, Value)]) -> String {
  let Some(raw) = prefetch::extract_raw(html) else {
    warn!("page carries no prefetch payload, captured operations not injected");
    return html.to_string();
  };
  let mut data: Value = match serde_json::from_str(&prefetch::unescape(raw)) {
    Ok(value) => value,
    Err(error) => {
      warn!("prefetch payload did not decode, leaving the page as is: {error}");
      return html.to_string();
    }
  };
  let Value::Object(ref mut payload) = data else {
    warn!("prefetch payload is not an object, leaving the page as is");
    return html.to_string();
  };

  let queries = payload
    .entry("queries")
    .or_insert_with(|| Value::Object(Default::default()));
  if let Value::Object(queries) = queries {
    for (operation, response) in operations {
      queries.insert(operation.clone(), response.clone());
    }
    info!("injected {} captured operations into the prefetch payload", operations.len());
  }

  let raw = raw.to_string();
  html.replace(&raw, &prefetch::escape(&data.to_string()))
}

/// Captured operation responses under api/mp/models, decoded and sorted by
/// operation name. Corrupt captures are skipped.
pub fn load_captured_operations(models_dir: &Path) -> Vec<(String, Value)> {
  let entries = match std::fs::read_dir(models_dir) {
    Ok(entries) => entries,
    Err(error) => {
      warn!("no captured operations at {}: {error}", models_dir.display());
      return Vec::new();
    }
  };

  let mut operations = Vec::new();
  for entry in entries.flatten() {
    let file_name = entry.file_name();
    let Some(file_name) = file_name.to_str() else {
      continue;
    };
    let Some(operation) = file_name.strip_prefix("graph_").and_then(|n| n.strip_suffix(".json"))
    else {
      continue;
    };
    let raw = match std::fs::read_to_string(entry.path()) {
      Ok(raw) => raw,
      Err(error) => {
        warn!("skipping unreadable capture {file_name}: {error}");
        continue;
      }
    };
    match serde_json::from_str(&raw) {
      Ok(value) => operations.push((operation.to_string(), value)),
      Err(error) => warn!("skipping corrupt capture {file_name}: {error}"),
    }
  }
  operations.sort_by(|a, b| a.0.cmp(&b.0));
  operations
}
