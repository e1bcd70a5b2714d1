use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;
use tracing::info;
use tracing::warn;

use tourmirror_core::graph_ops::OperationTemplates;
use tourmirror_core::layout;
use tourmirror_fetch::credentials::AccessContext;
use tourmirror_fetch::model;
use tourmirror_fetch::orchestrator::Fetcher;
use tourmirror_fetch::orchestrator::PassStats;
use tourmirror_fetch::page;
use tourmirror_fetch::passes;
use tourmirror_fetch::transport::ReqwestTransport;
use tourmirror_fetch::transport::TransportRef;
use tourmirror_manifest::parse_css;
use tourmirror_manifest::parse_js;
use tourmirror_patch::bundle;
use tourmirror_patch::captured;
use tourmirror_patch::html;

/// Origin rewritten into index.html. The replay server answers it when run
/// with the default host and port.
pub const INDEX_LOCAL_ORIGIN: &str = "http://localhost:8080/";
/// Origin rewritten into the captured snapshots.
pub const SNAPSHOT_LOCAL_ORIGIN: &str = "http://127.0.0.1:8080";

pub struct MirrorOptions {
  pub page_id: String,
  pub base_dir: PathBuf,
  pub proxy: Option<String>,
  pub advanced_download: bool,
}

/// Runs a full mirror of one tour into downloads/<page-id>/. Individual
/// asset failures degrade the mirror; only an unusable show page aborts it.
pub async fn download(options: &MirrorOptions) -> anyhow::Result<()> {
  let root = options.base_dir.join("downloads").join(&options.page_id);
  tokio::fs::create_dir_all(&root).await?;

  let templates = OperationTemplates::load(&options.base_dir.join("graph_posts"), &options.page_id);
  if templates.is_empty() {
    warn!("no graph operation templates found, query data will not be captured");
  }

  let transport: TransportRef = Arc::new(ReqwestTransport::new(options.proxy.as_deref())?);
  let access = Arc::new(AccessContext::new());
  let fetcher = Fetcher::new(Arc::clone(&transport), Arc::clone(&access));

  info!("fetching the show page for {}", options.page_id);
  let page_url = format!("{}/show/?m={}", passes::PLAYER_ORIGIN, options.page_id);
  let page_html = String::from_utf8_lossy(&transport.get(&page_url).await?).into_owned();
  let analysis = page::analyze_page(&page_html)?;
  info!("static base is {}", analysis.static_base);

  // Fresh signing pair before the first signed fetch; the page itself can
  // carry stale credentials.
  let files_url =
    format!("{}/api/player/models/{}/files?type=3", passes::PLAYER_ORIGIN, options.page_id);
  match transport.get(&files_url).await {
    Ok(bytes) => access.observe(&String::from_utf8_lossy(&bytes)),
    Err(error) => warn!("could not refresh access credentials: {error}"),
  }

  let runtime_source = match &analysis.runtime_path {
    Some(path) => {
      let dest = root.join(path);
      if let Err(error) = fetcher.download(&format!("{}{path}", analysis.static_base), &dest).await
      {
        warn!("runtime bundle fetch failed: {error:#}");
      }
      tokio::fs::read_to_string(&dest).await.unwrap_or_default()
    }
    None => {
      warn!("the show page references no runtime bundle");
      String::new()
    }
  };
  if let Some(path) = &analysis.showcase_path {
    if let Err(error) =
      fetcher.download(&format!("{}{path}", analysis.static_base), &root.join(path)).await
    {
      warn!("showcase bundle fetch failed: {error:#}");
    }
  }

  let js_chunks = parse_js(&runtime_source);
  let css_chunks = parse_css(&runtime_source);
  info!("manifest holds {} js chunks and {} css chunks", js_chunks.len(), css_chunks.len());

  log_pass(
    "static assets",
    passes::download_assets(&fetcher, &root, &analysis.static_base, &js_chunks, &css_chunks).await,
  );
  log_pass(
    "page references",
    passes::download_static_references(&fetcher, &root, &analysis.static_base, &page_html).await,
  );
  log_pass(
    "webgl vendors",
    passes::download_webgl_vendors(&fetcher, &root, &analysis.webgl_vendors).await,
  );

  bundle::patch_main_bundle(&root)?;

  log_pass("model metadata", passes::download_info(&fetcher, &root, &options.page_id).await?);

  let player_model = match passes::load_player_model(&root, &options.page_id) {
    Ok(player_model) => Some(player_model),
    Err(error) => {
      error!("player model snapshot unusable, skipping images and tiles: {error:#}");
      None
    }
  };

  if let Some(player_model) = &player_model {
    log_pass("gallery images", passes::download_pics(&fetcher, &root, player_model).await);
    if options.advanced_download {
      log_pass(
        "texture crop variants",
        passes::download_crop_variants(&fetcher, &root, player_model).await,
      );
    }
  }

  info!("capturing graph operations");
  passes::download_graph_operations(&fetcher, &root, &templates).await?;
  captured::patch_captured_snapshots(&root, SNAPSHOT_LOCAL_ORIGIN)?;

  if let Some(player_model) = &player_model {
    info!("mirroring the mesh and sweep tiles");
    if let Err(error) = model::download_model(
      &fetcher,
      &root,
      player_model,
      &analysis.access_url,
      &analysis.mesh_access_url,
    )
    .await
    {
      error!("model tiles incomplete: {error:#}");
    }
  }

  // Written last so the prefetch injection sees every captured operation.
  info!("writing index.html");
  let prepared = html::prepare_index_html(
    &page_html,
    &html::IndexHtmlContext {
      page_id: &options.page_id,
      static_base: &analysis.static_base,
      local_origin: INDEX_LOCAL_ORIGIN,
      three_min_url: analysis.three_min_url.as_deref(),
    },
  );
  let operations = html::load_captured_operations(&root.join("api/mp/models"));
  tokio::fs::write(root.join("index.html"), html::inject_prefetched_queries(&prepared, &operations))
    .await?;

  // The analytics path must exist as a file for the replay fallback.
  let event_placeholder = root.join("api/v1/event");
  if !event_placeholder.exists() {
    tokio::fs::create_dir_all(root.join("api/v1")).await?;
    tokio::fs::write(&event_placeholder, b"").await?;
  }

  info!("mirror of {} complete at {}", options.page_id, root.display());
  Ok(())
}

/// Resolves a previously downloaded mirror, erroring with a hint when none
/// exists.
pub fn resolve_mirror_root(base_dir: &Path, page_id: &str) -> anyhow::Result<PathBuf> {
  layout::resolve_mirror_dir(base_dir, page_id).ok_or_else(|| {
    anyhow::anyhow!("no mirror for {page_id} under {}, run download first", base_dir.display())
  })
}

fn log_pass(label: &str, stats: PassStats) {
  info!("{label}: {} fetched, {} skipped, {} failed", stats.fetched, stats.skipped, stats.failed);
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn mirrors_resolve_from_the_downloads_directory() {
    let base = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(base.path().join("downloads/abc123")).unwrap();

    let root = resolve_mirror_root(base.path(), "abc123").unwrap();

    assert_eq!(root, base.path().join("downloads/abc123"));
  }

  #[test]
  fn a_missing_mirror_names_the_search_directory() {
    let base = tempfile::tempdir().unwrap();

    let error = resolve_mirror_root(base.path(), "abc123").unwrap_err();

    assert!(error.to_string().contains("abc123"));
    assert!(error.to_string().contains("run download first"));
  }
}
