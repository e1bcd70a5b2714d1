use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use tourmirror_core::chunk::ChunkEntry;
use tourmirror_core::chunk::CssChunkEntry;
use tourmirror_core::graph_ops;
use tourmirror_core::graph_ops::OperationTemplates;
use tourmirror_core::layout;
use tourmirror_core::task::DownloadTask;

use crate::catalog;
use crate::orchestrator::Fetcher;
use crate::orchestrator::PassStats;
use crate::page;

pub const PLAYER_ORIGIN: &str = "https://my.matterport.com";

/// Asset and metadata fetches run this wide; sweep tiles run wider, see
/// [`crate::model::SWEEP_POOL_WIDTH`].
pub const ASSET_POOL_WIDTH: usize = 16;

/// The slice of the player model snapshot the passes actually consume.
#[derive(Debug, Deserialize)]
pub struct PlayerModel {
  #[serde(default)]
  pub images: Vec<PlayerImage>,
  pub job: ModelJob,
  #[serde(default)]
  pub sweeps: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerImage {
  pub src: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelJob {
  pub uuid: String,
}

/// Reads the player model snapshot a previous pass mirrored to disk.
pub fn load_player_model(root: &Path, page_id: &str) -> anyhow::Result<PlayerModel> {
  let path = root.join(format!("api/v1/player/models/{page_id}/index.html"));
  let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("decoding {}", path.display()))
}

/// Mirrors the static-origin asset set: catalogs plus manifest chunks.
pub async fn download_assets(
  fetcher: &Fetcher,
  root: &Path,
  static_base: &str,
  js_chunks: &[ChunkEntry],
  css_chunks: &[CssChunkEntry],
) -> PassStats {
  let mut tasks =
    vec![DownloadTask::new(format!("{PLAYER_ORIGIN}/favicon.ico"), root.join("favicon.ico"))];
  for asset in catalog::static_assets(js_chunks, css_chunks) {
    tasks.push(DownloadTask::new(
      format!("{static_base}{asset}"),
      root.join(layout::local_asset_path(&asset)),
    ));
  }
  info!("mirroring {} static assets", tasks.len());
  fetcher.download_many(tasks, ASSET_POOL_WIDTH).await
}

/// Mirrors everything the page markup references from the static origin.
pub async fn download_static_references(
  fetcher: &Fetcher,
  root: &Path,
  static_base: &str,
  html: &str,
) -> PassStats {
  let tasks: Vec<DownloadTask> = page::static_referenced_assets(html)
    .into_iter()
    .map(|asset| {
      DownloadTask::new(
        page::join_static_base(static_base, &asset),
        root.join(layout::local_asset_path(&asset)),
      )
    })
    .collect();
  fetcher.download_many(tasks, ASSET_POOL_WIDTH).await
}

pub async fn download_webgl_vendors(
  fetcher: &Fetcher,
  root: &Path,
  vendors: &[String],
) -> PassStats {
  let tasks: Vec<DownloadTask> = vendors
    .iter()
    .map(|url| DownloadTask::new(url.clone(), root.join(page::vendor_local_path(url))))
    .collect();
  fetcher.download_many(tasks, ASSET_POOL_WIDTH).await
}

/// Mirrors the model metadata endpoints and files snapshots, then registers
/// the alternate access queries those snapshots carry.
pub async fn download_info(fetcher: &Fetcher, root: &Path, page_id: &str) -> anyhow::Result<PassStats> {
  let endpoints = [
    format!("api/v1/jsonstore/model/highlights/{page_id}"),
    format!("api/v1/jsonstore/model/Labels/{page_id}"),
    format!("api/v1/jsonstore/model/mattertags/{page_id}"),
    format!("api/v1/jsonstore/model/measurements/{page_id}"),
    format!("api/v1/jsonstore/model/trims/{page_id}"),
    format!("api/v1/player/models/{page_id}/thumb?width=1707&dpr=1.5&disable=upscale"),
    format!("api/v1/player/models/{page_id}/"),
    format!("api/v2/models/{page_id}/sweeps"),
    String::from("api/v2/users/current"),
    format!("api/player/models/{page_id}/files"),
    String::from("api/v1/plugins?manifest=true"),
  ];
  let tasks: Vec<DownloadTask> = endpoints
    .iter()
    .map(|endpoint| {
      DownloadTask::new(
        format!("{PLAYER_ORIGIN}/{endpoint}"),
        root.join(layout::local_asset_path(endpoint)),
      )
    })
    .collect();
  let mut stats = fetcher.download_many(tasks, ASSET_POOL_WIDTH).await;

  // The replay endpoint needs a body even before any operation is captured.
  let models_dir = root.join("api/mp/models");
  tokio::fs::create_dir_all(&models_dir).await?;
  tokio::fs::write(models_dir.join("graph"), br#"{"data": "empty"}"#).await?;

  for file_type in 1..=3 {
    let url = format!("{PLAYER_ORIGIN}/api/player/models/{page_id}/files?type={file_type}");
    let dest = root.join(format!("api/player/models/{page_id}/files_type{file_type}"));
    match fetcher.download(&url, &dest).await {
      Ok(outcome) => stats.record(outcome),
      Err(error) => {
        warn!("files snapshot type {file_type} failed: {error:#}");
        stats.failed += 1;
      }
    }
  }

  register_alternate_queries(fetcher, root, page_id);
  Ok(stats)
}

/// The files snapshots carry their own signed URLs; their query strings are
/// the alternates retried when the primary credentials are refused.
fn register_alternate_queries(fetcher: &Fetcher, root: &Path, page_id: &str) {
  let files_dir = root.join(format!("api/player/models/{page_id}"));

  match read_json(&files_dir.join("files_type2")) {
    Ok(snapshot) => {
      let query = snapshot
        .get("base.url")
        .and_then(Value::as_str)
        .and_then(|url| url.rsplit('?').next());
      match query {
        Some(query) => fetcher.access().add_alternate(query.to_string()),
        None => warn!("files_type2 snapshot carries no base url"),
      }
    }
    Err(error) => warn!("files_type2 snapshot unusable: {error:#}"),
  }

  match read_json(&files_dir.join("files_type3")) {
    Ok(snapshot) => {
      let query = snapshot
        .get("templates")
        .and_then(Value::as_array)
        .and_then(|templates| templates.first())
        .and_then(Value::as_str)
        .and_then(|url| url.rsplit('?').next());
      match query {
        Some(query) => fetcher.access().add_alternate(query.to_string()),
        None => warn!("files_type3 snapshot carries no templates"),
      }
    }
    Err(error) => warn!("files_type3 snapshot unusable: {error:#}"),
  }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
  let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("decoding {}", path.display()))
}

/// Mirrors the gallery images the player model snapshot references.
pub async fn download_pics(fetcher: &Fetcher, root: &Path, model: &PlayerModel) -> PassStats {
  let tasks: Vec<DownloadTask> = model
    .images
    .iter()
    .filter_map(|image| {
      let local = layout::local_path_for_url(&image.src)?;
      Some(DownloadTask::new(image.src.clone(), root.join(local)))
    })
    .collect();
  fetcher.download_many(tasks, ASSET_POOL_WIDTH).await
}

/// Captures one response per templated graph operation. Capture failures are
/// logged and skipped; the replay server degrades to the request template.
pub async fn download_graph_operations(
  fetcher: &Fetcher,
  root: &Path,
  templates: &OperationTemplates,
) -> anyhow::Result<()> {
  tokio::fs::create_dir_all(root.join("api/mp/models")).await?;
  let url = format!("{PLAYER_ORIGIN}/api/mp/models/graph");
  for (operation, body) in templates.iter() {
    let dest = graph_ops::captured_response_path(root, operation);
    if let Err(error) = fetcher.download_json_post(&url, &dest, body, operation).await {
      warn!("capturing {operation} failed: {error:#}");
    }
  }
  Ok(())
}

/// Fetches the crop and width texture variants the client may request for
/// dollhouse and floorplan views, named so the replay server's variant probe
/// finds them. Best effort: most images only exist in some variants.
pub async fn download_crop_variants(
  fetcher: &Fetcher,
  root: &Path,
  model: &PlayerModel,
) -> PassStats {
  let mut tasks = Vec::new();
  for image in &model.images {
    let Some(local) = layout::local_path_for_url(&image.src) else {
      continue;
    };
    for preset in catalog::CROP_PRESETS {
      for x in catalog::crop_offsets(preset.step_hundredths) {
        for y in catalog::crop_offsets(preset.step_hundredths) {
          let remote = format!("{}&{}", image.src, catalog::variant_query(preset, &x, &y));
          let mut variant = local.clone().into_os_string();
          variant.push(catalog::variant_file_suffix(preset, &x, &y));
          tasks.push(DownloadTask::new(remote, root.join(variant)));
        }
      }
    }
  }
  info!("requesting {} texture crop variants", tasks.len());
  fetcher.download_many(tasks, ASSET_POOL_WIDTH).await
}
