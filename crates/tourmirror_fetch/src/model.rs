use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;
use tracing::warn;

use tourmirror_core::task::DownloadTask;

use crate::catalog;
use crate::orchestrator::Fetcher;
use crate::passes::PlayerModel;

/// Sweep tiles are small and plentiful, so they run twice as wide as the
/// asset passes.
pub const SWEEP_POOL_WIDTH: usize = 32;

static ACCESS_ID: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"models/([a-z0-9\-_./~]*)/\{filename\}").unwrap());

/// Pulls the mesh archive, its texture tiles, and every sweep tile grid into
/// models/<access-id>/.
pub async fn download_model(
  fetcher: &Fetcher,
  root: &Path,
  model: &PlayerModel,
  access_url: &str,
  mesh_access_url: &str,
) -> anyhow::Result<()> {
  let access_id = ACCESS_ID
    .captures(access_url)
    .and_then(|captures| captures.get(1))
    .map(|segment| segment.as_str().to_string())
    .ok_or_else(|| anyhow::anyhow!("access url {access_url} carries no model path"))?;

  let model_root = root.join("models").join(&access_id);
  tokio::fs::create_dir_all(&model_root).await?;

  download_mesh(fetcher, &model_root, mesh_access_url, &model.job.uuid).await?;
  download_sweeps(fetcher, &model_root, access_url, &model.sweeps).await;
  Ok(())
}

async fn download_mesh(
  fetcher: &Fetcher,
  model_root: &Path,
  mesh_access_url: &str,
  uuid: &str,
) -> anyhow::Result<()> {
  let dam_name = format!("{uuid}_50k.dam");
  let dam_path = model_root.join(&dam_name);
  fetcher.download(&fill_template(mesh_access_url, &dam_name), &dam_path).await?;
  // The client also resolves the archive one directory up.
  if let Some(parent) = model_root.parent() {
    tokio::fs::copy(&dam_path, parent.join(&dam_name)).await?;
  }

  // Texture indices are dense from zero; the first missing tile ends the set.
  for index in 0..1000 {
    for quality in ["high", "low"] {
      let tile = format!("{uuid}_50k_texture_jpg_{quality}/{uuid}_50k_{index:03}.jpg");
      let url = fill_template(mesh_access_url, &tile);
      if let Err(error) = fetcher.download(&url, &model_root.join(&tile)).await {
        warn!("texture tile set ends at {tile}: {error:#}");
        return Ok(());
      }
    }
  }
  Ok(())
}

async fn download_sweeps(
  fetcher: &Fetcher,
  model_root: &Path,
  access_url: &str,
  sweeps: &[String],
) {
  let variants = catalog::tile_variants();
  let mut tasks = Vec::with_capacity(sweeps.len() * variants.len());
  for sweep in sweeps {
    let sweep = sweep.replace('-', "");
    for variant in &variants {
      let tile = format!("tiles/{sweep}/{variant}");
      tasks.push(DownloadTask::new(
        format!("{}&imageopt=1", fill_template(access_url, &tile)),
        model_root.join(&tile),
      ));
    }
  }
  info!("mirroring {} sweep tiles across {} sweeps", tasks.len(), sweeps.len());
  let stats = fetcher.download_many(tasks, SWEEP_POOL_WIDTH).await;
  info!(
    "sweep tiles: {} fetched, {} skipped, {} failed",
    stats.fetched, stats.skipped, stats.failed
  );
}

fn fill_template(template: &str, filename: &str) -> String {
  template.replace("{filename}", filename)
}
