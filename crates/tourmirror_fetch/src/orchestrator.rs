use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinError;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::warn;

use tourmirror_core::task::DownloadTask;

use crate::credentials::AccessContext;
use crate::transport::TransportRef;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FetchOutcome {
  Fetched,
  AlreadyPresent,
}

/// Totals for one bulk download pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PassStats {
  pub fetched: usize,
  pub skipped: usize,
  pub failed: usize,
}

impl PassStats {
  pub fn record(&mut self, outcome: FetchOutcome) {
    match outcome {
      FetchOutcome::Fetched => self.fetched += 1,
      FetchOutcome::AlreadyPresent => self.skipped += 1,
    }
  }
}

/// Executes download tasks against a transport, consulting the shared access
/// context for every outbound URL. Clones share both.
#[derive(Clone)]
pub struct Fetcher {
  transport: TransportRef,
  access: Arc<AccessContext>,
}

impl Fetcher {
  pub fn new(transport: TransportRef, access: Arc<AccessContext>) -> Self {
    Self { transport, access }
  }

  pub fn access(&self) -> &AccessContext {
    &self.access
  }

  /// Fetches one file. Existing destinations are skipped so an interrupted
  /// mirror resumes without refetching. A status failure on a signed URL is
  /// retried once per known alternate access query before giving up.
  pub async fn download(&self, url: &str, dest: &Path) -> anyhow::Result<FetchOutcome> {
    let url = self.access.apply(url);

    if tokio::fs::try_exists(dest).await.unwrap_or(false) {
      debug!("skipping {url}, {} already present", dest.display());
      return Ok(FetchOutcome::AlreadyPresent);
    }
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }

    match self.transport.get(&url).await {
      Ok(bytes) => {
        tokio::fs::write(dest, bytes).await?;
        debug!("downloaded {url} to {}", dest.display());
        Ok(FetchOutcome::Fetched)
      }
      Err(error) if error.is_status() && url.contains("?t=") => {
        warn!("{error}, retrying with alternate access queries");
        self.download_with_alternates(&url, dest).await
      }
      Err(error) => Err(error.into()),
    }
  }

  async fn download_with_alternates(&self, url: &str, dest: &Path) -> anyhow::Result<FetchOutcome> {
    let base = match url.split_once('?') {
      Some((base, _)) => base,
      None => url,
    };
    for alternate in self.access.alternates() {
      let retry_url = format!("{base}?{alternate}");
      match self.transport.get(&retry_url).await {
        Ok(bytes) => {
          tokio::fs::write(dest, bytes).await?;
          debug!("downloaded {retry_url} through an alternate access query");
          return Ok(FetchOutcome::Fetched);
        }
        Err(error) => warn!("alternate access query failed for {retry_url}: {error}"),
      }
    }
    anyhow::bail!("every access query failed for {url}")
  }

  /// Runs a set of tasks over a bounded worker pool. Individual failures are
  /// logged and counted, never propagated: one missing asset must not take
  /// its siblings down.
  pub async fn download_many(&self, tasks: Vec<DownloadTask>, width: usize) -> PassStats {
    let mut jobs = JoinSet::new();
    let mut stats = PassStats::default();
    for task in tasks {
      if jobs.len() >= width {
        if let Some(result) = jobs.join_next().await {
          absorb(&mut stats, result);
        }
      }
      jobs.spawn({
        let fetcher = self.clone();
        async move {
          let outcome = fetcher.download(&task.remote_url, &task.local_path).await;
          (task, outcome)
        }
      });
    }
    while let Some(result) = jobs.join_next().await {
      absorb(&mut stats, result);
    }
    stats
  }

  /// Posts a JSON request body and captures the response. Skips existing
  /// captures the same way `download` does, so re-runs leave them alone.
  pub async fn download_json_post(
    &self,
    url: &str,
    dest: &Path,
    body: &str,
    descriptor: &str,
  ) -> anyhow::Result<FetchOutcome> {
    if tokio::fs::try_exists(dest).await.unwrap_or(false) {
      debug!("skipping {descriptor}, {} already present", dest.display());
      return Ok(FetchOutcome::AlreadyPresent);
    }
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = self.transport.post_json(url, body).await?;
    tokio::fs::write(dest, bytes).await?;
    debug!("captured {descriptor} to {}", dest.display());
    Ok(FetchOutcome::Fetched)
  }
}

fn absorb(
  stats: &mut PassStats,
  result: Result<(DownloadTask, anyhow::Result<FetchOutcome>), JoinError>,
) {
  match result {
    Ok((_, Ok(outcome))) => stats.record(outcome),
    Ok((task, Err(error))) => {
      warn!("failed to mirror {}: {error:#}", task.remote_url);
      stats.failed += 1;
    }
    Err(error) => {
      warn!("download task panicked: {error}");
      stats.failed += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;
  use std::sync::Mutex;

  use async_trait::async_trait;
  use pretty_assertions::assert_eq;

  use crate::transport::Transport;
  use crate::transport::TransportError;

  use super::*;

  /// Serves canned bodies and records every URL it sees. URLs with no canned
  /// body fail with a 403.
  #[derive(Default)]
  struct ScriptedTransport {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
  }

  impl ScriptedTransport {
    fn with(mut self, url: &str, body: &[u8]) -> Self {
      self.bodies.insert(url.to_string(), body.to_vec());
      self
    }

    fn requests(&self) -> Vec<String> {
      self.requests.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
      self.requests.lock().unwrap().push(url.to_string());
      self.bodies.get(url).cloned().ok_or_else(|| TransportError::Status {
        url: url.to_string(),
        status: 403,
      })
    }

    async fn post_json(&self, url: &str, _body: &str) -> Result<Vec<u8>, TransportError> {
      self.get(url).await
    }
  }

  fn fetcher_over(transport: Arc<ScriptedTransport>) -> Fetcher {
    Fetcher::new(transport, Arc::new(AccessContext::new()))
  }

  #[tokio::test]
  async fn existing_files_are_skipped() {
    let transport = Arc::new(ScriptedTransport::default().with("https://host/a", b"payload"));
    let fetcher = fetcher_over(Arc::clone(&transport));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("deep/nested/a");

    let first = fetcher.download("https://host/a", &dest).await.unwrap();
    let second = fetcher.download("https://host/a", &dest).await.unwrap();

    assert_eq!(first, FetchOutcome::Fetched);
    assert_eq!(second, FetchOutcome::AlreadyPresent);
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
  }

  #[tokio::test]
  async fn signed_failures_walk_the_alternate_queries() {
    let transport =
      Arc::new(ScriptedTransport::default().with("https://host/tile.jpg?t=2-b&k=y", b"tile"));
    let fetcher = fetcher_over(Arc::clone(&transport));
    fetcher.access().add_alternate(String::from("t=2-a&k=x"));
    fetcher.access().add_alternate(String::from("t=2-b&k=y"));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("tile.jpg");

    let outcome = fetcher.download("https://host/tile.jpg?t=2-stale&k=stale", &dest).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Fetched);
    assert_eq!(
      transport.requests(),
      vec![
        "https://host/tile.jpg?t=2-stale&k=stale",
        "https://host/tile.jpg?t=2-a&k=x",
        "https://host/tile.jpg?t=2-b&k=y",
      ]
    );
    assert_eq!(std::fs::read(&dest).unwrap(), b"tile");
  }

  #[tokio::test]
  async fn unsigned_failures_do_not_retry() {
    let transport = Arc::new(ScriptedTransport::default());
    let fetcher = fetcher_over(Arc::clone(&transport));
    fetcher.access().add_alternate(String::from("t=2-a&k=x"));
    let dir = tempfile::tempdir().unwrap();

    let result = fetcher.download("https://host/missing.css", &dir.path().join("missing.css")).await;

    assert!(result.is_err());
    assert_eq!(transport.requests().len(), 1);
  }

  #[tokio::test]
  async fn pass_failures_are_counted_not_propagated() {
    let transport = Arc::new(
      ScriptedTransport::default()
        .with("https://host/one", b"1")
        .with("https://host/two", b"2"),
    );
    let fetcher = fetcher_over(Arc::clone(&transport));
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("two"), b"already here").unwrap();

    let tasks = vec![
      DownloadTask::new("https://host/one", dir.path().join("one")),
      DownloadTask::new("https://host/two", dir.path().join("two")),
      DownloadTask::new("https://host/gone", dir.path().join("gone")),
    ];
    let stats = fetcher.download_many(tasks, 2).await;

    assert_eq!(stats, PassStats { fetched: 1, skipped: 1, failed: 1 });
  }

  #[tokio::test]
  async fn observed_credentials_rewrite_outbound_urls() {
    let transport =
      Arc::new(ScriptedTransport::default().with("https://host/file?t=2-fresh&k=new", b"x"));
    let fetcher = fetcher_over(Arc::clone(&transport));
    fetcher.access().observe("?t=2-fresh&k=new");
    let dir = tempfile::tempdir().unwrap();

    let outcome = fetcher
      .download("https://host/file?t=2-stale&k=old", &dir.path().join("file"))
      .await
      .unwrap();

    assert_eq!(outcome, FetchOutcome::Fetched);
    assert_eq!(transport.requests(), vec!["https://host/file?t=2-fresh&k=new"]);
  }

  #[tokio::test]
  async fn json_posts_skip_existing_captures() {
    let transport = Arc::new(ScriptedTransport::default().with("https://host/graph", b"{}"));
    let fetcher = fetcher_over(Arc::clone(&transport));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("graph_GetModelDetails.json");

    let first = fetcher
      .download_json_post("https://host/graph", &dest, "{}", "GetModelDetails")
      .await
      .unwrap();
    let second = fetcher
      .download_json_post("https://host/graph", &dest, "{}", "GetModelDetails")
      .await
      .unwrap();

    assert_eq!(first, FetchOutcome::Fetched);
    assert_eq!(second, FetchOutcome::AlreadyPresent);
    assert_eq!(transport.requests().len(), 1);
  }
}
