use std::path::PathBuf;

/// One unit of download work: the signed or static URL to pull and where the
/// body lands inside the mirror.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadTask {
  pub remote_url: String,
  pub local_path: PathBuf,
}

impl DownloadTask {
  pub fn new(remote_url: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
    Self {
      remote_url: remote_url.into(),
      local_path: local_path.into(),
    }
  }
}
