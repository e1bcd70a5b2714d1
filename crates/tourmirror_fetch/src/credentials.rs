use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::NoExpand;
use regex::Regex;
use tracing::debug;

static TOKEN_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"t=([^&"\s]+)"#).unwrap());
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"k=([^&"\s]+)"#).unwrap());
static TOKEN_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"t=.*?&").unwrap());
static KEY_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"k=.*?$").unwrap());

/// The freshest signed-access token/key pair observed during a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CredentialPair {
  pub token: Option<String>,
  pub key: Option<String>,
}

impl CredentialPair {
  fn is_complete(&self) -> bool {
    self.token.is_some() && self.key.is_some()
  }
}

/// Shared signing state for outbound fetches: the freshest observed
/// token/key pair plus the alternate access query strings collected from the
/// files metadata snapshots.
#[derive(Debug, Default)]
pub struct AccessContext {
  pair: Mutex<CredentialPair>,
  alternates: Mutex<Vec<String>>,
}

impl AccessContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records the token/key values found in freshly fetched metadata text.
  /// Propagation only; the values are never validated here.
  pub fn observe(&self, text: &str) {
    let mut pair = self.pair.lock();
    if let Some(token) = TOKEN_VALUE.captures(text).and_then(|captures| captures.get(1)) {
      pair.token = Some(token.as_str().to_string());
    }
    if let Some(key) = KEY_VALUE.captures(text).and_then(|captures| captures.get(1)) {
      pair.key = Some(key.as_str().to_string());
    }
    if pair.is_complete() {
      debug!("access credentials refreshed");
    }
  }

  /// Rewrites the signed query segments of a URL to the stored pair. Until
  /// both halves have been observed the URL passes through untouched.
  pub fn apply(&self, url: &str) -> String {
    let pair = self.pair.lock();
    let (Some(token), Some(key)) = (&pair.token, &pair.key) else {
      return url.to_string();
    };
    let url = TOKEN_SEGMENT.replace_all(url, NoExpand(&format!("t={token}&")));
    KEY_SEGMENT.replace(&url, NoExpand(&format!("k={key}"))).into_owned()
  }

  /// Registers an alternate access query string to retry signed fetches
  /// with. Duplicates are dropped.
  pub fn add_alternate(&self, query: String) {
    if query.is_empty() {
      return;
    }
    let mut alternates = self.alternates.lock();
    if !alternates.contains(&query) {
      debug!("registered alternate access query");
      alternates.push(query);
    }
  }

  pub fn alternates(&self) -> Vec<String> {
    self.alternates.lock().clone()
  }

  pub fn pair(&self) -> CredentialPair {
    self.pair.lock().clone()
  }
}
