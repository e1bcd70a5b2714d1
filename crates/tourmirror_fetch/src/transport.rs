use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::REFERER;
use reqwest::header::USER_AGENT;
use thiserror::Error;

/// Browser-equivalent identity; the upstream CDN refuses requests without one.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.5790.110 Safari/537.36";
const UPSTREAM_REFERER: &str = "https://my.matterport.com/";

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("{url} returned status {status}")]
  Status { url: String, status: u16 },
  #[error("request to {url} failed: {source}")]
  Network {
    url: String,
    #[source]
    source: reqwest::Error,
  },
}

impl TransportError {
  /// Status errors are the ones worth retrying with alternate credentials.
  pub fn is_status(&self) -> bool {
    matches!(self, TransportError::Status { .. })
  }
}

/// The HTTP layer behind every fetch. Seam for tests; production code uses
/// [`ReqwestTransport`].
#[async_trait]
pub trait Transport {
  async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
  async fn post_json(&self, url: &str, body: &str) -> Result<Vec<u8>, TransportError>;
}

pub type TransportRef = Arc<dyn Transport + Send + Sync>;

pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(proxy: Option<&str>) -> anyhow::Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(REFERER, HeaderValue::from_static(UPSTREAM_REFERER));

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(proxy) = proxy {
      builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    Ok(Self { client: builder.build()? })
  }

  async fn collect(
    response: Result<reqwest::Response, reqwest::Error>,
    url: &str,
  ) -> Result<Vec<u8>, TransportError> {
    let response = response.map_err(|source| TransportError::Network {
      url: url.to_string(),
      source,
    })?;
    let status = response.status();
    if !status.is_success() {
      return Err(TransportError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }
    let bytes = response.bytes().await.map_err(|source| TransportError::Network {
      url: url.to_string(),
      source,
    })?;
    Ok(bytes.to_vec())
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
    Self::collect(self.client.get(url).send().await, url).await
  }

  async fn post_json(&self, url: &str, body: &str) -> Result<Vec<u8>, TransportError> {
    let response = self
      .client
      .post(url)
      .header(CONTENT_TYPE, "application/json")
      .header("x-matterport-application-name", "showcase")
      .body(body.to_string())
      .send()
      .await;
    Self::collect(response, url).await
  }
}
