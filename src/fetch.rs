use crate::{config, error::PipelineError, util::timeout_from_secs};
use std::future::Future;
use tracing::{debug, info};

/// Downloads the source object behind a presigned URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, PipelineError>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(cfg: &config::Fetch) -> Result<Self, PipelineError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout_from_secs(cfg.timeout_seconds) {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PipelineError::Fetch(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs: cfg.timeout_seconds,
            max_bytes: cfg.max_bytes,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        // The query string of a presigned URL is a credential; keep it out of logs.
        let shown = url.split('?').next().unwrap_or(url);
        debug!("GET {}", shown);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::Fetch(format!("timed out after {}s", self.timeout_secs))
            } else {
                PipelineError::Fetch(e.without_url().to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(PipelineError::Fetch(format!("HTTP {}", response.status())));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(PipelineError::Fetch(format!(
                    "object is {len} bytes, limit is {}",
                    self.max_bytes
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Fetch(e.without_url().to_string()))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(PipelineError::Fetch(format!(
                "object is {} bytes, limit is {}",
                bytes.len(),
                self.max_bytes
            )));
        }

        info!("downloaded {} bytes from {}", bytes.len(), shown);
        Ok(bytes.to_vec())
    }
}
