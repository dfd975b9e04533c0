//! Client side of the proxy: fetches chapter data for preview and export.

use crate::data::{Chapter, ChapterBundle, Envelope};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{message} (HTTP {status})")]
    Server { status: u16, message: String },
    #[error("unexpected response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chapters(&self) -> Result<Vec<Chapter>, ClientError> {
        let envelope: Envelope<Vec<Chapter>> = self.get("api/surahs").await?;
        Ok(envelope.data)
    }

    pub async fn chapter(&self, number: u16) -> Result<ChapterBundle, ClientError> {
        self.get(&format!("api/surah/{number}")).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|err| ClientError::Parse {
            url,
            reason: err.to_string(),
        })
    }
}
