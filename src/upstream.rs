//! Client for the public Quran text API the proxy forwards to.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.alquran.cloud/v1";
pub const DEFAULT_SCRIPT_EDITION: &str = "ar.alafasy";
pub const DEFAULT_TRANSLATION_EDITION: &str = "en.sahih";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} returned an unreadable body: {reason}")]
    Body { url: String, reason: String },
    #[error("refusing to forward path segment {segment:?}")]
    Segment { segment: String },
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub script_edition: String,
    pub translation_edition: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            script_edition: DEFAULT_SCRIPT_EDITION.to_string(),
            translation_edition: DEFAULT_TRANSLATION_EDITION.to_string(),
        }
    }
}

/// Thin wrapper over `reqwest::Client`; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct Upstream {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl Upstream {
    pub fn new(config: UpstreamConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config }
    }

    /// Full chapter list, returned verbatim.
    pub async fn chapter_list(&self) -> Result<Value, UpstreamError> {
        self.get_json("surah").await
    }

    /// One chapter in the configured script edition.
    pub async fn chapter_script(&self, chapter: &str) -> Result<Value, UpstreamError> {
        let path = format!("surah/{}/{}", segment(chapter)?, self.config.script_edition);
        self.get_json(&path).await
    }

    pub async fn chapter_translation(&self, chapter: &str) -> Result<Value, UpstreamError> {
        let path = format!("surah/{}/{}", segment(chapter)?, self.config.translation_edition);
        self.get_json(&path).await
    }

    /// One chapter in the upstream's default edition.
    pub async fn chapter_default(&self, chapter: &str) -> Result<Value, UpstreamError> {
        self.get_json(&format!("surah/{}", segment(chapter)?)).await
    }

    pub async fn verse_script(&self, chapter: &str, verse: &str) -> Result<Value, UpstreamError> {
        let path = format!("{}/{}", verse_path(chapter, verse)?, self.config.script_edition);
        self.get_json(&path).await
    }

    pub async fn verse_translation(
        &self,
        chapter: &str,
        verse: &str,
    ) -> Result<Value, UpstreamError> {
        let path = format!("{}/{}", verse_path(chapter, verse)?, self.config.translation_edition);
        self.get_json(&path).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, UpstreamError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| UpstreamError::Body {
                url,
                reason: err.to_string(),
            })
    }
}

/// Percent-encodes a caller-supplied path segment so it cannot leave its
/// position in the upstream path. Dot segments are rejected outright because
/// URL parsing resolves them even when encoded.
fn segment(raw: &str) -> Result<String, UpstreamError> {
    if matches!(raw, "" | "." | "..") {
        return Err(UpstreamError::Segment {
            segment: raw.to_string(),
        });
    }
    Ok(utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string())
}

fn verse_path(chapter: &str, verse: &str) -> Result<String, UpstreamError> {
    Ok(format!("ayah/{}:{}", segment(chapter)?, segment(verse)?))
}

/// Takes the `data` member out of an upstream envelope.
pub fn take_data(mut envelope: Value, url_hint: &str) -> Result<Value, UpstreamError> {
    match envelope.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => Err(UpstreamError::Body {
            url: url_hint.to_string(),
            reason: "missing `data` member".to_string(),
        }),
        Some(data) => Ok(data),
    }
}
