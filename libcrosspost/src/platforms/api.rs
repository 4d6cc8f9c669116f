//! HTTP client for the posting backend
//!
//! The platform clients do not talk to LinkedIn, X or Substack directly. They
//! post JSON to a backend that holds the platform tokens and answers in the
//! normalized `{success, data, message}` shape.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::error::{ConfigError, PlatformError, Result};
use crate::types::MediaPayload;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("crosspost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "api".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().map(SecretString::from),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body and decode the JSON answer
    ///
    /// A non-2xx answer whose body still decodes as `T` is returned as-is so
    /// the backend's own failure message reaches the caller. Returns
    /// `PlatformError::Cancelled` as soon as `cancel` fires.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let url = self.url(path);
        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| PlatformError::Network(format!("Request to {} failed: {}", url, e)))?;
            let status = response.status();
            let text = response.text().await.map_err(|e| {
                PlatformError::Network(format!("Failed to read response from {}: {}", url, e))
            })?;

            tracing::debug!("POST {} -> {}", url, status);

            match serde_json::from_str::<T>(&text) {
                Ok(parsed) => Ok::<T, PlatformError>(parsed),
                Err(e) if status.is_success() => Err(PlatformError::Posting(format!(
                    "Unexpected response from {}: {}",
                    url, e
                ))),
                Err(_) => Err(PlatformError::Network(format!(
                    "HTTP {} from {}",
                    status.as_u16(),
                    url
                ))),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PlatformError::Cancelled.into()),
            result = exchange => result.map_err(Into::into),
        }
    }
}

/// JSON form of a media payload, bytes base64 encoded
pub(crate) fn media_json(media: &MediaPayload) -> serde_json::Value {
    serde_json::json!({
        "fileName": media.file_name,
        "mimeType": media.mime_type,
        "data": STANDARD.encode(&media.bytes),
    })
}
