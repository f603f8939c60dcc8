mod builder;
mod chat;
mod embedding;

use crate::error::{ClientError, Result};
pub use builder::ClientBuilder;
pub use chat::{ChatMessage, ChatModel, ChatRequest};
pub use embedding::EmbeddingApi;
use rquest::Client as RquestClient;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// JSON client for an OpenAI-compatible inference endpoint.
#[derive(Clone)]
pub struct Client {
    inner: RquestClient,
    base: Url,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.build_url(path)?;
        let payload = serde_json::to_vec(body)?;

        let response = self
            .inner
            .post(url.as_str())
            .body(payload)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let is_success = response.status().is_success();
        let content = response.text().await.map_err(|e| {
            ClientError::RequestFailed(format!("Failed to get response text: {}", e))
        })?;

        if !is_success {
            return Err(ClientError::ResponseError {
                status_code: status,
                message: truncate(&content, 300),
            }
            .into());
        }

        serde_json::from_str(&content).map_err(|e| {
            ClientError::MalformedResponse(format!("{}: {}", e, truncate(&content, 300))).into()
        })
    }

    /// GETs `path` (relative to the base, or absolute) and returns the body.
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.build_url(path)?;
        let response = self
            .inner
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let content = response.text().await.map_err(|e| {
            ClientError::RequestFailed(format!("Failed to get response text: {}", e))
        })?;

        if !status.is_success() {
            return Err(ClientError::ResponseError {
                status_code: status.as_u16(),
                message: truncate(&content, 300),
            }
            .into());
        }
        Ok(content)
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("Invalid path: {}", e)).into())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
