use super::Client;
use crate::config::EmbeddingConfig;
use crate::error::{ClientError, Result};
use crate::similarity::Embedder;
use crate::log_warn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_type: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Sentence embeddings from a remote `/embeddings` endpoint.
pub struct EmbeddingApi {
    client: Client,
    model: String,
    input_type: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl EmbeddingApi {
    pub fn new(client: Client, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            input_type: config.input_type.clone(),
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_secs(config.retry_delay),
        }
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            encoding_format: "float",
            input_type: self.input_type.as_deref(),
        };
        let mut response: EmbeddingResponse = self.client.post_json("embeddings", &request).await?;

        if response.data.len() != inputs.len() {
            return Err(ClientError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                response.data.len()
            ))
            .into());
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for EmbeddingApi {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 1;
        loop {
            match self.request(inputs).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if attempt < self.max_retries => {
                    log_warn!(
                        "[embedding] Attempt {}/{} failed: {}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
