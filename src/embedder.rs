//! Client for the hosted embedding service.
//!
//! Wraps the Hugging Face Inference API feature-extraction pipeline:
//! text in, fixed-length `f32` vector out. The vector dimension is
//! determined by the model and must stay constant for the lifetime of a
//! collection.

use serde_json::json;
use tracing::warn;

use crate::{
    config::Config,
    error::{Error, Result},
};

const API_BASE: &str = "https://router.huggingface.co/hf-inference/models";

/// Embedding-service client.
///
/// Construction failure is fatal to startup: the system cannot function
/// without an embedding capability. A missing API key is only a warning
/// at this point (some models serve unauthenticated requests); it
/// surfaces as an API error on the first call if the service rejects us.
pub struct EmbeddingClient {
    http: reqwest::blocking::Client,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl EmbeddingClient {
    pub fn new(config: &Config) -> Result<Self> {
        if config.api_key.is_none() {
            warn!("HF_API_KEY is not set; embedding requests may be rejected");
        }

        let http = reqwest::blocking::Client::builder().build()?;

        Ok(Self {
            http,
            model: config.embedding_model.clone(),
            api_key: config.api_key.clone(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Embedding model identifier this client was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a single text.
    ///
    /// Delegates to `embed_batch` with a batch of one, so batch and
    /// single embedding are equivalent by construction.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        Ok(vectors.remove(0))
    }

    /// Embed a batch of texts in a single request.
    ///
    /// The returned vectors have the same length and order as the
    /// input; a mismatched response is an API error.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/{}/pipeline/feature-extraction",
            self.base_url, self.model
        );
        let mut request =
            self.http.post(&url).json(&json!({ "inputs": texts }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        let vectors: Vec<Vec<f32>> = response.json()?;
        if vectors.len() != texts.len() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                ),
            });
        }

        Ok(vectors)
    }
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
