//! Client for the hosted text-generation service.
//!
//! Speaks the OpenAI-style chat-completions protocol: an ordered list
//! of role-tagged messages plus sampling parameters, one text
//! completion back. Failures are surfaced to the caller and never
//! retried; the orchestrator converts them into user-visible text.

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
};

const API_URL: &str = "https://router.huggingface.co/v1/chat/completions";

/// Sampling parameters, fixed for every request.
const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 300;
const TOP_P: f32 = 0.95;

/// A role-tagged message in a chat-completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Generation-service client.
///
/// Construction requires the API credential; a missing key fails here
/// so the orchestrator can start with generation disabled instead of
/// crashing mid-answer.
pub struct ChatClient {
    http: reqwest::blocking::Client,
    model: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config("HF_API_KEY is required for text generation".into())
        })?;
        let http = reqwest::blocking::Client::builder().build()?;

        Ok(Self {
            http,
            model: config.llm_model.clone(),
            api_key,
        })
    }

    /// Generation model identifier this client was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request one completion for the given messages.
    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        let parsed: ChatResponse = response.json()?;
        let choice = parsed.choices.into_iter().next().ok_or(Error::Api {
            status: status.as_u16(),
            message: "completion response contained no choices".into(),
        })?;

        Ok(choice.message.content.trim().to_string())
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn test_config(api_key: Option<&str>) -> Config {
        Config {
            api_key: api_key.map(str::to_string),
            embedding_model: "test/embedding-model".to_string(),
            llm_model: "test/llm-model".to_string(),
            chunk_size: 512,
            chunk_overlap: 50,
            top_k: 3,
            docs_dir: PathBuf::from("./data"),
            index_dir: PathBuf::from("."),
            collection: "test".to_string(),
        }
    }

    #[test]
    fn construction_requires_api_key() {
        assert!(matches!(
            ChatClient::new(&test_config(None)),
            Err(Error::Config(_))
        ));

        let client = ChatClient::new(&test_config(Some("key"))).unwrap();
        assert_eq!(client.model(), "test/llm-model");
    }

    #[test]
    fn message_constructors_tag_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
    }

    #[test]
    fn request_serializes_expected_shape() {
        let messages = [ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["max_tokens"], 300);
    }
}
