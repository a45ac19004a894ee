//! Chat-completion client for an OpenAI-compatible LLM service

use crate::config::Config;
use crate::error::{Result, ResumeTailorError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One prompt sent to the LLM service
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<ImageAttachment>,
    /// Overrides the client's default model for this request.
    pub model: Option<String>,
}

impl LlmRequest {
    pub fn new(system: &str, prompt: String) -> Self {
        Self {
            system: Some(system.to_string()),
            prompt,
            ..Default::default()
        }
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ImageAttachment {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            media_type: "image/png".to_string(),
            data,
        }
    }

    fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.data))
    }
}

/// Request–response access to the LLM service.
///
/// Implementations return the raw text of the model's reply; interpreting it
/// is up to the calling stage.
pub trait LlmClient {
    fn complete(&self, request: &LlmRequest) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Send a request and interpret the reply, re-requesting once if the reply
/// is malformed. Service errors are returned immediately.
pub async fn complete_structured<L, T, F>(llm: &L, request: &LlmRequest, interpret: F) -> Result<T>
where
    L: LlmClient,
    F: Fn(&str) -> Result<T>,
{
    let first = match llm.complete(request).await {
        Ok(text) => interpret(&text),
        Err(e) => Err(e),
    };

    match first {
        Err(e) if e.is_retryable_parse() => {
            warn!("Re-requesting after malformed LLM reply: {}", e);
            let text = llm.complete(request).await?;
            interpret(&text)
        }
        other => other,
    }
}

/// Client for `POST {base_url}/chat/completions`
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResumeTailorError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: 0.2,
            max_tokens: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::new(
            config.api_key()?,
            &config.llm.base_url,
            &config.llm.model,
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        client.temperature = config.llm.temperature;
        client.max_tokens = config.llm.max_tokens;
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body<'a>(&'a self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system.clone()),
            });
        }

        let content = if request.images.is_empty() {
            MessageContent::Text(request.prompt.clone())
        } else {
            let mut parts = vec![ContentPart::Text {
                text: request.prompt.clone(),
            }];
            parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl { url: image.data_url() },
            }));
            MessageContent::Parts(parts)
        };
        messages.push(ChatMessage { role: "user", content });

        ChatRequest {
            model: request.model.as_deref().unwrap_or(&self.model),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        let body = self.build_body(request);
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "LLM request to {} (model {}, {} prompt chars, {} images)",
            url,
            body.model,
            request.prompt.len(),
            request.images.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResumeTailorError::ServiceUnavailable(format!("LLM request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ResumeTailorError::ServiceUnavailable(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            ResumeTailorError::MalformedResponse(format!("Failed to decode LLM response: {}", e))
        })?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ResumeTailorError::MalformedResponse("LLM returned no content".to_string()))?;

        debug!("LLM reply: {} chars", text.len());
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new(
            "key".to_string(),
            "http://localhost:9/v1/",
            "text-model",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_text_only_request_uses_plain_content() {
        let client = client();
        let request = LlmRequest::new("be terse", "hello".to_string());
        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(body["model"], "text-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_image_request_uses_content_parts() {
        let client = client();
        let request = LlmRequest::new("critic", "look".to_string())
            .with_images(vec![ImageAttachment::png(vec![1, 2, 3])])
            .with_model("vision-model");
        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(body["model"], "vision-model");
        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AQID");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        assert_eq!(client().base_url, "http://localhost:9/v1");
    }
}
