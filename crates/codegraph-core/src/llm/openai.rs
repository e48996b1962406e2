use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MAX_TOKENS, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};

use super::{LLMError, LLM};

#[derive(Debug, Clone, PartialEq)]
enum Auth {
    None,
    Bearer(String),
    /// Azure sends the key in an `api-key` header.
    AzureKey(String),
}

/// OpenAI-compatible chat completions client.
///
/// Works with OpenAI, Azure OpenAI deployments, Ollama
/// (http://localhost:11434/v1), vLLM, llama.cpp and other servers that speak
/// the chat completions API.
pub struct OpenAIClient {
    auth: Auth,
    base_url: String,
    /// Query string appended to every request (Azure `api-version`).
    api_version: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    client: Client,
}

impl OpenAIClient {
    /// Creates a new OpenAI-compatible client.
    ///
    /// # Arguments
    /// * `base_url` - The API base URL (e.g., "https://api.openai.com/v1")
    /// * `api_key` - The API key (can be empty for local providers like Ollama)
    /// * `model` - The model name (e.g., "gpt-4o", "llama3")
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            auth: if api_key.is_empty() {
                Auth::None
            } else {
                Auth::Bearer(api_key)
            },
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: None,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            client: Client::new(),
        }
    }

    /// Creates a client for OpenAI.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(DEFAULT_OPENAI_URL, api_key, model)
    }

    /// Creates a client for Ollama (local).
    pub fn ollama(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_OLLAMA_URL, "", model)
    }

    /// Creates a client for an Azure OpenAI deployment.
    ///
    /// `endpoint` is the resource URL, e.g. `https://name.openai.azure.com`.
    pub fn azure(
        endpoint: impl AsRef<str>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        let deployment = deployment.into();
        Self {
            auth: Auth::AzureKey(api_key.into()),
            base_url: format!(
                "{}/openai/deployments/{}",
                endpoint.as_ref().trim_end_matches('/'),
                deployment
            ),
            api_version: Some(api_version.into()),
            model: deployment,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            client: Client::new(),
        }
    }

    /// Sets the maximum tokens for responses.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn chat_url(&self) -> String {
        match &self.api_version {
            Some(version) => format!("{}/chat/completions?api-version={}", self.base_url, version),
            None => format!("{}/chat/completions", self.base_url),
        }
    }

    async fn send_request(&self, messages: Vec<ChatMessage>, system: Option<&str>) -> Result<String, LLMError> {
        let mut all_messages = Vec::new();

        if let Some(sys) = system {
            all_messages.push(ChatMessage {
                role: "system".to_string(),
                content: sys.to_string(),
            });
        }

        all_messages.extend(messages);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: all_messages,
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
        };

        let mut req = self
            .client
            .post(self.chat_url())
            .header("content-type", "application/json");

        req = match &self.auth {
            Auth::None => req,
            Auth::Bearer(key) => req.header("authorization", format!("Bearer {}", key)),
            Auth::AzureKey(key) => req.header("api-key", key),
        };

        let response = req.json(&request).send().await?;

        let status = response.status();

        if status == 429 {
            return Err(LLMError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        Ok(content)
    }
}

#[async_trait]
impl LLM for OpenAIClient {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];

        self.send_request(messages, None).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError> {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];

        self.send_request(messages, Some(system)).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}
