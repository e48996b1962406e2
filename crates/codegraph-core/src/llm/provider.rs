use crate::config::{
    LLMConfig, DEFAULT_AZURE_API_VERSION, DEFAULT_AZURE_DEPLOYMENT, DEFAULT_MAX_TOKENS,
    DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL,
};

use super::{LLMError, OpenAIClient, LLM};

/// Per-use sampling settings. Summaries and explanations differ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }
}

/// LLM Provider configuration.
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI-compatible endpoint (default, most universal)
    OpenAI {
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    },
    /// Azure OpenAI deployment
    Azure {
        endpoint: Option<String>,
        api_key: Option<String>,
        deployment: Option<String>,
        api_version: Option<String>,
    },
    /// Local Ollama instance
    Ollama {
        base_url: Option<String>,
        model: String,
    },
}

impl Default for Provider {
    fn default() -> Self {
        Provider::OpenAI {
            base_url: None,
            api_key: None,
            model: None,
        }
    }
}

impl Provider {
    /// Creates a provider from LLMConfig.
    pub fn from_config(config: &LLMConfig) -> Self {
        match config.provider.as_str() {
            "azure" => Provider::Azure {
                endpoint: config.base_url.clone(),
                api_key: config.api_key.clone(),
                deployment: config.deployment.clone(),
                api_version: Some(config.api_version.clone()),
            },
            "ollama" => Provider::Ollama {
                base_url: config.base_url.clone(),
                model: config.model.clone().unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            },
            _ => Provider::OpenAI {
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
            },
        }
    }

    /// Creates an LLM client with default sampling.
    pub fn build(self) -> Result<Box<dyn LLM>, LLMError> {
        self.build_with(GenerationParams::default())
    }

    /// Creates an LLM client with the given sampling settings.
    pub fn build_with(self, params: GenerationParams) -> Result<Box<dyn LLM>, LLMError> {
        let client = match self {
            Provider::OpenAI { base_url, api_key, model } => OpenAIClient::new(
                base_url.unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
                api_key.unwrap_or_default(),
                model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            ),

            Provider::Azure {
                endpoint,
                api_key,
                deployment,
                api_version,
            } => {
                let endpoint = endpoint.ok_or_else(|| {
                    LLMError::MissingConfig("Azure endpoint (AZURE_OPENAI_ENDPOINT)".to_string())
                })?;
                let key = api_key.ok_or(LLMError::MissingApiKey)?;
                OpenAIClient::azure(
                    endpoint,
                    key,
                    deployment.unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string()),
                    api_version.unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                )
            }

            Provider::Ollama { base_url, model } => {
                let base = base_url
                    .map(|h| {
                        let h = h.trim_end_matches('/');
                        if h.ends_with("/v1") {
                            h.to_string()
                        } else {
                            format!("{}/v1", h)
                        }
                    })
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
                OpenAIClient::new(base, "", model)
            }
        };

        let client = client.with_max_tokens(params.max_tokens);
        let client = match params.temperature {
            Some(t) => client.with_temperature(t),
            None => client,
        };
        Ok(Box::new(client))
    }

    /// Provider name as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "openai",
            Provider::Azure { .. } => "azure",
            Provider::Ollama { .. } => "ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider() {
        let provider = Provider::default();
        assert!(matches!(provider, Provider::OpenAI { .. }));
    }

    #[test]
    fn test_ollama_provider_build() {
        let provider = Provider::Ollama {
            base_url: Some("http://gpu-box:11434".to_string()),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        };
        assert!(provider.build().is_ok());
    }

    #[test]
    fn test_azure_requires_endpoint_and_key() {
        let missing_endpoint = Provider::Azure {
            endpoint: None,
            api_key: Some("k".to_string()),
            deployment: None,
            api_version: None,
        };
        assert!(matches!(missing_endpoint.build(), Err(LLMError::MissingConfig(_))));

        let missing_key = Provider::Azure {
            endpoint: Some("https://res.openai.azure.com".to_string()),
            api_key: None,
            deployment: None,
            api_version: None,
        };
        assert!(matches!(missing_key.build(), Err(LLMError::MissingApiKey)));
    }

    #[test]
    fn test_from_config() {
        let config = LLMConfig {
            provider: "ollama".to_string(),
            model: Some("codellama".to_string()),
            ..Default::default()
        };

        let provider = Provider::from_config(&config);
        assert!(matches!(provider, Provider::Ollama { ref model, .. } if model == "codellama"));
        assert_eq!(provider.name(), "ollama");

        let azure = LLMConfig {
            provider: "azure".to_string(),
            base_url: Some("https://res.openai.azure.com".to_string()),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let provider = Provider::from_config(&azure);
        assert_eq!(provider.name(), "azure");
        assert!(provider
            .build_with(GenerationParams {
                max_tokens: 100,
                temperature: Some(0.3),
            })
            .is_ok());
    }
}
