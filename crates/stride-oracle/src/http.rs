use std::time::Duration;

use crate::types::{ChatMessage, ChatRequest, ChatResponse, Completion, OracleRequest};
use crate::{Oracle, OracleError, Result};

// ─── HttpOracleOptions ────────────────────────────────────────────────────

/// Connection settings for one OpenAI-compatible model endpoint.
#[derive(Debug, Clone)]
pub struct HttpOracleOptions {
    /// Base URL without the trailing `/chat/completions`.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl HttpOracleOptions {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

// ─── HttpOracle ───────────────────────────────────────────────────────────

/// Calls `POST {base_url}/chat/completions` for a single model.
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    opts: HttpOracleOptions,
}

impl HttpOracle {
    pub fn new(opts: HttpOracleOptions) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(opts.timeout).build()?;
        let endpoint = format!("{}/chat/completions", opts.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            opts,
        })
    }
}

#[async_trait::async_trait]
impl Oracle for HttpOracle {
    fn name(&self) -> &str {
        &self.opts.model
    }

    async fn complete(&self, request: &OracleRequest) -> Result<Completion> {
        let body = ChatRequest {
            model: &self.opts.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.opts.temperature,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.opts.api_key {
            req = req.bearer_auth(key);
        }

        tracing::debug!(model = %self.opts.model, endpoint = %self.endpoint, "calling oracle");
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)?;
        let text = parsed.first_text().ok_or(OracleError::EmptyCompletion)?;

        Ok(Completion {
            text: text.to_string(),
            model: parsed.model.clone().unwrap_or_else(|| self.opts.model.clone()),
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
