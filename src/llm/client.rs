//! HTTP client for the configured LLM provider.
//!
//! Three local-first backends share one interface: Ollama's `/api/generate`,
//! any OpenAI-compatible chat-completions endpoint (LM Studio, LocalAI), and
//! an n8n webhook. The caller hands over a finished prompt and gets cleaned
//! text back; failures are typed so the UI can tell "retry" from "fix your
//! configuration".

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::types::{LlmConfig, LlmProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_LOCAL_HTTP_URL: &str = "http://localhost:8000/v1/chat/completions";

/// Strip reasoning scratchpads and markup from model output. Some reasoning
/// models wrap their chain of thought in `<think>` tags; others decorate with
/// HTML.
pub fn clean_output(text: &str) -> String {
    static THINK: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let think = THINK.get_or_init(|| Regex::new(r"(?is)<think>.*?</think>").unwrap());
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());

    let cleaned = think.replace_all(text, "");
    tags.replace_all(&cleaned, "").trim().to_string()
}

pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send `prompt` to the configured provider and return the cleaned
    /// response text.
    pub async fn run(&self, prompt: &str) -> Result<String, LlmError> {
        let raw = match self.config.provider {
            LlmProvider::Ollama => self.call_ollama(prompt).await?,
            LlmProvider::LocalHttp => self.call_local_http(prompt).await?,
            LlmProvider::N8n => self.call_n8n(prompt).await?,
            LlmProvider::Unknown => return Err(LlmError::UnsupportedProvider),
        };
        Ok(clean_output(&raw))
    }

    /// Cheap liveness probe for the settings screen.
    pub async fn test_connection(&self) -> Result<bool, LlmError> {
        let response = self
            .run("Hello, are you online? Respond with 'Yes'.")
            .await?;
        Ok(!response.is_empty())
    }

    async fn call_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/');
        let model = if self.config.model.is_empty() {
            "llama3"
        } else {
            &self.config.model
        };
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let data = self
            .post_json("ollama", &format!("{}/api/generate", base), &body, None)
            .await?;
        Ok(data
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn call_local_http(&self, prompt: &str) -> Result<String, LlmError> {
        let url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_LOCAL_HTTP_URL);
        let model = if self.config.model.is_empty() {
            "local-model"
        } else {
            &self.config.model
        };
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.7,
        });
        let bearer = self
            .config
            .api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key));

        let data = self
            .post_json("local_http", url, &body, bearer.as_deref())
            .await?;
        // choices[0].message.content, with fallbacks for non-conforming
        // servers.
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .or_else(|| data.get("content").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string());
        Ok(content)
    }

    async fn call_n8n(&self, prompt: &str) -> Result<String, LlmError> {
        let url = self
            .config
            .base_url
            .as_deref()
            .ok_or(LlmError::MissingEndpoint)?;
        let body = json!({
            "prompt": prompt,
            "model": self.config.model,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let data = self
            .post_json("n8n", url, &body, self.config.api_key.as_deref())
            .await?;
        if let Some(text) = data.as_str() {
            return Ok(text.to_string());
        }
        // Workflow outputs vary by node wiring.
        let content = ["output", "text", "response", "content"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string());
        Ok(content)
    }

    async fn post_json(
        &self,
        provider: &'static str,
        url: &str,
        body: &Value,
        authorization: Option<&str>,
    ) -> Result<Value, LlmError> {
        let mut request = self
            .http
            .post(url)
            .timeout(REQUEST_TIMEOUT)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(auth) = authorization {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                provider,
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| LlmError::Network(format!("Invalid JSON from {}: {}", provider, e)))
    }
}

/// List the models an Ollama instance has pulled. Errors collapse to an
/// empty list; the settings screen shows a free-text field either way.
pub async fn fetch_ollama_models(base_url: &str) -> Vec<String> {
    let base = if base_url.is_empty() {
        DEFAULT_OLLAMA_URL
    } else {
        base_url
    };
    let url = format!("{}/api/tags", base.trim_end_matches('/'));

    let response = match reqwest::Client::new()
        .get(&url)
        .timeout(Duration::from_secs(10))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            log::info!("Could not reach Ollama for model list: {}", e);
            return Vec::new();
        }
    };
    let data: Value = match response.json().await {
        Ok(data) => data,
        Err(_) => return Vec::new(),
    };
    data.get("models")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
