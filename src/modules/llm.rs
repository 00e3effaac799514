use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::ValueEnum;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::modules::error::ProviderError;

/// A chat model that turns a system and user prompt into a reply.
pub trait Completion {
    fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    #[default]
    Openai,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Openai => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    host: String,
    model: String,
    provider: LlmProvider,
    api_key: Option<String>,
    max_attempts: u32,
    transcript_dir: Option<PathBuf>,
    http: Client,
}

impl LlmClient {
    pub fn new(
        host: impl Into<String>,
        model: impl Into<String>,
        provider: LlmProvider,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            host: host.into(),
            model: model.into(),
            provider,
            api_key,
            max_attempts: 3,
            transcript_dir: None,
            http,
        })
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Appends every successful exchange to `<dir>/llm.log`.
    pub fn with_transcript_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.transcript_dir = dir;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub const fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn call_once(&self, messages: &[Message]) -> Result<Exchange, ProviderError> {
        match self.provider {
            LlmProvider::Ollama => self.call_ollama(messages),
            LlmProvider::Openai => self.call_openai(messages),
        }
    }

    fn call_ollama(&self, messages: &[Message]) -> Result<Exchange, ProviderError> {
        let url = format!("{}/api/chat", self.host.trim_end_matches('/'));
        let body = ChatRequest {
            model: self.model.clone(),
            stream: false,
            messages: messages.to_vec(),
        };
        let raw = self.post(&url, &body, reqwest::header::HeaderMap::new())?;
        let parsed: ChatResponse =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Decode(format!("{}; body={}", e, truncate(&raw, 200))))?;
        Ok(Exchange {
            request_json: serde_json::to_string_pretty(&body).unwrap_or_default(),
            response_json: raw,
            text: parsed.message.content,
        })
    }

    fn call_openai(&self, messages: &[Message]) -> Result<Exchange, ProviderError> {
        let url = {
            let trimmed = self.host.trim_end_matches('/');
            if trimmed.ends_with("/v1/chat/completions") {
                trimmed.to_string()
            } else {
                format!("{}/v1/chat/completions", trimmed)
            }
        };
        let body = OpenAiChatRequest {
            model: self.model.clone(),
            stream: false,
            temperature: Some(0.7),
            messages: messages.to_vec(),
        };
        let raw = self.post(&url, &body, build_openai_headers(&self.api_key)?)?;
        let parsed: OpenAiChatResponse =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Decode(format!("{}; body={}", e, truncate(&raw, 200))))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        Ok(Exchange {
            request_json: serde_json::to_string_pretty(&body).unwrap_or_default(),
            response_json: raw,
            text,
        })
    }

    fn post<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        headers: reqwest::header::HeaderMap,
    ) -> Result<String, ProviderError> {
        let resp = self.http.post(url).headers(headers).json(body).send()?;
        let status = resp.status();
        let raw = resp.text()?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&raw, 200),
            });
        }
        Ok(raw)
    }

    fn log_exchange(&self, exchange: &Exchange) {
        if let Some(dir) = &self.transcript_dir {
            log_llm_call(dir, self.provider, &self.model, &exchange.request_json, &exchange.response_json);
        }
    }
}

impl Completion for LlmClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let messages = build_chat_messages(system, user);
        let mut attempts = 0;
        let mut last_err = None;

        while attempts < self.max_attempts {
            attempts += 1;
            if attempts > 1 {
                // 50-150ms between retries
                let jitter_ms = 50 + rand::random::<u64>() % 100;
                std::thread::sleep(Duration::from_millis(jitter_ms));
            }
            match self.call_once(&messages) {
                Ok(exchange) => {
                    self.log_exchange(&exchange);
                    if exchange.text.trim().is_empty() {
                        return Err(ProviderError::EmptyReply);
                    }
                    debug!(provider = %self.provider, model = %self.model, attempts, "llm reply received");
                    return Ok(exchange.text);
                }
                Err(ProviderError::MissingApiKey) => return Err(ProviderError::MissingApiKey),
                Err(err) => {
                    debug!(attempt = attempts, error = %err, "llm call failed");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Unavailable("no attempts made".into())))
    }
}

struct Exchange {
    request_json: String,
    response_json: String,
    text: String,
}

fn log_llm_call(dir: &Path, provider: LlmProvider, model: &str, request_json: &str, response_json: &str) {
    if let Err(err) = fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %err, "failed to create transcript dir");
        return;
    }
    let path = dir.join("llm.log");
    let content = format!(
        "[{}] provider={} model={}\nrequest:\n{}\nresponse:\n{}\n\n",
        Utc::now().to_rfc3339(),
        provider,
        model,
        request_json,
        response_json
    );
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| f.write_all(content.as_bytes()));
    if let Err(err) = result {
        warn!(path = %path.display(), error = %err, "failed to write llm transcript");
    }
}

fn build_chat_messages(system: &str, user: &str) -> Vec<Message> {
    vec![
        Message {
            role: "system".into(),
            content: system.into(),
        },
        Message {
            role: "user".into(),
            content: user.into(),
        },
    ]
}

fn build_openai_headers(api_key: &Option<String>) -> Result<reqwest::header::HeaderMap, ProviderError> {
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
    let Some(key) = api_key else {
        return Err(ProviderError::MissingApiKey);
    };
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let value = HeaderValue::from_str(&format!("Bearer {}", key))
        .map_err(|e| ProviderError::Unavailable(format!("invalid api key header: {}", e)))?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Shortens `text` to `max` chars, cutting on a char boundary.
pub fn truncate(text: &str, max: usize) -> String {
    let mut chars = text.char_indices();
    let cutoff = match chars.nth(max) {
        Some((idx, _)) => idx,
        None => return text.to_string(),
    };
    format!("{}...", &text[..cutoff])
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}
