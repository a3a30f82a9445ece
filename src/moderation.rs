// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Content moderation through an OpenAI-compatible completion API
//!
//! Moderation is best-effort and fails open: if the completion service is
//! unreachable or answers with something unusable, content is allowed.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ModerationConfig;
use crate::{IdeaBoardError, Result};

/// Warning shown when the reply is not JSON but reads as a rejection
pub const HEURISTIC_WARNING: &str =
    "Please revise your content to be more appropriate for our community.";

const SYSTEM_PROMPT: &str = r#"You are a content moderator for an AI idea sharing platform. Your task is to check if the given content is appropriate for a professional, creative, and inspiring community.

Rules:
- Content should be about AI, technology, innovation, or creative ideas
- No NSFW, sexual content, hate speech, violence, or illegal activities
- No spam, advertising, or promotional content
- No harmful, dangerous, or unethical suggestions
- Content should be constructive and positive

Respond with a JSON object:
{
  "isAppropriate": true/false,
  "reason": "Brief explanation if not appropriate",
  "warning": "User-friendly warning message if not appropriate"
}"#;

/// Moderation decision for a piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_appropriate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub warning: String,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            is_appropriate: true,
            reason: None,
            warning: String::new(),
        }
    }
}

/// Reviews user content before it is published
#[async_trait]
pub trait Moderator: Send + Sync {
    /// Name of this moderator, for logs
    fn name(&self) -> &'static str;

    /// Review content; never fails, every error resolves to a verdict
    async fn review(&self, content: &str) -> Verdict;
}

/// Moderator that approves everything, used when moderation is disabled
pub struct AllowAll;

#[async_trait]
impl Moderator for AllowAll {
    fn name(&self) -> &'static str {
        "allow-all"
    }

    async fn review(&self, _content: &str) -> Verdict {
        Verdict::allow()
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat completion client that asks a language model to judge content
pub struct CompletionModerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl CompletionModerator {
    pub fn new(config: &ModerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Accept either the API root or the full completions endpoint
        let base_url = config
            .url
            .trim_end_matches('/')
            .trim_end_matches("/chat/completions")
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            api_key: config.api_key(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the completion API answers at all
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models", self.base_url);

        let mut request = self.client.get(&url).timeout(Duration::from_secs(10));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            IdeaBoardError::ModerationUnavailable(format!(
                "Cannot connect to {}: {}",
                self.base_url, e
            ))
        })?;

        if !response.status().is_success() {
            return Err(IdeaBoardError::ModerationUnavailable(format!(
                "{} answered with status {}",
                url,
                response.status()
            )));
        }

        Ok(())
    }

    /// Ask the model about the content; `None` when the reply has no text
    pub async fn complete(&self, content: &str) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Please review this content for appropriateness: \"{}\"",
                        content
                    ),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        debug!("Sending moderation request: model={}", self.model);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(IdeaBoardError::ModerationUnavailable(format!(
                "Completion API returned status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }
}

#[async_trait]
impl Moderator for CompletionModerator {
    fn name(&self) -> &'static str {
        "completion"
    }

    async fn review(&self, content: &str) -> Verdict {
        match self.complete(content).await {
            Ok(Some(reply)) => interpret(&reply),
            Ok(None) => Verdict::allow(),
            Err(e) => {
                warn!("Content moderation error: {}", e);
                Verdict::allow()
            }
        }
    }
}

/// Turn a model reply into a verdict
///
/// A JSON reply approves the content only when `isAppropriate` is `true`;
/// its `reason` and `warning` are kept. Anything that is not JSON is read as
/// a rejection when it mentions "not appropriate" or "inappropriate".
pub fn interpret(reply: &str) -> Verdict {
    let trimmed = strip_code_fence(reply.trim());
    if trimmed.is_empty() {
        return Verdict::allow();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        return Verdict {
            is_appropriate: value.get("isAppropriate") == Some(&Value::Bool(true)),
            reason: text("reason"),
            warning: text("warning").unwrap_or_default(),
        };
    }

    let lowered = trimmed.to_lowercase();
    let is_appropriate =
        !lowered.contains("not appropriate") && !lowered.contains("inappropriate");

    Verdict {
        is_appropriate,
        reason: None,
        warning: if is_appropriate {
            String::new()
        } else {
            HEURISTIC_WARNING.to_string()
        },
    }
}

/// Models often wrap JSON in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Build the moderator selected by configuration
pub fn from_config(config: &ModerationConfig) -> Result<Arc<dyn Moderator>> {
    if config.enabled {
        Ok(Arc::new(CompletionModerator::new(config)?))
    } else {
        Ok(Arc::new(AllowAll))
    }
}
