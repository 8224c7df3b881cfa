//! Motivational and recovery text from a generative model.
//!
//! Nothing here can fail from the caller's side: every error path ends in a
//! fixed fallback line, and the text never feeds back into challenge state.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DAILY_FALLBACK: &str = "Stay hard. Keep pushing.";
pub const RECOVERY_FALLBACK: &str = "Get back up. Day 1 starts now.";

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response had no text")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError>;
}

/// The first week and the 31..44 stretch are where people tend to quit.
pub fn is_struggle_day(day: u32) -> bool {
    day < 7 || (day > 30 && day < 45)
}

fn daily_prompt(day: u32, struggling: bool) -> String {
    let mood = if struggling {
        "They are struggling, or this is a critical milestone."
    } else {
        "They are making steady progress."
    };
    format!(
        "You are a blunt, no-nonsense coach for the 75 Hard challenge. \
         The user is on day {} of 75. {} \
         Reply with one short, demanding motivational line (two sentences at most) \
         about discipline, mental toughness and execution. No pleasantries.",
        day, mood
    )
}

const RECOVERY_PROMPT: &str = "The user just failed the 75 Hard challenge and must restart from day 1. \
     In at most 50 words, give a stern but encouraging message: failure is a lesson, \
     not the end. Tell them to get back up immediately.";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Google Generative Language `generateContent` over plain HTTPS.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }
}

fn extract_text(body: GenerateResponse) -> Result<String, AdvisoryError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(AdvisoryError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(AdvisoryError::Status {
                status: status.as_u16(),
                message,
            });
        }

        extract_text(response.json::<GenerateResponse>().await?)
    }
}

/// Wraps an optional generator with fallbacks and a timeout.
#[derive(Clone)]
pub struct Advisor {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl Advisor {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub fn offline() -> Self {
        Self::new(None, Duration::ZERO)
    }

    async fn ask(&self, prompt: String, fallback: &'static str) -> String {
        let Some(generator) = self.generator.as_ref() else {
            return fallback.to_string();
        };

        match tokio::time::timeout(self.timeout, generator.generate(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "advisory provider failed, using fallback");
                fallback.to_string()
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "advisory provider timed out");
                fallback.to_string()
            }
        }
    }

    pub async fn daily_advisory(&self, day: u32, struggling: bool) -> String {
        self.ask(daily_prompt(day, struggling), DAILY_FALLBACK).await
    }

    pub async fn recovery_advisory(&self) -> String {
        self.ask(RECOVERY_PROMPT.to_string(), RECOVERY_FALLBACK).await
    }
}

/// Holds at most one in-flight advisory request, tagged with the day it was
/// asked for. A newer request or a different displayed day discards it.
#[derive(Default)]
pub struct AdvisorySlot {
    pending: Option<(u32, JoinHandle<String>)>,
}

impl AdvisorySlot {
    pub fn request<F>(&mut self, day: u32, fut: F)
    where
        F: Future<Output = String> + Send + 'static,
    {
        self.dismiss();
        self.pending = Some((day, tokio::spawn(fut)));
    }

    pub fn dismiss(&mut self) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }
    }

    /// The text for `displayed_day`, or `None` if the pending request was for
    /// another day, was dismissed, or died.
    pub async fn resolve(&mut self, displayed_day: u32) -> Option<String> {
        match self.pending.take() {
            Some((day, handle)) if day == displayed_day => handle.await.ok(),
            Some((_, handle)) => {
                handle.abort();
                None
            }
            None => None,
        }
    }
}

impl Drop for AdvisorySlot {
    fn drop(&mut self) {
        self.dismiss();
    }
}
