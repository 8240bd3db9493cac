//! Narrative summarizer boundary.
//!
//! The hosted text-generation endpoint is opaque to this crate: structured
//! capture data and a tone go in, a narrative string or a typed, staged
//! error comes out. The stage taxonomy is a closed set; anything a provider
//! emits outside it collapses to `Unknown`.

pub mod client;
pub mod provider;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::moment::Moment;
use crate::period::{day_part, hour_bucket};

pub use client::SummarizerClient;
pub use provider::{create_summarizer, OpenAiCompatibleProvider};

/// Where in the generation pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Expired or missing credential; the user must re-authenticate.
    Auth,
    /// Source data could not be loaded. Retryable.
    Fetch,
    /// Summarizer backend unavailable. Retryable after a delay.
    Model,
    /// Summarizer response was malformed.
    Parse,
    /// Locally detected invalid input; never reaches the network.
    Validate,
    /// Summarizer reported success but an expected field was missing.
    Extract,
    Unknown,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Auth => "auth",
            Stage::Fetch => "fetch",
            Stage::Model => "model",
            Stage::Parse => "parse",
            Stage::Validate => "validate",
            Stage::Extract => "extract",
            Stage::Unknown => "unknown",
        }
    }

    /// Parse a stage emitted by the boundary; unrecognized values pass
    /// through as `Unknown` rather than failing.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "auth" => Stage::Auth,
            "fetch" => Stage::Fetch,
            "model" => Stage::Model,
            "parse" => Stage::Parse,
            "validate" => Stage::Validate,
            "extract" => Stage::Extract,
            _ => Stage::Unknown,
        }
    }

    /// Fixed human-readable message per stage.
    pub fn user_message(&self) -> &'static str {
        match self {
            Stage::Auth => "Please sign in again to refresh your insights.",
            Stage::Fetch => "Couldn't load your moments. Check your connection and try again.",
            Stage::Model => "The summary service is busy right now. Try again in a moment.",
            Stage::Parse => "The summary came back in an unexpected shape. Please try again.",
            Stage::Validate => "Some moments couldn't be read. Refresh and try again.",
            Stage::Extract => "The summary service returned an incomplete answer. Try again.",
            Stage::Unknown => "Something went wrong while generating your insight.",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure from the summarizer boundary.
#[derive(Debug, Clone, Error)]
#[error("summarizer failed at {stage}: {message}")]
pub struct SummarizeError {
    pub stage: Stage,
    pub message: String,
    pub request_id: Option<String>,
    pub status: Option<u16>,
}

impl SummarizeError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            request_id: None,
            status: None,
        }
    }

    /// Message shown to the user: the fixed per-stage text, with the raw
    /// request id appended for support-ticket correlation when present.
    pub fn user_message(&self) -> String {
        match &self.request_id {
            Some(id) => format!("{} (ref: {id})", self.stage.user_message()),
            None => self.stage.user_message().to_string(),
        }
    }
}

/// One capture in the structured summarizer payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePayload {
    pub mood: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamp: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_part: Option<String>,
}

impl CapturePayload {
    pub fn from_moment(moment: &Moment) -> Self {
        Self {
            mood: crate::mood::resolve_label(&moment.mood, moment.mood_name.as_deref()),
            note: moment.note.clone(),
            timestamp: moment.created_at.to_rfc3339(),
            tags: moment.tags.clone(),
            time_bucket: Some(hour_bucket(moment.created_at)),
            day_part: Some(day_part(moment.created_at).to_string()),
        }
    }
}

/// Input to one narrative generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub period_label: String,
    pub structured_captures: Vec<CapturePayload>,
    pub tone_style: String,
}

/// Successful generation result.
#[derive(Debug, Clone)]
pub struct SummaryResponse {
    pub text: String,
    pub request_id: String,
}

/// A narrative generation backend.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizeError>;

    fn provider_name(&self) -> &'static str;
}
