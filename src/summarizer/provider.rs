//! OpenAI-compatible chat-completion provider.

use serde::{Deserialize, Serialize};

use crate::config::{SummarizerConfig, SummarizerProviderType};

use super::{Stage, SummarizeError, SummaryRequest, SummaryResponse, Summarizer};

/// Build a provider from configuration. Every supported backend speaks the
/// OpenAI-compatible chat API; only the default endpoint differs.
pub fn create_summarizer(config: &SummarizerConfig) -> Box<dyn Summarizer> {
    let provider_name = match config.provider {
        SummarizerProviderType::LmStudio => "lmstudio",
        SummarizerProviderType::OpenAi => "openai",
        SummarizerProviderType::Ollama => "ollama",
    };

    Box::new(OpenAiCompatibleProvider {
        endpoint: config.endpoint.clone(),
        model: config.model.clone(),
        api_key: config.api_key.clone(),
        timeout_secs: config.timeout_secs,
        provider_name,
    })
}

pub struct OpenAiCompatibleProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
    provider_name: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// Staged error envelope some backends return alongside the HTTP status.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    #[serde(default)]
    request_id: Option<String>,
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

impl OpenAiCompatibleProvider {
    fn build_request(&self, request: &SummaryRequest) -> Result<ChatRequest, SummarizeError> {
        let payload = serde_json::to_string(request).map_err(|e| {
            SummarizeError::new(Stage::Validate, format!("request not serializable: {e}"))
        })?;

        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: format!(
                        "You are a gentle journaling companion. Write one short \
                         narrative paragraph about the captured moments below, in a \
                         {} tone. Return plain text only.",
                        request.tone_style
                    ),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: payload,
                },
            ],
            max_tokens: 400,
            temperature: 0.7,
        })
    }
}

impl Summarizer for OpenAiCompatibleProvider {
    fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizeError> {
        let body = self.build_request(request)?;
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build();

        let mut call = agent.post(&url).set("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            call = call.set("Authorization", &format!("Bearer {key}"));
        }

        let response = match call.send_json(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let fallback_stage = match code {
                    401 | 403 => Stage::Auth,
                    _ => Stage::Model,
                };
                let detail = response.into_string().unwrap_or_default();

                // Prefer the backend's own staged error when it sent one;
                // stages outside the taxonomy collapse to `unknown`.
                if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&detail) {
                    return Err(SummarizeError {
                        stage: envelope
                            .error
                            .stage
                            .as_deref()
                            .map(Stage::parse)
                            .unwrap_or(fallback_stage),
                        message: envelope
                            .error
                            .message
                            .unwrap_or_else(|| format!("summarizer returned HTTP {code}")),
                        request_id: envelope.request_id,
                        status: envelope.error.status.or(Some(code)),
                    });
                }

                return Err(SummarizeError {
                    stage: fallback_stage,
                    message: format!("summarizer returned HTTP {code}: {detail}"),
                    request_id: None,
                    status: Some(code),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(SummarizeError::new(
                    Stage::Model,
                    format!("summarizer unreachable: {transport}"),
                ));
            }
        };

        let parsed: ChatResponse = response.into_json().map_err(|e| {
            SummarizeError::new(Stage::Parse, format!("malformed summarizer response: {e}"))
        })?;

        let request_id = parsed.id.clone().unwrap_or_default();
        let text = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| SummarizeError {
                stage: Stage::Extract,
                message: "summarizer response carried no narrative text".to_string(),
                request_id: parsed.id,
                status: None,
            })?;

        Ok(SummaryResponse { text, request_id })
    }

    fn provider_name(&self) -> &'static str {
        self.provider_name
    }
}
