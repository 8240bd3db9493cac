//! Shareable handle over a summarizer provider.

use std::sync::Arc;

use crate::config::SummarizerConfig;

use super::{create_summarizer, SummarizeError, SummaryRequest, SummaryResponse, Summarizer};

/// Thin wrapper that makes a provider cheap to share across callers.
pub struct SummarizerClient {
    provider: Arc<dyn Summarizer>,
}

impl SummarizerClient {
    pub fn new(provider: Arc<dyn Summarizer>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self {
            provider: Arc::from(create_summarizer(config)),
        }
    }

    pub fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizeError> {
        self.provider.summarize(request)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }
}

impl Clone for SummarizerClient {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}
