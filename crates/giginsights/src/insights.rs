//! One-shot insight tasks plus the entry point for chat.
//!
//! Each task loads the corpus fresh, samples it, builds a prompt, makes a
//! single completion call and repairs the output. Completion failures never
//! escape: they become the task's fallback value.

use std::sync::Arc;

use crate::config::InsightsConfig;
use crate::corpus::{load_complaints, load_policies, load_raw_complaints, CorpusStore};
use crate::error::{Collection, InsightError, InsightResult};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts::{self, Prompt};
use crate::sampler;
use crate::session::{ChatReply, SessionStore};
use crate::types::ConcernSummary;
use crate::validator;

pub struct InsightsService {
    config: InsightsConfig,
    corpus: Arc<dyn CorpusStore>,
    client: Arc<dyn CompletionClient>,
    sessions: Arc<SessionStore>,
}

impl InsightsService {
    pub fn new(
        config: InsightsConfig,
        corpus: Arc<dyn CorpusStore>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(&config));
        Self {
            config,
            corpus,
            client,
            sessions,
        }
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The whole complaint collection as stored.
    pub fn complaints(&self) -> Vec<serde_json::Value> {
        load_raw_complaints(self.corpus.as_ref())
    }

    pub async fn summary(&self) -> InsightResult<String> {
        let titles = self.sampled_titles()?;
        let prompt = prompts::build_summary_prompt(&titles);
        let raw = self
            .complete(prompt, self.config.tasks.summary_max_tokens, "summary")
            .await;
        Ok(validator::accept_summary(raw))
    }

    pub async fn analytics(&self) -> InsightResult<Vec<ConcernSummary>> {
        let titles = self.sampled_titles()?;
        let prompt = prompts::build_analysis_prompt(&titles);
        let raw = self
            .complete(prompt, self.config.tasks.analysis_max_tokens, "analytics")
            .await;
        if let Some(raw) = &raw {
            tracing::debug!(raw = %raw, "Raw analysis response");
        }
        Ok(validator::concerns_or_fallback(raw.as_deref()))
    }

    /// Policy suggestions as the model's raw text.
    pub async fn policy_suggestions(&self) -> InsightResult<String> {
        let policies = load_policies(self.corpus.as_ref());
        if policies.is_empty() {
            return Err(InsightError::EmptyCorpus(Collection::Policies));
        }

        let prompt = prompts::build_policy_suggestion_prompt(&policies);
        let raw = self
            .complete(prompt, self.config.tasks.policy_max_tokens, "policy-suggestions")
            .await;

        if let Some(text) = &raw {
            match validator::parse_policy_suggestions(text) {
                Some(parsed) => tracing::debug!(
                    suggestions = parsed.suggestions.len(),
                    "Policy suggestions parsed"
                ),
                None => tracing::warn!("Policy suggestions are not a JSON object, passing raw text through"),
            }
        }
        Ok(validator::accept_summary(raw))
    }

    pub async fn chat(&self, session_key: &str, prompt: &str) -> InsightResult<ChatReply> {
        self.sessions
            .chat(session_key, prompt, self.corpus.as_ref(), self.client.as_ref())
            .await
    }

    fn sampled_titles(&self) -> InsightResult<Vec<String>> {
        let complaints = load_complaints(self.corpus.as_ref());
        if complaints.is_empty() {
            return Err(InsightError::EmptyCorpus(Collection::Complaints));
        }
        let sample = sampler::sample(&complaints, self.config.sampling.analytics_sample_size);
        Ok(sample.iter().map(|c| c.title().to_string()).collect())
    }

    /// One completion attempt; `None` on failure.
    async fn complete(&self, prompt: Prompt, max_tokens: usize, task: &str) -> Option<String> {
        let request =
            CompletionRequest::new(&self.config.llm.model, prompt.into_messages(), max_tokens);
        match self.client.complete(request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(task, error = %InsightError::from(e), "Completion failed, using fallback");
                None
            }
        }
    }
}
