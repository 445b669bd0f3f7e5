use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub llm: LlmConfig,
    pub tasks: TaskLimits,
    pub sampling: SamplingConfig,
    pub corpus: CorpusConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without the `/chat/completions` suffix
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// Output token ceilings per task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskLimits {
    pub summary_max_tokens: usize,
    pub policy_max_tokens: usize,
    pub analysis_max_tokens: usize,
    pub chat_max_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Complaints drawn for the summary and analytics prompts
    pub analytics_sample_size: usize,
    /// Complaints drawn when seeding a new chat session
    pub seed_sample_size: usize,
    /// Leading titles of the seed sample left out of the chat preamble
    pub seed_skip: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub complaints_path: PathBuf,
    pub policies_path: PathBuf,
}

/// Longest accepted session idle TTL (one year).
pub const MAX_IDLE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl InsightsConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.llm.model.trim().is_empty() {
            return Err("llm.model must not be empty".into());
        }
        if self.llm.base_url.trim().is_empty() {
            return Err("llm.base_url must not be empty".into());
        }
        let limits = [
            ("tasks.summary_max_tokens", self.tasks.summary_max_tokens),
            ("tasks.policy_max_tokens", self.tasks.policy_max_tokens),
            ("tasks.analysis_max_tokens", self.tasks.analysis_max_tokens),
            ("tasks.chat_max_tokens", self.tasks.chat_max_tokens),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(format!("{} must be > 0", name));
            }
        }
        if self.sampling.analytics_sample_size == 0 {
            return Err("sampling.analytics_sample_size must be > 0".into());
        }
        if self.sampling.seed_sample_size == 0 {
            return Err("sampling.seed_sample_size must be > 0".into());
        }
        if self.sampling.seed_skip >= self.sampling.seed_sample_size {
            return Err("sampling.seed_skip must be < seed_sample_size".into());
        }
        if self.sessions.idle_ttl_secs == 0 {
            return Err("sessions.idle_ttl_secs must be > 0".into());
        }
        if self.sessions.idle_ttl_secs > MAX_IDLE_TTL_SECS {
            return Err(format!(
                "sessions.idle_ttl_secs must be <= {}",
                MAX_IDLE_TTL_SECS
            ));
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err("sessions.sweep_interval_secs must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables on top of file/default values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(path) = non_empty("COMPLAINTS_PATH") {
            self.corpus.complaints_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty("POLICIES_PATH") {
            self.corpus.policies_path = PathBuf::from(path);
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            connect_timeout_secs: 15,
            request_timeout_secs: 120,
        }
    }
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            summary_max_tokens: 300,
            policy_max_tokens: 300,
            analysis_max_tokens: 500,
            chat_max_tokens: 500,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            analytics_sample_size: 50,
            seed_sample_size: 50,
            seed_skip: 29,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            complaints_path: PathBuf::from("data.json"),
            policies_path: PathBuf::from("policies.json"),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}
