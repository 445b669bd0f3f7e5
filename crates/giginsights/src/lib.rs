pub mod config;
pub mod corpus;
pub mod error;
pub mod insights;
pub mod llm;
pub mod prompts;
pub mod sampler;
pub mod session;
pub mod types;
pub mod validator;

// Re-export primary types for convenience
pub use config::InsightsConfig;
pub use corpus::{CorpusStore, JsonFileCorpus, StaticCorpus};
pub use error::{Collection, InsightError};
pub use insights::InsightsService;
pub use llm::{
    ChatMessage, ChatRole, CompletionClient, CompletionError, CompletionRequest, OpenAIClient,
};
pub use session::{ChatReply, SessionStore};
pub use types::{ComplaintRecord, ConcernSummary, PolicyRecord, PolicySuggestionResult};
