//! Conversation sessions keyed by an opaque session token.
//!
//! A session is created on its first chat call with exactly one `system`
//! message carrying persona and sampled complaint context, then grows by one
//! `user` message per turn and one `assistant` message per successful
//! completion. History is append-only; sessions disappear only through
//! [`SessionStore::remove`] or idle eviction.
//!
//! Turns on the same session are serialized: the history lock is held from
//! the `user` append through the completion call to the `assistant` append.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::{InsightsConfig, MAX_IDLE_TTL_SECS};
use crate::corpus::{load_complaints, CorpusStore};
use crate::error::{Collection, InsightError, InsightResult};
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::sampler;

pub const CHAT_FALLBACK: &str = "Sorry, something went wrong.";

const CHAT_PERSONA: &str = "You are GigInsights, an assistant that helps policy makers understand \
complaints filed by gig-economy cab drivers. Answer questions about the complaints, their common \
themes and possible policy responses. Never reveal the names of individual complainants.";

/// Outcome of one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    /// True when the completion failed and `text` is the fixed fallback
    pub fallback: bool,
}

struct Session {
    history: tokio::sync::Mutex<Vec<ChatMessage>>,
    last_active: Mutex<DateTime<Utc>>,
}

impl Session {
    fn seeded(seed: ChatMessage) -> Self {
        Self {
            history: tokio::sync::Mutex::new(vec![seed]),
            last_active: Mutex::new(Utc::now()),
        }
    }

    fn touch(&self) {
        *self.last_active.lock() = Utc::now();
    }

    fn idle_since(&self) -> DateTime<Utc> {
        *self.last_active.lock()
    }
}

pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    model: String,
    max_tokens: usize,
    seed_sample_size: usize,
    seed_skip: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(config: &InsightsConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            model: config.llm.model.clone(),
            max_tokens: config.tasks.chat_max_tokens,
            seed_sample_size: config.sampling.seed_sample_size,
            seed_skip: config.sampling.seed_skip,
            // Clamped so an unvalidated config cannot overflow the TTL
            idle_ttl: Duration::seconds(config.sessions.idle_ttl_secs.min(MAX_IDLE_TTL_SECS) as i64),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    /// Create and seed a session unless one already exists.
    ///
    /// Returns `true` when a new session was created.
    pub fn create(&self, key: &str, corpus: &dyn CorpusStore) -> InsightResult<bool> {
        self.get_or_create(key, corpus).map(|(_, created)| created)
    }

    /// Run one chat turn.
    ///
    /// An empty prompt is rejected before any session is created or touched.
    /// A failed completion returns [`CHAT_FALLBACK`] and leaves the `user`
    /// message in history without an `assistant` reply.
    pub async fn chat(
        &self,
        key: &str,
        prompt: &str,
        corpus: &dyn CorpusStore,
        client: &dyn CompletionClient,
    ) -> InsightResult<ChatReply> {
        if prompt.trim().is_empty() {
            return Err(InsightError::Validation("Prompt is required".into()));
        }

        let (session, _) = self.get_or_create(key, corpus)?;

        let mut history = session.history.lock().await;
        history.push(ChatMessage::user(prompt));

        let request = CompletionRequest::new(&self.model, history.clone(), self.max_tokens);
        let reply = match client.complete(request).await {
            Ok(text) => {
                history.push(ChatMessage::assistant(text.clone()));
                ChatReply { text, fallback: false }
            }
            Err(e) => {
                tracing::error!(
                    session = %short_key(key),
                    turns = history.len(),
                    error = %e,
                    "Chat completion failed"
                );
                ChatReply {
                    text: CHAT_FALLBACK.to_string(),
                    fallback: true,
                }
            }
        };
        drop(history);

        session.touch();
        Ok(reply)
    }

    /// Snapshot of a session's messages.
    ///
    /// Waits for any in-flight turn on that session to finish.
    pub async fn history(&self, key: &str) -> Option<Vec<ChatMessage>> {
        let session = self.get(key)?;
        let history = session.history.lock().await;
        Some(history.clone())
    }

    /// Tear down a session. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.sessions.remove(key).is_some();
        if removed {
            tracing::info!(session = %short_key(key), "Chat session removed");
        }
        removed
    }

    /// Drop every session idle for longer than the configured TTL as of `now`.
    ///
    /// Sessions with a turn in flight are kept regardless of age.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            session.history.try_lock().is_err() || now - session.idle_since() <= self.idle_ttl
        });
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.sessions.len(), "Evicted idle chat sessions");
        }
        evicted
    }

    /// Periodically evict idle sessions until the store is dropped elsewhere
    /// and the task is aborted.
    pub fn spawn_sweeper(store: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.evict_idle(Utc::now());
            }
        })
    }

    fn get(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    fn get_or_create(
        &self,
        key: &str,
        corpus: &dyn CorpusStore,
    ) -> InsightResult<(Arc<Session>, bool)> {
        // Touch while the shard guard is held so eviction cannot slip in between
        if let Some(entry) = self.sessions.get(key) {
            entry.touch();
            return Ok((entry.value().clone(), false));
        }
        // Seeding reads the corpus, so it happens outside the map's shard lock
        let seed = self.build_seed(corpus)?;

        let mut created = false;
        let session = self
            .sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(Session::seeded(seed))
            })
            .value()
            .clone();
        if created {
            tracing::info!(session = %short_key(key), "Chat session created");
        }
        Ok((session, created))
    }

    fn build_seed(&self, corpus: &dyn CorpusStore) -> InsightResult<ChatMessage> {
        let complaints = load_complaints(corpus);
        let sample = sampler::sample(&complaints, self.seed_sample_size);
        if sample.is_empty() {
            return Err(InsightError::EmptyCorpus(Collection::Complaints));
        }

        let titles: Vec<&str> = seed_tail(&sample, self.seed_skip)
            .iter()
            .map(|c| c.title())
            .collect();
        Ok(ChatMessage::system(seed_preamble(&titles)))
    }
}

/// The part of the seed sample that goes into the preamble.
///
/// Leading `skip` entries are dropped, but a non-empty sample always keeps at
/// least its last entry.
fn seed_tail<T>(sample: &[T], skip: usize) -> &[T] {
    let skip = skip.min(sample.len().saturating_sub(1));
    &sample[skip..]
}

fn seed_preamble(titles: &[&str]) -> String {
    format!(
        "{}\n\nComplaint titles for context:\n- {}",
        CHAT_PERSONA,
        titles.join("\n- ")
    )
}

fn short_key(key: &str) -> String {
    key.chars().take(8).collect()
}
