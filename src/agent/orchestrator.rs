//! Memory orchestrator
//!
//! Runs one user turn to completion: delete-intent check, create-intent
//! check, then the retrieval-need check and the reply. Remote failures are
//! converted to fallback replies here; the only error that escapes a turn is
//! `Error::MemoryWrite` under the abort write-failure policy.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use super::decision::{decode, CreateDecision, DecodeError, DeleteDecision, RetrievalDecision};
use super::prompts::Prompts;
use super::types::GenerationOptions;
use crate::config::{AgentConfig, WriteFailurePolicy};
use crate::core::{LlmProvider, MemoryPayload, MemoryStatus, VectorStore};
use crate::error::{Error, Result};
use crate::memory::{format_memories, Embedder, MemoryRetriever};
use crate::session::{Session, SessionSummary};

/// Reply when the language model cannot be reached or returns nothing
pub const BRAIN_TROUBLE_REPLY: &str = "Sorry, I'm having trouble connecting to my brain right now.";

/// Reply when a turn cannot be completed for any other reason
pub const GENERIC_ERROR_REPLY: &str = "Something went wrong while handling your message. Please try again.";

/// Reply when new memories could not be stored (report policy)
pub const SAVE_FAILED_REPLY: &str = "I couldn't save that to memory right now.";

/// Reply when a matched memory could not be marked deleted
pub const FORGET_FAILED_REPLY: &str = "I couldn't forget that right now. Please try again.";

/// Reply to a blank message
pub const EMPTY_MESSAGE_REPLY: &str = "I didn't catch that. Could you say it again?";

/// Everything that happened during one turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    /// Contents of records soft-deleted this turn
    pub forgotten: Vec<String>,
    /// Facts stored this turn
    pub remembered: Vec<String>,
    /// Final reply; never empty
    pub reply: String,
    /// Context block sent with the grounded reply prompt, if any
    pub memory_context: Option<String>,
}

impl TurnReport {
    /// User-visible text: forget confirmations, then the reply
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .forgotten
            .iter()
            .map(|content| format!("I have forgotten about \"{}\".", content))
            .collect();
        lines.push(self.reply.clone());
        lines.join("\n")
    }
}

/// Coordinates the language model, embedder, and vector store per turn
pub struct MemoryOrchestrator {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    retriever: MemoryRetriever,
    prompts: Prompts,
    settings: AgentConfig,
}

impl MemoryOrchestrator {
    /// Wire the orchestrator to its services
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        settings: AgentConfig,
    ) -> Result<Self> {
        if embedder.dimensions() != store.dimensions() {
            return Err(Error::Config(format!(
                "Embedder produces {}-dimension vectors but the {} store expects {}",
                embedder.dimensions(),
                store.id(),
                store.dimensions()
            )));
        }

        let retriever = MemoryRetriever::new(store.clone(), embedder.clone(), &settings);
        Ok(MemoryOrchestrator {
            llm,
            embedder,
            store,
            retriever,
            prompts: Prompts::new()?,
            settings,
        })
    }

    /// Start a session and make sure its collection exists
    pub async fn open_session(&self) -> Result<Session> {
        let session = Session::new();
        self.store.ensure_collection(&session.collection()).await?;
        info!("Opened session {} on {} store", session.id(), self.store.id());
        Ok(session)
    }

    /// End a session and report what it holds; nothing is purged
    pub async fn close_session(&self, session: Session) -> Result<SessionSummary> {
        let collection = session.collection();
        let summary = SessionSummary {
            session_id: session.id(),
            started_at: session.started_at(),
            turns: session.turns(),
            active_memories: self.store.count(&collection, Some(MemoryStatus::Active)).await?,
            deleted_memories: self.store.count(&collection, Some(MemoryStatus::Deleted)).await?,
        };
        info!("Closed {}", summary);
        Ok(summary)
    }

    /// Handle one user message
    pub async fn handle_user_message(&self, session: &mut Session, message: &str) -> Result<TurnReport> {
        session.record_turn();
        let collection = session.collection();
        let message = message.trim();
        let mut report = TurnReport::default();

        if message.is_empty() {
            report.reply = EMPTY_MESSAGE_REPLY.to_string();
            return Ok(report);
        }

        debug!("Turn {} of session {}", session.turns(), session.id());

        if let Some(reply) = self.forget(&collection, message, &mut report).await {
            report.reply = reply;
            return Ok(report);
        }

        if let Some(reply) = self.remember(&collection, message, &mut report).await? {
            report.reply = reply;
            return Ok(report);
        }

        let (reply, context) = self.respond(&collection, message).await;
        report.reply = reply;
        report.memory_context = context;
        Ok(report)
    }

    /// Ask a structured question; the outer error is transport, the inner decoding
    async fn classify<T: DeserializeOwned>(
        &self,
        prompt: Result<String>,
    ) -> Result<std::result::Result<T, DecodeError>> {
        let prompt = prompt?;
        let raw = self
            .llm
            .complete(&prompt, &GenerationOptions::precise().json())
            .await?;
        Ok(decode(&raw))
    }

    /// Delete step. Returns a reply when the turn should stop here.
    async fn forget(&self, collection: &str, message: &str, report: &mut TurnReport) -> Option<String> {
        let decision: DeleteDecision = match self.classify(self.prompts.delete_intent(message)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!("Could not decode delete-intent answer: {}", e);
                return None;
            }
            Err(e) => {
                warn!("Delete-intent check failed: {}", e);
                return None;
            }
        };

        let subjects = decision.subjects();
        if subjects.is_empty() {
            return None;
        }

        let vectors = match self.embedder.embed_batch(subjects.clone()).await {
            Ok(vectors) => vectors,
            Err(e) => {
                warn!("Could not embed subjects to forget: {}", e);
                return None;
            }
        };

        for (subject, vector) in subjects.iter().zip(vectors) {
            let hits = match self.retriever.search_vector(collection, vector, true).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Search for {:?} failed: {}", subject, e);
                    return None;
                }
            };

            if hits.is_empty() {
                info!("No memory matches {:?}", subject);
                return Some(format!("I don't have a memory about \"{}\".", subject));
            }

            for hit in hits {
                let id = hit.memory.id;
                if let Err(e) = self.store.soft_delete(collection, id).await {
                    error!("Failed to forget memory {}: {}", id, e);
                    return Some(FORGET_FAILED_REPLY.to_string());
                }
                info!("Forgot memory {} (score {:.3})", id, hit.score);
                report.forgotten.push(hit.memory.payload.content);
            }
        }

        None
    }

    /// Create step. Returns a reply when the turn should stop here.
    async fn remember(&self, collection: &str, message: &str, report: &mut TurnReport) -> Result<Option<String>> {
        let decision: CreateDecision = match self.classify(self.prompts.create_intent(message)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!("Could not decode create-intent answer: {}", e);
                return Ok(None);
            }
            Err(e) => {
                warn!("Create-intent check failed: {}", e);
                return Ok(None);
            }
        };

        let facts = decision.facts();
        if facts.is_empty() {
            return Ok(None);
        }

        let vectors = match self.embedder.embed_batch(facts.clone()).await {
            Ok(vectors) => vectors,
            Err(e) => {
                warn!("Could not embed new facts: {}", e);
                return Ok(None);
            }
        };
        let payloads = facts.iter().map(|fact| MemoryPayload::active(fact.clone())).collect();

        match self.store.insert(collection, vectors, payloads).await {
            Ok(ids) => {
                info!("Remembered {} facts in {}", ids.len(), collection);
                report.remembered.extend(facts);
                Ok(None)
            }
            Err(e) => {
                error!("Failed to store memories: {}", e);
                match self.settings.on_write_failure {
                    WriteFailurePolicy::Report => Ok(Some(SAVE_FAILED_REPLY.to_string())),
                    WriteFailurePolicy::Abort => Err(Error::MemoryWrite(e.to_string())),
                }
            }
        }
    }

    /// Retrieval-need check and final reply, with the context block used
    async fn respond(&self, collection: &str, message: &str) -> (String, Option<String>) {
        let decision: RetrievalDecision = match self.classify(self.prompts.retrieval_need(message)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!("Could not decode retrieval-need answer: {}", e);
                return (GENERIC_ERROR_REPLY.to_string(), None);
            }
            Err(e) => {
                warn!("Retrieval-need check failed: {}", e);
                return (BRAIN_TROUBLE_REPLY.to_string(), None);
            }
        };

        let (prompt, context) = if decision.requires_memory {
            let hits = match self.retriever.search_text(collection, message).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Memory lookup failed: {}", e);
                    return (GENERIC_ERROR_REPLY.to_string(), None);
                }
            };
            let context = format_memories(&hits);
            match self.prompts.grounded_reply(&context, message) {
                Ok(prompt) => (prompt, Some(context)),
                Err(e) => {
                    warn!("Could not build reply prompt: {}", e);
                    return (GENERIC_ERROR_REPLY.to_string(), None);
                }
            }
        } else {
            (message.to_string(), None)
        };

        let reply = match self.llm.complete(&prompt, &GenerationOptions::balanced()).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Language model returned an empty reply");
                BRAIN_TROUBLE_REPLY.to_string()
            }
            Err(e) => {
                warn!("Reply generation failed: {}", e);
                BRAIN_TROUBLE_REPLY.to_string()
            }
        };
        (reply, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryStore;
    use crate::memory::NO_MEMORIES_CONTEXT;
    use crate::testing::{FixedEmbedder, ScriptedLlm};

    const NO_DELETE: &str = r#"{"shouldDelete": false, "memoryToForget": []}"#;
    const NO_CREATE: &str = r#"{"shouldRemember": false, "memory": null}"#;
    const CASUAL: &str = r#"{"requiresMemory": false}"#;
    const NEEDS_MEMORY: &str = r#"{"requiresMemory": true}"#;

    fn embedder() -> FixedEmbedder {
        FixedEmbedder::new(3)
            .with("uses Shram for work", vec![1.0, 0.0, 0.0])
            .with("uses Magnet for work", vec![0.0, 1.0, 0.0])
            .with("uses Brave for browsing", vec![0.0, 0.0, 1.0])
            .with("Brave", vec![0.0, 0.2, 1.0])
            .with("uses Linear for project tracking", vec![1.0, 0.0, 0.0])
            .with("likes green tea", vec![1.0, 0.0, 0.0])
            .with("What drink do I like?", vec![0.5, 0.75f32.sqrt(), 0.0])
            .with("What car do I drive?", vec![0.2, 0.96f32.sqrt(), 0.0])
    }

    struct Harness {
        llm: Arc<ScriptedLlm>,
        store: Arc<InMemoryStore>,
        agent: MemoryOrchestrator,
    }

    fn harness(llm: ScriptedLlm, settings: AgentConfig) -> Harness {
        let llm = Arc::new(llm);
        let store = Arc::new(InMemoryStore::new(3));
        let agent = MemoryOrchestrator::new(llm.clone(), Arc::new(embedder()), store.clone(), settings).unwrap();
        Harness { llm, store, agent }
    }

    async fn seed(store: &InMemoryStore, session: &Session, content: &str, vector: Vec<f32>) {
        store
            .insert(&session.collection(), vec![vector], vec![MemoryPayload::active(content)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_two_facts_become_two_records() {
        let h = harness(
            ScriptedLlm::new()
                .then(NO_DELETE)
                .then(r#"{"shouldRemember": "True", "memory": ["uses Shram for work", "uses Magnet for work"]}"#)
                .then(CASUAL)
                .then("Nice tools!"),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();

        let report = h
            .agent
            .handle_user_message(&mut session, "I use Shram and Magnet for my work")
            .await
            .unwrap();

        assert_eq!(report.remembered, vec!["uses Shram for work", "uses Magnet for work"]);
        assert_eq!(report.reply, "Nice tools!");
        assert_eq!(h.store.count(&session.collection(), Some(MemoryStatus::Active)).await.unwrap(), 2);

        let prompts = h.llm.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[..3].iter().all(|(_, json)| *json));
        assert_eq!(prompts[3], ("I use Shram and Magnet for my work".to_string(), false));
    }

    #[tokio::test]
    async fn test_forget_then_forget_again() {
        let h = harness(
            ScriptedLlm::new()
                .then(r#"{"shouldDelete": true, "memoryToForget": ["Brave"]}"#)
                .then(NO_CREATE)
                .then(CASUAL)
                .then("Noted.")
                .then(r#"{"shouldDelete": true, "memoryToForget": ["Brave"]}"#),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();
        let collection = session.collection();
        seed(&h.store, &session, "uses Brave for browsing", vec![0.0, 0.0, 1.0]).await;

        let report = h
            .agent
            .handle_user_message(&mut session, "I don't use Brave anymore")
            .await
            .unwrap();
        assert_eq!(report.forgotten, vec!["uses Brave for browsing"]);
        assert_eq!(
            report.render(),
            "I have forgotten about \"uses Brave for browsing\".\nNoted."
        );

        let report = h
            .agent
            .handle_user_message(&mut session, "Forget about Brave")
            .await
            .unwrap();
        assert!(report.forgotten.is_empty());
        assert_eq!(report.reply, "I don't have a memory about \"Brave\".");
        assert_eq!(h.llm.remaining(), 0);

        assert_eq!(h.store.count(&collection, None).await.unwrap(), 1);
        assert_eq!(h.store.count(&collection, Some(MemoryStatus::Deleted)).await.unwrap(), 1);
        assert_eq!(h.store.count(&collection, Some(MemoryStatus::Active)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replace_deletes_and_creates_in_one_turn() {
        let h = harness(
            ScriptedLlm::new()
                .then(r#"{"shouldDelete": true, "memoryToForget": ["Brave"]}"#)
                .then(r#"{"shouldRemember": true, "memory": ["uses Linear for project tracking"]}"#)
                .then(CASUAL)
                .then("Switched."),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();
        seed(&h.store, &session, "uses Brave for browsing", vec![0.0, 0.0, 1.0]).await;

        let report = h
            .agent
            .handle_user_message(&mut session, "Replace Brave with Linear")
            .await
            .unwrap();
        assert_eq!(report.forgotten.len(), 1);
        assert_eq!(report.remembered, vec!["uses Linear for project tracking"]);

        let summary = h.agent.close_session(session).await.unwrap();
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.active_memories, 1);
        assert_eq!(summary.deleted_memories, 1);
    }

    #[tokio::test]
    async fn test_empty_store_uses_fallback_context() {
        let h = harness(
            ScriptedLlm::new()
                .then(NO_DELETE)
                .then(NO_CREATE)
                .then(NEEDS_MEMORY)
                .then("I don't know much about you yet."),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();

        let report = h
            .agent
            .handle_user_message(&mut session, "What do you know about me?")
            .await
            .unwrap();

        assert_eq!(report.memory_context.as_deref(), Some(NO_MEMORIES_CONTEXT));
        assert_eq!(report.reply, "I don't know much about you yet.");

        let (last_prompt, json) = h.llm.prompts().pop().unwrap();
        assert!(!json);
        assert!(last_prompt.contains(NO_MEMORIES_CONTEXT));
        assert!(last_prompt.contains("What do you know about me?"));
    }

    #[tokio::test]
    async fn test_similarity_threshold_controls_context() {
        let h = harness(
            ScriptedLlm::new()
                .then(NO_DELETE)
                .then(NO_CREATE)
                .then(NEEDS_MEMORY)
                .then("Green tea.")
                .then(NO_DELETE)
                .then(NO_CREATE)
                .then(NEEDS_MEMORY)
                .then("No idea."),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();
        seed(&h.store, &session, "likes green tea", vec![1.0, 0.0, 0.0]).await;

        // cosine 0.5
        let report = h
            .agent
            .handle_user_message(&mut session, "What drink do I like?")
            .await
            .unwrap();
        let context = report.memory_context.unwrap();
        assert!(context.contains("- likes green tea"));

        // cosine 0.2
        let report = h
            .agent
            .handle_user_message(&mut session, "What car do I drive?")
            .await
            .unwrap();
        assert_eq!(report.memory_context.as_deref(), Some(NO_MEMORIES_CONTEXT));
    }

    #[tokio::test]
    async fn test_malformed_classification_means_no_action() {
        let h = harness(
            ScriptedLlm::new()
                .then("I think you want to delete something")
                .then(r#"{"shouldRemember": maybe}"#)
                .then(CASUAL)
                .then("Hello!"),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();

        let report = h.agent.handle_user_message(&mut session, "hi there").await.unwrap();
        assert!(report.forgotten.is_empty());
        assert!(report.remembered.is_empty());
        assert_eq!(report.reply, "Hello!");
        assert_eq!(h.store.count(&session.collection(), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_retrieval_answer_gives_error_reply() {
        let h = harness(
            ScriptedLlm::new().then(NO_DELETE).then(NO_CREATE).then("yes"),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();

        let report = h.agent.handle_user_message(&mut session, "hello").await.unwrap();
        assert_eq!(report.reply, GENERIC_ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_outage_still_replies() {
        let h = harness(
            ScriptedLlm::new().then_fail().then_fail().then_fail().then_fail(),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();

        let report = h.agent.handle_user_message(&mut session, "hello").await.unwrap();
        assert_eq!(report.reply, BRAIN_TROUBLE_REPLY);
        assert!(!report.render().is_empty());
    }

    #[tokio::test]
    async fn test_empty_model_reply_is_replaced() {
        let h = harness(
            ScriptedLlm::new().then(NO_DELETE).then(NO_CREATE).then(CASUAL).then("   "),
            AgentConfig::default(),
        );
        let mut session = h.agent.open_session().await.unwrap();

        let report = h.agent.handle_user_message(&mut session, "hello").await.unwrap();
        assert_eq!(report.reply, BRAIN_TROUBLE_REPLY);
    }

    #[tokio::test]
    async fn test_blank_message_skips_the_model() {
        let h = harness(ScriptedLlm::new(), AgentConfig::default());
        let mut session = h.agent.open_session().await.unwrap();

        let report = h.agent.handle_user_message(&mut session, "   ").await.unwrap();
        assert_eq!(report.reply, EMPTY_MESSAGE_REPLY);
        assert!(h.llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let h = harness(
            ScriptedLlm::new()
                .then(NO_DELETE)
                .then(r#"{"shouldRemember": true, "memory": ["uses Shram for work"]}"#),
            AgentConfig::default(),
        );
        // Collection never created, so the insert fails
        let mut session = Session::new();

        let report = h
            .agent
            .handle_user_message(&mut session, "I use Shram for work")
            .await
            .unwrap();
        assert_eq!(report.reply, SAVE_FAILED_REPLY);
        assert!(report.remembered.is_empty());
        assert_eq!(h.llm.remaining(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_aborts_when_configured() {
        let settings = AgentConfig {
            on_write_failure: WriteFailurePolicy::Abort,
            ..AgentConfig::default()
        };
        let h = harness(
            ScriptedLlm::new()
                .then(NO_DELETE)
                .then(r#"{"shouldRemember": true, "memory": ["uses Shram for work"]}"#),
            settings,
        );
        let mut session = Session::new();

        let result = h.agent.handle_user_message(&mut session, "I use Shram for work").await;
        assert!(matches!(result, Err(Error::MemoryWrite(_))));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let result = MemoryOrchestrator::new(
            Arc::new(ScriptedLlm::new()),
            Arc::new(FixedEmbedder::new(384)),
            Arc::new(InMemoryStore::new(3)),
            AgentConfig::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_render_without_deletions() {
        let report = TurnReport {
            reply: "Hi!".into(),
            ..Default::default()
        };
        assert_eq!(report.render(), "Hi!");
    }
}
