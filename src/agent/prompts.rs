//! Prompt templates and engineering
//!
//! One template per model call-site. The user's message is inserted with
//! triple braces so Handlebars does not HTML-escape it.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::error::{Error, Result};

/// A prompt template using Handlebars syntax
pub struct PromptTemplate {
    /// Template name
    name: String,
    /// Handlebars registry
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        let name = name.into();
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);

        registry
            .register_template_string(&name, template)
            .map_err(|e| Error::Internal(format!("Invalid template: {}", e)))?;

        Ok(PromptTemplate { name, registry })
    }

    /// Render the template with given data
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.name, data)
            .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
    }
}

/// Asks whether the message retracts or replaces something already remembered
pub const DELETE_INTENT_TEMPLATE: &str = r#"You are an assistant that manages a user's long-term memories.

Decide whether the message below clearly asks to forget, stop using, replace or update something that may already be stored about the user.

Message: "{{{message}}}"

1. Detect whether the user wants to drop or update any specific information.
2. Extract each piece of information that should be removed.

Answer with a single JSON object:
- "shouldDelete": boolean, true if something should be removed or updated
- "memoryToForget": list of strings, one per thing to forget (empty list if none)

Examples:
- "I don't use Brave anymore" -> { "shouldDelete": true, "memoryToForget": ["Brave"] }
- "Replace Jira with Linear for project tracking" -> { "shouldDelete": true, "memoryToForget": ["Jira for project tracking"] }
- "I still use Notion every day" -> { "shouldDelete": false, "memoryToForget": [] }

Return only the JSON object, with no explanation."#;

/// Asks for durable, atomic facts worth remembering
pub const CREATE_INTENT_TEMPLATE: &str = r#"Decide whether the message below states a core, long-term fact about the user.

Message: "{{{message}}}"

Rules:
- Ignore trivial remarks and conversational filler.
- Ignore messages whose intent is to forget, stop using or negate something ("I no longer use X", "I don't use X"), and messages that only express dislike of something.
- Summarize each fact separately. Every list item must mention exactly one entity.

Answer with a single JSON object:
- "shouldRemember": boolean
- "memory": list of strings, one per fact, or null

Example: "I use Shram and Magnet for my work" -> { "shouldRemember": true, "memory": ["uses Shram for work", "uses Magnet for work"] }

Return only the JSON object, with no explanation."#;

/// Asks whether answering needs knowledge about the user
pub const RETRIEVAL_NEED_TEMPLATE: &str = r#"Decide whether the message below is casual conversation or needs knowledge about the user to be answered well.

Message: "{{{message}}}"

Answer with a single JSON object: { "requiresMemory": true } if knowledge about the user is needed, otherwise { "requiresMemory": false }.

Return only the JSON object, with no explanation."#;

/// Final answer grounded on retrieved memories
pub const GROUNDED_REPLY_TEMPLATE: &str = r#"You are a helpful assistant with a long-term memory that can remember and forget facts about the user. Below is what a semantic search of your memory returned for the user's message.

{{{memories}}}

Using this context, give a helpful and relevant reply to the user's latest message.

User's message: "{{{message}}}""#;

/// The compiled templates used by the orchestrator
pub struct Prompts {
    delete_intent: PromptTemplate,
    create_intent: PromptTemplate,
    retrieval_need: PromptTemplate,
    grounded_reply: PromptTemplate,
}

impl Prompts {
    /// Compile all templates
    pub fn new() -> Result<Self> {
        Ok(Prompts {
            delete_intent: PromptTemplate::new("delete_intent", DELETE_INTENT_TEMPLATE)?,
            create_intent: PromptTemplate::new("create_intent", CREATE_INTENT_TEMPLATE)?,
            retrieval_need: PromptTemplate::new("retrieval_need", RETRIEVAL_NEED_TEMPLATE)?,
            grounded_reply: PromptTemplate::new("grounded_reply", GROUNDED_REPLY_TEMPLATE)?,
        })
    }

    /// Delete-intent classification prompt
    pub fn delete_intent(&self, message: &str) -> Result<String> {
        self.delete_intent.render(&json!({ "message": message }))
    }

    /// Create-intent classification prompt
    pub fn create_intent(&self, message: &str) -> Result<String> {
        self.create_intent.render(&json!({ "message": message }))
    }

    /// Retrieval-need classification prompt
    pub fn retrieval_need(&self, message: &str) -> Result<String> {
        self.retrieval_need.render(&json!({ "message": message }))
    }

    /// Final reply prompt with the memory context block
    pub fn grounded_reply(&self, memories: &str, message: &str) -> Result<String> {
        self.grounded_reply
            .render(&json!({ "memories": memories, "message": message }))
    }
}
