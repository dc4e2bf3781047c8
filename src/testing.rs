//! Test doubles for the model and embedding seams

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::agent::GenerationOptions;
use crate::core::LlmProvider;
use crate::error::{Error, Result};
use crate::memory::Embedder;

/// Language model that replays queued answers in call order
#[derive(Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<(String, bool)>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer
    pub fn then(self, answer: &str) -> Self {
        self.push(Ok(answer.to_string()))
    }

    /// Queue a transport failure
    pub fn then_fail(self) -> Self {
        self.push(Err(Error::ServiceUnavailable("scripted outage".into())))
    }

    fn push(self, item: Result<String>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }

    /// Prompts received so far, with whether JSON output was requested
    pub fn prompts(&self) -> Vec<(String, bool)> {
        self.prompts.lock().unwrap().clone()
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.wants_json()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Llm("script exhausted".into())))
    }
}

/// Embedder mapping known texts to fixed vectors; unknown text gets zeros
pub struct FixedEmbedder {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    fail: bool,
    calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        FixedEmbedder {
            dimensions,
            vectors: HashMap::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimensions);
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `embed_batch` calls made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("scripted embedding failure".into()));
        }
        Ok(texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dimensions])
            })
            .collect())
    }
}
