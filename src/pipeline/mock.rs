use crate::error::GatewayError;
use crate::models::EvidenceSet;
use crate::pipeline::traits::{EvidenceSearch, LanguageModel, Prompt, ResponseSchema};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Script = Box<dyn Fn(&Prompt) -> Result<String, GatewayError> + Send + Sync>;

/// Model whose answers come from a closure over the prompt.
pub struct ScriptedModel {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&Prompt) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn constant(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(
        &self,
        prompt: &Prompt,
        _schema: Option<&ResponseSchema>,
    ) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(prompt)
    }
}

pub struct FailingModel {
    pub reason: String,
}

#[async_trait]
impl LanguageModel for FailingModel {
    async fn generate(
        &self,
        _prompt: &Prompt,
        _schema: Option<&ResponseSchema>,
    ) -> Result<String, GatewayError> {
        Err(GatewayError::new(self.reason.clone()))
    }
}

/// Search that never finds anything. Used when no search key is configured.
pub struct DummySearch;

#[async_trait]
impl EvidenceSearch for DummySearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<EvidenceSet, GatewayError> {
        Ok(EvidenceSet::empty())
    }
}

pub struct FailingSearch {
    pub reason: String,
}

#[async_trait]
impl EvidenceSearch for FailingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<EvidenceSet, GatewayError> {
        Err(GatewayError::new(self.reason.clone()))
    }
}

/// Canned results per query, each with an optional artificial latency.
/// Unknown queries return an empty set.
#[derive(Default)]
pub struct StaticSearch {
    results: HashMap<String, (EvidenceSet, Duration)>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: impl Into<String>, set: EvidenceSet) -> Self {
        self.results.insert(query.into(), (set, Duration::ZERO));
        self
    }

    pub fn with_delay(mut self, query: impl Into<String>, set: EvidenceSet, delay: Duration) -> Self {
        self.results.insert(query.into(), (set, delay));
        self
    }

    /// Queries seen so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EvidenceSearch for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<EvidenceSet, GatewayError> {
        if let Ok(mut seen) = self.queries.lock() {
            seen.push(query.to_string());
        }
        let Some((set, delay)) = self.results.get(query) else {
            return Ok(EvidenceSet::empty());
        };
        if !delay.is_zero() {
            tokio::time::sleep(*delay).await;
        }
        let mut set = set.clone();
        set.items.truncate(max_results);
        Ok(set)
    }
}
