//! Intent classification
//!
//! The router only ever talks to an [`IntentClassifier`]. The production
//! implementation asks an LLM ([`LlmClassifier`]); [`StaticClassifier`]
//! answers with a fixed result and counts calls.

mod llm;

pub use llm::{LlmClassifier, parse_classification};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ClassificationResult;
use crate::error::{Result, RouterError};

/// Maps an utterance to an intent and a confidence score
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> Result<ClassificationResult>;
}

/// Classifier with a canned answer
#[derive(Debug)]
pub struct StaticClassifier {
    outcome: std::result::Result<ClassificationResult, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticClassifier {
    pub fn new(result: ClassificationResult) -> Self {
        Self {
            outcome: Ok(result),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Shorthand for a label and score with no hints
    pub fn label(label: &str, confidence: f64) -> Self {
        Self::new(ClassificationResult::new(label, confidence))
    }

    /// Always fail as if the service were unreachable
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentClassifier for StaticClassifier {
    async fn classify(&self, _utterance: &str) -> Result<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome
            .clone()
            .map_err(RouterError::ClassificationUnavailable)
    }
}
