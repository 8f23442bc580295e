//! LLM-backed intent classifier

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::{ClassificationResult, RoutingHints};
use crate::error::{Result, RouterError};
use crate::llm::{CompletionRequest, LlmClient};
use crate::store::DomainStore;

use super::IntentClassifier;

const SYSTEM_PROMPT: &str = r#"You are an intent router for a voice assistant. Classify the user's request into exactly one intent:

- navigation: the user wants to open or go to a page or website (e.g. "go to home", "open my profile").
- medical: the user dictates a clinical specimen or procedure note (e.g. "biopsy from the antrum", "colonoscopy polyp from the sigmoid colon").
- general_tools: the user asks for live data a tool can fetch: weather, cryptocurrency prices, news, jokes, quotes.
- general_conversation: anything else.

Respond with a single JSON object and nothing else:
{"intent": "<one of the four labels>", "confidence": <number between 0 and 1>, "target": "<page name, navigation only>", "tool_name": "<tool, general_tools only>", "parameters": {<tool parameters, general_tools only>}}

Omit fields that do not apply. Use a confidence above 0.6 only when you are sure."#;

/// Classifies utterances with a single LLM completion
pub struct LlmClassifier {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
    max_tokens: u32,
}

impl LlmClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_tokens: 256,
        }
    }

    /// Append the known pages and tools so the model can fill in hints
    pub fn with_store(mut self, store: &DomainStore) -> Self {
        let pages = store.pages.names().join(", ");
        let tools: Vec<String> = store
            .tools
            .all()
            .map(|t| {
                let params: Vec<&str> = t.params.iter().map(|p| p.name.as_str()).collect();
                format!("- {}({}): {}", t.name, params.join(", "), t.description)
            })
            .collect();

        self.system_prompt = format!(
            "{}\n\nKnown pages: {}\n\nAvailable tools:\n{}",
            SYSTEM_PROMPT,
            pages,
            tools.join("\n")
        );
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl std::fmt::Debug for LlmClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClassifier")
            .field("model", &self.client.model())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, utterance: &str) -> Result<ClassificationResult> {
        let request = CompletionRequest::new(self.system_prompt.clone())
            .with_user_message(utterance)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0);

        let response = self
            .client
            .complete(request)
            .await
            .map_err(|e| RouterError::ClassificationUnavailable(e.to_string()))?;

        if response.stop_reason.is_truncated() {
            warn!("Classifier answer truncated at max_tokens");
        }
        debug!("Classifier raw answer: {}", response.content);
        parse_classification(&response.content)
    }
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent: String,
    confidence: Value,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
}

/// Parse the classifier's answer, tolerating code fences and surrounding prose
pub fn parse_classification(text: &str) -> Result<ClassificationResult> {
    let json = extract_json_object(text)
        .ok_or_else(|| RouterError::ClassificationUnavailable("answer contains no JSON object".to_string()))?;

    let raw: RawClassification = serde_json::from_str(json)
        .map_err(|e| RouterError::ClassificationUnavailable(format!("malformed classifier JSON: {}", e)))?;

    let confidence = match &raw.confidence {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| RouterError::ClassificationUnavailable(format!("confidence is not a number: {}", raw.confidence)))?;

    let hints = RoutingHints {
        target: raw.target.filter(|t| !t.trim().is_empty()),
        tool_name: raw.tool_name.filter(|t| !t.trim().is_empty()),
        parameters: raw.parameters.unwrap_or_default(),
    };

    Ok(ClassificationResult::new(raw.intent, confidence).with_hints(hints))
}

/// Outermost `{...}` span in the text
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
