//! Master router
//!
//! One classifier call per utterance, a confidence gate, then at most one
//! handler call. `route` and `dispatch` never return `Err`: every failure is
//! folded into a [`HandlerResponse`].
//!
//! `route_function_call` is the alternative front end: the model is offered
//! every domain as a function and its first call is dispatched directly.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use serde_json::{Map, Value, json};

use crate::classifier::IntentClassifier;
use crate::domain::{
    ClassificationResult, ConversationResult, ErrorKind, ErrorResult, FallbackReason, HandlerResponse, Intent,
    RoutingHints,
};
use crate::error::RouterError;
use crate::handlers::{BrowserLauncher, GeneralToolsHandler, MedicalHandler, NavigationHandler};
use crate::llm::{CompletionRequest, LlmClient, ToolCall, ToolDefinition};
use crate::store::DomainStore;
use crate::tools::{DEFAULT_TOOL_TIMEOUT_MS, DataProvider, Geocoder};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.60;

pub const DEFAULT_CLASSIFY_TIMEOUT_MS: u64 = 15_000;

pub const NAVIGATE_TOOL: &str = "navigate_to_page";

pub const MEDICAL_TOOL: &str = "extract_medical_info";

const FUNCTION_CALL_PROMPT: &str = "You route requests for a voice assistant. \
If the request matches one of the available functions, call exactly one of them with its arguments. \
Otherwise answer the user briefly in plain text.";

const FUNCTION_CALL_MAX_TOKENS: u32 = 512;

/// Last "in/for/of/about/on <phrase>" of an utterance
static TRAILING_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*\b(?:in|for|of|about|on)\s+(?:the\s+)?(.+?)[\s?.!]*$").expect("trailing phrase pattern")
});

/// Tunables for the routing decision
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Results strictly below this are never dispatched to a domain
    pub confidence_threshold: f64,
    pub classify_timeout: Duration,
    /// Provider timeout for tools without their own
    pub tool_timeout_ms: u64,
    /// Origin for app-relative page URLs
    pub base_url: Option<String>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            classify_timeout: Duration::from_millis(DEFAULT_CLASSIFY_TIMEOUT_MS),
            tool_timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
            base_url: None,
        }
    }
}

pub struct MasterRouter {
    classifier: Arc<dyn IntentClassifier>,
    store: Arc<DomainStore>,
    navigation: NavigationHandler,
    medical: MedicalHandler,
    tools: GeneralToolsHandler,
    settings: RouterSettings,
}

impl MasterRouter {
    pub fn new(
        store: Arc<DomainStore>,
        classifier: Arc<dyn IntentClassifier>,
        launcher: Arc<dyn BrowserLauncher>,
        provider: Arc<dyn DataProvider>,
        geocoder: Arc<dyn Geocoder>,
        settings: RouterSettings,
    ) -> Self {
        let mut navigation = NavigationHandler::new(store.clone(), launcher);
        if let Some(base_url) = &settings.base_url {
            navigation = navigation.with_base_url(base_url.clone());
        }
        let tools = GeneralToolsHandler::new(store.clone(), provider, geocoder).with_timeout_ms(settings.tool_timeout_ms);

        Self {
            classifier,
            medical: MedicalHandler::new(store.clone()),
            store,
            navigation,
            tools,
            settings,
        }
    }

    /// Classify an utterance and hand it to exactly one handler
    pub async fn route(&self, utterance: &str) -> HandlerResponse {
        let classification = match self.classify(utterance).await {
            Ok(c) => c,
            Err(e) => return unavailable(e),
        };

        info!(
            "Classified as {} (label {:?}, confidence {:.2})",
            classification.intent, classification.label, classification.confidence
        );

        if classification.confidence < self.settings.confidence_threshold {
            return fallback(utterance, FallbackReason::LowConfidence, Some(classification.confidence));
        }

        let ClassificationResult {
            intent,
            confidence,
            recognized,
            hints,
            ..
        } = classification;

        match intent {
            Intent::Navigation => {
                let target = hints
                    .target
                    .unwrap_or_else(|| self.navigation.resolve_target(utterance));
                debug!("Navigation target: {:?}", target);
                self.navigation.handle(&target)
            }
            Intent::Medical => self.medical.handle(utterance),
            Intent::GeneralTools => self.route_tool(utterance, hints).await,
            Intent::GeneralConversation if recognized => fallback(utterance, FallbackReason::GeneralIntent, Some(confidence)),
            Intent::GeneralConversation => fallback(utterance, FallbackReason::UnrecognizedLabel, Some(confidence)),
        }
    }

    async fn classify(&self, utterance: &str) -> Result<ClassificationResult, RouterError> {
        let timeout = self.settings.classify_timeout;
        match tokio::time::timeout(timeout, self.classifier.classify(utterance)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(RouterError::ClassificationUnavailable(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn route_tool(&self, utterance: &str, hints: RoutingHints) -> HandlerResponse {
        let tool_name = hints
            .tool_name
            .or_else(|| self.store.tools.match_keywords(utterance).map(|t| t.name.clone()));

        let Some(tool_name) = tool_name else {
            info!("No registry tool matches {:?}", utterance);
            return HandlerResponse::error(ErrorKind::UnresolvedTarget, "No tool found for this request");
        };

        let mut params = hints.parameters;
        if let Some(tool) = self.store.tools.get(&tool_name)
            && let [only] = tool.required_params().as_slice()
            && !params.contains_key(*only)
            && let Some(phrase) = trailing_phrase(utterance)
        {
            debug!("Using {:?} as {} for {}", phrase, only, tool_name);
            params.insert(only.to_string(), Value::String(phrase));
        }

        self.tools.handle(&tool_name, &params).await
    }

    /// Offer every domain to the model as a function and dispatch its first call.
    ///
    /// A plain-text answer becomes a general conversation response. There is
    /// no confidence gate here: the model either commits to a function or not.
    pub async fn route_function_call(&self, client: &dyn LlmClient, utterance: &str) -> HandlerResponse {
        let request = CompletionRequest::new(FUNCTION_CALL_PROMPT)
            .with_user_message(utterance)
            .with_tools(self.tool_definitions())
            .with_max_tokens(FUNCTION_CALL_MAX_TOKENS)
            .with_temperature(0.0);

        let timeout = self.settings.classify_timeout;
        let response = match tokio::time::timeout(timeout, client.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return unavailable(RouterError::ClassificationUnavailable(e.to_string())),
            Err(_elapsed) => {
                return unavailable(RouterError::ClassificationUnavailable(format!(
                    "timed out after {}ms",
                    timeout.as_millis()
                )));
            }
        };

        let Some(call) = response.tool_calls.first() else {
            info!("Model answered without a function call");
            let answer = response.content.trim();
            return HandlerResponse::Conversation(ConversationResult {
                query: utterance.to_string(),
                response: if answer.is_empty() {
                    NO_ANSWER.to_string()
                } else {
                    answer.to_string()
                },
                reason: FallbackReason::NoFunctionCall,
                confidence: None,
            });
        };

        if response.tool_calls.len() > 1 {
            warn!("Model made {} function calls, dispatching only {}", response.tool_calls.len(), call.name);
        }
        self.dispatch(call).await
    }

    /// Route an LLM function call by name, skipping classification
    pub async fn dispatch(&self, call: &ToolCall) -> HandlerResponse {
        info!("Dispatching function call {}", call.name);
        match call.name.as_str() {
            NAVIGATE_TOOL => match string_arg(&call.input, "page_name") {
                Ok(page) => self.navigation.handle(page),
                Err(e) => e.into(),
            },
            MEDICAL_TOOL => match string_arg(&call.input, "user_query") {
                Ok(query) => self.medical.handle(query),
                Err(e) => e.into(),
            },
            other => {
                let params = call.input.as_object().cloned().unwrap_or_default();
                self.tools.handle(other, &params).await
            }
        }
    }

    /// Function declarations for every domain, for an LLM tool-calling session
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let pages = self.store.pages.names().join(", ");
        let mut definitions = vec![
            ToolDefinition::new(
                NAVIGATE_TOOL,
                format!("Open a known page in the browser. Known pages: {}.", pages),
                json!({
                    "type": "object",
                    "properties": {
                        "page_name": { "type": "string", "description": "Name of the page to open" }
                    },
                    "required": ["page_name"]
                }),
            ),
            ToolDefinition::new(
                MEDICAL_TOOL,
                "Extract organ, anatomical site, procedure types and test types from a clinical note.",
                json!({
                    "type": "object",
                    "properties": {
                        "user_query": { "type": "string", "description": "The dictated clinical text" }
                    },
                    "required": ["user_query"]
                }),
            ),
        ];
        definitions.extend(self.store.tools.all().map(|t| t.to_llm_definition()));
        definitions
    }
}

const NO_ANSWER: &str = "I'm not sure what you need. Could you rephrase that?";

fn fallback(utterance: &str, reason: FallbackReason, confidence: Option<f64>) -> HandlerResponse {
    info!("Falling back to general conversation ({:?})", reason);
    let response = match reason {
        FallbackReason::LowConfidence => NO_ANSWER,
        FallbackReason::GeneralIntent | FallbackReason::UnrecognizedLabel | FallbackReason::NoFunctionCall => {
            "This request is handled as general conversation."
        }
    };
    HandlerResponse::Conversation(ConversationResult {
        query: utterance.to_string(),
        response: response.to_string(),
        reason,
        confidence,
    })
}

fn unavailable(err: RouterError) -> HandlerResponse {
    warn!("Classification failed: {}", err);
    let detail = match err {
        RouterError::ClassificationUnavailable(message) => message,
        other => other.to_string(),
    };
    HandlerResponse::Error(ErrorResult::new(
        ErrorKind::ClassificationUnavailable,
        format!("Classification unavailable: {}", detail),
    ))
}

fn string_arg<'a>(input: &'a Value, key: &str) -> Result<&'a str, RouterError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RouterError::validation(key, "argument is missing or empty"))
}

/// Phrase after the last "in/for/of/about/on", e.g. "Surat" in
/// "what's the weather in Surat?"
pub fn trailing_phrase(utterance: &str) -> Option<String> {
    TRAILING_PHRASE
        .captures(utterance.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parameters as a JSON map, for callers building tool calls by hand
pub fn params_from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}
