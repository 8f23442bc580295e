//! HandlerResponse - the only type that crosses the router boundary
//!
//! Every variant serializes to a flat JSON object with a `type`
//! discriminator, and parses back from the same shape.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::medical::MedicalRecord;
use crate::error::RouterError;

/// Successful navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationResult {
    pub result: String,
    pub page: String,
    pub url: String,
}

impl NavigationResult {
    pub fn new(page: impl Into<String>, url: impl Into<String>) -> Self {
        let page = page.into();
        let url = url.into();
        Self {
            result: format!("Successfully navigated to {} page ({})", page, url),
            page,
            url,
        }
    }
}

/// A field the medical extractor could not fill in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Medical extraction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalResult {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<FieldIssue>,
}

impl MedicalResult {
    pub fn new(record: MedicalRecord, issues: Vec<FieldIssue>) -> Self {
        let complete = record.site.is_some() && issues.is_empty();
        Self {
            record,
            complete,
            issues,
        }
    }
}

/// Key a tool payload is nested under when it uses a reserved key
pub const TOOL_DATA_KEY: &str = "data";

/// Keys owned by the flat form of a tool result
const RESERVED_TOOL_KEYS: [&str; 2] = [TYPE_KEY, "tool"];

/// Normalized provider payload for a registry tool
///
/// The payload is flattened next to `tool`. A payload that carries `type` or
/// `tool` itself is kept whole under [`TOOL_DATA_KEY`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResult {
    pub fn new(tool: impl Into<String>, data: Map<String, Value>) -> Self {
        let data = if has_reserved_key(&data) {
            let mut nested = Map::new();
            nested.insert(TOOL_DATA_KEY.to_string(), Value::Object(data));
            nested
        } else {
            data
        };
        Self {
            tool: tool.into(),
            data,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

fn has_reserved_key(data: &Map<String, Value>) -> bool {
    RESERVED_TOOL_KEYS.iter().any(|k| data.contains_key(*k))
}

/// Why the router did not commit to a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    LowConfidence,
    GeneralIntent,
    UnrecognizedLabel,
    /// Function-calling model answered in plain text
    NoFunctionCall,
}

/// Pass-through general conversation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub query: String,
    pub response: String,
    pub reason: FallbackReason,
    /// Classifier score; absent when the model picked no function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Error categories surfaced in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ClassificationUnavailable,
    UnresolvedTarget,
    ValidationFailure,
    ProviderFailure,
    Internal,
}

/// Structured error result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResult {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
            tool: None,
            field: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl From<RouterError> for ErrorResult {
    fn from(err: RouterError) -> Self {
        let kind = err.kind();
        match err {
            RouterError::ValidationFailed { field, reason } => {
                ErrorResult::new(kind, format!("Validation failed for '{}': {}", field, reason)).with_field(field)
            }
            // Provider detail stays in the logs; callers get a generic reason
            RouterError::Provider { tool, .. } => {
                ErrorResult::new(kind, format!("Tool '{}' is unavailable right now", tool)).with_tool(tool)
            }
            other => ErrorResult::new(kind, other.to_string()),
        }
    }
}

/// Tagged union of all handler outputs
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResponse {
    Navigation(NavigationResult),
    Medical(MedicalResult),
    Tool(ToolResult),
    Conversation(ConversationResult),
    Error(ErrorResult),
}

const TYPE_KEY: &str = "type";

impl HandlerResponse {
    /// Discriminator written under the `type` key
    pub fn type_name(&self) -> &'static str {
        match self {
            HandlerResponse::Navigation(_) => "navigation",
            HandlerResponse::Medical(_) => "medical",
            HandlerResponse::Tool(_) => "tool",
            HandlerResponse::Conversation(_) => "conversation",
            HandlerResponse::Error(_) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HandlerResponse::Error(_))
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        HandlerResponse::Error(ErrorResult::new(kind, message))
    }

    /// Error kind, if this is an error result
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            HandlerResponse::Error(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Flatten into a JSON object
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let body = match self {
            HandlerResponse::Navigation(r) => serde_json::to_value(r)?,
            HandlerResponse::Medical(r) => serde_json::to_value(r)?,
            HandlerResponse::Tool(r) if has_reserved_key(&r.data) => {
                return Err(serde_json::Error::custom(format!(
                    "payload of '{}' overrides a reserved key",
                    r.tool
                )));
            }
            HandlerResponse::Tool(r) => serde_json::to_value(r)?,
            HandlerResponse::Conversation(r) => serde_json::to_value(r)?,
            HandlerResponse::Error(r) => serde_json::to_value(r)?,
        };
        let mut object = match body {
            Value::Object(map) => map,
            other => return Err(serde_json::Error::custom(format!("expected object, got {}", other))),
        };
        object.insert(TYPE_KEY.to_string(), Value::String(self.type_name().to_string()));
        Ok(Value::Object(object))
    }

    /// Parse a flat JSON object produced by [`HandlerResponse::to_json`]
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        let mut object = match value {
            Value::Object(map) => map,
            other => return Err(serde_json::Error::custom(format!("expected object, got {}", other))),
        };
        let type_name = match object.remove(TYPE_KEY) {
            Some(Value::String(s)) => s,
            _ => return Err(serde_json::Error::missing_field(TYPE_KEY)),
        };
        let body = Value::Object(object);
        match type_name.as_str() {
            "navigation" => Ok(HandlerResponse::Navigation(serde_json::from_value(body)?)),
            "medical" => Ok(HandlerResponse::Medical(serde_json::from_value(body)?)),
            "tool" => Ok(HandlerResponse::Tool(serde_json::from_value(body)?)),
            "conversation" => Ok(HandlerResponse::Conversation(serde_json::from_value(body)?)),
            "error" => Ok(HandlerResponse::Error(serde_json::from_value(body)?)),
            other => Err(serde_json::Error::custom(format!("unknown response type '{}'", other))),
        }
    }
}

impl From<RouterError> for HandlerResponse {
    fn from(err: RouterError) -> Self {
        HandlerResponse::Error(err.into())
    }
}

impl Serialize for HandlerResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HandlerResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        HandlerResponse::from_json(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Organ;
    use serde_json::json;

    fn roundtrip(response: &HandlerResponse) -> HandlerResponse {
        let text = serde_json::to_string(response).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_navigation_shape() {
        let response = HandlerResponse::Navigation(NavigationResult::new("home", "https://google.com"));
        let json = response.to_json().unwrap();
        assert_eq!(json["type"], "navigation");
        assert_eq!(json["result"], "Successfully navigated to home page (https://google.com)");
        assert_eq!(roundtrip(&response), response);
    }

    #[test]
    fn test_medical_shape_with_null_site() {
        let mut record = MedicalRecord::new(Organ::UpperGit);
        record.test_types.insert("Histopathology".to_string());
        let response = HandlerResponse::Medical(MedicalResult::new(
            record,
            vec![FieldIssue::new("site", "no site recognized")],
        ));

        let json = response.to_json().unwrap();
        assert_eq!(json["organ"], "Upper GIT");
        assert!(json["site"].is_null());
        assert_eq!(json["test_types"], json!(["Histopathology"]));
        assert_eq!(json["complete"], false);
        assert_eq!(roundtrip(&response), response);
    }

    #[test]
    fn test_tool_shape_is_flat() {
        let data = json!({"temperature": 25.5, "condition": "Partly Cloudy", "location": "Surat, India"});
        let response = HandlerResponse::Tool(ToolResult::new(
            "get_weather_tool",
            data.as_object().cloned().unwrap(),
        ));

        let json = response.to_json().unwrap();
        assert_eq!(json["temperature"], 25.5);
        assert_eq!(json["condition"], "Partly Cloudy");
        assert_eq!(json["tool"], "get_weather_tool");
        assert_eq!(roundtrip(&response), response);
    }

    #[test]
    fn test_tool_payload_with_reserved_keys() {
        let data = json!({"type": "trivia", "tool": "other", "text": "x"});
        let response = HandlerResponse::Tool(ToolResult::new("fact_api", data.as_object().cloned().unwrap()));

        let json = response.to_json().unwrap();
        assert_eq!(json["type"], "tool");
        assert_eq!(json["tool"], "fact_api");
        assert_eq!(json[TOOL_DATA_KEY], data);
        assert_eq!(roundtrip(&response), response);
    }

    #[test]
    fn test_hand_built_colliding_payload_is_rejected() {
        let response = HandlerResponse::Tool(ToolResult {
            tool: "fact_api".to_string(),
            data: json!({"type": "trivia"}).as_object().cloned().unwrap(),
        });
        assert!(response.to_json().is_err());
    }

    #[test]
    fn test_conversation_roundtrip() {
        let response = HandlerResponse::Conversation(ConversationResult {
            query: "hello".to_string(),
            response: "hi".to_string(),
            reason: FallbackReason::LowConfidence,
            confidence: Some(0.4),
        });
        assert_eq!(roundtrip(&response), response);
    }

    #[test]
    fn test_error_roundtrip() {
        let response = HandlerResponse::Error(
            ErrorResult::new(ErrorKind::ValidationFailure, "missing location")
                .with_tool("get_weather_tool")
                .with_field("location"),
        );
        let json = response.to_json().unwrap();
        assert_eq!(json["kind"], "validation_failure");
        assert_eq!(roundtrip(&response), response);
    }

    #[test]
    fn test_provider_error_is_generic() {
        let response: HandlerResponse =
            RouterError::provider("crypto_api", "connection refused at 10.0.0.1:443").into();
        match response {
            HandlerResponse::Error(e) => {
                assert_eq!(e.kind, ErrorKind::ProviderFailure);
                assert_eq!(e.tool.as_deref(), Some("crypto_api"));
                assert!(!e.error.contains("10.0.0.1"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_rejects_unknown_type() {
        assert!(HandlerResponse::from_json(json!({"type": "bogus"})).is_err());
        assert!(HandlerResponse::from_json(json!({"result": "x"})).is_err());
        assert!(HandlerResponse::from_json(json!([1, 2])).is_err());
    }
}
