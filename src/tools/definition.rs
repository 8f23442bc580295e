//! Tool definitions for the general tools registry
//!
//! Each entry describes how to reach one external data provider and what its
//! normalized response looks like.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::ToolDefinition;

/// HTTP method used for the provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Normalized response shape for a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Weather,
    Crypto,
    News,
    Joke,
    Quote,
    /// Provider payload passed through untouched
    #[default]
    Raw,
}

/// A single input parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

fn default_param_type() -> String {
    "string".to_string()
}

impl ParamSpec {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: default_param_type(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, description)
        }
    }
}

/// A registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Registry key (e.g., "get_weather_tool")
    pub name: String,
    /// Human-readable description for LLM
    pub description: String,
    /// Endpoint URL; `{param}` placeholders are filled from parameters
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Words that select this tool from a free-form utterance
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub response: ResponseKind,
    /// Geocoding endpoint for location-based tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoding_url: Option<String>,
    /// Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Provider timeout used when neither the tool nor config says otherwise
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 10_000;

impl Tool {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            endpoint: endpoint.into(),
            method: HttpMethod::Get,
            params: Vec::new(),
            keywords: Vec::new(),
            response: ResponseKind::Raw,
            geocoding_url: None,
            timeout_ms: None,
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Set selection keywords
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Set response kind
    pub fn with_response(mut self, response: ResponseKind) -> Self {
        self.response = response;
        self
    }

    /// Set geocoding endpoint
    pub fn with_geocoding(mut self, url: impl Into<String>) -> Self {
        self.geocoding_url = Some(url.into());
        self
    }

    /// Names of required parameters, in declaration order
    pub fn required_params(&self) -> Vec<&str> {
        self.params.iter().filter(|p| p.required).map(|p| p.name.as_str()).collect()
    }

    /// Get effective timeout, falling back to `default_ms`
    pub fn effective_timeout_ms(&self, default_ms: u64) -> u64 {
        self.timeout_ms.unwrap_or(default_ms)
    }

    /// JSON schema for the input parameters
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for param in &self.params {
            let mut prop = serde_json::Map::new();
            prop.insert("type".to_string(), Value::String(param.param_type.clone()));
            if !param.description.is_empty() {
                prop.insert("description".to_string(), Value::String(param.description.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params()
        })
    }

    /// Convert to LLM ToolDefinition for API calls
    pub fn to_llm_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name.clone(), self.description.clone(), self.input_schema())
    }
}
