//! Tool catalog - the static registry of general tools
//!
//! Loads tool definitions from YAML and provides lookup methods.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};

use super::definition::{ParamSpec, ResponseKind, Tool};

/// YAML file structure
#[derive(Debug, Deserialize)]
struct YamlCatalog {
    #[serde(rename = "tool")]
    tools: Vec<Tool>,
}

/// Catalog of tool definitions keyed by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Tool>", into = "Vec<Tool>")]
pub struct ToolCatalog {
    tools: BTreeMap<String, Tool>,
}

impl From<Vec<Tool>> for ToolCatalog {
    fn from(tools: Vec<Tool>) -> Self {
        let mut catalog = Self::new();
        for tool in tools {
            catalog.add(tool);
        }
        catalog
    }
}

impl From<ToolCatalog> for Vec<Tool> {
    fn from(catalog: ToolCatalog) -> Self {
        catalog.tools.into_values().collect()
    }
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Load catalog from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RouterError::Config(format!("Failed to read catalog file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Load catalog from a YAML string with a top-level `tool:` list
    pub fn from_yaml(content: &str) -> Result<Self> {
        let catalog: YamlCatalog = serde_yaml::from_str(content)
            .map_err(|e| RouterError::Config(format!("Failed to parse YAML: {}", e)))?;
        let catalog = Self::from(catalog.tools);
        catalog.validate()?;
        Ok(catalog)
    }

    /// Weather, crypto, news, quote and joke providers
    pub fn builtin() -> Self {
        Self::from(vec![
            Tool::new(
                "get_weather_tool",
                "Get the current weather for a given location.",
                "https://api.open-meteo.com/v1/forecast?latitude={latitude}&longitude={longitude}&current_weather=true",
            )
            .with_param(ParamSpec::required(
                "location",
                "City or place to get weather for. Example: 'Surat, India'.",
            ))
            .with_keywords(&["weather", "temperature", "forecast", "rain", "sunny"])
            .with_response(ResponseKind::Weather)
            .with_geocoding("https://geocoding-api.open-meteo.com/v1/search?name={location}&count=1"),
            Tool::new(
                "crypto_api",
                "Get current price of a cryptocurrency.",
                "https://api.coingecko.com/api/v3/simple/price?ids={coin}&vs_currencies=usd",
            )
            .with_param(ParamSpec::required("coin", "Cryptocurrency ID (e.g., bitcoin, ethereum)"))
            .with_keywords(&["crypto", "cryptocurrency", "bitcoin", "ethereum", "coin"])
            .with_response(ResponseKind::Crypto),
            Tool::new(
                "news_api",
                "Get latest news headlines.",
                "https://inshortsapi.vercel.app/news?category={category}",
            )
            .with_param(ParamSpec::required(
                "category",
                "News category (e.g., technology, sports, business)",
            ))
            .with_keywords(&["news", "headlines", "headline"])
            .with_response(ResponseKind::News),
            Tool::new(
                "quote_api",
                "Get a random motivational or inspirational quote.",
                "https://api.quotable.io/random",
            )
            .with_keywords(&["quote", "quotes", "inspiration", "motivational"])
            .with_response(ResponseKind::Quote),
            Tool::new("joke_api", "Get a random joke.", "https://official-joke-api.appspot.com/random_joke")
                .with_keywords(&["joke", "jokes", "funny"])
                .with_response(ResponseKind::Joke),
        ])
    }

    /// Every `{placeholder}` in an endpoint must be a declared parameter or
    /// a value the provider resolves itself (coordinates after geocoding).
    pub fn validate(&self) -> Result<()> {
        for tool in self.tools.values() {
            if tool.name.trim().is_empty() {
                return Err(RouterError::Config("tool with empty name".to_string()));
            }
            for placeholder in placeholders(&tool.endpoint) {
                let declared = tool.params.iter().any(|p| p.name == placeholder);
                let geocoded = tool.geocoding_url.is_some() && matches!(placeholder, "latitude" | "longitude");
                if !declared && !geocoded {
                    return Err(RouterError::Config(format!(
                        "tool '{}' endpoint uses undeclared parameter '{}'",
                        tool.name, placeholder
                    )));
                }
            }
        }
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// List all tool names
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get all tools
    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// First tool (by name order) with a keyword present as a whole word
    pub fn match_keywords(&self, text: &str) -> Option<&Tool> {
        let words: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect();
        self.tools
            .values()
            .find(|tool| tool.keywords.iter().any(|k| words.iter().any(|w| w.eq_ignore_ascii_case(k))))
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Add a tool to the catalog
    pub fn add(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

/// `{name}` placeholders in a template, in order of appearance
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                found.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    found
}
