//! Data-provider capabilities for general tools
//!
//! Two narrow seams: [`Geocoder`] turns a place name into coordinates and
//! [`DataProvider`] fetches the raw payload for a tool. Both have an HTTP
//! implementation and an in-memory one for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, RouterError};

use super::catalog::placeholders;
use super::definition::{HttpMethod, Tool};

/// A geocoded place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub latitude: f64,
    pub longitude: f64,
    /// Display name, e.g. "Surat, India"
    pub display_name: String,
}

/// Resolves free-form place names
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, tool: &Tool, query: &str) -> Result<ResolvedPlace>;
}

/// Fetches the raw provider payload for a validated tool invocation
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch(&self, tool: &Tool, params: &Map<String, Value>) -> Result<Value>;
}

/// Render a parameter value for URL substitution
pub fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fill `{name}` placeholders with URL-encoded parameter values
pub fn fill_template(tool: &Tool, params: &Map<String, Value>) -> Result<String> {
    let mut url = tool.endpoint.clone();
    for name in placeholders(&tool.endpoint) {
        let value = params
            .get(name)
            .map(param_to_string)
            .ok_or_else(|| RouterError::validation(name, format!("no value for endpoint of '{}'", tool.name)))?;
        let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
        url = url.replace(&format!("{{{}}}", name), &encoded);
    }
    Ok(url)
}

/// reqwest-backed provider for the public APIs in the registry
#[derive(Debug, Clone)]
pub struct HttpDataProvider {
    client: Client,
}

impl HttpDataProvider {
    /// Create a provider whose HTTP client enforces `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RouterError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn get_json(&self, tool: &str, url: &str) -> Result<Value> {
        debug!("GET {} for {}", url, tool);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RouterError::provider(tool, format!("request failed: {}", e)))?;
        Self::read_json(tool, response).await
    }

    async fn read_json(tool: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(RouterError::provider(tool, format!("HTTP {}", status)));
        }
        response
            .json()
            .await
            .map_err(|e| RouterError::provider(tool, format!("invalid JSON: {}", e)))
    }

    /// open-meteo reports current conditions under `current_weather`
    fn flatten_weather(tool: &str, body: Value) -> Result<Value> {
        let current = body
            .get("current_weather")
            .ok_or_else(|| RouterError::provider(tool, "response has no current_weather"))?;
        Ok(serde_json::json!({
            "temperature": current.get("temperature").cloned().unwrap_or(Value::Null),
            "weathercode": current.get("weathercode").cloned().unwrap_or(Value::Null),
        }))
    }
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    async fn fetch(&self, tool: &Tool, params: &Map<String, Value>) -> Result<Value> {
        let url = fill_template(tool, params)?;
        tracing::debug!(tool = %tool.name, method = ?tool.method, "fetching provider payload");

        let body = match tool.method {
            HttpMethod::Get => self.get_json(&tool.name, &url).await?,
            HttpMethod::Post => {
                debug!("POST {} for {}", url, tool.name);
                let response = self
                    .client
                    .post(&url)
                    .json(params)
                    .send()
                    .await
                    .map_err(|e| RouterError::provider(&tool.name, format!("request failed: {}", e)))?;
                Self::read_json(&tool.name, response).await?
            }
        };

        if tool.geocoding_url.is_some() && body.get("current_weather").is_some() {
            return Self::flatten_weather(&tool.name, body);
        }
        Ok(body)
    }
}

#[async_trait]
impl Geocoder for HttpDataProvider {
    async fn resolve(&self, tool: &Tool, query: &str) -> Result<ResolvedPlace> {
        let template = tool
            .geocoding_url
            .as_deref()
            .ok_or_else(|| RouterError::provider(&tool.name, "tool has no geocoding endpoint"))?;
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let url = template.replace("{location}", &encoded);
        let body = self.get_json(&tool.name, &url).await?;

        let first = body
            .get("results")
            .and_then(|r| r.as_array())
            .and_then(|r| r.first())
            .ok_or_else(|| RouterError::provider(&tool.name, format!("location '{}' not found", query)))?;

        let latitude = first.get("latitude").and_then(Value::as_f64);
        let longitude = first.get("longitude").and_then(Value::as_f64);
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(RouterError::provider(&tool.name, "geocoding result has no coordinates"));
        };
        let name = first.get("name").and_then(Value::as_str).unwrap_or(query);
        let display_name = match first.get("country").and_then(Value::as_str) {
            Some(country) => format!("{}, {}", name, country),
            None => name.to_string(),
        };

        Ok(ResolvedPlace {
            latitude,
            longitude,
            display_name,
        })
    }
}

/// In-memory provider with canned payloads and a call counter
#[derive(Debug, Default)]
pub struct MockProvider {
    responses: HashMap<String, std::result::Result<Value, String>>,
    places: HashMap<String, ResolvedPlace>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    recorded: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned payload for a tool
    pub fn with_response(mut self, tool: impl Into<String>, payload: Value) -> Self {
        self.responses.insert(tool.into(), Ok(payload));
        self
    }

    /// Canned failure for a tool
    pub fn with_failure(mut self, tool: impl Into<String>, reason: impl Into<String>) -> Self {
        self.responses.insert(tool.into(), Err(reason.into()));
        self
    }

    /// Known place for geocoding (matched case-insensitively)
    pub fn with_place(mut self, query: &str, latitude: f64, longitude: f64, display_name: &str) -> Self {
        self.places.insert(
            query.to_lowercase(),
            ResolvedPlace {
                latitude,
                longitude,
                display_name: display_name.to_string(),
            },
        );
        self
    }

    /// Sleep before answering, for timeout tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetch and resolve calls made
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Parameters passed to each fetch, in order
    pub fn recorded_calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.recorded.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    async fn fetch(&self, tool: &Tool, params: &Map<String, Value>) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push((tool.name.clone(), params.clone()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.responses.get(&tool.name) {
            Some(Ok(payload)) => Ok(payload.clone()),
            Some(Err(reason)) => Err(RouterError::provider(&tool.name, reason.clone())),
            None => Err(RouterError::provider(&tool.name, "no canned response")),
        }
    }
}

#[async_trait]
impl Geocoder for MockProvider {
    async fn resolve(&self, tool: &Tool, query: &str) -> Result<ResolvedPlace> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.places
            .get(&query.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| RouterError::provider(&tool.name, format!("location '{}' not found", query)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolCatalog;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fill_template_encodes_values() {
        let catalog = ToolCatalog::builtin();
        let tool = catalog.get("news_api").unwrap();
        let url = fill_template(tool, &params(json!({"category": "science & tech"}))).unwrap();
        assert_eq!(url, "https://inshortsapi.vercel.app/news?category=science+%26+tech");
    }

    #[test]
    fn test_fill_template_numbers() {
        let catalog = ToolCatalog::builtin();
        let tool = catalog.get("get_weather_tool").unwrap();
        let url = fill_template(tool, &params(json!({"latitude": 21.17, "longitude": 72.83}))).unwrap();
        assert!(url.contains("latitude=21.17"));
        assert!(url.contains("longitude=72.83"));
    }

    #[test]
    fn test_fill_template_missing_value() {
        let catalog = ToolCatalog::builtin();
        let tool = catalog.get("crypto_api").unwrap();
        let result = fill_template(tool, &Map::new());
        assert!(matches!(result, Err(RouterError::ValidationFailed { .. })));
    }

    #[test]
    fn test_flatten_weather() {
        let body = json!({"current_weather": {"temperature": 31.2, "weathercode": 2, "windspeed": 9.0}});
        let flat = HttpDataProvider::flatten_weather("get_weather_tool", body).unwrap();
        assert_eq!(flat, json!({"temperature": 31.2, "weathercode": 2}));
    }

    #[tokio::test]
    async fn test_mock_provider_counts_calls() {
        let catalog = ToolCatalog::builtin();
        let tool = catalog.get("joke_api").unwrap();
        let mock = MockProvider::new().with_response("joke_api", json!({"setup": "a", "punchline": "b"}));

        let payload = mock.fetch(tool, &Map::new()).await.unwrap();
        assert_eq!(payload["setup"], "a");
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.recorded_calls()[0].0, "joke_api");
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let catalog = ToolCatalog::builtin();
        let tool = catalog.get("quote_api").unwrap();
        let mock = MockProvider::new().with_failure("quote_api", "503");
        let result = mock.fetch(tool, &Map::new()).await;
        assert!(matches!(result, Err(RouterError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_mock_geocoder() {
        let catalog = ToolCatalog::builtin();
        let tool = catalog.get("get_weather_tool").unwrap();
        let mock = MockProvider::new().with_place("Surat", 21.17, 72.83, "Surat, India");

        let place = mock.resolve(tool, "surat").await.unwrap();
        assert_eq!(place.display_name, "Surat, India");
        assert!(mock.resolve(tool, "Atlantis").await.is_err());
    }
}
