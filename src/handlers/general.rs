//! General tools handler - registry lookup, parameter validation, one
//! provider call under a timeout, then payload normalization

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde_json::{Map, Value};

use crate::domain::{ErrorKind, ErrorResult, HandlerResponse, ToolResult};
use crate::error::{Result, RouterError};
use crate::store::DomainStore;
use crate::tools::{
    DEFAULT_TOOL_TIMEOUT_MS, DataProvider, Geocoder, RESOLVED_LOCATION_KEY, ResponseKind, Tool, normalize,
};

/// Parameter the geocoder resolves for tools with a `geocoding_url`
const LOCATION_PARAM: &str = "location";

/// Crypto providers key prices by lowercase coin id
const COIN_PARAM: &str = "coin";

pub struct GeneralToolsHandler {
    store: Arc<DomainStore>,
    provider: Arc<dyn DataProvider>,
    geocoder: Arc<dyn Geocoder>,
    default_timeout_ms: u64,
}

impl GeneralToolsHandler {
    pub fn new(store: Arc<DomainStore>, provider: Arc<dyn DataProvider>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            store,
            provider,
            geocoder,
            default_timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
        }
    }

    /// Timeout for tools that do not set their own
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Run a registry tool and return its normalized result
    pub async fn handle(&self, tool_name: &str, params: &Map<String, Value>) -> HandlerResponse {
        let name = tool_name.trim();
        let Some(tool) = self.store.tools.get(name) else {
            info!("Unknown tool requested: {:?}", name);
            return HandlerResponse::Error(
                ErrorResult::new(ErrorKind::UnresolvedTarget, format!("Tool '{}' not found", name)).with_tool(name),
            );
        };

        if let Err(e) = validate_params(tool, params) {
            return e.into();
        }

        let timeout = Duration::from_millis(tool.effective_timeout_ms(self.default_timeout_ms));
        let outcome = match tokio::time::timeout(timeout, self.invoke(tool, params.clone())).await {
            Ok(result) => result,
            Err(_elapsed) => Err(RouterError::provider(
                &tool.name,
                format!("timed out after {}ms", timeout.as_millis()),
            )),
        };

        match outcome {
            Ok(data) => {
                info!("Tool {} succeeded", tool.name);
                HandlerResponse::Tool(ToolResult::new(&tool.name, data))
            }
            Err(e) => {
                warn!("Tool {} failed: {}", tool.name, e);
                e.into()
            }
        }
    }

    async fn invoke(&self, tool: &Tool, mut params: Map<String, Value>) -> Result<Map<String, Value>> {
        if tool.response == ResponseKind::Crypto
            && let Some(Value::String(coin)) = params.get_mut(COIN_PARAM)
        {
            *coin = coin.trim().to_lowercase();
        }

        if tool.geocoding_url.is_some()
            && let Some(location) = params.get(LOCATION_PARAM).and_then(Value::as_str).map(str::to_string)
        {
            let place = self.geocoder.resolve(tool, &location).await?;
            params.insert("latitude".to_string(), place.latitude.into());
            params.insert("longitude".to_string(), place.longitude.into());
            params.insert(RESOLVED_LOCATION_KEY.to_string(), place.display_name.into());
        }

        let raw = self.provider.fetch(tool, &params).await?;
        normalize(tool, &params, raw)
    }
}

/// Every required parameter must be present and non-blank
pub fn validate_params(tool: &Tool, params: &Map<String, Value>) -> Result<()> {
    for name in tool.required_params() {
        let present = match params.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(RouterError::validation(
                name,
                format!("required parameter for '{}' is missing or empty", tool.name),
            ));
        }
    }
    Ok(())
}
