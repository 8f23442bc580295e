use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use voxroute::llm::AnthropicConfig;
use voxroute::llm::anthropic::{DEFAULT_API_KEY_ENV, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use voxroute::router::{DEFAULT_CLASSIFY_TIMEOUT_MS, DEFAULT_CONFIDENCE_THRESHOLD, RouterSettings};
use voxroute::tools::DEFAULT_TOOL_TIMEOUT_MS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub routing: RoutingConfig,
    pub providers: ProvidersConfig,
    pub browser: BrowserConfig,
    /// YAML domain store replacing the built-in pages, vocabulary and tools
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms: 30000,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn to_anthropic(&self) -> AnthropicConfig {
        AnthropicConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: Duration::from_millis(self.timeout_ms),
            api_key_env: self.api_key_env.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub confidence_threshold: f64,
    pub classify_timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            classify_timeout_ms: DEFAULT_CLASSIFY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub timeout_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// When false, launches are logged instead of performed
    pub enabled: bool,
    /// Origin for app-relative page URLs such as `/profile`
    pub base_url: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            routing: RoutingConfig::default(),
            providers: ProvidersConfig::default(),
            browser: BrowserConfig::default(),
            registry: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.routing.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            eyre::bail!("routing.confidence_threshold must be within [0, 1], got {}", threshold);
        }
        if self.routing.classify_timeout_ms == 0 || self.providers.timeout_ms == 0 {
            eyre::bail!("timeouts must be greater than zero");
        }
        Ok(())
    }

    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            confidence_threshold: self.routing.confidence_threshold,
            classify_timeout: Duration::from_millis(self.routing.classify_timeout_ms),
            tool_timeout_ms: self.providers.timeout_ms,
            base_url: self.browser.base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.routing.confidence_threshold, 0.60);
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
        assert!(config.browser.enabled);
        assert!(config.registry.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("voxroute.yml");
        fs::write(
            &path,
            "routing:\n  confidence_threshold: 0.75\nbrowser:\n  enabled: false\n  base_url: http://localhost:3000\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.routing.confidence_threshold, 0.75);
        assert_eq!(config.routing.classify_timeout_ms, DEFAULT_CLASSIFY_TIMEOUT_MS);
        assert!(!config.browser.enabled);

        let settings = config.router_settings();
        assert_eq!(settings.confidence_threshold, 0.75);
        assert_eq!(settings.base_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yml");
        fs::write(&path, "routing:\n  confidence_threshold: 1.5\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let path = PathBuf::from("/nonexistent/voxroute.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_to_anthropic() {
        let mut config = Config::default();
        config.llm.api_key_env = "MY_KEY".to_string();
        config.llm.timeout_ms = 1500;
        let anthropic = config.llm.to_anthropic();
        assert_eq!(anthropic.api_key_env, "MY_KEY");
        assert_eq!(anthropic.timeout, Duration::from_millis(1500));
    }
}
