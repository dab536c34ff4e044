use crate::error::{Result, StrideError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stride_oracle::{FallbackOracle, HttpOracle, HttpOracleOptions, Oracle};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// OracleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Tried in order; the first model that answers wins.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "STRIDE_ORACLE_API_KEY".to_string()
}

fn default_models() -> Vec<String> {
    vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()]
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            models: default_models(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OracleConfig {
    /// The key from the configured environment variable, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// One HTTP backend per configured model, wrapped in ordered fallback.
    pub fn build(&self) -> Result<FallbackOracle> {
        let api_key = self.api_key();
        if api_key.is_none() {
            tracing::warn!(env = %self.api_key_env, "oracle API key not set, sending unauthenticated requests");
        }
        let mut backends: Vec<Arc<dyn Oracle>> = Vec::with_capacity(self.models.len());
        for model in &self.models {
            let mut opts = HttpOracleOptions::new(&self.base_url, model);
            opts.api_key = api_key.clone();
            opts.temperature = self.temperature;
            opts.timeout = Duration::from_secs(self.timeout_secs);
            backends.push(Arc::new(HttpOracle::new(opts)?));
        }
        Ok(FallbackOracle::new(backends))
    }
}

// ---------------------------------------------------------------------------
// AssistantConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_match_threshold")]
    pub match_threshold: u32,
    #[serde(default)]
    pub timezone_offset_minutes: i32,
}

fn default_match_threshold() -> u32 {
    30
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            timezone_offset_minutes: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Header carrying the authenticated user id.
    #[serde(default = "default_user_header")]
    pub user_header: String,
}

fn default_port() -> u16 {
    3210
}

fn default_user_header() -> String {
    "x-user-id".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            user_header: default_user_header(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// `production` hides error details from HTTP responses.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            environment: default_environment(),
            oracle: OracleConfig::default(),
            assistant: AssistantConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(StrideError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        if self.oracle.models.is_empty() {
            push(
                WarnLevel::Error,
                "oracle.models is empty: no model to ask".to_string(),
            );
        }

        let mut seen = HashSet::new();
        for model in &self.oracle.models {
            if !seen.insert(model.as_str()) {
                push(
                    WarnLevel::Warning,
                    format!("model '{model}' is listed more than once in oracle.models"),
                );
            }
        }

        if self.oracle.base_url.trim().is_empty() {
            push(WarnLevel::Error, "oracle.base_url is blank".to_string());
        }

        if !(1..=100).contains(&self.assistant.match_threshold) {
            push(
                WarnLevel::Warning,
                format!(
                    "assistant.match_threshold={} is outside 1..=100",
                    self.assistant.match_threshold
                ),
            );
        }

        if self.server.user_header.trim().is_empty() {
            push(WarnLevel::Error, "server.user_header is blank".to_string());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.server.port, 3210);
    }

    #[test]
    fn sparse_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("environment: production\nserver:\n  port: 8080\n").unwrap();
        assert!(cfg.is_production());
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.user_header, "x-user-id");
        assert_eq!(cfg.assistant.match_threshold, 30);
        assert_eq!(cfg.oracle.models, default_models());
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Config::load(dir.path()), Err(StrideError::NotInitialized)));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.oracle.models = vec!["local-model".to_string()];
        cfg.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn oracle_builds_one_backend_per_model() {
        let cfg = OracleConfig::default();
        assert_eq!(cfg.build().unwrap().len(), 2);
    }

    #[test]
    fn default_config_is_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_problems() {
        let mut cfg = Config::default();
        cfg.oracle.models = vec!["a".into(), "a".into()];
        cfg.assistant.match_threshold = 0;
        cfg.server.user_header = " ".into();
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.message.contains("more than once")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("user_header")));

        cfg.oracle.models.clear();
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("oracle.models is empty")));
    }
}
