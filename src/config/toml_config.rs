use crate::utils::error::{Result, TriageError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "triage-flow.toml";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Process configuration, resolved once at startup and passed down by value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub reasoning: ReasoningConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub reformat_on_parse_error: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_seconds: 8,
            reformat_on_parse_error: false,
        }
    }
}

impl ReasoningConfig {
    /// The API key, if one was really provided. Blank values and `${VAR}` placeholders
    /// left behind by substitution count as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !(key.starts_with("${") && key.ends_with('}')))
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("reformat_on_parse_error", &self.reformat_on_parse_error)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: "./audit/triage-audit.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TriageError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TriageError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Loads `path` when it exists, otherwise falls back to built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            Self::from_file(path)
        } else {
            tracing::info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Fills `reasoning.api_key` from `GEMINI_API_KEY` when the file left it unset.
    pub fn with_api_key_from_env(mut self) -> Self {
        if !self.reasoning.is_configured() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.reasoning.api_key = Some(key);
            }
        }
        self
    }

    /// 替換環境變數 (例如 ${GEMINI_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TriageError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e| TriageError::InvalidConfigValueError {
                field: "server.bind_addr".to_string(),
                value: self.server.bind_addr.clone(),
                reason: format!("{}", e),
            })
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        validation::validate_endpoint("reasoning.endpoint", &self.reasoning.endpoint)?;
        validation::validate_non_empty("reasoning.model", &self.reasoning.model)?;
        validation::validate_range(
            "reasoning.timeout_seconds",
            self.reasoning.timeout_seconds,
            1..=60,
        )?;
        validation::validate_file_path("audit.path", &self.audit.path)?;

        Ok(())
    }
}
