//! Environment-driven configuration

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.together.xyz/v1";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org";
const DEFAULT_RETRY_BASE_MS: u64 = 1000;
const DEFAULT_MAX_RETRY_DELAY_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("failed to load .env: {0}")]
    DotEnv(String),
}

/// Configuration for the model provider
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// OpenAI-compatible API root, e.g. `https://api.together.xyz/v1`
    pub base_url: String,
    pub model: String,
    /// Request `response_format: json_object`
    pub json_mode: bool,
}

/// Configuration for the weather provider
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

/// Bounds on a single turn of the agent loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    pub max_model_attempts: u32,
    pub max_tool_attempts: u32,
    /// Maximum model round-trips per turn
    pub max_steps: u32,
    pub retry_base_delay: Duration,
    /// Ceiling on any single retry wait, including a provider's `Retry-After`
    pub max_retry_delay: Duration,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(15),
            max_model_attempts: 3,
            max_tool_attempts: 2,
            max_steps: 16,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            max_retry_delay: Duration::from_secs(DEFAULT_MAX_RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub limits: LoopLimits,
}

/// Load `.env` from the working directory or its ancestors, if there is one.
///
/// Variables already present in the process environment win.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::DotEnv(e.to_string())),
    }
}

/// Load a specific env file. Returns `false` when it does not exist.
pub fn load_dotenv_from(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ConfigError::DotEnv(format!("{}: {e}", path.display()))),
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = LoopLimits::default();

        let llm = LlmConfig {
            api_key: non_empty("TOGETHER_API_KEY"),
            base_url: non_empty("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: non_empty("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            json_mode: parse_bool("LLM_JSON_MODE", non_empty("LLM_JSON_MODE"), true)?,
        };

        let weather = WeatherConfig {
            api_key: non_empty("WEATHER_API_KEY"),
            base_url: non_empty("WEATHER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_WEATHER_BASE_URL.to_string()),
        };

        let limits = LoopLimits {
            model_timeout: Duration::from_secs(parse_u64(
                "AGENT_MODEL_TIMEOUT_SECS",
                non_empty("AGENT_MODEL_TIMEOUT_SECS"),
                defaults.model_timeout.as_secs(),
            )?),
            tool_timeout: Duration::from_secs(parse_u64(
                "AGENT_TOOL_TIMEOUT_SECS",
                non_empty("AGENT_TOOL_TIMEOUT_SECS"),
                defaults.tool_timeout.as_secs(),
            )?),
            max_model_attempts: parse_positive(
                "AGENT_MAX_MODEL_ATTEMPTS",
                non_empty("AGENT_MAX_MODEL_ATTEMPTS"),
                defaults.max_model_attempts,
            )?,
            max_tool_attempts: parse_positive(
                "AGENT_MAX_TOOL_ATTEMPTS",
                non_empty("AGENT_MAX_TOOL_ATTEMPTS"),
                defaults.max_tool_attempts,
            )?,
            max_steps: parse_positive(
                "AGENT_MAX_STEPS",
                non_empty("AGENT_MAX_STEPS"),
                defaults.max_steps,
            )?,
            retry_base_delay: Duration::from_millis(parse_u64(
                "AGENT_RETRY_BASE_MS",
                non_empty("AGENT_RETRY_BASE_MS"),
                DEFAULT_RETRY_BASE_MS,
            )?),
            max_retry_delay: Duration::from_secs(parse_u64(
                "AGENT_MAX_RETRY_DELAY_SECS",
                non_empty("AGENT_MAX_RETRY_DELAY_SECS"),
                DEFAULT_MAX_RETRY_DELAY_SECS,
            )?),
        };

        Ok(Self {
            llm,
            weather,
            limits,
        })
    }
}

fn parse_u64(var: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected: "a non-negative integer",
            value: raw,
        }),
    }
}

fn parse_positive(
    var: &'static str,
    value: Option<String>,
    default: u32,
) -> Result<u32, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid {
                var,
                expected: "a positive integer",
                value: raw,
            }),
        },
    }
}

fn parse_bool(
    var: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var,
                expected: "a boolean",
                value: raw,
            }),
        },
    }
}
