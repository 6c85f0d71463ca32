//! Tools the model can invoke through `action` envelopes
//!
//! Each tool takes a single string argument and returns a string result.
//! The set of tools is fixed when the registry is built.

mod weather;

pub use weather::{OpenWeatherMap, WeatherError, WeatherProvider, WeatherTool};

use crate::config::WeatherConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure of a tool's own operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{tool}: {message}")]
pub struct ToolError {
    pub tool: String,
    pub input: String,
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(
        tool: impl Into<String>,
        input: impl Into<String>,
        kind: ToolErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            input: input.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(tool: impl Into<String>, input: impl Into<String>, after: Duration) -> Self {
        let message = format!("timed out after {}ms", after.as_millis());
        Self::new(tool, input, ToolErrorKind::Timeout, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// Transport failure or upstream 429/5xx - retryable
    Transient,
    /// Upstream refused the request (unknown city, bad key) - not retryable
    Rejected,
    /// Upstream answered with an unusable payload - not retryable
    MalformedPayload,
    /// Call exceeded the configured deadline - retryable
    Timeout,
}

impl ToolErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Timeout)
    }
}

/// Tool definition advertised in the system prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    /// e.g. `getWeatherDetails(city:string):string`
    pub signature: String,
    pub description: String,
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name matched exactly against the `function` field of an action
    fn name(&self) -> &str;

    /// Call signature shown to the model
    fn signature(&self) -> String;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// Run the tool with the action's `input`
    async fn invoke(&self, input: &str) -> Result<String, ToolError>;
}

/// Collection of tools available to the agent
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the built-in tool set
    pub fn standard(weather: &WeatherConfig) -> Result<Self, WeatherError> {
        let provider = OpenWeatherMap::new(weather)?;
        Ok(Self::builder()
            .register(Arc::new(WeatherTool::new(provider)))
            .build())
    }

    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Look up a tool by exact, case-sensitive name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }

    /// Get all tool definitions for the system prompt
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                signature: tool.signature(),
                description: tool.description(),
            })
            .collect()
    }
}

/// Registration-time construction of a `ToolRegistry`
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    /// Add a tool, replacing any earlier tool with the same name
    #[must_use]
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.retain(|existing| existing.name() != tool.name());
        self.tools.push(tool);
        self
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry { tools: self.tools }
    }
}
