//! Agent loop state types

use crate::config::LoopLimits;
use crate::error::AgentError;
use std::collections::HashSet;
use std::time::Duration;

/// Where the loop is within the current turn
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AgentState {
    /// Ready for user input, no pending operations
    #[default]
    AwaitingUserInput,

    /// A model request is in flight (or scheduled for retry)
    AwaitingModelResponse {
        /// Attempt number for the current request, starting at 1
        attempt: u32,
        /// Model round-trips made so far in this turn, including this one
        step: u32,
    },

    /// A tool requested by an `action` envelope is running
    Dispatching {
        function: String,
        input: String,
        attempt: u32,
        step: u32,
    },

    /// The model produced an `output`; the turn is over
    Terminated { output: String },

    /// The turn was abandoned
    Aborted { error: AgentError },
}

impl AgentState {
    /// Check if a turn is in progress
    pub fn is_working(&self) -> bool {
        matches!(
            self,
            AgentState::AwaitingModelResponse { .. } | AgentState::Dispatching { .. }
        )
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            AgentState::AwaitingUserInput => "awaiting_user_input",
            AgentState::AwaitingModelResponse { .. } => "awaiting_model_response",
            AgentState::Dispatching { .. } => "dispatching",
            AgentState::Terminated { .. } => "terminated",
            AgentState::Aborted { .. } => "aborted",
        }
    }
}

/// Context for the loop (immutable configuration)
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// Names of registered tools, matched exactly
    pub tool_names: HashSet<String>,
    pub max_model_attempts: u32,
    pub max_tool_attempts: u32,
    pub max_steps: u32,
    pub retry_base_delay: Duration,
    /// Upper bound on any single retry wait, including `Retry-After`
    pub max_retry_delay: Duration,
}

impl AgentContext {
    pub fn new(tool_names: impl IntoIterator<Item = String>, limits: &LoopLimits) -> Self {
        Self {
            tool_names: tool_names.into_iter().collect(),
            max_model_attempts: limits.max_model_attempts,
            max_tool_attempts: limits.max_tool_attempts,
            max_steps: limits.max_steps,
            retry_base_delay: limits.retry_base_delay,
            max_retry_delay: limits.max_retry_delay,
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tool_names.contains(name)
    }

    /// Exponential backoff: base, 2x base, 4x base, ... up to `max_retry_delay`
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2).min(16);
        self.retry_base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_retry_delay)
    }
}
