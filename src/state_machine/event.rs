//! Events that drive the agent loop

use crate::llm::LlmError;
use crate::tools::ToolError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserInput {
        text: String,
    },

    // Model events
    ModelResponse {
        /// Raw message content, possibly fenced
        raw: String,
    },
    ModelFailed {
        error: LlmError,
    },

    // Tool events
    ToolSucceeded {
        output: String,
    },
    ToolFailed {
        error: ToolError,
    },

    /// A scheduled retry delay elapsed
    RetryTimeout {
        attempt: u32,
    },
}
