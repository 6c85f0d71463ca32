//! Reasons a turn of the agent loop is aborted
//!
//! None of these are fatal to the process: each ends the current turn and
//! control returns to the prompt.

use crate::llm::LlmError;
use crate::protocol::ProtocolError;
use crate::tools::ToolError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// Transport, auth, rate-limit or timeout failure calling the model
    #[error("model invocation failed after {attempts} attempt(s): {source}")]
    ModelInvocation { source: LlmError, attempts: u32 },

    /// The model's reply is not a valid envelope. The reply stays in the log.
    #[error("could not parse model response: {0}")]
    ProtocolParse(#[from] ProtocolError),

    /// The action names a tool that is not registered
    #[error("tool {name:?} not found")]
    ToolNotFound { name: String },

    /// The tool ran and failed
    #[error("tool execution failed after {attempts} attempt(s): {source}")]
    ToolExecution { source: ToolError, attempts: u32 },

    /// The turn used up its model round-trips without an output
    #[error("no output after {limit} model round-trips")]
    StepLimit { limit: u32 },
}
