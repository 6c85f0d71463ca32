//! Effects produced by state transitions

use crate::error::AgentError;
use crate::llm::Message;
use crate::protocol::Envelope;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the conversation log
    AppendMessage { message: Message },

    /// Append a tool result as an assistant `observation` envelope
    AppendObservation { observation: String },

    /// Send the whole conversation to the model
    RequestModel,

    /// Run a registered tool
    InvokeTool { function: String, input: String },

    /// Wait, then deliver `Event::RetryTimeout`
    ScheduleRetry { delay: Duration, attempt: u32 },

    /// Surface the final answer to the user
    EmitOutput { text: String },

    /// Surface the reason the turn was abandoned
    ReportAbort { error: AgentError },
}

impl Effect {
    pub fn append_user(envelope: &Envelope) -> Self {
        Effect::AppendMessage {
            message: Message::user(envelope.to_json()),
        }
    }

    /// Model output is logged verbatim, even when it fails to parse
    pub fn append_raw_assistant(raw: impl Into<String>) -> Self {
        Effect::AppendMessage {
            message: Message::assistant(raw),
        }
    }

    pub fn append_observation(observation: impl Into<String>) -> Self {
        Effect::AppendObservation {
            observation: observation.into(),
        }
    }

    pub fn invoke_tool(function: impl Into<String>, input: impl Into<String>) -> Self {
        Effect::InvokeTool {
            function: function.into(),
            input: input.into(),
        }
    }
}
