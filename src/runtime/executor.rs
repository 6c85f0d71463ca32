//! Agent loop executor

use crate::config::LoopLimits;
use crate::conversation::Conversation;
use crate::error::AgentError;
use crate::llm::{LlmError, LlmRequest, LlmService};
use crate::protocol::parse_envelope;
use crate::state_machine::{
    transition, AgentContext, AgentState, Effect, Event, TransitionError,
};
use crate::tools::{ToolError, ToolErrorKind, ToolRegistry};
use std::collections::VecDeque;
use std::time::Instant;

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced an `output` envelope
    Answered(String),
    /// The turn was abandoned; the conversation keeps everything logged so far
    Aborted(AgentError),
}

/// Drives turns of the loop against a model and a tool registry.
///
/// The conversation outlives individual turns, so later questions see the
/// full history, including replies from aborted turns.
pub struct AgentRuntime<L: LlmService> {
    context: AgentContext,
    state: AgentState,
    conversation: Conversation,
    llm: L,
    tools: ToolRegistry,
    limits: LoopLimits,
    json_mode: bool,
}

impl<L: LlmService> AgentRuntime<L> {
    pub fn new(
        llm: L,
        tools: ToolRegistry,
        conversation: Conversation,
        limits: LoopLimits,
    ) -> Self {
        Self {
            context: AgentContext::new(tools.names(), &limits),
            state: AgentState::default(),
            conversation,
            llm,
            tools,
            limits,
            json_mode: true,
        }
    }

    /// Whether requests ask the provider for JSON-only output
    #[must_use]
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[cfg(test)]
    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Run one user question to completion.
    ///
    /// Only `TransitionError` escapes; everything that goes wrong inside the
    /// turn is reported as `TurnOutcome::Aborted`.
    pub async fn run_turn(&mut self, text: &str) -> Result<TurnOutcome, TransitionError> {
        let started = Instant::now();
        let mut pending = VecDeque::from([Event::UserInput {
            text: text.to_string(),
        }]);

        while let Some(event) = pending.pop_front() {
            let result = match transition(&self.state, &self.context, event) {
                Ok(r) => r,
                Err(e) => {
                    if self.state.is_working() {
                        tracing::error!(
                            error = %e,
                            state = self.state.name(),
                            "Turn stalled, resetting"
                        );
                        self.state = AgentState::AwaitingUserInput;
                    }
                    return Err(e);
                }
            };

            if result.new_state.name() != self.state.name() {
                tracing::debug!(
                    from = self.state.name(),
                    to = result.new_state.name(),
                    "State transition"
                );
            }
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    pending.push_back(generated);
                }
            }
        }

        let outcome = match &self.state {
            AgentState::Terminated { output } => TurnOutcome::Answered(output.clone()),
            AgentState::Aborted { error } => TurnOutcome::Aborted(error.clone()),
            other => {
                return Err(TransitionError::InvalidTransition(format!(
                    "turn ended without a result in state {}",
                    other.name()
                )))
            }
        };

        tracing::info!(
            duration_ms = %started.elapsed().as_millis(),
            messages = self.conversation.snapshot().len(),
            observations = self.conversation.observations().len(),
            answered = matches!(outcome, TurnOutcome::Answered(_)),
            "Turn finished"
        );
        Ok(outcome)
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendMessage { message } => {
                tracing::debug!(
                    role = message.role.as_str(),
                    kind = parse_envelope(&message.content).map_or("unparsed", |e| e.kind()),
                    "Appending message"
                );
                self.conversation.append(message);
                None
            }

            Effect::AppendObservation { observation } => {
                tracing::debug!("Appending observation");
                self.conversation.append_observation(observation);
                None
            }

            Effect::RequestModel => Some(self.request_model().await),

            Effect::InvokeTool { function, input } => {
                Some(self.invoke_tool(&function, &input).await)
            }

            Effect::ScheduleRetry { delay, attempt } => {
                tracing::info!(delay_ms = %delay.as_millis(), attempt, "Retrying after delay");
                tokio::time::sleep(delay).await;
                Some(Event::RetryTimeout { attempt })
            }

            Effect::EmitOutput { text } => {
                tracing::info!(output = %text, "Model produced output");
                None
            }

            Effect::ReportAbort { error } => {
                tracing::warn!(error = %error, "Turn aborted");
                None
            }
        }
    }

    async fn request_model(&self) -> Event {
        let request = LlmRequest {
            messages: self.conversation.snapshot().to_vec(),
            json_mode: self.json_mode,
            max_tokens: None,
        };

        let timeout = self.limits.model_timeout;
        match tokio::time::timeout(timeout, self.llm.complete(&request)).await {
            Ok(Ok(response)) => Event::ModelResponse { raw: response.text },
            Ok(Err(error)) => Event::ModelFailed { error },
            Err(_) => Event::ModelFailed {
                error: LlmError::timeout(timeout),
            },
        }
    }

    async fn invoke_tool(&self, function: &str, input: &str) -> Event {
        let Some(tool) = self.tools.resolve(function) else {
            // The context is built from the registry, so this only fires if they diverge
            return Event::ToolFailed {
                error: ToolError::new(
                    function,
                    input,
                    ToolErrorKind::Rejected,
                    "tool is not registered",
                ),
            };
        };

        tracing::info!(tool = %function, input = %input, "Executing tool");
        let timeout = self.limits.tool_timeout;
        match tokio::time::timeout(timeout, tool.invoke(input)).await {
            Ok(Ok(output)) => {
                tracing::info!(tool = %function, observation = %output, "Observation");
                Event::ToolSucceeded { output }
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    tool = %function,
                    input = %error.input,
                    error = %error.message,
                    "Tool failed"
                );
                Event::ToolFailed { error }
            }
            Err(_) => Event::ToolFailed {
                error: ToolError::timeout(function, input, timeout),
            },
        }
    }
}
