//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects, with no I/O.

use super::{AgentContext, AgentState, Effect, Event};
use crate::error::AgentError;
use crate::protocol::{parse_envelope, Envelope};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: AgentState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: AgentState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Agent is busy, cannot accept input until the current turn ends")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &AgentState,
    context: &AgentContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User input
        // ============================================================

        // Idle, or the previous turn ended either way -> request the model
        (
            AgentState::AwaitingUserInput
            | AgentState::Terminated { .. }
            | AgentState::Aborted { .. },
            Event::UserInput { text },
        ) => Ok(
            TransitionResult::new(AgentState::AwaitingModelResponse { attempt: 1, step: 1 })
                .with_effect(Effect::append_user(&Envelope::user(text)))
                .with_effect(Effect::RequestModel),
        ),

        (
            AgentState::AwaitingModelResponse { .. } | AgentState::Dispatching { .. },
            Event::UserInput { .. },
        ) => Err(TransitionError::Busy),

        // ============================================================
        // Model response
        // ============================================================
        (AgentState::AwaitingModelResponse { step, .. }, Event::ModelResponse { raw }) => {
            let envelope = parse_envelope(&raw);
            let logged = Effect::append_raw_assistant(raw);

            let result = match envelope {
                Err(e) => abort(AgentError::ProtocolParse(e)),

                Ok(Envelope::Output { output }) => {
                    TransitionResult::new(AgentState::Terminated {
                        output: output.clone(),
                    })
                    .with_effect(Effect::EmitOutput { text: output })
                }

                Ok(Envelope::Action { function, input }) => {
                    if context.has_tool(&function) {
                        TransitionResult::new(AgentState::Dispatching {
                            function: function.clone(),
                            input: input.clone(),
                            attempt: 1,
                            step: *step,
                        })
                        .with_effect(Effect::invoke_tool(function, input))
                    } else {
                        abort(AgentError::ToolNotFound { name: function })
                    }
                }

                // Informational: nothing to run, ask the model again
                Ok(
                    Envelope::Plan { .. } | Envelope::Observation { .. } | Envelope::User { .. },
                ) => next_step(context, *step),
            };

            // The raw reply is logged ahead of whatever it caused
            let mut effects = vec![logged];
            effects.extend(result.effects);
            Ok(TransitionResult::new(result.new_state).with_effects(effects))
        }

        // Retryable model failure with attempts left -> back off and retry
        (AgentState::AwaitingModelResponse { attempt, step }, Event::ModelFailed { error })
            if error.kind.is_retryable() && *attempt < context.max_model_attempts =>
        {
            let new_attempt = attempt + 1;
            let delay = error
                .requested_delay(context.max_retry_delay)
                .unwrap_or_else(|| context.retry_delay(new_attempt));

            Ok(TransitionResult::new(AgentState::AwaitingModelResponse {
                attempt: new_attempt,
                step: *step,
            })
            .with_effect(Effect::ScheduleRetry {
                delay,
                attempt: new_attempt,
            }))
        }

        (AgentState::AwaitingModelResponse { attempt, .. }, Event::ModelFailed { error }) => {
            Ok(abort(AgentError::ModelInvocation {
                source: error,
                attempts: *attempt,
            }))
        }

        (
            AgentState::AwaitingModelResponse { attempt, step },
            Event::RetryTimeout {
                attempt: retry_attempt,
            },
        ) if *attempt == retry_attempt => {
            Ok(TransitionResult::new(AgentState::AwaitingModelResponse {
                attempt: *attempt,
                step: *step,
            })
            .with_effect(Effect::RequestModel))
        }

        // ============================================================
        // Tool execution
        // ============================================================

        // Success -> exactly one observation, then back to the model
        (AgentState::Dispatching { step, .. }, Event::ToolSucceeded { output }) => {
            let next = next_step(context, *step);
            Ok(TransitionResult::new(next.new_state)
                .with_effect(Effect::append_observation(output))
                .with_effects(next.effects))
        }

        (
            AgentState::Dispatching {
                function,
                input,
                attempt,
                step,
            },
            Event::ToolFailed { error },
        ) if error.is_retryable() && *attempt < context.max_tool_attempts => {
            let new_attempt = attempt + 1;
            Ok(TransitionResult::new(AgentState::Dispatching {
                function: function.clone(),
                input: input.clone(),
                attempt: new_attempt,
                step: *step,
            })
            .with_effect(Effect::ScheduleRetry {
                delay: context.retry_delay(new_attempt),
                attempt: new_attempt,
            }))
        }

        // Tool failures are never fed back to the model as observations
        (AgentState::Dispatching { attempt, .. }, Event::ToolFailed { error }) => {
            Ok(abort(AgentError::ToolExecution {
                source: error,
                attempts: *attempt,
            }))
        }

        (
            AgentState::Dispatching {
                function,
                input,
                attempt,
                ..
            },
            Event::RetryTimeout {
                attempt: retry_attempt,
            },
        ) if *attempt == retry_attempt => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::invoke_tool(function.clone(), input.clone()))),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

fn abort(error: AgentError) -> TransitionResult {
    TransitionResult::new(AgentState::Aborted {
        error: error.clone(),
    })
    .with_effect(Effect::ReportAbort { error })
}

/// Request the model again unless the turn has used all of its steps
fn next_step(context: &AgentContext, step: u32) -> TransitionResult {
    if step >= context.max_steps {
        return abort(AgentError::StepLimit {
            limit: context.max_steps,
        });
    }
    TransitionResult::new(AgentState::AwaitingModelResponse {
        attempt: 1,
        step: step + 1,
    })
    .with_effect(Effect::RequestModel)
}
