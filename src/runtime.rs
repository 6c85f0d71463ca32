//! Runtime for executing the agent loop
//!
//! The state machine decides, the runtime performs: model calls, tool calls,
//! retry delays and conversation updates all happen here.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::{AgentRuntime, TurnOutcome};
