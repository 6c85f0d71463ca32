//! System prompt construction
//!
//! The prompt teaches the model the envelope protocol, lists the registered
//! tools and walks through a worked example. It is the first message of every
//! conversation and never changes afterwards.

use crate::protocol::Envelope;
use crate::tools::ToolDefinition;
use std::fmt::Write;

/// Role and protocol rules
const BASE_PROMPT: &str = r"You are an AI Assistant with START, PLAN, ACTION, Observation, and Output State.
Wait for the user prompt and first PLAN using available tools.
After Planning, take the action with appropriate tools and wait for Observation based on Action.
Once you get the observations, return the AI response based on START prompt and observations.
Strictly follow the JSON output format: reply with exactly one JSON object per message.";

/// Build the system prompt advertising the given tools
pub fn build_system_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    prompt.push_str("\n\nAvailable Tools:\n");
    if tools.is_empty() {
        prompt.push_str("\n(none)\n");
    }
    for tool in tools {
        tracing::debug!(tool = %tool.name, "Advertising tool");
        let _ = write!(prompt, "\n-{}\n{}\n", tool.signature, tool.description);
    }

    prompt.push_str("\nEXAMPLE:\n\n");
    for envelope in example_exchange() {
        prompt.push_str(&envelope.to_json());
        prompt.push('\n');
    }

    prompt
}

/// Two tool calls, two observations, one summed answer
fn example_exchange() -> [Envelope; 8] {
    let plan = |text: &str| Envelope::Plan {
        plan: text.to_string(),
    };
    let action = |city: &str| Envelope::Action {
        function: "getWeatherDetails".to_string(),
        input: city.to_string(),
    };

    [
        Envelope::user("What is the sum of weather of Patiala and Mohali?"),
        plan("I will call the getWeatherDetails for Patiala"),
        action("patiala"),
        Envelope::observation("10°C"),
        plan("I will call getWeatherDetails for Mohali"),
        action("mohali"),
        Envelope::observation("15°C"),
        Envelope::Output {
            output: "The sum of the weather of Patiala and Mohali is 25°C".to_string(),
        },
    ]
}
