//! Append-only conversation log replayed to the model on every request

use crate::llm::Message;
use crate::protocol::Envelope;

/// Ordered message log. The system instruction is always the first entry.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Tool results the loop appended, oldest first
    observed: Vec<String>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            observed: Vec::new(),
        }
    }

    /// Add a message to the end of the log. Content is not validated.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Log a tool result as an assistant-role `observation` envelope.
    ///
    /// Only results appended here are counted by [`Conversation::observations`];
    /// observation envelopes written by the model itself go through `append`.
    pub fn append_observation(&mut self, observation: impl Into<String>) {
        let observation = observation.into();
        self.messages.push(Message::assistant(
            Envelope::observation(observation.clone()).to_json(),
        ));
        self.observed.push(observation);
    }

    /// The full history, in insertion order
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .map_or("", |message| message.content.as_str())
    }

    /// Tool results appended by the loop, in order
    pub fn observations(&self) -> &[String] {
        &self.observed
    }
}
