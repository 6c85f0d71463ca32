//! Mock implementations for testing
//!
//! These mocks enable testing the loop without network access.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::tools::{Tool, ToolError, ToolErrorKind, WeatherError, WeatherProvider};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    delay: Option<Duration>,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each request
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response with the given message content
    pub fn queue_text(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(LlmResponse {
            text: text.to_string(),
            end_turn: true,
            usage: Usage::default(),
        }));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(LlmError::invalid_request("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Tool
// ============================================================================

/// Mock tool with a default result and optional one-shot results queued ahead of it
pub struct MockTool {
    name: String,
    default: Result<String, ToolError>,
    queued: Mutex<VecDeque<Result<String, ToolError>>>,
    delay: Option<Duration>,
    /// Inputs of every invocation
    inputs: Mutex<Vec<String>>,
}

impl MockTool {
    pub fn succeeding(name: &str, output: &str) -> Self {
        Self::with_default(name, Ok(output.to_string()))
    }

    pub fn failing(name: &str, kind: ToolErrorKind, message: &str) -> Self {
        Self::with_default(name, Err(ToolError::new(name, "", kind, message)))
    }

    fn with_default(name: &str, default: Result<String, ToolError>) -> Self {
        Self {
            name: name.to_string(),
            default,
            queued: Mutex::new(VecDeque::new()),
            delay: None,
            inputs: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Result for the next invocation only
    pub fn queue(&self, result: Result<String, ToolError>) {
        self.queued.lock().unwrap().push_back(result);
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> String {
        format!("{}(input:string):string", self.name)
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        self.inputs.lock().unwrap().push(input.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.default.clone())
    }
}

// ============================================================================
// Mock Weather Provider
// ============================================================================

/// In-memory temperatures keyed by exact city name
#[derive(Default)]
pub struct MockWeatherProvider {
    cities: HashMap<String, f64>,
    calls: Mutex<Vec<String>>,
}

impl MockWeatherProvider {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_city(mut self, city: &str, kelvin: f64) -> Self {
        self.cities.insert(city.to_string(), kelvin);
        self
    }

    /// Cities queried so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherProvider for MockWeatherProvider {
    async fn temperature_kelvin(&self, city: &str) -> Result<f64, WeatherError> {
        self.calls.lock().unwrap().push(city.to_string());
        self.cities
            .get(city)
            .copied()
            .ok_or_else(|| WeatherError::Status {
                status: 404,
                message: "city not found".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoopLimits;
    use crate::conversation::Conversation;
    use crate::error::AgentError;
    use crate::llm::{LlmErrorKind, MessageRole};
    use crate::protocol::{parse_envelope, Envelope, ProtocolError};
    use crate::runtime::{AgentRuntime, TurnOutcome};
    use crate::state_machine::AgentState;
    use crate::tools::{ToolRegistry, WeatherTool};
    use std::sync::Arc;

    fn fast_limits() -> LoopLimits {
        LoopLimits {
            retry_base_delay: Duration::from_millis(1),
            ..LoopLimits::default()
        }
    }

    fn weather_registry(provider: &Arc<MockWeatherProvider>) -> ToolRegistry {
        ToolRegistry::builder()
            .register(Arc::new(WeatherTool::new(provider.clone())))
            .build()
    }

    fn runtime_with(
        llm: &Arc<MockLlmService>,
        tools: ToolRegistry,
        limits: LoopLimits,
    ) -> AgentRuntime<Arc<MockLlmService>> {
        AgentRuntime::new(llm.clone(), tools, Conversation::new("system prompt"), limits)
    }

    #[tokio::test]
    async fn test_two_city_weather_sum() {
        let llm = Arc::new(MockLlmService::new("mock"));
        let answer = "The sum of weather of Patiala and Mohali is 36.35°C";
        llm.queue_text(
            r#"{"type":"plan","plan":"I will call the getWeatherDetails for Patiala and Mohali"}"#,
        );
        llm.queue_text(
            r#"{"type":"action","function":"getWeatherDetails","input":"patiala"}"#,
        );
        llm.queue_text(r#"{"type":"action","function":"getWeatherDetails","input":"mohali"}"#);
        llm.queue_text(&Envelope::Output { output: answer.to_string() }.to_json());

        let provider = Arc::new(
            MockWeatherProvider::new()
                .with_city("patiala", 294.50)
                .with_city("mohali", 288.15),
        );
        let mut runtime = runtime_with(&llm, weather_registry(&provider), fast_limits());

        let outcome = runtime
            .run_turn("What is the sum of weather of Patiala and Mohali?")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Answered(answer.to_string())
        );
        assert_eq!(provider.calls(), vec!["patiala", "mohali"]);

        let messages = runtime.conversation().snapshot();
        // system, user, plan, action, observation, action, observation, output
        assert_eq!(messages.len(), 8);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(
            parse_envelope(&messages[1].content).unwrap(),
            Envelope::user("What is the sum of weather of Patiala and Mohali?")
        );
        assert_eq!(messages[4].role, MessageRole::Assistant);
        assert_eq!(
            parse_envelope(&messages[4].content).unwrap(),
            Envelope::observation("21.35°C")
        );
        assert_eq!(
            parse_envelope(&messages[6].content).unwrap(),
            Envelope::observation("15.00°C")
        );
        assert_eq!(runtime.conversation().observations(), ["21.35°C", "15.00°C"]);

        // Every request replays the whole log
        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[3].messages.len(), 7);
        assert!(requests.iter().all(|r| r.json_mode));
        assert!(matches!(runtime.state(), AgentState::Terminated { .. }));
    }

    #[tokio::test]
    async fn test_malformed_reply_aborts_then_next_turn_sees_it() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text("Sure! It is sunny.");
        llm.queue_text(r#"{"type":"output","output":"Sorry, here is JSON."}"#);

        let provider = Arc::new(MockWeatherProvider::new());
        let mut runtime = runtime_with(&llm, weather_registry(&provider), fast_limits());

        let first = runtime.run_turn("Weather?").await.unwrap();
        assert!(matches!(
            first,
            TurnOutcome::Aborted(AgentError::ProtocolParse(ProtocolError::InvalidJson(_)))
        ));
        assert_eq!(llm.recorded_requests().len(), 1);
        let last = runtime.conversation().snapshot().last().unwrap().clone();
        assert_eq!(last.content, "Sure! It is sunny.");

        let second = runtime.run_turn("Please answer in JSON").await.unwrap();
        assert_eq!(second, TurnOutcome::Answered("Sorry, here is JSON.".to_string()));

        let requests = llm.recorded_requests();
        assert!(requests[1]
            .messages
            .iter()
            .any(|m| m.content == "Sure! It is sunny."));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_accepted() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text("```json\n{\"type\":\"output\",\"output\":\"20.00°C\"}\n```");

        let mut runtime = runtime_with(&llm, ToolRegistry::builder().build(), fast_limits());
        let outcome = runtime.run_turn("Weather?").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Answered("20.00°C".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_never_invoked() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"action","function":"getTime","input":"now"}"#);

        let tool = Arc::new(MockTool::succeeding("getWeatherDetails", "20.00°C"));
        let registry = ToolRegistry::builder().register(tool.clone()).build();
        let mut runtime = runtime_with(&llm, registry, fast_limits());

        let outcome = runtime.run_turn("What time is it?").await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Aborted(AgentError::ToolNotFound {
                name: "getTime".to_string()
            })
        );
        assert!(tool.inputs().is_empty());
        assert_eq!(runtime.conversation().observations().len(), 0);
    }

    #[tokio::test]
    async fn test_model_written_observation_is_not_counted() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"observation","observation":"10°C"}"#);
        llm.queue_text(r#"{"type":"output","output":"It is 10°C"}"#);

        let provider = Arc::new(MockWeatherProvider::new());
        let mut runtime = runtime_with(&llm, weather_registry(&provider), fast_limits());

        let outcome = runtime.run_turn("Weather?").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Answered("It is 10°C".to_string()));
        assert!(provider.calls().is_empty());
        assert!(runtime.conversation().observations().is_empty());

        // Still logged verbatim and replayed on the next request
        let messages = runtime.conversation().snapshot();
        assert_eq!(
            messages[2].content,
            r#"{"type":"observation","observation":"10°C"}"#
        );
        assert_eq!(llm.recorded_requests()[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_tool_failure_is_not_fed_back() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"action","function":"getWeatherDetails","input":"Atlantis"}"#);

        let provider = Arc::new(MockWeatherProvider::new());
        let mut runtime = runtime_with(&llm, weather_registry(&provider), fast_limits());

        let outcome = runtime.run_turn("Weather in Atlantis?").await.unwrap();
        let TurnOutcome::Aborted(AgentError::ToolExecution { source, attempts }) = outcome else {
            panic!("expected tool execution failure, got {outcome:?}");
        };
        assert_eq!(attempts, 1);
        assert_eq!(source.kind, ToolErrorKind::Rejected);
        assert!(source.message.contains("Atlantis"));

        assert_eq!(runtime.conversation().observations().len(), 0);
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_tool_payload_is_not_retried() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"action","function":"lookup","input":"x"}"#);

        let tool = Arc::new(MockTool::failing(
            "lookup",
            ToolErrorKind::MalformedPayload,
            "missing numeric main.temp",
        ));
        let registry = ToolRegistry::builder().register(tool.clone()).build();
        let mut runtime = runtime_with(&llm, registry, fast_limits());

        let outcome = runtime.run_turn("Find x").await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Aborted(AgentError::ToolExecution { attempts: 1, .. })
        ));
        assert_eq!(tool.inputs(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_transient_tool_failure_is_retried() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"action","function":"lookup","input":"x"}"#);
        llm.queue_text(r#"{"type":"output","output":"done"}"#);

        let tool = Arc::new(MockTool::succeeding("lookup", "found"));
        tool.queue(Err(ToolError::new(
            "lookup",
            "x",
            ToolErrorKind::Transient,
            "connection reset",
        )));
        let registry = ToolRegistry::builder().register(tool.clone()).build();
        let mut runtime = runtime_with(&llm, registry, fast_limits());

        let outcome = runtime.run_turn("Find x").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Answered("done".to_string()));
        assert_eq!(tool.inputs(), vec!["x", "x"]);
        assert_eq!(runtime.conversation().observations().len(), 1);
    }

    #[tokio::test]
    async fn test_model_error_is_retried() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_error(LlmError::network("Connection failed"));
        llm.queue_text(r#"{"type":"output","output":"ok"}"#);

        let mut runtime = runtime_with(&llm, ToolRegistry::builder().build(), fast_limits());
        let outcome = runtime.run_turn("Hello").await.unwrap();

        assert_eq!(outcome, TurnOutcome::Answered("ok".to_string()));
        assert_eq!(llm.recorded_requests().len(), 2);
        // Failed attempts leave no trace in the log
        assert_eq!(runtime.conversation().snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_auth_error_aborts_without_retry() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_error(LlmError::auth("Authentication failed"));

        let mut runtime = runtime_with(&llm, ToolRegistry::builder().build(), fast_limits());
        let outcome = runtime.run_turn("Hello").await.unwrap();

        assert!(matches!(
            outcome,
            TurnOutcome::Aborted(AgentError::ModelInvocation { attempts: 1, .. })
        ));
        assert_eq!(llm.recorded_requests().len(), 1);
        assert_eq!(runtime.conversation().snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_model_timeout() {
        let llm = Arc::new(MockLlmService::new("mock").with_delay(Duration::from_secs(5)));
        let limits = LoopLimits {
            model_timeout: Duration::from_millis(20),
            max_model_attempts: 1,
            ..fast_limits()
        };

        let mut runtime = runtime_with(&llm, ToolRegistry::builder().build(), limits);
        let outcome = runtime.run_turn("Hello").await.unwrap();

        let TurnOutcome::Aborted(AgentError::ModelInvocation { source, .. }) = outcome else {
            panic!("expected model invocation failure, got {outcome:?}");
        };
        assert_eq!(source.kind, LlmErrorKind::Network);
        assert!(source.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_tool_timeout() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"action","function":"slow","input":"x"}"#);

        let tool = Arc::new(
            MockTool::succeeding("slow", "late").with_delay(Duration::from_secs(5)),
        );
        let registry = ToolRegistry::builder().register(tool).build();
        let limits = LoopLimits {
            tool_timeout: Duration::from_millis(20),
            max_tool_attempts: 1,
            ..fast_limits()
        };
        let mut runtime = runtime_with(&llm, registry, limits);

        let outcome = runtime.run_turn("Go").await.unwrap();
        let TurnOutcome::Aborted(AgentError::ToolExecution { source, .. }) = outcome else {
            panic!("expected tool execution failure, got {outcome:?}");
        };
        assert_eq!(source.kind, ToolErrorKind::Timeout);
        assert_eq!(runtime.conversation().observations().len(), 0);
    }

    #[tokio::test]
    async fn test_step_limit_ends_turn() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"plan","plan":"thinking"}"#);
        llm.queue_text(r#"{"type":"plan","plan":"still thinking"}"#);
        llm.queue_text(r#"{"type":"output","output":"never reached"}"#);

        let limits = LoopLimits {
            max_steps: 2,
            ..fast_limits()
        };
        let mut runtime = runtime_with(&llm, ToolRegistry::builder().build(), limits);

        let outcome = runtime.run_turn("Think").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Aborted(AgentError::StepLimit { limit: 2 }));
        assert_eq!(llm.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_json_mode_flag_reaches_requests() {
        let llm = Arc::new(MockLlmService::new("mock"));
        llm.queue_text(r#"{"type":"output","output":"ok"}"#);

        let mut runtime = runtime_with(&llm, ToolRegistry::builder().build(), fast_limits())
            .with_json_mode(false);
        runtime.run_turn("Hello").await.unwrap();
        assert!(!llm.recorded_requests()[0].json_mode);
    }
}
