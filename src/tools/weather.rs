//! Weather lookup tool backed by OpenWeatherMap
//!
//! The city name is passed to the provider as-is: empty or unknown names
//! still hit the provider and surface its failure.

use super::{Tool, ToolError, ToolErrorKind};
use crate::config::WeatherConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub const TOOL_NAME: &str = "getWeatherDetails";

/// Offset between Kelvin and Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Format a Kelvin reading as Celsius with two decimals, e.g. `"21.35°C"`
pub fn format_celsius(kelvin: f64) -> String {
    format!("{:.2}°C", kelvin - KELVIN_OFFSET)
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl WeatherError {
    fn kind(&self) -> ToolErrorKind {
        match self {
            WeatherError::Transport(_) => ToolErrorKind::Transient,
            WeatherError::Status { status, .. } if *status == 429 || *status >= 500 => {
                ToolErrorKind::Transient
            }
            WeatherError::Status { .. } | WeatherError::Client(_) => ToolErrorKind::Rejected,
            WeatherError::MalformedPayload(_) => ToolErrorKind::MalformedPayload,
        }
    }
}

/// Source of current temperatures
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current temperature in Kelvin. Each call is an independent upstream request.
    async fn temperature_kelvin(&self, city: &str) -> Result<f64, WeatherError>;
}

#[async_trait]
impl<T: WeatherProvider + ?Sized> WeatherProvider for Arc<T> {
    async fn temperature_kelvin(&self, city: &str) -> Result<f64, WeatherError> {
        (**self).temperature_kelvin(city).await
    }
}

/// `GET /data/2.5/weather?q=<city>&appid=<key>`
pub struct OpenWeatherMap {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenWeatherMap {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .build()
            .map_err(|e| WeatherError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/data/2.5/weather", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn temperature_kelvin(&self, city: &str) -> Result<f64, WeatherError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            // OpenWeatherMap errors look like {"cod":"404","message":"city not found"}
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| WeatherError::MalformedPayload(e.to_string()))?;
        tracing::debug!(city = %city, main = %payload["main"], "Weather provider response");

        extract_temperature(&payload)
    }
}

/// Read `main.temp` from a provider payload
pub fn extract_temperature(payload: &Value) -> Result<f64, WeatherError> {
    payload
        .get("main")
        .and_then(|main| main.get("temp"))
        .and_then(Value::as_f64)
        .ok_or_else(|| WeatherError::MalformedPayload("missing numeric main.temp".to_string()))
}

/// The `getWeatherDetails` tool
pub struct WeatherTool<P> {
    provider: P,
}

impl<P: WeatherProvider> WeatherTool<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: WeatherProvider> Tool for WeatherTool<P> {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn signature(&self) -> String {
        format!("{TOOL_NAME}(city:string):string")
    }

    fn description(&self) -> String {
        format!("{TOOL_NAME} is a function that accepts city name and returns weather details.")
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let kelvin = self.provider.temperature_kelvin(input).await.map_err(|e| {
            ToolError::new(
                TOOL_NAME,
                input,
                e.kind(),
                format!("Failed to fetch weather details for \"{input}\": {e}"),
            )
        })?;
        Ok(format_celsius(kelvin))
    }
}
