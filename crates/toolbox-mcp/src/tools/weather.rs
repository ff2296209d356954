use async_trait::async_trait;
use serde_json::{json, Map, Value};

use toolbox_core::{Error, ExecutionContext, HandlerResponse, OutboundRequest};

use super::{error_response, not_configured, object_schema};
use crate::registry::{ToolDefinition, ToolHandler};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

// Hanoi, Vietnam.
const LATITUDE: f64 = 21.0285;
const LONGITUDE: f64 = 105.8542;

pub fn definition() -> ToolDefinition {
    ToolDefinition::new(
        "weather",
        "GET current weather data (default: Hanoi, Vietnam)",
        object_schema(json!({}), &[]),
    )
}

fn forecast_url() -> String {
    format!("{FORECAST_URL}?latitude={LATITUDE}&longitude={LONGITUDE}&current_weather=true&timezone=auto")
}

/// A reading as plain text: numbers and strings without JSON quoting.
fn reading(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string()),
        Value::String(s) => s.clone(),
        Value::Null => "?".to_string(),
        other => other.to_string(),
    }
}

/// One-line description of the `current_weather` block, if it has a temperature.
fn summarize(forecast: &Value) -> String {
    let current = &forecast["current_weather"];
    match current.get("temperature") {
        Some(temperature) => format!(
            "Current weather in Hanoi (VN): {}°C, wind {} km/h.",
            reading(temperature),
            reading(&current["windspeed"])
        ),
        None => "No current weather data available.".to_string(),
    }
}

pub struct WeatherTool;

#[async_trait]
impl ToolHandler for WeatherTool {
    async fn invoke(
        &self,
        _args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResponse, Error> {
        let Some(http) = &ctx.http else {
            return Ok(not_configured("HTTP client"));
        };

        let response = match http.send(OutboundRequest::get(forecast_url())).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "weather fetch failed");
                return Ok(error_response(500, err.to_string()));
            }
        };

        if !response.is_success() {
            return Ok(HandlerResponse::json(
                502,
                &json!({
                    "error": "Failed to fetch weather data",
                    "upstreamStatus": response.status,
                    "upstreamStatusText": response.status_text,
                }),
            ));
        }

        let forecast: Value = match serde_json::from_str(&response.body) {
            Ok(forecast) => forecast,
            Err(err) => return Ok(error_response(500, format!("Invalid weather payload: {err}"))),
        };

        Ok(HandlerResponse::json(
            200,
            &json!({ "summary": summarize(&forecast), "weather": forecast }),
        ))
    }
}
