//! `weather_tool`: current conditions from the OpenWeatherMap REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::errors::ToolError;
use super::{require_param, Parameters, Tool};
use crate::config::WeatherConfig;

pub const TOOL_NAME: &str = "weather_tool";

pub struct WeatherTool {
    http: HttpClient,
    config: WeatherConfig,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

impl WeatherTool {
    pub fn new(config: WeatherConfig) -> Result<Self, ToolError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolError::ConfigError {
                reason: format!("failed to build weather HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    fn unit_suffix(&self) -> &'static str {
        match self.config.units.as_str() {
            "metric" => "°C",
            "standard" => " K",
            _ => "°F",
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    async fn execute(&self, params: &Parameters) -> Result<String, ToolError> {
        let location = require_param(params, TOOL_NAME, "location")?;
        let api_key = self.config.api_key().ok_or_else(|| ToolError::NotConfigured {
            what: "Weather API key".into(),
        })?;

        let url = format!("{}/weather", self.config.base_url.trim_end_matches('/'));
        let context = format!("weather for {location}");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", location.as_str()),
                ("appid", api_key),
                ("units", self.config.units.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::RequestFailed {
                context: context.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::RequestFailed {
                context,
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let body: WeatherResponse = response.json().await.map_err(|e| ToolError::ResponseShape {
            context: format!("weather data for {location}"),
            reason: e.to_string(),
        })?;

        let description = body
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("no description");

        Ok(format!(
            "{location}: {}{}, {description}, humidity: {}%",
            body.main.temp,
            self.unit_suffix(),
            body.main.humidity
        ))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
