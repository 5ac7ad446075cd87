//! `graphql_tool`: SpaceX rocket, mission and launch data.
//!
//! Backed by the SpaceX v3 REST API. The query text only picks the view:
//! anything mentioning rockets lists rockets, anything mentioning missions
//! shows detailed recent missions, everything else lists recent launches.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::errors::ToolError;
use super::{param_text, Parameters, Tool};
use crate::config::LaunchesConfig;

pub const TOOL_NAME: &str = "graphql_tool";

/// Entries shown per listing.
const MAX_ENTRIES: usize = 5;
const MISSION_FETCH_LIMIT: u32 = 8;
const LAUNCH_FETCH_LIMIT: u32 = 10;

pub struct LaunchesTool {
    http: HttpClient,
    config: LaunchesConfig,
}

/// Which listing a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchView {
    Rockets,
    Missions,
    RecentLaunches,
}

impl LaunchView {
    pub fn from_query(query: &str) -> Self {
        let lowered = query.to_lowercase();
        if lowered.contains("rocket") {
            LaunchView::Rockets
        } else if lowered.contains("mission") {
            LaunchView::Missions
        } else {
            LaunchView::RecentLaunches
        }
    }
}

// ─── Wire Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Rocket {
    rocket_name: Option<String>,
    rocket_type: Option<String>,
    cost_per_launch: Option<u64>,
    success_rate_pct: Option<f64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Launch {
    mission_name: Option<String>,
    launch_date_utc: Option<String>,
    launch_success: Option<bool>,
    flight_number: Option<u64>,
    #[serde(default)]
    upcoming: bool,
    details: Option<String>,
    rocket: Option<LaunchRocket>,
    launch_site: Option<LaunchSite>,
}

#[derive(Debug, Deserialize)]
struct LaunchRocket {
    rocket_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LaunchSite {
    site_name: Option<String>,
}

// ─── LaunchesTool ────────────────────────────────────────────────────────────

impl LaunchesTool {
    pub fn new(config: LaunchesConfig) -> Result<Self, ToolError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolError::ConfigError {
                reason: format!("failed to build SpaceX HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        limit: Option<u32>,
    ) -> Result<T, ToolError> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        let mut request = self.http.get(&url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit.to_string()), ("order", "desc".to_string())]);
        }

        let response = request.send().await.map_err(|e| ToolError::RequestFailed {
            context: "SpaceX data".into(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::HttpError {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| ToolError::ResponseShape {
            context: format!("SpaceX {endpoint}"),
            reason: e.to_string(),
        })
    }

    async fn rockets(&self) -> Result<String, ToolError> {
        let rockets: Vec<Rocket> = self.fetch("rockets", None).await?;
        if rockets.is_empty() {
            return Ok("No rocket data found".to_string());
        }

        let mut out = String::from("SpaceX Rockets:\n");
        for rocket in rockets.iter().take(MAX_ENTRIES) {
            let cost = rocket
                .cost_per_launch
                .map(|c| format!("${}", group_thousands(c)))
                .unwrap_or_else(|| "Unknown".into());
            let success_rate = rocket
                .success_rate_pct
                .map(|r| format!("{r}%"))
                .unwrap_or_else(|| "Unknown".into());
            let description = rocket
                .description
                .as_deref()
                .map(|d| truncate(d, 100))
                .unwrap_or_else(|| "No description available".into());

            out.push_str(&format!(
                "• {} ({})\n  Cost per launch: {cost}\n  Success rate: {success_rate}\n  {description}\n\n",
                or_unknown(rocket.rocket_name.as_deref()),
                or_unknown(rocket.rocket_type.as_deref()),
            ));
        }
        Ok(out.trim_end().to_string())
    }

    async fn missions(&self) -> Result<String, ToolError> {
        let launches: Vec<Launch> = self.fetch("launches", Some(MISSION_FETCH_LIMIT)).await?;
        if launches.is_empty() {
            return Ok("No mission data found".to_string());
        }

        let completed: Vec<&Launch> = launches
            .iter()
            .filter(|l| !l.upcoming)
            .take(MAX_ENTRIES)
            .collect();
        if completed.is_empty() {
            return Ok("No recent completed missions found".to_string());
        }

        let mut out = String::from("SpaceX Missions:\n");
        for launch in completed {
            let rocket = launch.rocket.as_ref().and_then(|r| r.rocket_name.as_deref());
            let site = launch.launch_site.as_ref().and_then(|s| s.site_name.as_deref());
            let details = launch
                .details
                .as_deref()
                .map(|d| truncate(d, 150))
                .unwrap_or_else(|| "No details available".into());

            out.push_str(&format!(
                "• {} (Flight #{})\n  Rocket: {}\n  Launch Site: {}\n  Date: {}\n  Status: {}\n  {details}\n\n",
                or_unknown(launch.mission_name.as_deref()),
                flight_number(launch.flight_number),
                or_unknown(rocket),
                or_unknown(site),
                format_launch_date(launch.launch_date_utc.as_deref()),
                launch_status(launch.launch_success),
            ));
        }
        Ok(out.trim_end().to_string())
    }

    async fn recent_launches(&self) -> Result<String, ToolError> {
        let launches: Vec<Launch> = self.fetch("launches", Some(LAUNCH_FETCH_LIMIT)).await?;
        if launches.is_empty() {
            return Ok("No launch data found".to_string());
        }

        let completed: Vec<&Launch> = launches
            .iter()
            .filter(|l| !l.upcoming)
            .take(MAX_ENTRIES)
            .collect();
        if completed.is_empty() {
            return Ok("No recent completed launches found".to_string());
        }

        let mut out = String::from("Recent SpaceX Launches:\n");
        for launch in completed {
            out.push_str(&format!(
                "\n{} (Flight #{})\n  Date: {}\n  Status: {}\n",
                or_unknown(launch.mission_name.as_deref()),
                flight_number(launch.flight_number),
                format_launch_date(launch.launch_date_utc.as_deref()),
                launch_status(launch.launch_success),
            ));
        }
        Ok(out.trim_end().to_string())
    }
}

#[async_trait]
impl Tool for LaunchesTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    async fn execute(&self, params: &Parameters) -> Result<String, ToolError> {
        let query = param_text(params, "query").unwrap_or_default();
        let view = LaunchView::from_query(&query);
        tracing::debug!(?view, "querying SpaceX API");

        match view {
            LaunchView::Rockets => self.rockets().await,
            LaunchView::Missions => self.missions().await,
            LaunchView::RecentLaunches => self.recent_launches().await,
        }
    }
}

// ─── Formatting ──────────────────────────────────────────────────────────────

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("Unknown")
}

fn flight_number(number: Option<u64>) -> String {
    number.map(|n| n.to_string()).unwrap_or_else(|| "Unknown".into())
}

fn launch_status(success: Option<bool>) -> &'static str {
    if success == Some(true) {
        "Success"
    } else {
        "Failed"
    }
}

/// `2020-01-29T14:06:00.000Z` → `2020-01-29 14:06 UTC`. Unparseable dates are
/// passed through unchanged.
fn format_launch_date(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "Unknown".to_string();
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc).format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// First `max_chars` characters followed by `...`.
fn truncate(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

/// `90000000` → `90,000,000`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
