//! Weather tool using wttr.in.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::ToolError;
use crate::tool::{string_params, Tool, ToolArgs, ToolOutput};

const WTTR_BASE: &str = "https://wttr.in/";

/// Subset of the wttr.in `j1` payload we read.
#[derive(Debug, Deserialize)]
struct WttrResponse {
    #[serde(default)]
    current_condition: Vec<WttrCurrent>,
    #[serde(default)]
    weather: Vec<WttrDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WttrCurrent {
    #[serde(rename = "temp_C")]
    temp_c: String,
    humidity: String,
    #[serde(default, rename = "lang_zh")]
    lang_zh: Vec<WttrText>,
    #[serde(default)]
    weather_desc: Vec<WttrText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WttrDay {
    date: String,
    #[serde(rename = "maxtempC")]
    max_temp_c: String,
    #[serde(rename = "mintempC")]
    min_temp_c: String,
}

#[derive(Debug, Deserialize)]
struct WttrText {
    value: String,
}

/// What the model receives.
#[derive(Debug, Serialize, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub condition: String,
    pub temperature_c: String,
    pub humidity: String,
    pub forecast: Vec<DailyForecast>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DailyForecast {
    pub date: String,
    pub max_c: String,
    pub min_c: String,
}

/// `getWeather`: current conditions and a short forecast for a city.
///
/// Backed by wttr.in, which needs no API key.
pub struct GetWeather {
    client: reqwest::Client,
    base_url: String,
}

impl GetWeather {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("curl/8.0.0") // wttr.in picks its output by user agent
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: WTTR_BASE.to_string(),
        }
    }

    /// Point the tool at another wttr.in-compatible host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_url(&self, city: &str) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ToolError::InvalidParameter {
            name: "base_url".to_string(),
            reason: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| ToolError::ExecutionFailed("weather base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(city);
        url.query_pairs_mut().append_pair("format", "j1").append_pair("lang", "zh");
        Ok(url)
    }
}

impl Default for GetWeather {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a wttr.in `j1` body into a report.
pub(crate) fn parse_report(city: &str, body: &str) -> Result<WeatherReport, ToolError> {
    let data: WttrResponse = serde_json::from_str(body)?;
    let current = data
        .current_condition
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::NotFoundData(format!("未找到城市天气: {}", city)))?;

    let condition = current
        .lang_zh
        .into_iter()
        .chain(current.weather_desc)
        .map(|t| t.value.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_default();

    Ok(WeatherReport {
        city: city.to_string(),
        condition,
        temperature_c: current.temp_c,
        humidity: current.humidity,
        forecast: data
            .weather
            .into_iter()
            .map(|day| DailyForecast {
                date: day.date,
                max_c: day.max_temp_c,
                min_c: day.min_temp_c,
            })
            .collect(),
    })
}

#[async_trait]
impl Tool for GetWeather {
    fn name(&self) -> &str {
        "getWeather"
    }

    fn description(&self) -> &str {
        "当用户询问某个城市的天气情况时，调用此工具查询实时天气和未来几天的预报。"
    }

    fn parameters(&self) -> Value {
        string_params(&[("city", "需要查询天气的城市名称，例如 '北京'")])
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let city = args.get_string("city")?;
        let url = self.request_url(&city)?;
        debug!("Fetching weather from: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            warn!("Weather API returned status {}", response.status());
            return Err(ToolError::ExecutionFailed(format!(
                "Weather API returned status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        ToolOutput::json(&parse_report(&city, &body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    const SAMPLE: &str = r#"{
        "current_condition": [{
            "temp_C": "21", "humidity": "40",
            "lang_zh": [{"value": "晴"}],
            "weatherDesc": [{"value": "Sunny"}]
        }],
        "weather": [
            {"date": "2026-10-16", "maxtempC": "24", "mintempC": "12"},
            {"date": "2026-10-17", "maxtempC": "22", "mintempC": "11"}
        ]
    }"#;

    #[test]
    fn test_parse_report() {
        let report = parse_report("北京", SAMPLE).unwrap();
        assert_eq!(report.condition, "晴");
        assert_eq!(report.temperature_c, "21");
        assert_eq!(report.forecast.len(), 2);
        assert_eq!(report.forecast[1].min_c, "11");
    }

    #[test]
    fn test_parse_empty_conditions() {
        let result = parse_report("火星", r#"{"current_condition": [], "weather": []}"#);
        assert!(matches!(result, Err(ToolError::NotFoundData(_))));
    }

    #[test]
    fn test_request_url_encodes_city() {
        let url = GetWeather::new().request_url("New York").unwrap();
        assert_eq!(url.as_str(), "https://wttr.in/New%20York?format=j1&lang=zh");
    }

    #[tokio::test]
    async fn test_missing_city() {
        let result = GetWeather::new().execute(ToolArgs::new(Map::new())).await;
        assert!(matches!(result, Err(ToolError::MissingParameter(_))));
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_weather_fetch() {
        let mut params = Map::new();
        params.insert("city".to_string(), Value::String("Beijing".to_string()));
        let result = GetWeather::new().execute(ToolArgs::new(params)).await.unwrap();
        assert!(result.content.contains("temperature_c"));
    }
}
